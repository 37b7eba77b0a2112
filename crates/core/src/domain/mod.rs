pub mod approval;
pub mod component;
pub mod job;
pub mod rule;
