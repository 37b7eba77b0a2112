pub mod approvals;
pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod facts;

pub use approvals::{
    cache::{ApproverRoleCache, InMemoryRoleDirectory, RoleDirectory},
    resolve_approver, ApprovalRoute, ApprovalRouter, ResolvedRoute,
};
pub use cpq::{
    evaluate_line_item, evaluate_line_item_today,
    ingestion::{compile_rule, compile_rules, validate_rules},
    matcher::{match_rules, sort_by_priority, RuleMatch, TraceEntry},
    pricing::{aggregate, display_round, CostBreakdown},
    quote::{
        required_approvals, summarize_quote, ApprovalRequirement, ApprovalScope, PricedLine,
        QuoteSummary,
    },
    DeterministicPricingEngine, LineItemRequest, PricingEngine,
};
pub use domain::approval::{ApproverRole, DiscountApprovalRule, DiscountType, RoleId};
pub use domain::component::{
    AppliedComponent, AppliedComponents, CalculationMethod, CostComponent, CostComponentId,
    Periodicity,
};
pub use domain::job::{JobProfile, JobProfileId, LineItemSelections};
pub use domain::rule::{
    ActionDefinition, Condition, ConditionDefinition, ConditionGroup, ConditionGroupDefinition,
    FactPath, Operator, Predicate, PricingRule, PricingRuleId, RuleAction, RuleDefinition,
};
pub use errors::{ApplicationError, DomainError, RuleValidationError};
pub use facts::{FactBuilder, FactRecord, FactValue};
