pub mod conditions;
pub mod ingestion;
pub mod matcher;
pub mod pricing;
pub mod quote;

use chrono::{NaiveDate, Utc};

use crate::domain::component::CostComponent;
use crate::domain::job::{JobProfile, LineItemSelections};
use crate::domain::rule::PricingRule;
use crate::facts::FactBuilder;

use self::{matcher::match_rules, pricing::aggregate, pricing::CostBreakdown};

/// Everything one line item evaluation reads. Borrowed, never mutated.
#[derive(Clone, Copy, Debug)]
pub struct LineItemRequest<'a> {
    pub job_profile: &'a JobProfile,
    pub selections: &'a LineItemSelections,
    pub rules: &'a [PricingRule],
    pub components: &'a [CostComponent],
    pub as_of: NaiveDate,
}

pub trait PricingEngine: Send + Sync {
    fn price_line_item(&self, request: LineItemRequest<'_>) -> CostBreakdown;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price_line_item(&self, request: LineItemRequest<'_>) -> CostBreakdown {
        evaluate_line_item(
            request.job_profile,
            request.selections,
            request.rules,
            request.components,
            request.as_of,
        )
    }
}

/// Builds facts, matches `rules` (already in priority order) and aggregates the cost.
pub fn evaluate_line_item(
    job_profile: &JobProfile,
    selections: &LineItemSelections,
    rules: &[PricingRule],
    components: &[CostComponent],
    as_of: NaiveDate,
) -> CostBreakdown {
    let facts = FactBuilder::new(job_profile, selections).build();
    let matched = match_rules(rules, &facts, components, as_of);

    aggregate(job_profile.base_cost, matched, selections.quantity, selections.duration_months)
}

/// [`evaluate_line_item`] against today's UTC date.
pub fn evaluate_line_item_today(
    job_profile: &JobProfile,
    selections: &LineItemSelections,
    rules: &[PricingRule],
    components: &[CostComponent],
) -> CostBreakdown {
    evaluate_line_item(job_profile, selections, rules, components, Utc::now().date_naive())
}
