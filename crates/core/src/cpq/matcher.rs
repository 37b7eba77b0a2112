use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpq::conditions;
use crate::domain::component::{AppliedComponents, CostComponent};
use crate::domain::rule::{PricingRule, RuleAction};
use crate::facts::FactRecord;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rule_name: String,
    pub detail: String,
}

impl TraceEntry {
    fn new(rule: &PricingRule, detail: impl Into<String>) -> Self {
        Self { rule_name: rule.name.clone(), detail: detail.into() }
    }
}

/// Effects accumulated from every matching rule, plus the explanation trail.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub applied_components: AppliedComponents,
    pub markup_pct: Decimal,
    pub discount_pct: Decimal,
    pub trace: Vec<TraceEntry>,
}

/// Orders rules by descending priority. Equal priorities keep their input order.
pub fn sort_by_priority(rules: &mut [PricingRule]) {
    rules.sort_by(|left, right| right.priority.cmp(&left.priority));
}

/// Runs `rules` against `facts` as of the given date.
///
/// `rules` must already be in evaluation order (see [`sort_by_priority`]); they are
/// not re-sorted here. A rule is skipped when `as_of` is outside its window or its
/// conditions fail. A matching rule with `stop_if_matched` ends the run after its
/// own actions are applied.
pub fn match_rules(
    rules: &[PricingRule],
    facts: &FactRecord,
    components: &[CostComponent],
    as_of: NaiveDate,
) -> RuleMatch {
    let mut outcome = RuleMatch::default();

    for rule in rules {
        if !rule.is_open_on(as_of) || !conditions::evaluate(&rule.conditions, facts) {
            continue;
        }

        debug!(
            event_name = "pricing.rule.matched",
            rule_id = %rule.id.0,
            priority = rule.priority,
            "pricing rule matched"
        );
        outcome.trace.push(TraceEntry::new(rule, format!("matched (priority {})", rule.priority)));

        for action in &rule.actions {
            apply_action(&mut outcome, rule, action, components);
        }

        if rule.stop_if_matched {
            debug!(event_name = "pricing.rule.halted", rule_id = %rule.id.0, "rule evaluation halted");
            outcome
                .trace
                .push(TraceEntry::new(rule, "stop_if_matched set; remaining rules skipped"));
            break;
        }
    }

    outcome
}

fn apply_action(
    outcome: &mut RuleMatch,
    rule: &PricingRule,
    action: &RuleAction,
    components: &[CostComponent],
) {
    match action {
        RuleAction::AddCostComponent { component_id, value } => {
            let Some(component) = components.iter().find(|component| &component.id == component_id)
            else {
                outcome.trace.push(TraceEntry::new(
                    rule,
                    format!("cost component `{}` not found; action skipped", component_id.0),
                ));
                return;
            };

            let applied_value = value.unwrap_or(component.value);
            outcome.applied_components.insert(component, applied_value);
            outcome.trace.push(TraceEntry::new(
                rule,
                format!("added cost component `{}` at {}", component.name, applied_value.normalize()),
            ));
        }
        RuleAction::ApplyMarkupPercentage { value } => {
            outcome.markup_pct = outcome.markup_pct.saturating_add(*value);
            outcome.trace.push(TraceEntry::new(rule, format!("markup +{}%", value.normalize())));
        }
        RuleAction::ApplyDiscountPercentage { value } => {
            outcome.discount_pct = outcome.discount_pct.saturating_add(*value);
            outcome.trace.push(TraceEntry::new(rule, format!("discount +{}%", value.normalize())));
        }
    }
}
