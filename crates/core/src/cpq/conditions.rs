use rust_decimal::Decimal;

use crate::domain::rule::{Condition, ConditionGroup, Predicate};
use crate::facts::{FactRecord, FactValue};

/// Returns whether every condition in the group holds for `facts`.
///
/// An empty group always holds. Evaluation stops at the first failing condition.
pub fn evaluate(group: &ConditionGroup, facts: &FactRecord) -> bool {
    group.all.iter().all(|condition| evaluate_condition(condition, facts))
}

/// A missing fact path makes the condition fail.
pub fn evaluate_condition(condition: &Condition, facts: &FactRecord) -> bool {
    let Some(actual) = facts.resolve(&condition.fact) else {
        return false;
    };

    match &condition.predicate {
        Predicate::Equal(expected) => actual.loosely_equals(expected),
        Predicate::NotEqual(expected) => !actual.loosely_equals(expected),
        Predicate::GreaterThan(threshold) => compare(&actual, |value| value > *threshold),
        Predicate::LessThan(threshold) => compare(&actual, |value| value < *threshold),
        Predicate::GreaterThanOrEqual(threshold) => compare(&actual, |value| value >= *threshold),
        Predicate::LessThanOrEqual(threshold) => compare(&actual, |value| value <= *threshold),
        Predicate::Between { low, high } => compare(&actual, |value| value >= *low && value <= *high),
        Predicate::In(members) => {
            let needle = actual.to_string();
            members.iter().any(|member| *member == needle)
        }
        Predicate::Contains(fragment) => actual.to_string().contains(fragment.as_str()),
        Predicate::StartsWith(prefix) => actual.to_string().starts_with(prefix.as_str()),
        Predicate::Unsupported { .. } => false,
    }
}

fn compare(actual: &FactValue, check: impl Fn(Decimal) -> bool) -> bool {
    actual.as_decimal().is_some_and(check)
}
