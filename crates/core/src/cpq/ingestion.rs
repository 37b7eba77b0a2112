//! Compiles loosely-typed rule definitions into [`PricingRule`]s.
//!
//! All shape problems are found here, once per load. The matcher and the
//! condition evaluator only ever see compiled rules and never fail.

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::config::IngestionMode;
use crate::domain::component::CostComponentId;
use crate::domain::rule::{
    ActionDefinition, Condition, ConditionDefinition, ConditionGroup, FactPath, Operator,
    Predicate, PricingRule, PricingRuleId, RuleAction, RuleDefinition,
};
use crate::errors::RuleValidationError;
use crate::facts::{parse_decimal, FactValue};

/// Compiles every definition, keeping input order. Stops at the first invalid rule.
pub fn compile_rules(
    definitions: &[RuleDefinition],
    mode: IngestionMode,
) -> Result<Vec<PricingRule>, RuleValidationError> {
    definitions.iter().map(|definition| compile_rule(definition, mode)).collect()
}

/// Strict-mode problems for every definition, for reporting a whole rule set at once.
pub fn validate_rules(definitions: &[RuleDefinition]) -> Vec<RuleValidationError> {
    definitions
        .iter()
        .filter_map(|definition| compile_rule(definition, IngestionMode::Strict).err())
        .collect()
}

pub fn compile_rule(
    definition: &RuleDefinition,
    mode: IngestionMode,
) -> Result<PricingRule, RuleValidationError> {
    let rule_id = definition.id.as_str();
    if rule_id.trim().is_empty() {
        return Err(RuleValidationError::new(rule_id, "id", "rule id must not be empty"));
    }

    if let (Some(from), Some(to)) = (definition.from_date, definition.to_date) {
        if from > to {
            let reason = format!("from_date {from} is after to_date {to}");
            if mode == IngestionMode::Strict {
                return Err(RuleValidationError::new(rule_id, "from_date", reason));
            }
            warn!(
                event_name = "pricing.rules.empty_window",
                rule_id,
                "{reason}; rule will never match"
            );
        }
    }

    let conditions = definition
        .conditions
        .as_ref()
        .map(|group| {
            group
                .all
                .iter()
                .enumerate()
                .map(|(index, condition)| compile_condition(rule_id, index, condition, mode))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let mut actions = Vec::with_capacity(definition.actions.len());
    for (index, action) in definition.actions.iter().enumerate() {
        if let Some(compiled) = compile_action(rule_id, index, action, mode)? {
            actions.push(compiled);
        }
    }

    Ok(PricingRule {
        id: PricingRuleId(definition.id.clone()),
        name: definition.name.clone(),
        priority: definition.priority,
        from_date: definition.from_date,
        to_date: definition.to_date,
        conditions: ConditionGroup { all: conditions },
        actions,
        stop_if_matched: definition.stop_if_matched,
    })
}

fn compile_condition(
    rule_id: &str,
    index: usize,
    definition: &ConditionDefinition,
    mode: IngestionMode,
) -> Result<Condition, RuleValidationError> {
    let field = format!("conditions.all[{index}]");
    let fact = FactPath(definition.fact.trim().to_string());

    if fact.0.is_empty() {
        return Err(RuleValidationError::new(rule_id, format!("{field}.fact"), "fact path must not be empty"));
    }

    let predicate = match definition.operator.parse::<Operator>() {
        Ok(operator) => compile_predicate(operator, &definition.value),
        Err(reason) => Err(reason),
    };

    match predicate {
        Ok(predicate) => Ok(Condition { fact, predicate }),
        Err(reason) if mode == IngestionMode::Strict => {
            Err(RuleValidationError::new(rule_id, field, reason))
        }
        Err(reason) => {
            warn!(
                event_name = "pricing.rules.condition_unsupported",
                rule_id,
                condition = %field,
                operator = %definition.operator,
                "{reason}; condition will never match"
            );
            Ok(Condition {
                fact,
                predicate: Predicate::Unsupported { operator: definition.operator.clone() },
            })
        }
    }
}

fn compile_predicate(operator: Operator, value: &Value) -> Result<Predicate, String> {
    let predicate = match operator {
        Operator::Equal => Predicate::Equal(scalar_operand(operator, value)?),
        Operator::NotEqual => Predicate::NotEqual(scalar_operand(operator, value)?),
        Operator::GreaterThan => Predicate::GreaterThan(numeric_operand(operator, value)?),
        Operator::LessThan => Predicate::LessThan(numeric_operand(operator, value)?),
        Operator::GreaterThanOrEqual => {
            Predicate::GreaterThanOrEqual(numeric_operand(operator, value)?)
        }
        Operator::LessThanOrEqual => Predicate::LessThanOrEqual(numeric_operand(operator, value)?),
        Operator::In => Predicate::In(member_list(value)?),
        Operator::Contains => Predicate::Contains(scalar_operand(operator, value)?.to_string()),
        Operator::StartsWith => Predicate::StartsWith(scalar_operand(operator, value)?.to_string()),
        Operator::Between => {
            let (low, high) = numeric_pair(value)?;
            Predicate::Between { low, high }
        }
    };

    Ok(predicate)
}

fn scalar_operand(operator: Operator, value: &Value) -> Result<FactValue, String> {
    FactValue::from_json(value).ok_or_else(|| {
        out_of_range(&format!("`{}` operand", operator.as_str()), value).unwrap_or_else(|| {
            format!("`{}` expects a scalar or list value, got an object", operator.as_str())
        })
    })
}

fn numeric_operand(operator: Operator, value: &Value) -> Result<Decimal, String> {
    FactValue::from_json(value).and_then(|operand| operand.as_decimal()).ok_or_else(|| {
        out_of_range(&format!("`{}` operand", operator.as_str()), value)
            .unwrap_or_else(|| format!("`{}` expects a numeric value, got {value}", operator.as_str()))
    })
}

/// Names the first JSON number (searching into lists) that `Decimal` cannot hold.
fn out_of_range(label: &str, value: &Value) -> Option<String> {
    unrepresentable_number(value)
        .map(|number| format!("{label} {number} is outside the supported decimal range"))
}

fn unrepresentable_number(value: &Value) -> Option<&Number> {
    match value {
        Value::Number(number) if parse_decimal(&number.to_string()).is_none() => Some(number),
        Value::Array(items) => items.iter().find_map(unrepresentable_number),
        _ => None,
    }
}

// A list, or a comma separated string.
fn member_list(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::String(raw) => Ok(raw.split(',').map(|member| member.trim().to_string()).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                FactValue::from_json(item).map(|member| member.to_string()).ok_or_else(|| {
                    out_of_range("`in` list member", item)
                        .unwrap_or_else(|| "`in` list members must be scalars".to_string())
                })
            })
            .collect(),
        Value::Null | Value::Object(_) => {
            Err(format!("`in` expects a list or comma separated string, got {value}"))
        }
        scalar => FactValue::from_json(scalar)
            .map(|member| vec![member.to_string()])
            .ok_or_else(|| {
                out_of_range("`in` operand", scalar)
                    .unwrap_or_else(|| format!("`in` could not read operand {scalar}"))
            }),
    }
}

fn numeric_pair(value: &Value) -> Result<(Decimal, Decimal), String> {
    let Value::Array(bounds) = value else {
        return Err(format!("`between` expects a [low, high] pair, got {value}"));
    };
    let [low, high] = bounds.as_slice() else {
        return Err(format!("`between` expects exactly two bounds, got {}", bounds.len()));
    };

    let low = numeric_operand(Operator::Between, low)?;
    let high = numeric_operand(Operator::Between, high)?;
    if low > high {
        return Err(format!("`between` lower bound {low} exceeds upper bound {high}"));
    }

    Ok((low, high))
}

fn compile_action(
    rule_id: &str,
    index: usize,
    definition: &ActionDefinition,
    mode: IngestionMode,
) -> Result<Option<RuleAction>, RuleValidationError> {
    let field = format!("actions[{index}]");
    let compiled = match definition.action_type.trim() {
        "add_cost_component" => add_cost_component(&definition.params),
        "apply_markup_percentage" => percentage(&definition.params)
            .map(|value| RuleAction::ApplyMarkupPercentage { value }),
        "apply_discount_percentage" => percentage(&definition.params)
            .map(|value| RuleAction::ApplyDiscountPercentage { value }),
        other => Err(format!("unknown action type `{other}`")),
    };

    match compiled {
        Ok(action) => Ok(Some(action)),
        Err(reason) if mode == IngestionMode::Strict => {
            Err(RuleValidationError::new(rule_id, field, reason))
        }
        Err(reason) => {
            warn!(
                event_name = "pricing.rules.action_dropped",
                rule_id,
                action = %field,
                action_type = %definition.action_type,
                "{reason}; action dropped"
            );
            Ok(None)
        }
    }
}

fn add_cost_component(params: &Map<String, Value>) -> Result<RuleAction, String> {
    let component_id = match params.get("component_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err("`add_cost_component` requires params.component_id".to_string()),
    };

    let value = match params.get("value") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            FactValue::from_json(raw).and_then(|value| value.as_decimal()).ok_or_else(|| {
                out_of_range("params.value", raw)
                    .unwrap_or_else(|| format!("params.value must be numeric, got {raw}"))
            })?,
        ),
    };

    Ok(RuleAction::AddCostComponent { component_id: CostComponentId(component_id), value })
}

// Absent or null means zero.
fn percentage(params: &Map<String, Value>) -> Result<Decimal, String> {
    match params.get("value") {
        None | Some(Value::Null) => Ok(Decimal::ZERO),
        Some(raw) => FactValue::from_json(raw).and_then(|value| value.as_decimal()).ok_or_else(|| {
            out_of_range("params.value", raw)
                .unwrap_or_else(|| format!("params.value must be numeric, got {raw}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{compile_rule, compile_rules, validate_rules};
    use crate::config::IngestionMode;
    use crate::domain::component::CostComponentId;
    use crate::domain::rule::{Predicate, RuleAction, RuleDefinition};

    fn definition(value: serde_json::Value) -> RuleDefinition {
        serde_json::from_value(value).expect("rule definition fixture")
    }

    #[test]
    fn compiles_operands_into_typed_predicates() {
        let rule = compile_rule(
            &definition(json!({
                "id": "r-gcc",
                "name": "GCC nationals",
                "priority": 50,
                "conditions": {"all": [
                    {"fact": "line_item.nationality", "operator": "in", "value": "SA, AE,KW"},
                    {"fact": "line_item.quantity", "operator": "greater_than_or_equal", "value": "5"},
                    {"fact": "line_item.duration", "operator": "between", "value": [6, 24]}
                ]},
                "actions": [
                    {"type": "add_cost_component", "params": {"component_id": "visa", "value": 250}},
                    {"type": "apply_markup_percentage", "params": {"value": "7.5"}},
                    {"type": "apply_discount_percentage", "params": {}}
                ]
            })),
            IngestionMode::Strict,
        )
        .expect("valid rule compiles");

        assert_eq!(
            rule.conditions.all[0].predicate,
            Predicate::In(vec!["SA".to_string(), "AE".to_string(), "KW".to_string()])
        );
        assert_eq!(rule.conditions.all[1].predicate, Predicate::GreaterThanOrEqual(Decimal::new(5, 0)));
        assert_eq!(
            rule.conditions.all[2].predicate,
            Predicate::Between { low: Decimal::new(6, 0), high: Decimal::new(24, 0) }
        );
        assert_eq!(
            rule.actions,
            vec![
                RuleAction::AddCostComponent {
                    component_id: CostComponentId("visa".to_string()),
                    value: Some(Decimal::new(250, 0)),
                },
                RuleAction::ApplyMarkupPercentage { value: Decimal::new(75, 1) },
                RuleAction::ApplyDiscountPercentage { value: Decimal::ZERO },
            ]
        );
    }

    #[test]
    fn absent_conditions_compile_to_unconditional_group() {
        let rule = compile_rule(
            &definition(json!({"id": "r-base", "name": "base fee", "actions": []})),
            IngestionMode::Strict,
        )
        .expect("rule without conditions compiles");

        assert!(rule.conditions.is_unconditional());
        assert!(!rule.stop_if_matched);
    }

    #[test]
    fn strict_mode_rejects_unknown_kinds() {
        let unknown_operator = definition(json!({
            "id": "r-1",
            "name": "regex",
            "conditions": {"all": [{"fact": "line_item.location", "operator": "matches", "value": "^R"}]}
        }));
        let error = compile_rule(&unknown_operator, IngestionMode::Strict).expect_err("unknown operator");
        assert_eq!(error.rule_id, "r-1");
        assert_eq!(error.field, "conditions.all[0]");

        let unknown_action = definition(json!({
            "id": "r-2",
            "name": "tax",
            "actions": [{"type": "apply_tax", "params": {"value": 15}}]
        }));
        let error = compile_rule(&unknown_action, IngestionMode::Strict).expect_err("unknown action");
        assert_eq!(error.field, "actions[0]");
    }

    #[test]
    fn lenient_mode_keeps_rule_but_neutralises_unknown_kinds() {
        let rule = compile_rule(
            &definition(json!({
                "id": "r-3",
                "name": "mixed",
                "conditions": {"all": [{"fact": "line_item.location", "operator": "matches", "value": "^R"}]},
                "actions": [
                    {"type": "apply_tax", "params": {"value": 15}},
                    {"type": "apply_markup_percentage", "params": {"value": 5}}
                ]
            })),
            IngestionMode::Lenient,
        )
        .expect("lenient ingestion keeps the rule");

        assert_eq!(
            rule.conditions.all[0].predicate,
            Predicate::Unsupported { operator: "matches".to_string() }
        );
        assert_eq!(rule.actions, vec![RuleAction::ApplyMarkupPercentage { value: Decimal::new(5, 0) }]);
    }

    #[test]
    fn rejects_malformed_operands() {
        let cases = [
            json!({"fact": "line_item.quantity", "operator": "greater_than", "value": "many"}),
            json!({"fact": "line_item.quantity", "operator": "between", "value": [10]}),
            json!({"fact": "line_item.quantity", "operator": "between", "value": [20, 10]}),
            json!({"fact": "line_item.quantity", "operator": "in", "value": null}),
            json!({"fact": "", "operator": "equal", "value": 1}),
        ];

        for condition in cases {
            let rule = definition(json!({"id": "r-bad", "name": "bad", "conditions": {"all": [condition]}}));
            assert!(compile_rule(&rule, IngestionMode::Strict).is_err());
        }
    }

    #[test]
    fn numbers_beyond_decimal_range_are_reported_as_such() {
        let conditions = [
            json!({"fact": "line_item.quantity", "operator": "greater_than", "value": 1e30}),
            json!({"fact": "line_item.quantity", "operator": "equal", "value": 1e30}),
            json!({"fact": "line_item.quantity", "operator": "in", "value": [1, 1e30]}),
            json!({"fact": "line_item.quantity", "operator": "between", "value": [0, 1e30]}),
        ];
        for condition in conditions {
            let rule = definition(json!({"id": "r-huge", "name": "huge", "conditions": {"all": [condition]}}));
            let error = compile_rule(&rule, IngestionMode::Strict).expect_err("out-of-range operand");
            assert!(
                error.reason.contains("1e30 is outside the supported decimal range"),
                "unexpected reason: {}",
                error.reason
            );
            assert!(!error.reason.contains("object"));
        }

        let action = definition(json!({
            "id": "r-huge",
            "name": "huge",
            "actions": [{"type": "apply_markup_percentage", "params": {"value": 1e30}}]
        }));
        let error = compile_rule(&action, IngestionMode::Strict).expect_err("out-of-range value");
        assert_eq!(error.reason, "params.value 1e30 is outside the supported decimal range");

        let object = definition(json!({
            "id": "r-obj",
            "name": "object",
            "conditions": {"all": [{"fact": "job.id", "operator": "equal", "value": {"a": 1}}]}
        }));
        let error = compile_rule(&object, IngestionMode::Strict).expect_err("object operand");
        assert!(error.reason.contains("got an object"));
    }

    #[test]
    fn inverted_date_window_is_rejected_in_strict_mode() {
        let mut rule = definition(json!({"id": "r-window", "name": "promo"}));
        rule.from_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        rule.to_date = NaiveDate::from_ymd_opt(2026, 5, 1);

        let error = compile_rule(&rule, IngestionMode::Strict).expect_err("inverted window");
        assert_eq!(error.field, "from_date");
        assert!(compile_rule(&rule, IngestionMode::Lenient).is_ok());
    }

    #[test]
    fn validate_rules_reports_every_invalid_definition() {
        let definitions = vec![
            definition(json!({"id": "ok", "name": "fine"})),
            definition(json!({"id": "bad-1", "name": "x", "actions": [{"type": "nope"}]})),
            definition(json!({"id": "bad-2", "name": "y", "actions": [{"type": "add_cost_component"}]})),
        ];

        let problems = validate_rules(&definitions);
        let ids: Vec<&str> = problems.iter().map(|problem| problem.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["bad-1", "bad-2"]);
        assert!(compile_rules(&definitions, IngestionMode::Strict).is_err());
        assert_eq!(compile_rules(&definitions[..1], IngestionMode::Strict).map(|rules| rules.len()), Ok(1));
    }
}
