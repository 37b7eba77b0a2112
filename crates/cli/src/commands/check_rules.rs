use std::collections::HashSet;
use std::path::Path;

use serde_json::json;
use staffquote_core::config::IngestionMode;
use staffquote_core::{compile_rule, validate_rules, CostComponentId, PricingRule};
use tracing::warn;

use crate::catalog::{catalog_bound_violations, read_catalog_document, CatalogDocument};
use crate::commands::{exit_code_for, load_config, CommandResult};

/// Validates a catalog as strict ingestion would, without pricing anything.
///
/// Problems fail the command. Warnings (dangling component references, which
/// evaluation skips with a trace entry) are reported but do not.
pub fn run(catalog_path: &Path) -> CommandResult {
    if let Err(result) = load_config("check-rules") {
        return result;
    }

    let document = match read_catalog_document(catalog_path) {
        Ok(document) => document,
        Err(error) => return CommandResult::from_error("check-rules", &error),
    };

    let problems = collect_problems(&document);
    let warnings = collect_warnings(&document);
    for warning in &warnings {
        warn!(event_name = "catalog.check.warning", detail = %warning, "catalog warning");
    }

    if !problems.is_empty() {
        return CommandResult::failure_with_data(
            "check-rules",
            "rule_validation",
            format!("{} problem(s) found in `{}`", problems.len(), catalog_path.display()),
            exit_code_for("rule_validation"),
            Some(json!({ "problems": problems, "warnings": warnings })),
        );
    }

    CommandResult::success_with_data(
        "check-rules",
        format!(
            "{} pricing rule(s) and {} approval row(s) are valid",
            document.pricing_rules.len(),
            document.discount_approvals.len()
        ),
        &json!({ "problems": problems, "warnings": warnings }),
    )
}

fn collect_problems(document: &CatalogDocument) -> Vec<String> {
    let mut problems: Vec<String> =
        validate_rules(&document.pricing_rules).iter().map(ToString::to_string).collect();

    let compiled: Vec<PricingRule> = document
        .pricing_rules
        .iter()
        .filter_map(|definition| compile_rule(definition, IngestionMode::Strict).ok())
        .collect();
    problems.extend(catalog_bound_violations(
        &document.job_profiles,
        &document.cost_components,
        &compiled,
    ));

    let mut seen = HashSet::new();
    for rule in &document.pricing_rules {
        if !rule.id.is_empty() && !seen.insert(rule.id.as_str()) {
            problems.push(format!("rule `{}` is defined more than once", rule.id));
        }
    }

    for (index, row) in document.discount_approvals.iter().enumerate() {
        if row.min_percentage >= row.max_percentage {
            problems.push(format!(
                "approval row {index} ({}) has an empty range ({}, {}]",
                row.discount_type.as_str(),
                row.min_percentage,
                row.max_percentage
            ));
        }
        if !document.approver_roles.is_empty()
            && !document.approver_roles.iter().any(|role| role.id == row.approver_role_id)
        {
            problems.push(format!(
                "approval row {index} names undefined approver role `{}`",
                row.approver_role_id.0
            ));
        }
    }

    problems
}

fn collect_warnings(document: &CatalogDocument) -> Vec<String> {
    let known: HashSet<&CostComponentId> =
        document.cost_components.iter().map(|component| &component.id).collect();
    let known = &known;

    document
        .pricing_rules
        .iter()
        .flat_map(move |rule| {
            rule.actions
                .iter()
                .filter(|action| action.action_type == "add_cost_component")
                .filter_map(|action| action.params.get("component_id")?.as_str())
                .filter(move |component_id| {
                    !known.contains(&CostComponentId(component_id.to_string()))
                })
                .map(move |component_id| {
                    format!("rule `{}` adds unknown cost component `{component_id}`", rule.id)
                })
        })
        .collect()
}
