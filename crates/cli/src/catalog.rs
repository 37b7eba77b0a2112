//! File-backed stand-in for the catalog store: job profiles, cost components,
//! pricing rules and the discount approval matrix, read from TOML or JSON.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use staffquote_core::config::IngestionMode;
use staffquote_core::{
    compile_rules, sort_by_priority, ApplicationError, ApproverRole, CostComponent,
    DiscountApprovalRule, DomainError, JobProfile, JobProfileId, LineItemSelections, PricingRule,
    RuleAction, RuleDefinition,
};
use tracing::info;

/// Largest magnitude accepted for a base cost or cost component value.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
/// Largest magnitude accepted for a rule markup or discount percentage.
pub const MAX_RULE_PERCENTAGE: i64 = 1_000;
pub const MAX_QUANTITY: i64 = 100_000;
pub const MAX_DURATION_MONTHS: i64 = 600;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub job_profiles: Vec<JobProfile>,
    #[serde(default)]
    pub cost_components: Vec<CostComponent>,
    #[serde(default)]
    pub pricing_rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub discount_approvals: Vec<DiscountApprovalRule>,
    #[serde(default)]
    pub approver_roles: Vec<ApproverRole>,
}

/// A catalog snapshot with pricing rules compiled and in evaluation order.
#[derive(Debug)]
pub struct Catalog {
    pub job_profiles: Vec<JobProfile>,
    pub cost_components: Vec<CostComponent>,
    pub pricing_rules: Vec<PricingRule>,
    pub discount_approvals: Vec<DiscountApprovalRule>,
    pub approver_roles: Vec<ApproverRole>,
}

impl Catalog {
    pub fn job_profile(&self, id: &JobProfileId) -> Option<&JobProfile> {
        self.job_profiles.iter().find(|profile| &profile.id == id)
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub overall_discount_pct: Option<Decimal>,
    pub lines: Vec<LineItemSelections>,
}

pub fn read_catalog_document(path: &Path) -> Result<CatalogDocument, ApplicationError> {
    read_document(path).map_err(|error| ApplicationError::Catalog(format!("{error:#}")))
}

pub fn load_catalog(path: &Path, mode: IngestionMode) -> Result<Catalog, ApplicationError> {
    let document = read_catalog_document(path)?;
    let mut pricing_rules = compile_rules(&document.pricing_rules, mode)?;
    sort_by_priority(&mut pricing_rules);

    let violations =
        catalog_bound_violations(&document.job_profiles, &document.cost_components, &pricing_rules);
    if !violations.is_empty() {
        return Err(ApplicationError::Catalog(violations.join("; ")));
    }

    info!(
        event_name = "catalog.loaded",
        path = %path.display(),
        job_profiles = document.job_profiles.len(),
        pricing_rules = pricing_rules.len(),
        discount_approvals = document.discount_approvals.len(),
        "catalog snapshot loaded"
    );

    Ok(Catalog {
        job_profiles: document.job_profiles,
        cost_components: document.cost_components,
        pricing_rules,
        discount_approvals: document.discount_approvals,
        approver_roles: document.approver_roles,
    })
}

pub fn load_request(path: &Path) -> Result<QuoteRequest, ApplicationError> {
    let request: QuoteRequest =
        read_document(path).map_err(|error| ApplicationError::Catalog(format!("{error:#}")))?;

    let violations = request_bound_violations(&request);
    if !violations.is_empty() {
        return Err(DomainError::InvariantViolation(violations.join("; ")).into());
    }

    Ok(request)
}

/// Catalog figures outside the ranges pricing accepts.
pub fn catalog_bound_violations(
    job_profiles: &[JobProfile],
    cost_components: &[CostComponent],
    rules: &[PricingRule],
) -> Vec<String> {
    let max_amount = Decimal::from(MAX_AMOUNT);
    let max_percentage = Decimal::from(MAX_RULE_PERCENTAGE);
    let mut violations = Vec::new();

    for profile in job_profiles {
        if profile.base_cost < Decimal::ZERO || profile.base_cost > max_amount {
            violations.push(format!(
                "job profile `{}` base_cost {} is outside 0..={MAX_AMOUNT}",
                profile.id.0, profile.base_cost
            ));
        }
    }

    for component in cost_components {
        if component.value.abs() > max_amount {
            violations.push(format!(
                "cost component `{}` value {} exceeds {MAX_AMOUNT} in magnitude",
                component.id.0, component.value
            ));
        }
    }

    for rule in rules {
        for action in &rule.actions {
            let out_of_range = match action {
                RuleAction::AddCostComponent { value: Some(value), .. } => {
                    (value.abs() > max_amount).then(|| format!("cost component value {value}"))
                }
                RuleAction::AddCostComponent { value: None, .. } => None,
                RuleAction::ApplyMarkupPercentage { value }
                | RuleAction::ApplyDiscountPercentage { value } => (value.abs() > max_percentage)
                    .then(|| format!("percentage {value} beyond {MAX_RULE_PERCENTAGE}")),
            };
            if let Some(detail) = out_of_range {
                violations.push(format!("rule `{}` has an out-of-range {detail}", rule.id.0));
            }
        }
    }

    violations
}

/// Request figures outside the ranges pricing accepts.
pub fn request_bound_violations(request: &QuoteRequest) -> Vec<String> {
    let mut violations = Vec::new();

    for (index, line) in request.lines.iter().enumerate() {
        if !(0..=MAX_QUANTITY).contains(&line.quantity) {
            violations.push(format!(
                "line {index} quantity {} is outside 0..={MAX_QUANTITY}",
                line.quantity
            ));
        }
        if line.duration_months < Decimal::ZERO
            || line.duration_months > Decimal::from(MAX_DURATION_MONTHS)
        {
            violations.push(format!(
                "line {index} duration_months {} is outside 0..={MAX_DURATION_MONTHS}",
                line.duration_months
            ));
        }
        if let Some(pct) = line.requested_discount_pct.filter(|pct| !is_discount_pct(*pct)) {
            violations.push(format!("line {index} requested_discount_pct {pct} is outside 0..=100"));
        }
    }

    if let Some(pct) = request.overall_discount_pct.filter(|pct| !is_discount_pct(*pct)) {
        violations.push(format!("overall_discount_pct {pct} is outside 0..=100"));
    }

    violations
}

fn is_discount_pct(pct: Decimal) -> bool {
    pct >= Decimal::ZERO && pct <= Decimal::ONE_HUNDRED
}

fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;

    match path.extension().and_then(|extension| extension.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("could not parse JSON document `{}`", path.display())),
        Some("toml") => toml::from_str(&raw)
            .with_context(|| format!("could not parse TOML document `{}`", path.display())),
        _ => bail!("unsupported document format for `{}` (expected .json or .toml)", path.display()),
    }
}
