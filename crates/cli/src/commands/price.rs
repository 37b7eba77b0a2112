use std::path::Path;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use staffquote_core::{
    display_round, required_approvals, summarize_quote, ApprovalRequirement, ApprovalRouter,
    CostBreakdown, DeterministicPricingEngine, LineItemRequest, PricedLine, PricingEngine,
    QuoteSummary,
};
use tracing::info;

use crate::catalog::{load_catalog, load_request};
use crate::commands::{exit_code_for, load_config, CommandResult};

#[derive(Debug, Serialize)]
struct PricedLineView {
    index: usize,
    job_profile_id: String,
    requested_discount_pct: Decimal,
    net_subtotal: Decimal,
    breakdown: CostBreakdown,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    currency: String,
    as_of: NaiveDate,
    lines: Vec<PricedLineView>,
    summary: QuoteSummary,
    approvals: Vec<ApprovalRequirement>,
}

pub fn run(catalog_path: &Path, request_path: &Path, as_of: Option<NaiveDate>) -> CommandResult {
    let config = match load_config("price") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let catalog = match load_catalog(catalog_path, config.pricing.ingestion_mode) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::from_error("price", &error),
    };
    let request = match load_request(request_path) {
        Ok(request) => request,
        Err(error) => return CommandResult::from_error("price", &error),
    };

    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let engine = DeterministicPricingEngine;
    let mut priced = Vec::with_capacity(request.lines.len());

    for (index, selections) in request.lines.iter().enumerate() {
        let Some(job_profile) = catalog.job_profile(&selections.job_profile_id) else {
            return CommandResult::failure(
                "price",
                "bad_request",
                format!(
                    "line {index} references unknown job profile `{}`",
                    selections.job_profile_id.0
                ),
                exit_code_for("bad_request"),
            );
        };

        let breakdown = engine.price_line_item(LineItemRequest {
            job_profile,
            selections,
            rules: &catalog.pricing_rules,
            components: &catalog.cost_components,
            as_of,
        });
        priced.push(PricedLine::new(breakdown, selections.requested_discount_pct));
    }

    let overall_discount_pct = request.overall_discount_pct.unwrap_or(Decimal::ZERO);
    let summary = summarize_quote(&priced, overall_discount_pct);
    let router = ApprovalRouter::from_config(&config.approvals);
    let approvals =
        required_approvals(&router, &priced, overall_discount_pct, &catalog.discount_approvals);

    let scale = config.pricing.display_scale;
    let lines = priced
        .iter()
        .zip(&request.lines)
        .enumerate()
        .map(|(index, (line, selections))| PricedLineView {
            index,
            job_profile_id: selections.job_profile_id.0.clone(),
            requested_discount_pct: line.requested_discount_pct,
            net_subtotal: display_round(line.net_subtotal(), scale),
            breakdown: line.breakdown.rounded(scale),
        })
        .collect();

    let report = PriceReport {
        currency: config.pricing.currency.clone(),
        as_of,
        lines,
        summary: summary.rounded(scale),
        approvals,
    };

    info!(
        event_name = "quote.priced",
        line_count = report.summary.line_count,
        approvals = report.approvals.len(),
        "quote priced"
    );

    let message = format!(
        "priced {} line(s); net total {} {}; {} approval(s) needed",
        report.summary.line_count,
        report.summary.net_total,
        report.currency,
        report.approvals.len()
    );
    CommandResult::success_with_data("price", message, &report)
}
