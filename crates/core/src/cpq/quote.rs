use rust_decimal::Decimal;
use serde::Serialize;

use crate::approvals::{ApprovalRoute, ApprovalRouter};
use crate::cpq::pricing::{display_round, CostBreakdown};
use crate::domain::approval::{DiscountApprovalRule, DiscountType};

/// A priced line plus the manual discount the salesperson asked for on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub breakdown: CostBreakdown,
    pub requested_discount_pct: Decimal,
}

impl PricedLine {
    pub fn new(breakdown: CostBreakdown, requested_discount_pct: Option<Decimal>) -> Self {
        Self { breakdown, requested_discount_pct: requested_discount_pct.unwrap_or(Decimal::ZERO) }
    }

    pub fn line_discount_amount(&self) -> Decimal {
        self.breakdown.subtotal.saturating_mul(self.requested_discount_pct / Decimal::ONE_HUNDRED)
    }

    pub fn net_subtotal(&self) -> Decimal {
        self.breakdown.subtotal.saturating_sub(self.line_discount_amount())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteSummary {
    pub line_count: usize,
    pub gross_subtotal: Decimal,
    pub line_discount_total: Decimal,
    pub overall_discount_pct: Decimal,
    pub overall_discount_amount: Decimal,
    pub net_total: Decimal,
    pub total_monthly_cost: Decimal,
    pub total_one_time_cost: Decimal,
}

impl QuoteSummary {
    pub fn rounded(&self, scale: u32) -> Self {
        Self {
            gross_subtotal: display_round(self.gross_subtotal, scale),
            line_discount_total: display_round(self.line_discount_total, scale),
            overall_discount_amount: display_round(self.overall_discount_amount, scale),
            net_total: display_round(self.net_total, scale),
            total_monthly_cost: display_round(self.total_monthly_cost, scale),
            total_one_time_cost: display_round(self.total_one_time_cost, scale),
            ..self.clone()
        }
    }
}

/// Rolls priced lines up into quote totals.
///
/// Line discounts come off each line subtotal first; the overall discount then
/// applies to the sum of the discounted lines.
pub fn summarize_quote(lines: &[PricedLine], overall_discount_pct: Decimal) -> QuoteSummary {
    let gross_subtotal = saturating_sum(lines.iter().map(|line| line.breakdown.subtotal));
    let line_discount_total = saturating_sum(lines.iter().map(PricedLine::line_discount_amount));
    let after_line_discounts = gross_subtotal.saturating_sub(line_discount_total);
    let overall_discount_amount =
        after_line_discounts.saturating_mul(overall_discount_pct / Decimal::ONE_HUNDRED);

    QuoteSummary {
        line_count: lines.len(),
        gross_subtotal,
        line_discount_total,
        overall_discount_pct,
        overall_discount_amount,
        net_total: after_line_discounts.saturating_sub(overall_discount_amount),
        total_monthly_cost: saturating_sum(
            lines.iter().map(|line| line.breakdown.total_monthly_cost),
        ),
        total_one_time_cost: saturating_sum(
            lines.iter().map(|line| line.breakdown.total_one_time_cost),
        ),
    }
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ApprovalScope {
    Line { index: usize },
    Quote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalRequirement {
    pub scope: ApprovalScope,
    pub discount_type: DiscountType,
    pub discount_pct: Decimal,
    pub route: ApprovalRoute,
}

/// Approval checks for every manual line discount and the overall discount.
///
/// Only routes that need attention are returned; an empty list means the quote
/// can go out without sign-off.
pub fn required_approvals(
    router: &ApprovalRouter,
    lines: &[PricedLine],
    overall_discount_pct: Decimal,
    rules: &[DiscountApprovalRule],
) -> Vec<ApprovalRequirement> {
    let line_checks = lines.iter().enumerate().map(|(index, line)| {
        (ApprovalScope::Line { index }, DiscountType::LineItem, line.requested_discount_pct)
    });
    let quote_check =
        std::iter::once((ApprovalScope::Quote, DiscountType::OverallQuote, overall_discount_pct));

    line_checks
        .chain(quote_check)
        .filter_map(|(scope, discount_type, discount_pct)| {
            let route = router.route(discount_pct, discount_type, rules);
            route.needs_attention().then_some(ApprovalRequirement {
                scope,
                discount_type,
                discount_pct,
                route,
            })
        })
        .collect()
}
