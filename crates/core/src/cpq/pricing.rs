use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::cpq::matcher::{RuleMatch, TraceEntry};
use crate::domain::component::{AppliedComponents, Periodicity};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CostBreakdown {
    pub base_rate: Decimal,
    pub quantity: i64,
    pub duration_months: Decimal,
    pub markup_pct: Decimal,
    pub discount_pct: Decimal,
    pub monthly_per_unit: Decimal,
    pub one_time_per_unit: Decimal,
    pub total_monthly_cost: Decimal,
    pub total_one_time_cost: Decimal,
    pub subtotal: Decimal,
    pub applied_components: AppliedComponents,
    pub trace: Vec<TraceEntry>,
}

impl CostBreakdown {
    /// Copy with every money figure rounded to `scale` places, for display only.
    pub fn rounded(&self, scale: u32) -> Self {
        Self {
            monthly_per_unit: display_round(self.monthly_per_unit, scale),
            one_time_per_unit: display_round(self.one_time_per_unit, scale),
            total_monthly_cost: display_round(self.total_monthly_cost, scale),
            total_one_time_cost: display_round(self.total_one_time_cost, scale),
            subtotal: display_round(self.subtotal, scale),
            ..self.clone()
        }
    }
}

/// Rounds half away from zero and pads to exactly `scale` places.
pub fn display_round(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Folds matched effects and the base rate into per-unit and total costs.
///
/// Markup is applied before discount, both to the monthly figure only:
/// `monthly * (1 + markup/100) * (1 - discount/100)`. Inputs are not validated;
/// a zero or negative quantity or duration flows straight through. Arithmetic
/// saturates at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
pub fn aggregate(
    base_rate: Decimal,
    matched: RuleMatch,
    quantity: i64,
    duration_months: Decimal,
) -> CostBreakdown {
    let RuleMatch { applied_components, markup_pct, discount_pct, trace } = matched;

    let mut monthly_per_unit = base_rate;
    let mut one_time_per_unit = Decimal::ZERO;

    for applied in applied_components.iter() {
        let contribution = applied.contribution(base_rate);
        match applied.component.periodicity {
            Periodicity::Monthly => {
                monthly_per_unit = monthly_per_unit.saturating_add(contribution);
            }
            Periodicity::OneTime => {
                one_time_per_unit = one_time_per_unit.saturating_add(contribution);
            }
        }
    }

    let markup_factor = Decimal::ONE.saturating_add(markup_pct / Decimal::ONE_HUNDRED);
    let discount_factor = Decimal::ONE.saturating_sub(discount_pct / Decimal::ONE_HUNDRED);
    monthly_per_unit = monthly_per_unit.saturating_mul(markup_factor).saturating_mul(discount_factor);

    let quantity_factor = Decimal::from(quantity);
    let subtotal = monthly_per_unit
        .saturating_mul(duration_months)
        .saturating_add(one_time_per_unit)
        .saturating_mul(quantity_factor);

    CostBreakdown {
        base_rate,
        quantity,
        duration_months,
        markup_pct,
        discount_pct,
        monthly_per_unit,
        one_time_per_unit,
        total_monthly_cost: monthly_per_unit.saturating_mul(quantity_factor),
        total_one_time_cost: one_time_per_unit.saturating_mul(quantity_factor),
        subtotal,
        applied_components,
        trace,
    }
}
