use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobProfileId(pub String);

/// Reference data for a staffable job. `base_cost` is the monthly rate for one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProfile {
    pub id: JobProfileId,
    pub name: String,
    pub base_cost: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
}

/// What the client picked on one quote line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItemSelections {
    pub job_profile_id: JobProfileId,
    #[serde(default)]
    pub nationality: Option<String>,
    pub duration_months: Decimal,
    #[serde(default)]
    pub location: Option<String>,
    pub quantity: i64,
    /// Manual discount requested by the salesperson on top of rule-driven pricing.
    #[serde(default)]
    pub requested_discount_pct: Option<Decimal>,
    /// Open attributes exposed to rules under their own dotted paths.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}
