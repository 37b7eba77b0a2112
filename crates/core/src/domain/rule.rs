use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::component::CostComponentId;
use crate::facts::FactValue;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingRuleId(pub String);

// Definitions as handed over by the rule store. Loosely typed on purpose: they are
// compiled into `PricingRule` once, at ingestion.

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub conditions: Option<ConditionGroupDefinition>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub stop_if_matched: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroupDefinition {
    #[serde(default)]
    pub all: Vec<ConditionDefinition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub fact: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    In,
    Contains,
    StartsWith,
    Between,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::In => "in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Between => "between",
        }
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "equal" => Ok(Self::Equal),
            "not_equal" => Ok(Self::NotEqual),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "greater_than_or_equal" => Ok(Self::GreaterThanOrEqual),
            "less_than_or_equal" => Ok(Self::LessThanOrEqual),
            "in" => Ok(Self::In),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "between" => Ok(Self::Between),
            other => Err(format!("unknown operator `{other}`")),
        }
    }
}

/// Dotted path into a fact record, e.g. `line_item.quantity`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactPath(pub String);

impl FactPath {
    pub fn segments(&self) -> std::str::Split<'_, char> {
        self.0.split('.')
    }
}

/// Compiled comparison. Operands are parsed once so evaluation cannot fail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "operator", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Equal(FactValue),
    NotEqual(FactValue),
    GreaterThan(Decimal),
    LessThan(Decimal),
    GreaterThanOrEqual(Decimal),
    LessThanOrEqual(Decimal),
    In(Vec<String>),
    Contains(String),
    StartsWith(String),
    Between { low: Decimal, high: Decimal },
    /// Only produced by lenient ingestion. Never matches.
    Unsupported { operator: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub fact: FactPath,
    pub predicate: Predicate,
}

/// Conjunction of conditions. An empty group always holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConditionGroup {
    pub all: Vec<Condition>,
}

impl ConditionGroup {
    pub fn is_unconditional(&self) -> bool {
        self.all.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    AddCostComponent { component_id: CostComponentId, value: Option<Decimal> },
    ApplyMarkupPercentage { value: Decimal },
    ApplyDiscountPercentage { value: Decimal },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PricingRule {
    pub id: PricingRuleId,
    pub name: String,
    pub priority: i64,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub conditions: ConditionGroup,
    pub actions: Vec<RuleAction>,
    pub stop_if_matched: bool,
}

impl PricingRule {
    /// Whether `as_of` falls inside `[from_date, to_date]`. A missing bound is open.
    pub fn is_open_on(&self, as_of: NaiveDate) -> bool {
        let after_start = self.from_date.map_or(true, |from| as_of >= from);
        let before_end = self.to_date.map_or(true, |to| as_of <= to);
        after_start && before_end
    }
}
