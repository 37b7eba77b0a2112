use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    LineItem,
    OverallQuote,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LineItem => "line_item",
            Self::OverallQuote => "overall_quote",
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "line_item" => Ok(Self::LineItem),
            "overall_quote" => Ok(Self::OverallQuote),
            other => Err(format!(
                "unsupported discount type `{other}` (expected line_item|overall_quote)"
            )),
        }
    }
}

/// One row of the discount approval matrix. Covers `(min_percentage, max_percentage]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountApprovalRule {
    pub discount_type: DiscountType,
    pub min_percentage: Decimal,
    pub max_percentage: Decimal,
    pub approver_role_id: RoleId,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl DiscountApprovalRule {
    pub fn covers(&self, discount_pct: Decimal) -> bool {
        discount_pct > self.min_percentage && discount_pct <= self.max_percentage
    }
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverRole {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}
