use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CostComponentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    Fixed,
    PercentageOfBase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Monthly,
    OneTime,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostComponent {
    pub id: CostComponentId,
    pub name: String,
    pub value: Decimal,
    pub calculation_method: CalculationMethod,
    pub periodicity: Periodicity,
    #[serde(rename = "type", default)]
    pub component_type: Option<String>,
}

/// A component selected by a matching rule together with the value that rule set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedComponent {
    pub component: CostComponent,
    pub applied_value: Decimal,
}

impl AppliedComponent {
    /// Per-unit amount this component adds for the given base rate.
    pub fn contribution(&self, base_rate: Decimal) -> Decimal {
        match self.component.calculation_method {
            CalculationMethod::Fixed => self.applied_value,
            CalculationMethod::PercentageOfBase => {
                base_rate.saturating_mul(self.applied_value / Decimal::ONE_HUNDRED)
            }
        }
    }
}

/// Applied components keyed by component id.
///
/// Inserting an id that is already present replaces its value in place, so the
/// last matching rule wins while the first insertion keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppliedComponents {
    entries: Vec<AppliedComponent>,
}

impl AppliedComponents {
    pub fn insert(&mut self, component: &CostComponent, applied_value: Decimal) {
        if let Some(existing) = self.entries.iter_mut().find(|entry| entry.component.id == component.id)
        {
            existing.component = component.clone();
            existing.applied_value = applied_value;
            return;
        }

        self.entries.push(AppliedComponent { component: component.clone(), applied_value });
    }

    pub fn get(&self, id: &CostComponentId) -> Option<&AppliedComponent> {
        self.entries.iter().find(|entry| &entry.component.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppliedComponent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
