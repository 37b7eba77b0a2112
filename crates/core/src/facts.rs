use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::job::{JobProfile, LineItemSelections};
use crate::domain::rule::FactPath;

/// Scalar or list value a condition can compare against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    List(Vec<FactValue>),
}

impl FactValue {
    /// Converts a JSON value. Objects are not facts and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => parse_decimal(&number.to_string()).map(Self::Number),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Array(items) => {
                items.iter().map(Self::from_json).collect::<Option<Vec<_>>>().map(Self::List)
            }
            Value::Object(_) => None,
        }
    }

    /// Numeric reading used by the comparison operators.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Text(text) => parse_decimal(text),
            Self::Null | Self::Bool(_) | Self::List(_) => None,
        }
    }

    /// Type-coercing equality for data stored as a mix of strings and numbers.
    ///
    /// Numbers compare numerically against numeric text, booleans compare as 1/0,
    /// lists compare by their comma-joined text, and `Null` only equals `Null`.
    pub fn loosely_equals(&self, other: &FactValue) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Bool(flag), value) | (value, Self::Bool(flag)) => {
                let number = if *flag { Decimal::ONE } else { Decimal::ZERO };
                Self::Number(number).loosely_equals(value)
            }
            (Self::Number(number), Self::Text(text)) | (Self::Text(text), Self::Number(number)) => {
                coerce_text_to_number(text).is_some_and(|parsed| parsed == *number)
            }
            (Self::List(_), Self::List(_)) => false,
            (list @ Self::List(_), scalar) | (scalar, list @ Self::List(_)) => {
                Self::Text(list.to_string()).loosely_equals(scalar)
            }
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Number(number) => write!(f, "{}", number.normalize()),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                let joined = items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                f.write_str(&joined)
            }
        }
    }
}

/// Parses plain or scientific decimal notation. Blank input is not a number.
pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed).or_else(|_| Decimal::from_scientific(trimmed)).ok()
}

// Blank text coerces to zero under loose equality.
fn coerce_text_to_number(text: &str) -> Option<Decimal> {
    if text.trim().is_empty() {
        return Some(Decimal::ZERO);
    }
    parse_decimal(text)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItemFacts {
    pub job_profile_id: String,
    pub nationality: Option<String>,
    pub duration: Decimal,
    pub location: Option<String>,
    pub quantity: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobFacts {
    pub id: String,
    pub name: String,
    pub base_cost: Decimal,
    pub category: Option<String>,
    pub skill_level: Option<String>,
}

/// Read-only facts for one evaluation.
///
/// The common paths (`line_item.*`, `job.*`) are typed fields. Anything else is
/// looked up by walking `extensions`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactRecord {
    pub line_item: LineItemFacts,
    pub job: JobFacts,
    pub extensions: Map<String, Value>,
}

impl FactRecord {
    /// Resolves a dotted path. `None` means some segment is missing.
    ///
    /// Typed paths answer from their field alone, so an unset typed field stays
    /// missing even when an extension carries the same key.
    pub fn resolve(&self, path: &FactPath) -> Option<FactValue> {
        let segments: Vec<&str> = path.segments().collect();
        let typed = match segments.as_slice() {
            ["line_item", field] => self.line_item_field(field),
            ["job", field] => self.job_field(field),
            _ => None,
        };

        match typed {
            Some(value) => value,
            None => walk_extensions(&self.extensions, &segments),
        }
    }

    // Outer `None`: not a typed field. Inner `None`: typed but unset.
    fn line_item_field(&self, field: &str) -> Option<Option<FactValue>> {
        let facts = &self.line_item;
        let value = match field {
            "job_profile_id" => Some(FactValue::Text(facts.job_profile_id.clone())),
            "nationality" => facts.nationality.clone().map(FactValue::Text),
            "duration" | "duration_months" => Some(FactValue::Number(facts.duration)),
            "location" => facts.location.clone().map(FactValue::Text),
            "quantity" => Some(FactValue::Number(Decimal::from(facts.quantity))),
            _ => return None,
        };
        Some(value)
    }

    fn job_field(&self, field: &str) -> Option<Option<FactValue>> {
        let facts = &self.job;
        let value = match field {
            "id" => Some(FactValue::Text(facts.id.clone())),
            "name" => Some(FactValue::Text(facts.name.clone())),
            "base_cost" => Some(FactValue::Number(facts.base_cost)),
            "category" => facts.category.clone().map(FactValue::Text),
            "skill_level" => facts.skill_level.clone().map(FactValue::Text),
            _ => return None,
        };
        Some(value)
    }
}

fn walk_extensions(extensions: &Map<String, Value>, segments: &[&str]) -> Option<FactValue> {
    let (first, rest) = segments.split_first()?;
    let mut current = extensions.get(*first)?;

    for segment in rest {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    FactValue::from_json(current)
}

/// Assembles the fact record for one line item.
///
/// Selection attributes land under `line_item.<name>`; extra namespaces can be
/// attached with [`FactBuilder::with_extension`]. A caller-supplied `line_item`
/// object is merged with the attributes, and its keys win on conflict.
pub struct FactBuilder<'a> {
    job: &'a JobProfile,
    selections: &'a LineItemSelections,
    extensions: Map<String, Value>,
}

impl<'a> FactBuilder<'a> {
    pub fn new(job: &'a JobProfile, selections: &'a LineItemSelections) -> Self {
        Self { job, selections, extensions: Map::new() }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn build(self) -> FactRecord {
        let Self { job, selections, mut extensions } = self;

        if !selections.attributes.is_empty() {
            let mut merged = selections.attributes.clone();
            if let Some(Value::Object(supplied)) = extensions.remove("line_item") {
                merged.extend(supplied);
            }
            extensions.insert("line_item".to_string(), Value::Object(merged));
        }

        FactRecord {
            line_item: LineItemFacts {
                job_profile_id: selections.job_profile_id.0.clone(),
                nationality: selections.nationality.clone(),
                duration: selections.duration_months,
                location: selections.location.clone(),
                quantity: selections.quantity,
            },
            job: JobFacts {
                id: job.id.0.clone(),
                name: job.name.clone(),
                base_cost: job.base_cost,
                category: job.category.clone(),
                skill_level: job.skill_level.clone(),
            },
            extensions,
        }
    }
}
