use crate::core::{Item, ModelError, Result, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Predicate applied to a single attribute of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Exists,
    NotExists,
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Le(Value),
    Gt(Value),
    Ge(Value),
    BeginsWith(String),
    In(Vec<Value>),
    Between(Value, Value),
}

impl Predicate {
    /// Parses an operator token and its operand (when the operator takes one).
    ///
    /// Accepted tokens: `=`, `<>`, `!=`, `<`, `<=`, `>`, `>=`, `begins_with`,
    /// `attribute_exists`, `attribute_not_exists`.
    pub fn parse(operator: &str, operand: Option<Value>) -> Result<Self> {
        let needs_operand = |operand: Option<Value>| {
            operand.ok_or_else(|| {
                ModelError::invalid_argument(format!("Operator '{}' requires a value", operator))
            })
        };

        match operator.trim().to_ascii_lowercase().as_str() {
            "attribute_exists" => Ok(Self::Exists),
            "attribute_not_exists" => Ok(Self::NotExists),
            "=" | "==" => Ok(Self::Eq(needs_operand(operand)?)),
            "<>" | "!=" => Ok(Self::Ne(needs_operand(operand)?)),
            "<" => Ok(Self::Lt(needs_operand(operand)?)),
            "<=" => Ok(Self::Le(needs_operand(operand)?)),
            ">" => Ok(Self::Gt(needs_operand(operand)?)),
            ">=" => Ok(Self::Ge(needs_operand(operand)?)),
            "begins_with" => match needs_operand(operand)? {
                Value::Text(prefix) => Ok(Self::BeginsWith(prefix)),
                other => Err(ModelError::invalid_argument(format!(
                    "begins_with requires TEXT, got {}",
                    other.type_name()
                ))),
            },
            other => Err(ModelError::invalid_argument(format!(
                "Unsupported operator '{}'",
                other
            ))),
        }
    }

    /// Evaluates against the current value of the attribute (`None` when absent).
    pub fn matches(&self, current: Option<&Value>) -> bool {
        let current = current.filter(|value| !value.is_null());
        match self {
            Self::Exists => current.is_some(),
            Self::NotExists => current.is_none(),
            Self::Eq(expected) => current.is_some_and(|value| value == expected),
            Self::Ne(expected) => current.is_none_or(|value| value != expected),
            Self::Lt(bound) => ordering(current, bound) == Some(Ordering::Less),
            Self::Le(bound) => matches!(
                ordering(current, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt(bound) => ordering(current, bound) == Some(Ordering::Greater),
            Self::Ge(bound) => matches!(
                ordering(current, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::BeginsWith(prefix) => current
                .and_then(Value::as_str)
                .is_some_and(|text| text.starts_with(prefix.as_str())),
            Self::In(candidates) => {
                current.is_some_and(|value| candidates.iter().any(|candidate| candidate == value))
            }
            Self::Between(low, high) => {
                matches!(
                    ordering(current, low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    ordering(current, high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
        }
    }
}

fn ordering(current: Option<&Value>, bound: &Value) -> Option<Ordering> {
    current.and_then(|value| value.compare(bound).ok())
}

/// One attribute-level clause of a condition, filter or key-condition expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub predicate: Predicate,
}

impl Condition {
    pub fn new(attribute: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            attribute: attribute.into(),
            predicate,
        }
    }

    pub fn not_exists(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Predicate::NotExists)
    }

    pub fn exists(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Predicate::Exists)
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Predicate::Eq(value.into()))
    }

    /// Evaluates against a target item; a missing item has no attributes.
    pub fn matches(&self, item: Option<&Item>) -> bool {
        let current = item.and_then(|item| item.get(&self.attribute));
        self.predicate.matches(current)
    }
}

/// Returns `true` when every clause holds (an empty list always holds).
pub fn all_match(conditions: &[Condition], item: Option<&Item>) -> bool {
    conditions.iter().all(|condition| condition.matches(item))
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.attribute;
        match &self.predicate {
            Predicate::Exists => write!(f, "attribute_exists({})", name),
            Predicate::NotExists => write!(f, "attribute_not_exists({})", name),
            Predicate::Eq(v) => write!(f, "{} = {}", name, v),
            Predicate::Ne(v) => write!(f, "{} <> {}", name, v),
            Predicate::Lt(v) => write!(f, "{} < {}", name, v),
            Predicate::Le(v) => write!(f, "{} <= {}", name, v),
            Predicate::Gt(v) => write!(f, "{} > {}", name, v),
            Predicate::Ge(v) => write!(f, "{} >= {}", name, v),
            Predicate::BeginsWith(prefix) => write!(f, "begins_with({}, {})", name, prefix),
            Predicate::In(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} IN ({})", name, rendered.join(", "))
            }
            Predicate::Between(low, high) => write!(f, "{} BETWEEN {} AND {}", name, low, high),
        }
    }
}
