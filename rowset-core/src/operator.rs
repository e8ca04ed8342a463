//! SQL comparison operators accepted in WHERE conditions

use std::fmt::{self, Display};

/// Type-safe SQL operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator(&'static str);

impl Operator {
    pub const EQ: Self = Operator("=");
    pub const NEQ: Self = Operator("<>");
    pub const GT: Self = Operator(">");
    pub const LT: Self = Operator("<");
    pub const GTE: Self = Operator(">=");
    pub const LTE: Self = Operator("<=");
    pub const LIKE: Self = Operator("LIKE");
    pub const NOT_LIKE: Self = Operator("NOT LIKE");
    pub const IN: Self = Operator("IN");
    pub const NOT_IN: Self = Operator("NOT IN");

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &str {
        self.0
    }

    /// `IN` and `NOT IN` take a set of values.
    pub fn is_set(&self) -> bool {
        *self == Self::IN || *self == Self::NOT_IN
    }

    /// Operators that turn a NULL comparison into `IS NOT NULL`.
    pub fn is_negative(&self) -> bool {
        *self == Self::NEQ || *self == Self::NOT_IN || *self == Self::NOT_LIKE
    }
}

impl Default for Operator {
    fn default() -> Self {
        Self::EQ
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Operator;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Operator {
        self
    }
}

/// Allow string literals for the supported operators
impl IntoOperator for &str {
    fn into_operator(self) -> Operator {
        match self.trim().to_uppercase().as_str() {
            "=" => Operator::EQ,
            "<>" | "!=" => Operator::NEQ,
            ">" => Operator::GT,
            "<" => Operator::LT,
            ">=" => Operator::GTE,
            "<=" => Operator::LTE,
            "LIKE" => Operator::LIKE,
            "NOT LIKE" => Operator::NOT_LIKE,
            "IN" => Operator::IN,
            "NOT IN" => Operator::NOT_IN,
            _ => panic!(
                "Unknown operator '{}'. Use one of the Operator constants.",
                self
            ),
        }
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const EQ: Operator = Operator::EQ;
    pub const NEQ: Operator = Operator::NEQ;
    pub const GT: Operator = Operator::GT;
    pub const LT: Operator = Operator::LT;
    pub const GTE: Operator = Operator::GTE;
    pub const LTE: Operator = Operator::LTE;
    pub const LIKE: Operator = Operator::LIKE;
    pub const NOT_LIKE: Operator = Operator::NOT_LIKE;
    pub const IN: Operator = Operator::IN;
    pub const NOT_IN: Operator = Operator::NOT_IN;
}
