//! Expression model: one binary operator applied to two scalar operands.

use serde::{Deserialize, Serialize};

use crate::{ParseError, Scalar};

/// Closed set of binary operators understood by both evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    /// Maps a prefix-notation symbol to its operator.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operator::Add),
            "-" => Some(Operator::Subtract),
            "*" => Some(Operator::Multiply),
            "/" => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        }
    }

    /// Numeric tag written into slot 0 of the kernel record.
    ///
    /// Must stay in sync with the `OP_*` constants in `evaluate_expression.wgsl`.
    pub fn tag(self) -> u32 {
        match self {
            Operator::Add => 0,
            Operator::Subtract => 1,
            Operator::Multiply => 2,
            Operator::Divide => 3,
        }
    }

    /// Decodes a tag carried as a float. Non-integral or out-of-range values yield `None`.
    pub fn from_tag(tag: Scalar) -> Option<Self> {
        if tag.fract() != 0.0 {
            return None;
        }
        match tag as i64 {
            0 => Some(Operator::Add),
            1 => Some(Operator::Subtract),
            2 => Some(Operator::Multiply),
            3 => Some(Operator::Divide),
            _ => None,
        }
    }

    /// Position of this operator's lane in the diagnostic vector (slots 4..=7).
    pub(crate) fn lane_index(self) -> usize {
        self.tag() as usize
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A fully-populated `(op a b)` expression.
///
/// Fields are private so that every instance handed to an evaluator went through a
/// constructor; there is no partially-built state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    operator: Operator,
    reserved: Scalar,
    operand_a: Scalar,
    operand_b: Scalar,
}

impl Expression {
    pub fn new(operator: Operator, operand_a: Scalar, operand_b: Scalar) -> Self {
        Self {
            operator,
            reserved: 0.0,
            operand_a,
            operand_b,
        }
    }

    /// Builds an expression from an operator symbol and a list of operands.
    pub fn from_parts(symbol: &str, operands: &[Scalar]) -> Result<Self, ParseError> {
        let operator = Operator::from_symbol(symbol).ok_or(ParseError::MalformedExpression)?;
        match *operands {
            [a, b] => Ok(Self::new(operator, a, b)),
            _ => Err(ParseError::MalformedExpression),
        }
    }

    /// Returns a copy carrying `reserved` in the record's spare slot.
    pub fn with_reserved(self, reserved: Scalar) -> Self {
        Self { reserved, ..self }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn reserved(&self) -> Scalar {
        self.reserved
    }

    pub fn operand_a(&self) -> Scalar {
        self.operand_a
    }

    pub fn operand_b(&self) -> Scalar {
        self.operand_b
    }

    pub fn operands(&self) -> (Scalar, Scalar) {
        (self.operand_a, self.operand_b)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.operator, self.operand_a, self.operand_b)
    }
}
