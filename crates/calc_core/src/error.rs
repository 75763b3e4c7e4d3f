//! Parse-time error taxonomy.

use thiserror::Error;

/// Errors raised while turning text into an [`Expression`](crate::Expression).
///
/// All of these are fatal to the current call only; the next call starts clean.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input is not a single, balanced `( ... )` form.
    #[error("malformed expression: expected a single `(op a b)` form")]
    MalformedExpression,

    /// The operator symbol is not one of `+ - * /`.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    /// An operand token is not a decimal floating-point literal.
    #[error("invalid operand `{0}`")]
    InvalidOperand(String),

    /// The form does not hold exactly an operator and two operands.
    #[error("expected an operator and 2 operands, found {found} token(s)")]
    ArityMismatch { found: usize },

    /// A parenthesized form appears inside the outer one.
    #[error("nested expressions are not supported")]
    UnsupportedNesting,
}
