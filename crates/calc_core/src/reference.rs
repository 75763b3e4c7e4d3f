//! Host reference evaluator, the correctness oracle for accelerator output.

use crate::{Expression, Operator, Scalar};

/// Evaluates `expr` with plain IEEE-754 `f32` arithmetic.
///
/// Division by zero is not an error: it yields a signed infinity, or NaN for `0/0`.
pub fn evaluate(expr: &Expression) -> Scalar {
    apply(expr.operator(), expr.operand_a(), expr.operand_b())
}

pub fn apply(operator: Operator, a: Scalar, b: Scalar) -> Scalar {
    match operator {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => a / b,
    }
}

/// Add, subtract, multiply and divide of the operands, in diagnostic-lane order.
pub fn all_lanes(a: Scalar, b: Scalar) -> [Scalar; 4] {
    Operator::ALL.map(|op| apply(op, a, b))
}
