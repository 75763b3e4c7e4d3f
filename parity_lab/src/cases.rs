//! Deterministic expression cases for the parity harness.

use calc_core::{Expression, Operator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A labeled batch of expressions, rendered as prefix text so that the parser is
/// exercised along with both evaluators.
#[derive(Debug, Clone)]
pub struct CaseSet {
    pub label: String,
    pub cases: Vec<String>,
}

/// Renders `expr` in the `(op a b)` input grammar.
///
/// Uses `{:?}` formatting so that the text parses back to the same bits.
pub fn to_prefix_text(expr: &Expression) -> String {
    format!(
        "({} {:?} {:?})",
        expr.operator().symbol(),
        expr.operand_a(),
        expr.operand_b()
    )
}

/// Deterministic generator cycling through every operator.
pub fn generate_expression_cases(count: usize, seed: u64) -> Vec<Expression> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|idx| {
            let operator = Operator::ALL[idx % Operator::ALL.len()];
            let a: f32 = rng.gen_range(-1.0e3..=1.0e3);
            let b: f32 = rng.gen_range(-1.0e3..=1.0e3);
            Expression::new(operator, a, b)
        })
        .collect()
}

/// Edge cases: zero divisors, signed zeros, and large/small magnitudes.
pub fn expression_stress_cases() -> Vec<Expression> {
    vec![
        Expression::new(Operator::Divide, 1.0, 0.0),
        Expression::new(Operator::Divide, -1.0, 0.0),
        Expression::new(Operator::Divide, 1.0, -0.0),
        Expression::new(Operator::Divide, 0.0, 0.0),
        Expression::new(Operator::Add, -0.0, 0.0),
        Expression::new(Operator::Subtract, 0.0, 0.0),
        Expression::new(Operator::Multiply, 1.0e20, 1.0e20),
        Expression::new(Operator::Multiply, -3.0e38, 10.0),
        Expression::new(Operator::Add, 1.0e-30, 2.0e-30),
        Expression::new(Operator::Divide, 7.0, 1.0e-3),
        Expression::new(Operator::Subtract, 16_777_216.0, 1.0),
    ]
}

/// Builds the default random and stress sets.
pub fn build_case_sets(count: usize, seed: u64) -> Vec<CaseSet> {
    let render =
        |exprs: Vec<Expression>| -> Vec<String> { exprs.iter().map(to_prefix_text).collect() };
    vec![
        CaseSet {
            label: format!("random_0x{seed:X}"),
            cases: render(generate_expression_cases(count, seed)),
        },
        CaseSet {
            label: "stress_edges".into(),
            cases: render(expression_stress_cases()),
        },
    ]
}
