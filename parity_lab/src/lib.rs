//! Parity Lab crate: the evaluation orchestrator plus harness glue for accelerator⇄host parity.

pub mod cases;
pub mod evaluator;

pub use evaluator::{EvaluationResult, EvaluationStatus, Evaluator};
