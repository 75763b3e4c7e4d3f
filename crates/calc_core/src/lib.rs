//! Core prefix-expression domain logic that stays independent of GPU backends or UI shells.
//!
//! This crate hosts:
//! - the [`Expression`] model and its fixed 16-byte [`ExpressionRecord`] layout
//! - the bracketed prefix-notation [`parse`]r
//! - the host reference evaluator used as the correctness oracle
//! - parity helpers for comparing accelerator output against the reference

pub mod config;
pub mod error;
pub mod expr;
pub mod parity;
pub mod parser;
pub mod record;
pub mod reference;

/// Scalar type shared by the host evaluator and the kernel payloads.
pub type Scalar = f32;

pub use error::ParseError;
pub use expr::{Expression, Operator};
pub use parser::parse;
pub use record::{DiagnosticVector, ExpressionRecord};
