//! GPU-facing layouts shared between host code and the WGSL expression kernel.

use crate::{reference, Expression, Operator, ParseError, Scalar};

/// Byte size of the input record bound at binding 0.
pub const RECORD_SIZE: usize = 16;
/// Byte size of the scalar output bound at binding 1.
pub const RESULT_SIZE: usize = 4;
/// Number of entries in the diagnostic vector bound at binding 2.
pub const DIAGNOSTIC_LEN: usize = 16;
/// Byte size of the diagnostic vector.
pub const DIAGNOSTIC_SIZE: usize = DIAGNOSTIC_LEN * 4;

/// Packed `(tag, reserved, a, b)` record, read by the kernel as four `f32`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ExpressionRecord {
    pub operator: Scalar,
    pub reserved: Scalar,
    pub operand_a: Scalar,
    pub operand_b: Scalar,
}

const _: () = assert!(core::mem::size_of::<ExpressionRecord>() == RECORD_SIZE);

impl ExpressionRecord {
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        bytemuck::cast(*self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() != RECORD_SIZE {
            return Err(ParseError::MalformedExpression);
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub fn as_array(&self) -> [Scalar; 4] {
        [self.operator, self.reserved, self.operand_a, self.operand_b]
    }
}

impl From<&Expression> for ExpressionRecord {
    fn from(expr: &Expression) -> Self {
        Self {
            operator: expr.operator().tag() as Scalar,
            reserved: expr.reserved(),
            operand_a: expr.operand_a(),
            operand_b: expr.operand_b(),
        }
    }
}

impl TryFrom<ExpressionRecord> for Expression {
    type Error = ParseError;

    fn try_from(record: ExpressionRecord) -> Result<Self, Self::Error> {
        let operator =
            Operator::from_tag(record.operator).ok_or(ParseError::MalformedExpression)?;
        Ok(Expression::new(operator, record.operand_a, record.operand_b)
            .with_reserved(record.reserved))
    }
}

/// Introspection values written by the kernel alongside the primary result.
///
/// | slots | contents |
/// |-------|----------|
/// | 0..=3 | input record verbatim |
/// | 4..=7 | add, subtract, multiply, divide of the operands |
/// | 8     | primary result echo |
/// | 9     | tag as decoded by the kernel (`-1` when unrecognised) |
/// | 10..  | zero |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DiagnosticVector(pub [Scalar; DIAGNOSTIC_LEN]);

const _: () = assert!(core::mem::size_of::<DiagnosticVector>() == DIAGNOSTIC_SIZE);

impl DiagnosticVector {
    pub const LANES: std::ops::Range<usize> = 4..8;
    pub const SELECTED: usize = 8;
    pub const DECODED_TAG: usize = 9;

    /// Builds the vector the kernel is expected to produce for `expr`.
    pub fn expected_for(expr: &Expression) -> Self {
        let mut slots = [0.0; DIAGNOSTIC_LEN];
        slots[..4].copy_from_slice(&ExpressionRecord::from(expr).as_array());
        let lanes = reference::all_lanes(expr.operand_a(), expr.operand_b());
        slots[Self::LANES].copy_from_slice(&lanes);
        slots[Self::SELECTED] = reference::evaluate(expr);
        slots[Self::DECODED_TAG] = expr.operator().tag() as Scalar;
        Self(slots)
    }

    pub fn record_echo(&self) -> ExpressionRecord {
        ExpressionRecord {
            operator: self.0[0],
            reserved: self.0[1],
            operand_a: self.0[2],
            operand_b: self.0[3],
        }
    }

    pub fn lanes(&self) -> [Scalar; 4] {
        [self.0[4], self.0[5], self.0[6], self.0[7]]
    }

    pub fn lane(&self, operator: Operator) -> Scalar {
        self.0[Self::LANES.start + operator.lane_index()]
    }

    pub fn selected(&self) -> Scalar {
        self.0[Self::SELECTED]
    }

    pub fn decoded_tag(&self) -> Scalar {
        self.0[Self::DECODED_TAG]
    }

    pub fn as_array(&self) -> &[Scalar; DIAGNOSTIC_LEN] {
        &self.0
    }
}
