//! Evaluation orchestrator: parse, dispatch, cross-check against the host reference.

use calc_core::{
    config::EvaluatorSettings, parity, parse, reference, DiagnosticVector, Expression,
    ParseError,
};
use calc_gpu::{Accelerator, AcceleratorError, DispatchOutput, SessionState};

/// Outcome of the accelerator half of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationStatus {
    /// The accelerator agreed with the host reference.
    Verified {
        accelerator_value: f32,
        diagnostics: DiagnosticVector,
    },
    /// The accelerator completed but its value disagrees with the reference.
    Diverged {
        accelerator_value: f32,
        diagnostics: DiagnosticVector,
    },
    /// The accelerator failed; the reference value is the result of record.
    AcceleratorFailed(AcceleratorError),
}

/// Combined result of one evaluation. Built fresh per call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub expression: Expression,
    pub reference_value: f32,
    pub status: EvaluationStatus,
}

impl EvaluationResult {
    pub fn accelerator_value(&self) -> Option<f32> {
        match self.status {
            EvaluationStatus::Verified {
                accelerator_value, ..
            }
            | EvaluationStatus::Diverged {
                accelerator_value, ..
            } => Some(accelerator_value),
            EvaluationStatus::AcceleratorFailed(_) => None,
        }
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticVector> {
        match &self.status {
            EvaluationStatus::Verified { diagnostics, .. }
            | EvaluationStatus::Diverged { diagnostics, .. } => Some(diagnostics),
            EvaluationStatus::AcceleratorFailed(_) => None,
        }
    }

    /// The value to report: the accelerator's when verified, the reference otherwise.
    pub fn value(&self) -> f32 {
        match self.status {
            EvaluationStatus::Verified {
                accelerator_value, ..
            } => accelerator_value,
            _ => self.reference_value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, EvaluationStatus::AcceleratorFailed(_))
    }
}

/// Sequences parse → dispatch → readback → compare for one expression at a time.
pub struct Evaluator {
    accelerator: Accelerator,
    parity_tolerance: f32,
}

impl Evaluator {
    /// Builds an evaluator and brings up the accelerator session.
    ///
    /// Initialization failures are logged and the evaluator keeps running host-only.
    pub async fn start(settings: EvaluatorSettings) -> Self {
        let evaluator = Self::host_only(settings);
        if let Err(err) = evaluator.accelerator.initialize().await {
            tracing::warn!(error = %err, "accelerator unavailable, falling back to host reference");
        }
        evaluator
    }

    /// Builds an evaluator without touching the accelerator.
    pub fn host_only(settings: EvaluatorSettings) -> Self {
        Self {
            accelerator: Accelerator::new(settings.accelerator),
            parity_tolerance: settings.parity_tolerance,
        }
    }

    pub fn accelerator_state(&self) -> SessionState {
        self.accelerator.state()
    }

    pub fn accelerator(&self) -> &Accelerator {
        &self.accelerator
    }

    /// Evaluates `text`. Parse errors are returned verbatim; accelerator errors
    /// degrade into [`EvaluationStatus::AcceleratorFailed`].
    pub async fn evaluate_expression(&self, text: &str) -> Result<EvaluationResult, ParseError> {
        let expression = parse(text)?;
        Ok(self.evaluate(expression).await)
    }

    pub fn evaluate_expression_blocking(&self, text: &str) -> Result<EvaluationResult, ParseError> {
        pollster::block_on(self.evaluate_expression(text))
    }

    /// Evaluates an already-parsed expression.
    pub async fn evaluate(&self, expression: Expression) -> EvaluationResult {
        let reference_value = reference::evaluate(&expression);
        let status = match self.accelerator.dispatch(&expression).await {
            Ok(output) => self.classify(&expression, reference_value, output),
            Err(err) => {
                if err != AcceleratorError::NotInitialized {
                    tracing::warn!(%expression, error = %err, "accelerator dispatch failed");
                }
                EvaluationStatus::AcceleratorFailed(err)
            }
        };
        EvaluationResult {
            expression,
            reference_value,
            status,
        }
    }

    pub async fn shutdown(&self) {
        self.accelerator.shutdown().await;
    }

    fn classify(
        &self,
        expression: &Expression,
        reference_value: f32,
        output: DispatchOutput,
    ) -> EvaluationStatus {
        let DispatchOutput { value, diagnostics } = output;
        if parity::values_agree(reference_value, value, self.parity_tolerance) {
            EvaluationStatus::Verified {
                accelerator_value: value,
                diagnostics,
            }
        } else {
            tracing::warn!(
                %expression,
                reference = reference_value,
                accelerator = value,
                "accelerator diverged from host reference"
            );
            EvaluationStatus::Diverged {
                accelerator_value: value,
                diagnostics,
            }
        }
    }
}
