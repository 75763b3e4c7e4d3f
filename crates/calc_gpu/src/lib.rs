//! Accelerator backend over `wgpu`: one long-lived session that evaluates a single
//! prefix expression per dispatch and reads back the result and diagnostic vector.

pub mod error;
mod readback;
pub mod session;

pub use error::{AcceleratorError, ReadbackStage};
pub use session::{Accelerator, DispatchOutput, SessionState};
