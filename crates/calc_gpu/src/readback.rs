//! Bounded waits and scoped buffer mappings for result readback.

use std::time::Duration;

use futures_channel::oneshot;

use crate::error::{AcceleratorError, ReadbackStage};

/// Blocks on the device for at most `timeout`, then checks whether `signal` fired.
///
/// The receiver is inspected rather than awaited so that a signal that never
/// arrives surfaces as [`AcceleratorError::ReadbackTimeout`] instead of hanging.
pub(crate) fn wait_for_signal<T>(
    device: &wgpu::Device,
    submission: Option<wgpu::SubmissionIndex>,
    signal: &mut oneshot::Receiver<T>,
    stage: ReadbackStage,
    timeout: Duration,
) -> Result<T, AcceleratorError> {
    match device.poll(wgpu::PollType::Wait {
        submission_index: submission,
        timeout: Some(timeout),
    }) {
        Ok(_) => {}
        Err(wgpu::PollError::Timeout) => {
            return Err(AcceleratorError::ReadbackTimeout { stage, timeout })
        }
        Err(err) => return Err(AcceleratorError::Dispatch(err.to_string())),
    }

    match signal.try_recv() {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(AcceleratorError::ReadbackTimeout { stage, timeout }),
        Err(oneshot::Canceled) => Err(AcceleratorError::Dispatch(format!(
            "{stage} signal dropped before firing"
        ))),
    }
}

/// A staging buffer with a read mapping requested.
///
/// Dropping the guard unmaps the buffer, which also aborts a mapping that is still
/// pending, so the buffer set is reusable on every exit path.
pub(crate) struct MappedReadback<'a> {
    buffer: &'a wgpu::Buffer,
    label: &'static str,
    signal: oneshot::Receiver<Result<(), wgpu::BufferAsyncError>>,
    failed: bool,
}

impl<'a> MappedReadback<'a> {
    pub(crate) fn request(buffer: &'a wgpu::Buffer, label: &'static str) -> Self {
        let (sender, signal) = oneshot::channel();
        buffer.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        Self {
            buffer,
            label,
            signal,
            failed: false,
        }
    }

    /// Waits for the mapping callback and reports its outcome.
    pub(crate) fn resolve(
        &mut self,
        device: &wgpu::Device,
        timeout: Duration,
    ) -> Result<(), AcceleratorError> {
        let outcome = wait_for_signal(
            device,
            None,
            &mut self.signal,
            ReadbackStage::Mapping(self.label),
            timeout,
        )?;
        outcome.map_err(|err| {
            self.failed = true;
            AcceleratorError::BufferMap {
                buffer: self.label,
                reason: err.to_string(),
            }
        })
    }

    /// Copies the mapped contents out as `N` packed `f32` values.
    pub(crate) fn read_f32s<const N: usize>(&self) -> Result<[f32; N], AcceleratorError> {
        let view = self.buffer.slice(..).get_mapped_range();
        let bytes: &[u8] = &view;
        if bytes.len() != N * std::mem::size_of::<f32>() {
            return Err(AcceleratorError::BufferMap {
                buffer: self.label,
                reason: format!("expected {} bytes, mapped {}", N * 4, bytes.len()),
            });
        }
        let mut values = [0.0f32; N];
        bytemuck::cast_slice_mut::<f32, u8>(&mut values).copy_from_slice(bytes);
        Ok(values)
    }
}

impl Drop for MappedReadback<'_> {
    fn drop(&mut self) {
        // A failed mapping leaves the buffer unmapped already.
        if !self.failed {
            self.buffer.unmap();
        }
    }
}
