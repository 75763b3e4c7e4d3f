//! Long-lived accelerator session: device, compiled kernel and the fixed buffer set.

use std::borrow::Cow;

use bytemuck::bytes_of;
use calc_core::{
    config::{AcceleratorSettings, PowerPreference},
    record::{DIAGNOSTIC_LEN, DIAGNOSTIC_SIZE, RECORD_SIZE, RESULT_SIZE},
    DiagnosticVector, Expression, ExpressionRecord,
};
use calc_shaders::{bindings, compute};
use futures_channel::oneshot;
use tokio::sync::Mutex;
use wgpu::{
    BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor, BindGroupLayoutEntry,
    BindingType, BufferBindingType, BufferSize, BufferUsages, CommandEncoderDescriptor,
    ComputePassDescriptor, ComputePipelineDescriptor, Device, DeviceDescriptor, ErrorFilter,
    Features, Instance, Limits, PipelineLayoutDescriptor, Queue,
    RequestAdapterOptions, ShaderStages,
};

use crate::{
    error::{AcceleratorError, ReadbackStage},
    readback::{wait_for_signal, MappedReadback},
};

/// Observable lifecycle state of an [`Accelerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    /// The session is held by an in-flight dispatch (or by `initialize`/`shutdown`).
    Dispatching,
}

/// Values read back from one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchOutput {
    pub value: f32,
    pub diagnostics: DiagnosticVector,
}

/// Owner of the accelerator session.
///
/// The session sits behind a single-slot async mutex held for the whole of a
/// dispatch: concurrent callers queue, and the shared buffers never see two
/// records at once.
pub struct Accelerator {
    settings: AcceleratorSettings,
    session: Mutex<Option<GpuSession>>,
}

impl Accelerator {
    /// Creates an uninitialized accelerator.
    pub fn new(settings: AcceleratorSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session.try_lock() {
            Ok(guard) if guard.is_some() => SessionState::Ready,
            Ok(_) => SessionState::Uninitialized,
            Err(_) => SessionState::Dispatching,
        }
    }

    /// Name of the selected adapter, once initialized.
    pub async fn adapter_name(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.adapter_info.name.clone())
    }

    /// Acquires a device, compiles the kernel and allocates the buffer set.
    ///
    /// Calling this on a ready session is a no-op.
    pub async fn initialize(&self) -> Result<(), AcceleratorError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let session = GpuSession::create(&self.settings).await?;
        tracing::info!(
            adapter = %session.adapter_info.name,
            backend = ?session.adapter_info.backend,
            device_type = ?session.adapter_info.device_type,
            "accelerator session ready"
        );
        *slot = Some(session);
        Ok(())
    }

    /// Releases the device and buffers. The accelerator can be initialized again.
    pub async fn shutdown(&self) {
        if self.session.lock().await.take().is_some() {
            tracing::info!("accelerator session shut down");
        }
    }

    /// Evaluates `expr` on the accelerator.
    ///
    /// The readback waits poll the device synchronously, so this blocks the calling
    /// thread for up to the configured timeout per wait. Callers on a multi-task
    /// runtime should run it on a blocking-capable thread.
    pub async fn dispatch(&self, expr: &Expression) -> Result<DispatchOutput, AcceleratorError> {
        let slot = self.session.lock().await;
        let session = slot.as_ref().ok_or(AcceleratorError::NotInitialized)?;
        tracing::debug!(
            operator = %expr.operator(),
            a = expr.operand_a(),
            b = expr.operand_b(),
            "dispatching expression"
        );
        session.run(expr, self.settings.readback_timeout()).await
    }
}

struct GpuSession {
    adapter_info: wgpu::AdapterInfo,
    device: Device,
    queue: Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    buffers: Buffers,
}

struct Buffers {
    record: wgpu::Buffer,
    result: wgpu::Buffer,
    diagnostics: wgpu::Buffer,
    result_staging: wgpu::Buffer,
    diagnostics_staging: wgpu::Buffer,
}

impl GpuSession {
    async fn create(settings: &AcceleratorSettings) -> Result<Self, AcceleratorError> {
        let instance = Instance::default();
        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: power_preference(settings.power_preference),
                compatible_surface: None,
                force_fallback_adapter: settings.force_fallback_adapter,
            })
            .await
            .map_err(|err| AcceleratorError::Unavailable(err.to_string()))?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("prefix_calc_device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|err| AcceleratorError::Unavailable(err.to_string()))?;

        device.push_error_scope(ErrorFilter::Validation);
        let (pipeline, bind_group_layout) = create_pipeline(&device);
        if let Some(err) = device.pop_error_scope().await {
            return Err(AcceleratorError::KernelCompilation(err.to_string()));
        }

        let buffers = Buffers {
            record: create_buffer(
                &device,
                "ExpressionRecord",
                RECORD_SIZE,
                BufferUsages::STORAGE | BufferUsages::COPY_DST,
            ),
            result: create_buffer(
                &device,
                "ExpressionResult",
                RESULT_SIZE,
                BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            ),
            diagnostics: create_buffer(
                &device,
                "ExpressionDiagnostics",
                DIAGNOSTIC_SIZE,
                BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            ),
            result_staging: create_buffer(
                &device,
                "ExpressionResultStaging",
                RESULT_SIZE,
                BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            ),
            diagnostics_staging: create_buffer(
                &device,
                "ExpressionDiagnosticsStaging",
                DIAGNOSTIC_SIZE,
                BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            ),
        };

        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("ExpressionBindGroup"),
            layout: &bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: bindings::RECORD,
                    resource: buffers.record.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: bindings::RESULT,
                    resource: buffers.result.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: bindings::DIAGNOSTICS,
                    resource: buffers.diagnostics.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            adapter_info,
            device,
            queue,
            pipeline,
            bind_group,
            buffers,
        })
    }

    async fn run(
        &self,
        expr: &Expression,
        timeout: std::time::Duration,
    ) -> Result<DispatchOutput, AcceleratorError> {
        let record = ExpressionRecord::from(expr);
        self.device.push_error_scope(ErrorFilter::Validation);
        self.queue.write_buffer(&self.buffers.record, 0, bytes_of(&record));

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("ExpressionEncoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("ExpressionPass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(bindings::GROUP, &self.bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        encoder.copy_buffer_to_buffer(
            &self.buffers.result,
            0,
            &self.buffers.result_staging,
            0,
            RESULT_SIZE as wgpu::BufferAddress,
        );
        encoder.copy_buffer_to_buffer(
            &self.buffers.diagnostics,
            0,
            &self.buffers.diagnostics_staging,
            0,
            DIAGNOSTIC_SIZE as wgpu::BufferAddress,
        );

        let submission = self.queue.submit(Some(encoder.finish()));
        let (done_tx, mut done_rx) = oneshot::channel();
        self.queue.on_submitted_work_done(move || {
            let _ = done_tx.send(());
        });
        if let Some(err) = self.device.pop_error_scope().await {
            return Err(AcceleratorError::Dispatch(err.to_string()));
        }

        wait_for_signal(
            &self.device,
            Some(submission),
            &mut done_rx,
            ReadbackStage::Submission,
            timeout,
        )?;

        let mut result_map = MappedReadback::request(&self.buffers.result_staging, "result");
        let mut diagnostics_map =
            MappedReadback::request(&self.buffers.diagnostics_staging, "diagnostics");
        result_map.resolve(&self.device, timeout)?;
        diagnostics_map.resolve(&self.device, timeout)?;

        let [value] = result_map.read_f32s::<1>()?;
        let diagnostics = DiagnosticVector(diagnostics_map.read_f32s::<DIAGNOSTIC_LEN>()?);

        Ok(DispatchOutput { value, diagnostics })
    }
}

fn create_pipeline(device: &Device) -> (wgpu::ComputePipeline, wgpu::BindGroupLayout) {
    let buffer_entry = |binding, ty: BufferBindingType, size: usize| BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: BufferSize::new(size as u64),
        },
        count: None,
    };

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("ExpressionBindGroupLayout"),
        entries: &[
            buffer_entry(
                bindings::RECORD,
                BufferBindingType::Storage { read_only: true },
                RECORD_SIZE,
            ),
            buffer_entry(
                bindings::RESULT,
                BufferBindingType::Storage { read_only: false },
                RESULT_SIZE,
            ),
            buffer_entry(
                bindings::DIAGNOSTICS,
                BufferBindingType::Storage { read_only: false },
                DIAGNOSTIC_SIZE,
            ),
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("ExpressionPipelineLayout"),
        bind_group_layouts: &[&bind_group_layout],
        ..Default::default()
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("evaluate_expression.wgsl"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(compute::EVALUATE_EXPRESSION)),
    });

    let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
        label: Some("ExpressionPipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: Some(compute::EVALUATE_EXPRESSION_ENTRY),
        compilation_options: Default::default(),
        cache: None,
    });

    (pipeline, bind_group_layout)
}

fn create_buffer(device: &Device, label: &str, size: usize, usage: BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage,
        mapped_at_creation: false,
    })
}

fn power_preference(preference: PowerPreference) -> wgpu::PowerPreference {
    match preference {
        PowerPreference::None => wgpu::PowerPreference::None,
        PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accelerator_is_uninitialized() {
        let accelerator = Accelerator::new(AcceleratorSettings::default());
        assert_eq!(accelerator.state(), SessionState::Uninitialized);
    }

    #[test]
    fn dispatch_requires_initialize() {
        let accelerator = Accelerator::new(AcceleratorSettings::default());
        let expr = Expression::new(calc_core::Operator::Add, 1.0, 2.0);
        let err = pollster::block_on(accelerator.dispatch(&expr)).expect_err("no session");
        assert_eq!(err, AcceleratorError::NotInitialized);
    }

    #[test]
    fn state_reports_busy_while_locked() {
        let accelerator = Accelerator::new(AcceleratorSettings::default());
        let guard = accelerator.session.try_lock().expect("uncontended");
        assert_eq!(accelerator.state(), SessionState::Dispatching);
        drop(guard);
        assert_eq!(accelerator.state(), SessionState::Uninitialized);
    }

    #[test]
    fn timed_out_wait_leaves_session_ready() {
        let accelerator = Accelerator::new(AcceleratorSettings::default());
        match pollster::block_on(accelerator.initialize()) {
            Err(AcceleratorError::Unavailable(reason)) => {
                eprintln!("skipping readback timeout test: {reason}");
                return;
            }
            other => other.expect("initialize"),
        }

        {
            let slot = accelerator.session.try_lock().expect("idle session");
            let session = slot.as_ref().expect("ready session");
            let pending = MappedReadback::request(&session.buffers.result_staging, "result");
            let (_sender, mut never) = oneshot::channel::<()>();
            let err = wait_for_signal(
                &session.device,
                None,
                &mut never,
                ReadbackStage::Submission,
                std::time::Duration::from_millis(1),
            )
            .expect_err("signal never fires");
            assert!(matches!(
                err,
                AcceleratorError::ReadbackTimeout {
                    stage: ReadbackStage::Submission,
                    ..
                }
            ));
            drop(pending);
        }

        assert_eq!(accelerator.state(), SessionState::Ready);
        let expr = Expression::new(calc_core::Operator::Multiply, 3.0, 4.0);
        let output =
            pollster::block_on(accelerator.dispatch(&expr)).expect("dispatch after timeout");
        assert_eq!(output.value, 12.0);
        assert_eq!(accelerator.state(), SessionState::Ready);
    }

    #[test]
    fn power_preference_maps_to_wgpu() {
        assert_eq!(
            power_preference(PowerPreference::LowPower),
            wgpu::PowerPreference::LowPower
        );
        assert_eq!(
            power_preference(PowerPreference::HighPerformance),
            wgpu::PowerPreference::HighPerformance
        );
    }
}
