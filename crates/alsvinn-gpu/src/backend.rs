//! The statevector engine facade.
//!
//! A [`GpuBackend`] owns one device context, the compiled kernel module,
//! and one state-vector buffer. Gate application is a fire-and-forget
//! enqueue on the device's in-order queue; probability, amplitude, and
//! sampling calls block until the queue has drained up to them. The engine
//! carries no internal mutex — exclusive use is encoded by `&mut self` on
//! the mutating calls, and ordering across calls is the queue's own.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{BindGroupDescriptor, BindGroupEntry, BufferDescriptor, BufferUsages, Limits};

use crate::context::{ContextOptions, GpuContext};
use crate::error::{GpuSimError, GpuSimResult};
use crate::gate::Gate;
use crate::kernel::{workgroups_for, KernelModule, KernelParams, AMPLITUDE_BYTES, WORKGROUP_SIZE};
use crate::sampler::{self, Counts};
use crate::statevector::{read_buffer, StateVector};

/// Element precision of the stored amplitudes.
///
/// Only single precision is defined: WGSL has no f64, so a double-precision
/// register would need a different kernel module, not a flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// 32-bit real + 32-bit imaginary per amplitude.
    #[default]
    Single,
}

/// Configuration for engine construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendOptions {
    /// Device-context selection.
    pub context: ContextOptions,
    /// Element precision of the register.
    pub precision: Precision,
}

impl BackendOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device-context options.
    pub fn with_context(mut self, context: ContextOptions) -> Self {
        self.context = context;
        self
    }

    /// Set the element precision.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }
}

/// A GPU-resident n-qubit statevector register.
#[derive(Debug)]
pub struct GpuBackend {
    context: GpuContext,
    kernels: KernelModule,
    state: StateVector,
    num_qubits: u32,
    precision: Precision,
}

impl GpuBackend {
    /// Create an engine for `num_qubits` qubits with default options,
    /// initialized to |0…0⟩.
    pub fn new(num_qubits: u32) -> GpuSimResult<Self> {
        Self::with_options(num_qubits, BackendOptions::default())
    }

    /// Create an engine with explicit options.
    pub fn with_options(num_qubits: u32, options: BackendOptions) -> GpuSimResult<Self> {
        if num_qubits == 0 {
            // Reject before acquiring a device.
            return Err(GpuSimError::InvalidQubitCount);
        }
        let context = GpuContext::new_sync(&options.context)?;
        Self::from_context(context, num_qubits, options.precision)
    }

    /// Create an engine around an already-constructed context, taking
    /// exclusive ownership of it.
    pub fn from_context(
        context: GpuContext,
        num_qubits: u32,
        precision: Precision,
    ) -> GpuSimResult<Self> {
        if num_qubits == 0 {
            return Err(GpuSimError::InvalidQubitCount);
        }
        let max = max_register_qubits(&context.limits());
        if num_qubits > max {
            return Err(GpuSimError::RegisterTooLarge {
                requested: num_qubits,
                max,
            });
        }

        let kernels = KernelModule::compile(&context.device)?;
        let state = StateVector::new(&context.device, &context.queue, num_qubits);
        debug!(num_qubits, backend = %context.backend_name(), "engine constructed");

        Ok(Self {
            context,
            kernels,
            state,
            num_qubits,
            precision,
        })
    }

    /// Number of qubits in the register.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Number of amplitudes (2^n).
    pub fn num_amplitudes(&self) -> u64 {
        self.state.num_amplitudes()
    }

    /// Element precision of the register.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// The device context this engine owns.
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Apply a single-qubit gate to `target`.
    ///
    /// Enqueues one dispatch of 2^(n-1) units and returns without waiting;
    /// the queue serializes it after every previously applied gate.
    pub fn apply_gate(&mut self, gate: &Gate, target: u32) -> GpuSimResult<()> {
        self.check_qubit(target)?;
        let units = (self.num_amplitudes() / 2) as u32;
        let params = KernelParams::for_gate(gate, target, 0, units);
        self.dispatch_gate(false, params)?;
        debug!(target, units, "gate dispatched");
        Ok(())
    }

    /// Apply a controlled single-qubit gate.
    ///
    /// Pairs whose `control` bit is 0 are not written at all. `control`
    /// must differ from `target`.
    pub fn apply_controlled_gate(
        &mut self,
        gate: &Gate,
        control: u32,
        target: u32,
    ) -> GpuSimResult<()> {
        self.check_qubit(control)?;
        self.check_qubit(target)?;
        if control == target {
            return Err(GpuSimError::InvalidQubitIndex {
                qubit: control,
                num_qubits: self.num_qubits,
            });
        }
        let units = (self.num_amplitudes() / 2) as u32;
        let params = KernelParams::for_gate(gate, target, control, units);
        self.dispatch_gate(true, params)?;
        debug!(control, target, units, "controlled gate dispatched");
        Ok(())
    }

    /// Probability of observing 0 on `target`, via parallel reduction over
    /// the amplitudes whose target bit is 0. Does not mutate the state.
    pub fn qubit_probability(&self, target: u32) -> GpuSimResult<f32> {
        self.check_qubit(target)?;
        let state_buffer = self.state.buffer()?;
        let units = self.num_amplitudes() / 2;
        let groups = workgroups_for(units);

        let device = &self.context.device;
        let partials = device.create_buffer(&BufferDescriptor {
            label: Some("qubit-probability partials"),
            size: u64::from(groups) * 4,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = KernelParams::for_qubit_probability(target, units as u32);
        let params_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("qubit-probability params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("qubit-probability bind group"),
            layout: &self.kernels.reduce_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: state_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: partials.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("qubit-probability encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("qubit-probability pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernels.qubit_probability);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_buffer(device, &self.context.queue, &partials, u64::from(groups) * 4)?;
        let partial_sums: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        let total: f64 = partial_sums.iter().map(|&p| f64::from(p)).sum();
        Ok(total as f32)
    }

    /// The full measurement-basis probability distribution.
    ///
    /// Cost and memory are O(2^n); callers needing a single qubit's
    /// marginal should use [`Self::qubit_probability`] instead.
    pub fn probabilities(&self) -> GpuSimResult<Vec<f32>> {
        let state_buffer = self.state.buffer()?;
        let units = self.num_amplitudes();

        let device = &self.context.device;
        let out = device.create_buffer(&BufferDescriptor {
            label: Some("probabilities"),
            size: units * 4,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = KernelParams::for_probabilities(units as u32);
        let params_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("probabilities params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("probabilities bind group"),
            layout: &self.kernels.reduce_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: state_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: out.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("probabilities encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("probabilities pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernels.calculate_probabilities);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups_for(units), 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_buffer(device, &self.context.queue, &out, units * 4)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Read back one amplitude without transferring the rest of the vector.
    pub fn single_amplitude(&self, index: u64) -> GpuSimResult<Complex32> {
        if index >= self.num_amplitudes() {
            return Err(GpuSimError::InvalidAmplitudeIndex {
                index,
                num_amplitudes: self.num_amplitudes(),
            });
        }
        let state_buffer = self.state.buffer()?;

        let device = &self.context.device;
        let out = device.create_buffer(&BufferDescriptor {
            label: Some("single amplitude"),
            size: AMPLITUDE_BYTES,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = KernelParams::for_single_amplitude(index as u32);
        let params_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("single-amplitude params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("single-amplitude bind group"),
            layout: &self.kernels.single_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: state_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: out.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("single-amplitude encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("single-amplitude pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernels.get_single_amplitude);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let bytes = read_buffer(device, &self.context.queue, &out, AMPLITUDE_BYTES)?;
        let amplitudes: Vec<Complex32> = bytemuck::pod_collect_to_vec(&bytes);
        Ok(amplitudes[0])
    }

    /// Read back the full amplitude vector.
    pub fn amplitudes(&self) -> GpuSimResult<Vec<Complex32>> {
        self.state.read_all(&self.context.device, &self.context.queue)
    }

    /// Draw `samples` i.i.d. outcomes from the full basis-state
    /// distribution and return counts per bitstring label.
    ///
    /// This is **non-destructive sampling**, not projective measurement:
    /// the state vector is never collapsed, and repeated calls keep drawing
    /// from the same pre-measurement distribution.
    #[instrument(skip(self))]
    pub fn measure(&self, samples: u32) -> GpuSimResult<Counts> {
        let probabilities = self.probabilities()?;
        sampler::sample_counts(&probabilities, samples, self.num_qubits)
    }

    /// Draw `samples` i.i.d. outcomes for one qubit, labelled "0"/"1".
    ///
    /// Non-destructive, like [`Self::measure`].
    #[instrument(skip(self))]
    pub fn measure_qubit(&self, target: u32, samples: u32) -> GpuSimResult<Counts> {
        let prob_zero = self.qubit_probability(target)?;
        sampler::sample_bit_counts(prob_zero, samples)
    }

    /// Free the state-vector buffer. Every subsequent operation fails with
    /// [`GpuSimError::BufferReleased`], as does a second `release`.
    pub fn release(&mut self) -> GpuSimResult<()> {
        self.state.release()
    }

    fn check_qubit(&self, qubit: u32) -> GpuSimResult<()> {
        if qubit >= self.num_qubits {
            return Err(GpuSimError::InvalidQubitIndex {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    fn dispatch_gate(&self, controlled: bool, params: KernelParams) -> GpuSimResult<()> {
        let state_buffer = self.state.buffer()?;
        let device = &self.context.device;

        let params_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("gate params"),
            contents: bytemuck::bytes_of(&params),
            usage: BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("gate bind group"),
            layout: &self.kernels.gate_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: state_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gate encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("gate pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(if controlled {
                &self.kernels.apply_controlled_gate
            } else {
                &self.kernels.apply_gate
            });
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups_for(u64::from(params.n)), 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// Largest register the device can hold and dispatch over in one pass:
/// bounded by the storage-binding byte limit, the total buffer size, and
/// the one-dimensional dispatch width.
fn max_register_qubits(limits: &Limits) -> u32 {
    let by_dispatch = (u64::from(limits.max_compute_workgroups_per_dimension)
        * u64::from(WORKGROUP_SIZE))
    .ilog2();
    let by_binding = (u64::from(limits.max_storage_buffer_binding_size) / AMPLITUDE_BYTES).ilog2();
    let by_buffer = (limits.max_buffer_size / AMPLITUDE_BYTES).ilog2();
    by_dispatch.min(by_binding).min(by_buffer)
}
