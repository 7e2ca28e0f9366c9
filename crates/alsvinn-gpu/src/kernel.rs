//! The compiled accelerator program.
//!
//! One WGSL module (`statevector.wgsl`) carries every kernel the engine
//! dispatches. Its entry-point names, binding slots, and parameter layout
//! form a versioned ABI; the module is compiled once per engine inside a
//! validation error scope, so a module that fails to compile or that lost
//! an entry point is a synchronous construction error rather than a panic
//! on first dispatch.

use bytemuck::{Pod, Zeroable};
use wgpu::{BindGroupLayout, ComputePipeline, Device};

use crate::error::{GpuSimError, GpuSimResult};
use crate::gate::Gate;

/// Revision of the kernel ABI this host was written against.
pub const ABI_VERSION: u32 = 1;

/// Invocations per workgroup. Must match `WORKGROUP_SIZE` in the module.
pub(crate) const WORKGROUP_SIZE: u32 = 64;

/// Bytes per stored amplitude (two f32 components).
pub(crate) const AMPLITUDE_BYTES: u64 = 8;

pub(crate) const ENTRY_APPLY_GATE: &str = "apply_gate";
pub(crate) const ENTRY_APPLY_CONTROLLED_GATE: &str = "apply_controlled_gate";
pub(crate) const ENTRY_GET_SINGLE_AMPLITUDE: &str = "get_single_amplitude";
pub(crate) const ENTRY_CALCULATE_PROBABILITIES: &str = "calculate_probabilities";
pub(crate) const ENTRY_QUBIT_PROBABILITY: &str = "qubit_probability";

/// Uniform parameter block shared by every entry point.
///
/// Layout mirrors `struct Params` in the module: four u32 words, then the
/// four gate coefficients as vec2<f32>.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub(crate) struct KernelParams {
    pub target: u32,
    pub control: u32,
    /// Number of units of work in the dispatch.
    pub n: u32,
    /// Amplitude index for single-amplitude read-back.
    pub index: u32,
    pub a: [f32; 2],
    pub b: [f32; 2],
    pub c: [f32; 2],
    pub d: [f32; 2],
}

impl KernelParams {
    pub fn for_gate(gate: &Gate, target: u32, control: u32, units: u32) -> Self {
        Self {
            target,
            control,
            n: units,
            index: 0,
            a: [gate.a.re, gate.a.im],
            b: [gate.b.re, gate.b.im],
            c: [gate.c.re, gate.c.im],
            d: [gate.d.re, gate.d.im],
        }
    }

    pub fn for_probabilities(units: u32) -> Self {
        Self {
            n: units,
            ..Self::default()
        }
    }

    pub fn for_qubit_probability(target: u32, units: u32) -> Self {
        Self {
            target,
            n: units,
            ..Self::default()
        }
    }

    pub fn for_single_amplitude(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compiled pipelines and their bind-group layouts, one per entry point
/// family.
#[derive(Debug)]
pub(crate) struct KernelModule {
    /// Layout for the gate kernels: amplitudes + params.
    pub gate_layout: BindGroupLayout,
    /// Layout for the probability kernels: amplitudes + params + results.
    pub reduce_layout: BindGroupLayout,
    /// Layout for single-amplitude read-back: amplitudes + params + out slot.
    pub single_layout: BindGroupLayout,

    pub apply_gate: ComputePipeline,
    pub apply_controlled_gate: ComputePipeline,
    pub calculate_probabilities: ComputePipeline,
    pub qubit_probability: ComputePipeline,
    pub get_single_amplitude: ComputePipeline,
}

impl KernelModule {
    /// Compile the module and resolve every entry point.
    ///
    /// Any validation error raised while compiling the module or building
    /// the pipelines is collected from the error scope and surfaced as
    /// [`GpuSimError::KernelCompile`].
    pub fn compile(device: &Device) -> GpuSimResult<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::include_wgsl!("statevector.wgsl"));

        let gate_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gate bind group layout"),
            entries: &[storage_entry(0), uniform_entry(1)],
        });
        let reduce_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reduce bind group layout"),
            entries: &[storage_entry(0), uniform_entry(1), storage_entry(2)],
        });
        let single_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("single-amplitude bind group layout"),
            entries: &[storage_entry(0), uniform_entry(1), storage_entry(3)],
        });

        let pipeline = |layout: &BindGroupLayout, entry: &str| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(entry),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        let apply_gate = pipeline(&gate_layout, ENTRY_APPLY_GATE);
        let apply_controlled_gate = pipeline(&gate_layout, ENTRY_APPLY_CONTROLLED_GATE);
        let calculate_probabilities = pipeline(&reduce_layout, ENTRY_CALCULATE_PROBABILITIES);
        let qubit_probability = pipeline(&reduce_layout, ENTRY_QUBIT_PROBABILITY);
        let get_single_amplitude = pipeline(&single_layout, ENTRY_GET_SINGLE_AMPLITUDE);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuSimError::KernelCompile(err.to_string()));
        }

        Ok(Self {
            gate_layout,
            reduce_layout,
            single_layout,
            apply_gate,
            apply_controlled_gate,
            calculate_probabilities,
            qubit_probability,
            get_single_amplitude,
        })
    }
}

/// Workgroups needed to cover `units` invocations.
pub(crate) fn workgroups_for(units: u64) -> u32 {
    units.div_ceil(u64::from(WORKGROUP_SIZE)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex32;

    #[test]
    fn params_block_is_48_bytes() {
        // The uniform layout in the module assumes this exact size.
        assert_eq!(std::mem::size_of::<KernelParams>(), 48);
    }

    #[test]
    fn gate_params_flatten_coefficients() {
        let g = Gate::new(
            Complex32::new(1.0, 2.0),
            Complex32::new(3.0, 4.0),
            Complex32::new(5.0, 6.0),
            Complex32::new(7.0, 8.0),
        );
        let p = KernelParams::for_gate(&g, 2, 0, 16);
        assert_eq!(p.target, 2);
        assert_eq!(p.n, 16);
        assert_eq!(p.a, [1.0, 2.0]);
        assert_eq!(p.d, [7.0, 8.0]);
    }

    #[test]
    fn workgroup_rounding() {
        assert_eq!(workgroups_for(1), 1);
        assert_eq!(workgroups_for(64), 1);
        assert_eq!(workgroups_for(65), 2);
        assert_eq!(workgroups_for(1 << 20), 16384);
    }
}
