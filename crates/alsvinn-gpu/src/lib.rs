//! Alsvinn GPU Statevector Engine
//!
//! This crate holds the full 2^n-amplitude state vector of an n-qubit
//! register in a GPU buffer and evolves it by dispatching data-parallel
//! compute kernels over `wgpu`. It answers probability and amplitude
//! queries against that vector and draws classical samples from the
//! resulting distributions.
//!
//! # Features
//!
//! - **Device-resident state**: amplitudes live in one storage buffer; the
//!   host only sees them on explicit read-back
//! - **Race-free in-place gates**: each parallel unit owns one disjoint
//!   amplitude pair and loads both members before storing either
//! - **In-order evolution**: gates are fire-and-forget enqueues on a
//!   strictly ordered device queue; reads block until the queue drains
//! - **Non-destructive sampling**: `measure`/`measure_qubit` draw from the
//!   current distribution without collapsing the state
//!
//! # Capacity
//!
//! The register size is capped at construction from the device limits
//! (storage-binding bytes and dispatch width). With wgpu's default limits:
//!
//! | Qubits | Amplitude buffer |
//! |--------|------------------|
//! | 10     | 8 KB             |
//! | 15     | 256 KB           |
//! | 18     | 2 MB             |
//! | 21     | 16 MB (cap)      |
//!
//! # Example
//!
//! ```ignore
//! use alsvinn_gpu::{Gate, GpuBackend};
//! use num_complex::Complex32;
//!
//! fn main() -> alsvinn_gpu::GpuSimResult<()> {
//!     let h = std::f32::consts::FRAC_1_SQRT_2;
//!     let hadamard = Gate::from_reals(h, h, h, -h);
//!     let not = Gate::from_reals(0.0, 1.0, 1.0, 0.0);
//!
//!     // Bell pair: H on qubit 0, then X on qubit 1 controlled by qubit 0.
//!     let mut backend = GpuBackend::new(2)?;
//!     backend.apply_gate(&hadamard, 0)?;
//!     backend.apply_controlled_gate(&not, 0, 1)?;
//!
//!     let counts = backend.measure(1000)?;
//!     println!("00: {}  11: {}", counts.get("00"), counts.get("11"));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod context;
pub mod error;
pub mod gate;
pub mod kernel;
pub mod pairing;
pub mod sampler;

mod statevector;

pub use backend::{BackendOptions, GpuBackend, Precision};
pub use context::{ContextOptions, GpuContext, PowerClass};
pub use error::{GpuSimError, GpuSimResult};
pub use gate::Gate;
pub use kernel::ABI_VERSION;
pub use sampler::{bitstring, Counts};
