//! Error types for the GPU statevector engine.

use thiserror::Error;

/// Errors produced by the GPU statevector engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GpuSimError {
    /// A register needs at least one qubit.
    #[error("register must have at least 1 qubit")]
    InvalidQubitCount,

    /// The requested register does not fit the device.
    #[error("register of {requested} qubits exceeds device capacity of {max} qubits")]
    RegisterTooLarge {
        /// Requested number of qubits.
        requested: u32,
        /// Largest register the device can hold and dispatch over.
        max: u32,
    },

    /// No compute adapter is available on this host.
    #[error("no GPU adapter available")]
    AdapterUnavailable,

    /// The adapter refused to create a device.
    #[error("failed to create device: {0}")]
    DeviceRequest(String),

    /// The compute kernel module failed to compile or validate.
    #[error("kernel module rejected: {0}")]
    KernelCompile(String),

    /// A target or control index is outside the register.
    #[error("qubit index {qubit} out of range for {num_qubits}-qubit register")]
    InvalidQubitIndex {
        /// The offending qubit index.
        qubit: u32,
        /// Number of qubits in the register.
        num_qubits: u32,
    },

    /// An amplitude index is outside the state vector.
    #[error("amplitude index {index} out of range for state vector of {num_amplitudes}")]
    InvalidAmplitudeIndex {
        /// The offending amplitude index.
        index: u64,
        /// Number of amplitudes in the state vector.
        num_amplitudes: u64,
    },

    /// The state-vector buffer was already released.
    #[error("state-vector buffer has been released")]
    BufferReleased,

    /// Mapping a read-back buffer failed on the device side.
    #[error("device read-back failed: {0}")]
    ReadBack(String),

    /// A sampled distribution carries no probability mass.
    #[error("distribution has no probability mass to sample")]
    DegenerateDistribution,
}

/// Result type for engine operations.
pub type GpuSimResult<T> = Result<T, GpuSimError>;
