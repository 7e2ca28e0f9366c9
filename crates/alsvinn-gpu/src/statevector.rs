//! The device-resident state-vector store.
//!
//! The buffer is the single source of truth for register state. No host
//! shadow copy exists; the only way amplitudes reach the host is an
//! explicit staging-buffer read-back.

use num_complex::Complex32;
use tracing::debug;
use wgpu::{Buffer, BufferDescriptor, BufferUsages, Device, Queue};

use crate::error::{GpuSimError, GpuSimResult};
use crate::kernel::AMPLITUDE_BYTES;

/// Owns the buffer of 2^n amplitudes for one register.
#[derive(Debug)]
pub(crate) struct StateVector {
    buffer: Buffer,
    num_amplitudes: u64,
    released: bool,
}

impl StateVector {
    /// Allocate the buffer and prepare |0…0⟩.
    ///
    /// New wgpu buffers are zero-filled, so only amplitude 0 needs writing.
    pub fn new(device: &Device, queue: &Queue, num_qubits: u32) -> Self {
        let num_amplitudes = 1u64 << num_qubits;
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some("state vector"),
            size: num_amplitudes * AMPLITUDE_BYTES,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&buffer, 0, bytemuck::bytes_of(&[1.0f32, 0.0f32]));
        debug!(num_qubits, num_amplitudes, "state vector allocated");
        Self {
            buffer,
            num_amplitudes,
            released: false,
        }
    }

    /// The amplitude buffer, or an error if it has been released.
    pub fn buffer(&self) -> GpuSimResult<&Buffer> {
        if self.released {
            Err(GpuSimError::BufferReleased)
        } else {
            Ok(&self.buffer)
        }
    }

    pub fn num_amplitudes(&self) -> u64 {
        self.num_amplitudes
    }

    /// Free the device buffer. Exactly once: a second call is a usage
    /// error, not a double free.
    pub fn release(&mut self) -> GpuSimResult<()> {
        if self.released {
            return Err(GpuSimError::BufferReleased);
        }
        self.buffer.destroy();
        self.released = true;
        debug!("state vector released");
        Ok(())
    }

    /// Blocking read-back of the full amplitude vector.
    pub fn read_all(&self, device: &Device, queue: &Queue) -> GpuSimResult<Vec<Complex32>> {
        let buffer = self.buffer()?;
        let bytes = read_buffer(device, queue, buffer, self.num_amplitudes * AMPLITUDE_BYTES)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }
}

/// Copy `size` bytes of `src` into a staging buffer, map it, and return the
/// contents. Blocks the calling thread until the device queue drains up to
/// the copy.
pub(crate) fn read_buffer(
    device: &Device,
    queue: &Queue,
    src: &Buffer,
    size: u64,
) -> GpuSimResult<Vec<u8>> {
    let staging = device.create_buffer(&BufferDescriptor {
        label: Some("read-back staging"),
        size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("read-back encoder"),
    });
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = tokio::sync::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    pollster::block_on(rx)
        .map_err(|_| GpuSimError::ReadBack("device dropped before map completed".into()))?
        .map_err(|e| GpuSimError::ReadBack(e.to_string()))?;

    let data = slice.get_mapped_range();
    let out = data.to_vec();
    drop(data);
    staging.unmap();
    Ok(out)
}
