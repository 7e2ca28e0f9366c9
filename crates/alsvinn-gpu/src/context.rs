//! Device context — wgpu initialization.
//!
//! One [`GpuContext`] per engine instance. The context is plain owned data,
//! never a process-wide singleton, so two simulations in one process get
//! independent devices, queues, and failure domains.

use serde::{Deserialize, Serialize};
use tracing::debug;
use wgpu::{
    Adapter, Device, DeviceDescriptor, Features, Instance, InstanceDescriptor, Limits, Queue,
    RequestAdapterOptions,
};

use crate::error::{GpuSimError, GpuSimResult};

/// Adapter selection preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerClass {
    /// Prefer the discrete/high-throughput adapter.
    #[default]
    HighPerformance,
    /// Prefer the integrated/low-power adapter.
    LowPower,
}

/// Configuration for device-context creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Which adapter class to request.
    pub power: PowerClass,
    /// Accept a software rasterizer. Useful on CI hosts without a GPU.
    pub allow_fallback_adapter: bool,
    /// Debug label attached to the device.
    pub label: Option<String>,
}

impl ContextOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the adapter power preference.
    pub fn with_power(mut self, power: PowerClass) -> Self {
        self.power = power;
        self
    }

    /// Accept a software fallback adapter.
    pub fn with_fallback_adapter(mut self, allow: bool) -> Self {
        self.allow_fallback_adapter = allow;
        self
    }

    /// Set the device debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An owned compute device: instance, adapter, device, and its in-order
/// submission queue.
#[derive(Debug)]
pub struct GpuContext {
    adapter: Adapter,
    pub(crate) device: Device,
    pub(crate) queue: Queue,
}

impl GpuContext {
    /// Request an adapter and device.
    ///
    /// Picks the best available backend for the platform (Metal on macOS,
    /// Vulkan/DX12 on Windows, Vulkan on Linux).
    pub async fn new(options: &ContextOptions) -> GpuSimResult<Self> {
        let instance = Instance::new(InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: match options.power {
                    PowerClass::HighPerformance => wgpu::PowerPreference::HighPerformance,
                    PowerClass::LowPower => wgpu::PowerPreference::LowPower,
                },
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await;
        // Retry with the fallback only after a real adapter failed, so a
        // hardware adapter still wins when one exists.
        let adapter = match adapter {
            Some(adapter) => adapter,
            None if options.allow_fallback_adapter => instance
                .request_adapter(&RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::LowPower,
                    compatible_surface: None,
                    force_fallback_adapter: true,
                })
                .await
                .ok_or(GpuSimError::AdapterUnavailable)?,
            None => return Err(GpuSimError::AdapterUnavailable),
        };

        let info = adapter.get_info();
        debug!(name = %info.name, backend = ?info.backend, driver = %info.driver, "adapter selected");

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: options.label.as_deref(),
                    required_features: Features::empty(),
                    required_limits: Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| GpuSimError::DeviceRequest(e.to_string()))?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Create a context synchronously (blocking).
    pub fn new_sync(options: &ContextOptions) -> GpuSimResult<Self> {
        pollster::block_on(Self::new(options))
    }

    /// Information about the selected adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Name of the backend driving this context (Metal, Vulkan, DX12, ...).
    pub fn backend_name(&self) -> &'static str {
        match self.adapter.get_info().backend {
            wgpu::Backend::Empty => "Empty",
            wgpu::Backend::Vulkan => "Vulkan",
            wgpu::Backend::Metal => "Metal",
            wgpu::Backend::Dx12 => "DX12",
            wgpu::Backend::Gl => "OpenGL",
            wgpu::Backend::BrowserWebGpu => "WebGPU",
        }
    }

    /// Device limits, used to bound the register size at construction.
    pub(crate) fn limits(&self) -> Limits {
        self.device.limits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder() {
        let opts = ContextOptions::new()
            .with_power(PowerClass::LowPower)
            .with_fallback_adapter(true)
            .with_label("test");
        assert_eq!(opts.power, PowerClass::LowPower);
        assert!(opts.allow_fallback_adapter);
        assert_eq!(opts.label.as_deref(), Some("test"));
    }

    #[test]
    fn context_creation() {
        // May fail on hosts without any adapter; that is the error path.
        match GpuContext::new_sync(&ContextOptions::new().with_fallback_adapter(true)) {
            Ok(ctx) => {
                assert!(!ctx.backend_name().is_empty());
            }
            Err(GpuSimError::AdapterUnavailable) => {}
            Err(e) => panic!("unexpected construction error: {e}"),
        }
    }
}
