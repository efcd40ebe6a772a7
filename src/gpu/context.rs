//! Headless device acquisition for tools and tests
//!
//! The engine normally shares its own device with the sorter; this is only
//! used where no renderer exists (benchmark binary, integration tests).

use std::sync::Arc;

use crate::error::{SortError, SortErrorContext, SortResult};

pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request a device without a surface
    ///
    /// Timestamp queries are enabled when the adapter offers them.
    pub async fn headless() -> SortResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let mut options = wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        };

        let adapter = match instance.request_adapter(&options).await {
            Some(adapter) => adapter,
            None => {
                log::warn!("[GpuContext] No high-performance adapter found, trying fallback...");
                options.force_fallback_adapter = true;
                instance
                    .request_adapter(&options)
                    .await
                    .ok_or(SortError::NoAdapter)?
            }
        };

        let adapter_info = adapter.get_info();
        log::info!(
            "[GpuContext] Adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        let required_features = adapter.features() & wgpu::Features::TIMESTAMP_QUERY;
        if required_features.is_empty() {
            log::debug!("[GpuContext] Timestamp queries unavailable");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Splat Sort Device"),
                    required_features,
                    required_limits: adapter.limits(),
                },
                None,
            )
            .await
            .gpu_context("request device")?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    pub fn supports_timestamps(&self) -> bool {
        self.device.features().contains(wgpu::Features::TIMESTAMP_QUERY)
    }
}
