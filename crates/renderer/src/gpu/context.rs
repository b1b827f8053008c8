use crate::error::RenderError;
use crate::types::GpuPowerPreference;

/// Device and queue shared by every render invocation of one process.
///
/// The context carries no per-render state: textures, framebuffers, and
/// pipelines are created and dropped inside each render.
pub struct GpuContext {
    pub(crate) _instance: wgpu::Instance,
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    adapter_name: String,
}

impl GpuContext {
    /// Creates a context with no presentation surface, for offscreen output
    /// and tests.
    pub fn headless(power: GpuPowerPreference) -> Result<Self, RenderError> {
        let instance = create_instance();
        Self::with_instance(instance, None, power)
    }

    /// Creates a context whose adapter can present to `surface`.
    pub(crate) fn with_instance(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
        power: GpuPowerPreference,
    ) -> Result<Self, RenderError> {
        let power_preference = match power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::Adapter(err.to_string()))?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("voronoi device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| RenderError::Adapter(format!("failed to create GPU device: {err}")))?;

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
            adapter_name: info.name,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Largest width a 2D texture may have on this device; bounds both the
    /// seed count and the render resolution.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Whether the adapter can both draw into and sample from `format`.
    pub fn supports_render_target(&self, format: wgpu::TextureFormat) -> bool {
        let required =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        self.adapter
            .get_texture_format_features(format)
            .allowed_usages
            .contains(required)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

pub(crate) fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}
