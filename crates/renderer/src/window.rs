use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::error::RenderError;
use crate::gpu::context::{create_instance, GpuContext};
use crate::gpu::PresentTarget;
use crate::points::SeedSet;
use crate::render::render_diagram;
use crate::types::{DiagramSettings, GpuPowerPreference};

/// Surface-backed preview. Field order matters: the surface must be dropped
/// before the window it was created from.
struct PreviewState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    ctx: GpuContext,
    window: Arc<Window>,
    rendered_once: bool,
}

impl PreviewState {
    fn new(window: Arc<Window>, power: GpuPowerPreference) -> Result<Self> {
        let instance = create_instance();
        let window_handle = window
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = window
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // SAFETY: the window outlives the surface; see the field order above.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let ctx = GpuContext::with_instance(instance, Some(&surface), power)?;
        let caps = surface.get_capabilities(&ctx.adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &config);
        tracing::debug!(?format, width = config.width, height = config.height, "configured surface");

        Ok(Self {
            surface,
            config,
            ctx,
            window,
            rendered_once: false,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.ctx.device, &self.config);
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.ctx.device, &self.config);
    }

    /// Runs one full single-shot render onto the next surface texture.
    fn render(&mut self, seeds: &SeedSet, settings: &DiagramSettings) -> Result<(), RenderError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // The distance field is square; follow the surface if the platform
        // sized the window differently than requested.
        let resolution = self.config.width.min(self.config.height);
        let mut frame_settings = settings.clone();
        frame_settings.resolution = resolution;

        let report = render_diagram(
            &self.ctx,
            seeds,
            &frame_settings,
            PresentTarget {
                view: &view,
                format: self.config.format,
            },
        )?;
        frame.present();

        if !self.rendered_once {
            tracing::info!(
                adapter = self.ctx.adapter_name(),
                points = report.point_count,
                resolution = report.resolution,
                "presented diagram"
            );
            self.rendered_once = true;
        }
        Ok(())
    }
}

/// Opens a window sized to the render resolution and re-renders the diagram
/// whenever the platform asks for a redraw. Returns when the window closes or
/// a render fails.
pub(crate) fn run(seeds: &SeedSet, settings: &DiagramSettings, power: GpuPowerPreference) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("Voronoi")
        .with_inner_size(PhysicalSize::new(settings.resolution, settings.resolution))
        .with_resizable(false)
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let mut state = PreviewState::new(window.clone(), power)?;
    let mut fatal: Option<RenderError> = None;
    window.request_redraw();

    event_loop
        .run(|event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);
            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != state.window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::Resized(size) => {
                    state.resize(size);
                    state.window.request_redraw();
                }
                WindowEvent::RedrawRequested => match state.render(seeds, settings) {
                    Ok(()) => {}
                    Err(RenderError::Surface(
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                    )) => {
                        state.reconfigure();
                        state.window.request_redraw();
                    }
                    Err(RenderError::Surface(wgpu::SurfaceError::Timeout)) => {
                        tracing::warn!("surface timeout; retrying on next redraw");
                    }
                    Err(err) => {
                        fatal = Some(err);
                        elwt.exit();
                    }
                },
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))?;

    match fatal {
        Some(err) => Err(err).context("window render failed"),
        None => Ok(()),
    }
}
