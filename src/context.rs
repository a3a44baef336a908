use std::sync::Arc;

use anyhow::{bail, Context, Result};
use winit::window::Window;

use crate::config::ContextConfig;

/// Where the framebuffer lives.
pub(crate) enum RenderTarget {
    /// A colour texture owned by the context, readable after drawing.
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
    /// The swapchain of a winit window.
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
}

/// The handle every GPU operation in this crate is issued through.
///
/// It owns the device, the queue and the render target. Everything created
/// from it is released when the owning value is dropped.
pub struct GraphicsContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) target: RenderTarget,
    format: wgpu::TextureFormat,
    size: (u32, u32),
    clear_color: wgpu::Color,
}

impl GraphicsContext {
    /// Acquires a context that renders into an offscreen texture.
    pub async fn headless(config: &ContextConfig) -> Result<Self> {
        let instance = new_instance(config);
        let adapter = request_adapter(&instance, config, None).await?;
        let (device, queue) = request_device(&adapter).await?;

        let size = (config.width.max(1), config.height.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Framebuffer"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: config.offscreen_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::info!(
            "offscreen context ready: {}x{} {:?} on {}",
            size.0,
            size.1,
            config.offscreen_format,
            adapter.get_info().name
        );

        Ok(Self {
            device,
            queue,
            target: RenderTarget::Offscreen { texture, view },
            format: config.offscreen_format,
            size,
            clear_color: config.clear_color,
        })
    }

    /// Acquires a context that renders into `window`.
    ///
    /// The surface keeps its own reference to the window.
    pub async fn for_window(window: Arc<Window>, config: &ContextConfig) -> Result<Self> {
        let instance = new_instance(config);

        let inner = window.inner_size();
        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let adapter = request_adapter(&instance, config, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter).await?;

        let size = (inner.width.max(1), inner.height.max(1));

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps.formats)
            .context("surface reports no supported formats")?;
        if format.is_srgb() {
            log::warn!("only sRGB surface formats available, colours will be gamma encoded");
        }
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0,
            height: size.1,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "window context ready: {}x{} {:?} on {}",
            size.0,
            size.1,
            format,
            adapter.get_info().name
        );

        Ok(Self {
            device,
            queue,
            target: RenderTarget::Window {
                surface,
                config: surface_config,
            },
            format,
            size,
            clear_color: config.clear_color,
        })
    }

    /// Colour format of the framebuffer.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Framebuffer size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn clear_color(&self) -> wgpu::Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Runs `f` inside a validation error scope and returns the first error
    /// it raised, if any.
    pub(crate) fn scoped<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }

    /// Maps a `MAP_READ` buffer and copies its contents out.
    pub(crate) fn map_read(&self, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .context("buffer map callback was dropped")?
            .context("failed to map read-back buffer")?;
        let data = slice.get_mapped_range().to_vec();
        buffer.unmap();

        Ok(data)
    }

    /// Copies the whole offscreen framebuffer back to the CPU.
    pub fn read_frame(&self) -> Result<Frame> {
        let RenderTarget::Offscreen { texture, .. } = &self.target else {
            bail!("window surfaces cannot be read back");
        };
        let (width, height) = self.size;
        let bytes_per_row = padded_bytes_per_row(width);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Framebuffer Read-back"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read-back Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let padded = self.map_read(&staging)?;
        Frame::from_padded(self.format, width, height, bytes_per_row, &padded)
    }

    /// Reads a single framebuffer pixel as normalized RGBA.
    pub fn read_pixel(&self, x: u32, y: u32) -> Result<[f32; 4]> {
        let frame = self.read_frame()?;
        frame
            .pixel(x, y)
            .with_context(|| format!("pixel ({x}, {y}) is outside the framebuffer"))
    }
}

/// An RGBA8 snapshot of the framebuffer, rows top to bottom.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Frame {
    fn from_padded(
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        bytes_per_row: u32,
        padded: &[u8],
    ) -> Result<Self> {
        // sRGB targets store encoded bytes, not the values the shader wrote
        let swap_red_blue = match format {
            wgpu::TextureFormat::Rgba8Unorm => false,
            wgpu::TextureFormat::Bgra8Unorm => true,
            other => bail!("read-back of {other:?} framebuffers is not supported"),
        };

        let row_len = 4 * width as usize;
        let mut rgba = Vec::with_capacity(row_len * height as usize);
        for row in padded.chunks(bytes_per_row as usize).take(height as usize) {
            for texel in row[..row_len].chunks_exact(4) {
                if swap_red_blue {
                    rgba.extend_from_slice(&[texel[2], texel[1], texel[0], texel[3]]);
                } else {
                    rgba.extend_from_slice(texel);
                }
            }
        }

        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// The pixel at `(x, y)`, origin top left, as normalized RGBA.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = 4 * (y as usize * self.width as usize + x as usize);
        let texel = &self.rgba[start..start + 4];
        Some([
            texel[0] as f32 / 255.0,
            texel[1] as f32 / 255.0,
            texel[2] as f32 / 255.0,
            texel[3] as f32 / 255.0,
        ])
    }
}

/// Row pitch of a texture copy: 4 bytes per texel rounded up to the copy
/// alignment.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    ((unpadded + align - 1) / align) * align
}

/// Picks a linear surface format so stored bytes equal the shader output,
/// the way a WebGL canvas stores them. Falls back to the first format.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

fn new_instance(config: &ContextConfig) -> wgpu::Instance {
    // Instance - Handle to the GPU. Use this to get adapter and surface
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: config.backends,
        ..Default::default()
    })
}

async fn request_adapter(
    instance: &wgpu::Instance,
    config: &ContextConfig,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    let hardware = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await;
    if let Some(adapter) = hardware {
        return Ok(adapter);
    }
    if !config.allow_fallback_adapter {
        bail!("no suitable GPU adapter found");
    }

    log::warn!("no hardware adapter found, trying the fallback adapter");
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: true,
        })
        .await
        .context("no suitable GPU adapter found")
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("main device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        )
        .await
        .context("failed to create device and queue")?;

    // Errors outside an error scope are logged, never fatal
    device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
        log::error!("uncaptured wgpu error: {error}");
    }));

    Ok((device, queue))
}
