use std::ops::Range;

use anyhow::{Context, Result};

use crate::context::{GraphicsContext, RenderTarget};
use crate::diagnostic::{Diagnostic, DiagnosticGroup};
use crate::shader::{ShaderProgram, SlotLayout};
use crate::vertex_array::VertexArray;

/// The texture a draw renders into.
enum FrameTarget<'a> {
    Offscreen(&'a wgpu::TextureView),
    Surface(wgpu::SurfaceTexture, wgpu::TextureView),
}

impl FrameTarget<'_> {
    fn view(&self) -> &wgpu::TextureView {
        match self {
            FrameTarget::Offscreen(view) => *view,
            FrameTarget::Surface(_, view) => view,
        }
    }

    fn present(self) {
        if let FrameTarget::Surface(surface_texture, _) = self {
            surface_texture.present();
        }
    }
}

impl GraphicsContext {
    /// Clears the framebuffer and draws `vertices` of `vertex_array` as a
    /// triangle list with `program`.
    ///
    /// The pipeline reads each attribute with the format and stride the
    /// vertex array declares for it.
    ///
    /// Validation failures (an invalid program, an attribute without a
    /// buffer) are logged under "Draw Log" and returned; they never abort.
    /// Only failing to acquire a window frame is an error.
    pub fn draw(
        &self,
        program: &ShaderProgram,
        vertex_array: &VertexArray,
        vertices: Range<u32>,
    ) -> Result<Option<Diagnostic>> {
        let frame = self.acquire_frame()?;

        let mut problems = Vec::new();
        let slots: Vec<SlotLayout> = program
            .inputs()
            .iter()
            .map(|input| {
                let binding = vertex_array.attribute(input.location);
                if binding.is_none() {
                    problems.push(format!(
                        "attribute `{}` at location {} has no enabled buffer",
                        input.name, input.location
                    ));
                }
                SlotLayout::for_input(
                    input,
                    binding.map(|binding| (binding.format, binding.effective_stride())),
                )
            })
            .collect();

        let ((), error) = self.scoped(|| {
            let pipeline = program.pipeline_for(&self.device, &slots);

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: frame.view(),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color()),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

                render_pass.set_pipeline(&pipeline);
                for (slot, input) in program.inputs().iter().enumerate() {
                    if let Some(binding) = vertex_array.attribute(input.location) {
                        let slice = binding.buffer.buffer().slice(binding.offset..);
                        render_pass.set_vertex_buffer(slot as u32, slice);
                    }
                }
                render_pass.draw(vertices.clone(), 0..1);
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        });

        frame.present();

        if let Some(error) = error {
            problems.push(Diagnostic::from_wgpu(DiagnosticGroup::Draw, &error).text);
        }
        let diagnostic = (!problems.is_empty())
            .then(|| Diagnostic::new(DiagnosticGroup::Draw, problems.join("\n")));
        if let Some(diagnostic) = &diagnostic {
            diagnostic.emit();
        } else {
            log::debug!("drew vertices {vertices:?}");
        }
        Ok(diagnostic)
    }

    fn acquire_frame(&self) -> Result<FrameTarget<'_>> {
        match &self.target {
            RenderTarget::Offscreen { view, .. } => Ok(FrameTarget::Offscreen(view)),
            RenderTarget::Window { surface, config } => {
                let surface_texture = match surface.get_current_texture() {
                    Ok(texture) => texture,
                    // Reconfigure the surface once if lost
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        surface.configure(&self.device, config);
                        surface
                            .get_current_texture()
                            .context("failed to acquire a frame after reconfiguring")?
                    }
                    Err(error) => return Err(error).context("failed to acquire a frame"),
                };
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(FrameTarget::Surface(surface_texture, view))
            }
        }
    }
}
