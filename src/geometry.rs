use std::sync::Arc;

use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::context::GraphicsContext;

/// XY positions of the triangle, counter-clockwise.
pub const TRIANGLE_VERTEX_POSITIONS: [f32; 6] = [
    -0.5, -0.5, // first vertex
    0.5, -0.5, // second
    0.0, 0.5, // third
];

pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Components per vertex in [`TRIANGLE_VERTEX_POSITIONS`].
pub const POSITION_COMPONENTS: u32 = 2;

/// GPU memory holding raw `f32` vertex data. Written once at creation.
///
/// Cloning shares the same GPU buffer.
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    buffer: Arc<wgpu::Buffer>,
    len: usize,
}

impl VertexBuffer {
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of `f32` values stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn size_in_bytes(&self) -> u64 {
        (self.len * std::mem::size_of::<f32>()) as u64
    }
}

impl GraphicsContext {
    /// Allocates a static vertex buffer and uploads `data` into it.
    ///
    /// The length is not checked against the component count the buffer is
    /// later read with; a mismatch only yields wrong geometry.
    pub fn create_vertex_buffer(&self, data: &[f32]) -> VertexBuffer {
        if data.len() % POSITION_COMPONENTS as usize != 0 {
            log::debug!(
                "vertex buffer of {} floats is not a whole number of 2D positions",
                data.len()
            );
        }

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Positions Buffer"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
            });

        VertexBuffer {
            buffer: Arc::new(buffer),
            len: data.len(),
        }
    }

    /// Copies the contents of `vertex_buffer` back from the GPU.
    pub fn read_buffer(&self, vertex_buffer: &VertexBuffer) -> Result<Vec<f32>> {
        if vertex_buffer.is_empty() {
            return Ok(Vec::new());
        }

        let size = vertex_buffer.size_in_bytes();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Vertex Read-back"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read-back Encoder"),
            });
        encoder.copy_buffer_to_buffer(vertex_buffer.buffer(), 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let bytes = self.map_read(&staging)?;
        Ok(bytes
            .chunks_exact(std::mem::size_of::<f32>())
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect())
    }
}
