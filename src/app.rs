use anyhow::Result;

use crate::context::GraphicsContext;
use crate::diagnostic::Diagnostic;
use crate::geometry::{
    VertexBuffer, POSITION_COMPONENTS, TRIANGLE_VERTEX_COUNT, TRIANGLE_VERTEX_POSITIONS,
};
use crate::shader::{
    ShaderProgram, ShaderStage, FRAGMENT_SHADER_SOURCE, VERTEX_POSITION_ATTRIBUTE,
    VERTEX_SHADER_SOURCE,
};
use crate::vertex_array::VertexArray;

/// Every GPU object the triangle needs, built once.
pub struct Triangle {
    pub vertex_buffer: VertexBuffer,
    pub program: ShaderProgram,
    pub vertex_array: VertexArray,
    pub vertex_position_location: i32,
}

impl Triangle {
    /// Uploads the geometry, builds the shaders and binds the position
    /// attribute, using the embedded shader sources.
    pub fn build(context: &GraphicsContext) -> Self {
        Self::build_with_sources(context, VERTEX_SHADER_SOURCE, FRAGMENT_SHADER_SOURCE)
    }

    /// Same as [`Triangle::build`] with caller supplied shader sources.
    ///
    /// Broken sources are logged and the build carries on.
    pub fn build_with_sources(
        context: &GraphicsContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Self {
        let vertex_buffer = context.create_vertex_buffer(&TRIANGLE_VERTEX_POSITIONS);

        let vertex_shader = context
            .create_shader(ShaderStage::Vertex, vertex_source)
            .into_handle();
        let fragment_shader = context
            .create_shader(ShaderStage::Fragment, fragment_source)
            .into_handle();
        let program = context
            .create_shader_program(vertex_shader, fragment_shader)
            .into_handle();

        let vertex_position_location = program.attribute_location(VERTEX_POSITION_ATTRIBUTE);

        let mut vertex_array = context.create_vertex_array();
        vertex_array.add_attribute(
            vertex_position_location,
            &vertex_buffer,
            POSITION_COMPONENTS,
        );

        Self {
            vertex_buffer,
            program,
            vertex_array,
            vertex_position_location,
        }
    }

    /// Clears the framebuffer and draws the three vertices.
    pub fn draw(&self, context: &GraphicsContext) -> Result<Option<Diagnostic>> {
        context.draw(&self.program, &self.vertex_array, 0..TRIANGLE_VERTEX_COUNT)
    }
}
