//! Draws a single triangle with wgpu: acquire a context, upload three 2D
//! positions, build a vertex and a fragment shader, bind the position
//! attribute and issue one draw call.

pub mod app;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod draw;
pub mod geometry;
pub mod logging;
pub mod shader;
pub mod vertex_array;

pub use app::Triangle;
pub use config::ContextConfig;
pub use context::{Frame, GraphicsContext};
pub use diagnostic::{Compiled, Diagnostic, DiagnosticGroup};
pub use geometry::{VertexBuffer, TRIANGLE_VERTEX_COUNT, TRIANGLE_VERTEX_POSITIONS};
pub use logging::{init_logging, LoggingConfig};
pub use shader::{Shader, ShaderProgram, ShaderStage, VertexInput};
pub use vertex_array::{AttributeBinding, VertexArray};
