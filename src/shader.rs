use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::GraphicsContext;
use crate::diagnostic::{Compiled, Diagnostic, DiagnosticGroup};

pub const VERTEX_SHADER_SOURCE: &str = include_str!("shaders/triangle.vert.wgsl");
pub const FRAGMENT_SHADER_SOURCE: &str = include_str!("shaders/triangle.frag.wgsl");

pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

/// Name of the position input in [`VERTEX_SHADER_SOURCE`].
pub const VERTEX_POSITION_ATTRIBUTE: &str = "vertexPosition";

/// Returned by [`ShaderProgram::attribute_location`] for unknown names.
pub const ATTRIBUTE_NOT_FOUND: i32 = -1;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_ENTRY_POINT,
            ShaderStage::Fragment => FRAGMENT_ENTRY_POINT,
        }
    }

    pub fn diagnostic_group(self) -> DiagnosticGroup {
        match self {
            ShaderStage::Vertex => DiagnosticGroup::VertexShader,
            ShaderStage::Fragment => DiagnosticGroup::FragmentShader,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex Shader",
            ShaderStage::Fragment => "Fragment Shader",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

/// A compiled module for one pipeline stage.
#[derive(Debug)]
pub struct Shader {
    module: wgpu::ShaderModule,
    stage: ShaderStage,
    source: String,
}

impl Shader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

/// A vertex shader input the program reads from a vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// How one buffer slot of a pipeline is read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SlotLayout {
    pub location: u32,
    pub format: wgpu::VertexFormat,
    pub stride: u64,
}

impl SlotLayout {
    /// The layout for `input`: the declared `(format, stride)` of its vertex
    /// array binding, or the input's own type tightly packed.
    pub fn for_input(input: &VertexInput, declared: Option<(wgpu::VertexFormat, u64)>) -> Self {
        let (format, stride) = declared.unwrap_or((input.format, input.format.size()));
        Self {
            location: input.location,
            format,
            stride,
        }
    }
}

/// The linked vertex and fragment stages.
///
/// Each vertex input is fed from its own buffer slot, slots numbered in
/// ascending location order. The render pipeline depends on how the vertex
/// array lays those slots out, so one is built per layout and cached.
#[derive(Debug)]
pub struct ShaderProgram {
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    inputs: Vec<VertexInput>,
    pipelines: RefCell<HashMap<Vec<SlotLayout>, Arc<wgpu::RenderPipeline>>>,
}

impl ShaderProgram {
    /// Location of the vertex input called `name`, or [`ATTRIBUTE_NOT_FOUND`].
    pub fn attribute_location(&self, name: &str) -> i32 {
        self.inputs
            .iter()
            .find(|input| input.name == name)
            .map_or(ATTRIBUTE_NOT_FOUND, |input| input.location as i32)
    }

    pub fn inputs(&self) -> &[VertexInput] {
        &self.inputs
    }

    /// Number of vertex layouts a render pipeline has been built for.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.borrow().len()
    }

    fn default_slots(&self) -> Vec<SlotLayout> {
        self.inputs
            .iter()
            .map(|input| SlotLayout::for_input(input, None))
            .collect()
    }

    /// The pipeline for `slots`, built on first use.
    ///
    /// Call inside an error scope; building can raise validation errors.
    pub(crate) fn pipeline_for(
        &self,
        device: &wgpu::Device,
        slots: &[SlotLayout],
    ) -> Arc<wgpu::RenderPipeline> {
        if let Some(pipeline) = self.pipelines.borrow().get(slots) {
            return Arc::clone(pipeline);
        }

        let attributes: Vec<wgpu::VertexAttribute> = slots
            .iter()
            .map(|slot| wgpu::VertexAttribute {
                format: slot.format,
                offset: 0,
                shader_location: slot.location,
            })
            .collect();
        let buffer_layouts: Vec<wgpu::VertexBufferLayout> = slots
            .iter()
            .zip(&attributes)
            .map(|(slot, attribute)| wgpu::VertexBufferLayout {
                array_stride: slot.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(attribute),
            })
            .collect();

        log::debug!("building render pipeline for {slots:?}");
        let pipeline = Arc::new(create_render_pipeline(
            device,
            &self.layout,
            self.color_format,
            &buffer_layouts,
            &self.vertex_module,
            &self.fragment_module,
        ));
        self.pipelines
            .borrow_mut()
            .insert(slots.to_vec(), Arc::clone(&pipeline));
        pipeline
    }
}

impl GraphicsContext {
    /// Compiles `source` as a shader for `stage`.
    ///
    /// Compilation failures are logged under the stage's heading and the
    /// (invalid) shader is returned anyway.
    pub fn create_shader(&self, stage: ShaderStage, source: &str) -> Compiled<Shader> {
        let (module, error) = self.scoped(|| {
            self.device
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(stage.label()),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
        });

        let diagnostic = error
            .map(|error| Diagnostic::from_wgpu(stage.diagnostic_group(), &error))
            .or_else(|| check_entry_point(stage, source));

        let shader = Shader {
            module,
            stage,
            source: source.to_owned(),
        };
        Compiled::reported(shader, diagnostic)
    }

    /// Links a vertex and a fragment shader into a program, consuming both.
    ///
    /// Linking builds the pipeline for tightly packed inputs. Failures are
    /// logged under "Shaders Program Log" and the (invalid) program is
    /// returned anyway.
    pub fn create_shader_program(
        &self,
        vertex_shader: Shader,
        fragment_shader: Shader,
    ) -> Compiled<ShaderProgram> {
        let mut problems = Vec::new();
        if vertex_shader.stage != ShaderStage::Vertex {
            problems.push(String::from("the vertex slot holds a fragment shader"));
        }
        if fragment_shader.stage != ShaderStage::Fragment {
            problems.push(String::from("the fragment slot holds a vertex shader"));
        }

        let inputs = match reflect_vertex_inputs(&vertex_shader.source) {
            Ok(inputs) => inputs,
            Err(reason) => {
                log::debug!("vertex inputs could not be reflected: {reason}");
                Vec::new()
            }
        };

        let (program, error) = self.scoped(|| {
            let layout = self
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Shaders Program Layout"),
                    bind_group_layouts: &[],
                    push_constant_ranges: &[],
                });
            let program = ShaderProgram {
                vertex_module: vertex_shader.module,
                fragment_module: fragment_shader.module,
                layout,
                color_format: self.format(),
                inputs,
                pipelines: RefCell::new(HashMap::new()),
            };
            program.pipeline_for(&self.device, &program.default_slots());
            program
        });

        if let Some(error) = error {
            problems.push(Diagnostic::from_wgpu(DiagnosticGroup::Program, &error).text);
        }
        let diagnostic = (!problems.is_empty())
            .then(|| Diagnostic::new(DiagnosticGroup::Program, problems.join("\n")));

        Compiled::reported(program, diagnostic)
    }
}

fn create_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shaders Program"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some(VERTEX_ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: vertex_layouts,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some(FRAGMENT_ENTRY_POINT),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // winding has no effect yet
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// Reports a source that parses but lacks the entry point for `stage`.
fn check_entry_point(stage: ShaderStage, source: &str) -> Option<Diagnostic> {
    let module = naga::front::wgsl::parse_str(source).ok()?;
    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.stage == stage.naga_stage() && ep.name == stage.entry_point());

    (!found).then(|| {
        Diagnostic::new(
            stage.diagnostic_group(),
            format!(
                "error: no {:?} entry point named `{}`",
                stage,
                stage.entry_point()
            ),
        )
    })
}

/// Lists the location-bound inputs of the vertex entry point in `source`,
/// sorted by location.
pub(crate) fn reflect_vertex_inputs(source: &str) -> Result<Vec<VertexInput>, String> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|error| error.emit_to_string(source))?;
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == VERTEX_ENTRY_POINT)
        .ok_or_else(|| format!("no vertex entry point named `{VERTEX_ENTRY_POINT}`"))?;

    let mut inputs = Vec::new();
    for argument in &entry_point.function.arguments {
        match &argument.binding {
            Some(binding) => {
                push_input(&module, &mut inputs, argument.name.as_deref(), argument.ty, binding);
            }
            // struct arguments carry bindings on their members
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let Some(binding) = &member.binding {
                            push_input(
                                &module,
                                &mut inputs,
                                member.name.as_deref(),
                                member.ty,
                                binding,
                            );
                        }
                    }
                }
            }
        }
    }

    inputs.sort_by_key(|input| input.location);
    Ok(inputs)
}

fn push_input(
    module: &naga::Module,
    inputs: &mut Vec<VertexInput>,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: &naga::Binding,
) {
    let naga::Binding::Location { location, .. } = binding else {
        return;
    };
    let Some(format) = vertex_format(&module.types[ty].inner) else {
        log::warn!("vertex input at location {location} has an unsupported type");
        return;
    };
    inputs.push(VertexInput {
        name: name.unwrap_or_default().to_owned(),
        location: *location,
        format,
    });
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    use naga::{Scalar, ScalarKind, TypeInner, VectorSize};
    use wgpu::VertexFormat as F;

    let (kind, components) = match *inner {
        TypeInner::Scalar(Scalar { kind, width: 4 }) => (kind, 1),
        TypeInner::Vector {
            size,
            scalar: Scalar { kind, width: 4 },
        } => {
            let components = match size {
                VectorSize::Bi => 2,
                VectorSize::Tri => 3,
                VectorSize::Quad => 4,
            };
            (kind, components)
        }
        _ => return None,
    };

    let format = match (kind, components) {
        (ScalarKind::Float, 1) => F::Float32,
        (ScalarKind::Float, 2) => F::Float32x2,
        (ScalarKind::Float, 3) => F::Float32x3,
        (ScalarKind::Float, 4) => F::Float32x4,
        (ScalarKind::Sint, 1) => F::Sint32,
        (ScalarKind::Sint, 2) => F::Sint32x2,
        (ScalarKind::Sint, 3) => F::Sint32x3,
        (ScalarKind::Sint, 4) => F::Sint32x4,
        (ScalarKind::Uint, 1) => F::Uint32,
        (ScalarKind::Uint, 2) => F::Uint32x2,
        (ScalarKind::Uint, 3) => F::Uint32x3,
        (ScalarKind::Uint, 4) => F::Uint32x4,
        _ => return None,
    };
    Some(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflects_the_embedded_position_input() {
        let inputs = reflect_vertex_inputs(VERTEX_SHADER_SOURCE).unwrap();
        assert_eq!(
            inputs,
            vec![VertexInput {
                name: VERTEX_POSITION_ATTRIBUTE.to_owned(),
                location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }]
        );
    }

    #[test]
    fn reflects_struct_members_in_location_order() {
        let source = r#"
            struct VertexIn {
                @location(3) weight: f32,
                @location(1) color: vec4<f32>,
                @builtin(vertex_index) index: u32,
            }

            @vertex
            fn vs_main(input: VertexIn) -> @builtin(position) vec4<f32> {
                return input.color * input.weight;
            }
        "#;
        let inputs = reflect_vertex_inputs(source).unwrap();
        let summary: Vec<_> = inputs
            .iter()
            .map(|input| (input.name.as_str(), input.location, input.format))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("color", 1, wgpu::VertexFormat::Float32x4),
                ("weight", 3, wgpu::VertexFormat::Float32),
            ]
        );
    }

    #[test]
    fn syntax_errors_come_back_as_compiler_text() {
        let source = "@vertex fn vs_main( -> @builtin(position) vec4<f32> {}";
        let error = reflect_vertex_inputs(source).unwrap_err();
        assert!(error.contains("error"), "{error}");
    }

    #[test]
    fn fragment_source_has_no_vertex_entry_point() {
        let error = reflect_vertex_inputs(FRAGMENT_SHADER_SOURCE).unwrap_err();
        assert!(error.contains(VERTEX_ENTRY_POINT));
    }

    #[test]
    fn entry_point_check_flags_wrong_stage() {
        let diagnostic = check_entry_point(ShaderStage::Vertex, FRAGMENT_SHADER_SOURCE).unwrap();
        assert_eq!(diagnostic.group, DiagnosticGroup::VertexShader);
        assert!(check_entry_point(ShaderStage::Fragment, FRAGMENT_SHADER_SOURCE).is_none());
        assert!(check_entry_point(ShaderStage::Vertex, VERTEX_SHADER_SOURCE).is_none());
    }

    #[test]
    fn slot_layout_follows_the_declared_binding() {
        let input = VertexInput {
            name: VERTEX_POSITION_ATTRIBUTE.to_owned(),
            location: 0,
            format: wgpu::VertexFormat::Float32x2,
        };

        let packed = SlotLayout::for_input(&input, None);
        assert_eq!((packed.format, packed.stride), (wgpu::VertexFormat::Float32x2, 8));

        // three floats per vertex, read through a vec2 input
        let declared = SlotLayout::for_input(&input, Some((wgpu::VertexFormat::Float32x3, 12)));
        assert_eq!(declared.location, 0);
        assert_eq!(
            (declared.format, declared.stride),
            (wgpu::VertexFormat::Float32x3, 12)
        );
        assert_ne!(packed, declared);
    }

    #[test]
    fn missing_semicolon_is_reported_by_the_compiler() {
        let source = "@vertex\nfn vs_main() -> @builtin(position) vec4<f32> {\n    return vec4<f32>(0.0)\n}\n";
        let error = reflect_vertex_inputs(source).unwrap_err();
        assert!(error.contains("expected"), "{error}");
        assert!(error.contains(';'), "{error}");
    }

    #[test]
    fn stages_map_to_their_log_headings() {
        assert_eq!(
            ShaderStage::Vertex.diagnostic_group().label(),
            "Vertex Shader Logs"
        );
        assert_eq!(
            ShaderStage::Fragment.diagnostic_group().label(),
            "Fragment Shader Logs"
        );
    }
}
