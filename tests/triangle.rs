mod common;

use common::{assert_color, context_or_skip, SIZE};
use wgpu_triangle::geometry::POSITION_COMPONENTS;
use wgpu_triangle::shader::ATTRIBUTE_NOT_FOUND;
use wgpu_triangle::{DiagnosticGroup, Triangle, TRIANGLE_VERTEX_COUNT, TRIANGLE_VERTEX_POSITIONS};

const TRIANGLE_COLOR: [f32; 4] = [0.2, 0.4, 1.0, 1.0];
const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[test]
fn vertex_buffer_reads_back_unchanged() {
    let context = context_or_skip!();

    let buffer = context.create_vertex_buffer(&[-0.5, -0.5, 0.5, -0.5, 0.0, 0.5]);
    assert_eq!(buffer.len(), 6);
    assert_eq!(buffer.size_in_bytes(), 24);

    let contents = context.read_buffer(&buffer).unwrap();
    assert_eq!(contents, vec![-0.5, -0.5, 0.5, -0.5, 0.0, 0.5]);
}

#[test]
fn triangle_covers_the_center_only() {
    let context = context_or_skip!();
    let (width, height) = context.size();
    assert_eq!((width, height), (SIZE, SIZE));

    let triangle = Triangle::build(&context);
    assert_eq!(triangle.vertex_position_location, 0);

    let diagnostic = triangle.draw(&context).unwrap();
    assert!(diagnostic.is_none(), "{diagnostic:?}");

    let frame = context.read_frame().unwrap();
    assert_color(frame.pixel(width / 2, height / 2).unwrap(), TRIANGLE_COLOR);
    // above the apex and beside the base
    assert_color(frame.pixel(width / 2, 2).unwrap(), BLACK);
    assert_color(frame.pixel(2, height - 2).unwrap(), BLACK);
    assert_color(frame.pixel(width - 3, 3).unwrap(), BLACK);
}

#[test]
fn clear_color_fills_pixels_outside_the_triangle() {
    let mut context = context_or_skip!();
    context.set_clear_color(wgpu::Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    });
    let (width, height) = context.size();

    let triangle = Triangle::build(&context);
    triangle.draw(&context).unwrap();

    assert_color(context.read_pixel(1, 1).unwrap(), [1.0, 0.0, 0.0, 1.0]);
    assert_color(
        context.read_pixel(width / 2, height / 2).unwrap(),
        TRIANGLE_COLOR,
    );
}

#[test]
fn missing_attribute_location_is_reported_as_a_draw_diagnostic() {
    let context = context_or_skip!();

    let triangle = Triangle::build(&context);
    let mut vertex_array = context.create_vertex_array();
    vertex_array.add_attribute(ATTRIBUTE_NOT_FOUND, &triangle.vertex_buffer, POSITION_COMPONENTS);
    assert!(vertex_array.is_empty());

    // no buffer feeds the position input; the draw must still return
    let diagnostic = context
        .draw(&triangle.program, &vertex_array, 0..TRIANGLE_VERTEX_COUNT)
        .unwrap()
        .expect("a draw without a position buffer is diagnosed");
    assert_eq!(diagnostic.group, DiagnosticGroup::Draw);
    assert!(diagnostic.text.contains("`vertexPosition` at location 0"));
    assert!(diagnostic.to_string().starts_with("Draw Log\n"));
}

#[test]
fn declared_stride_is_used_for_wider_vertices() {
    let context = context_or_skip!();
    let (width, height) = context.size();

    // xyz per vertex; the z values would land in the positions at stride 8
    let positions = [-0.5, -0.5, 9.0, 0.5, -0.5, 9.0, 0.0, 0.5, 9.0];
    let buffer = context.create_vertex_buffer(&positions);

    let triangle = Triangle::build(&context);
    let mut vertex_array = context.create_vertex_array();
    vertex_array.add_attribute(triangle.vertex_position_location, &buffer, 3);

    let diagnostic = context
        .draw(&triangle.program, &vertex_array, 0..TRIANGLE_VERTEX_COUNT)
        .unwrap();
    assert!(diagnostic.is_none(), "{diagnostic:?}");
    // one pipeline from linking, one for the xyz layout
    assert_eq!(triangle.program.pipeline_count(), 2);

    let frame = context.read_frame().unwrap();
    assert_color(frame.pixel(width / 2, height / 2).unwrap(), TRIANGLE_COLOR);
    assert_color(frame.pixel(width / 2, 2).unwrap(), BLACK);
    assert_color(frame.pixel(2, height - 2).unwrap(), BLACK);
}

#[test]
fn pipelines_are_reused_for_the_same_layout() {
    let context = context_or_skip!();

    let triangle = Triangle::build(&context);
    triangle.draw(&context).unwrap();
    triangle.draw(&context).unwrap();
    assert_eq!(triangle.program.pipeline_count(), 1);
}

#[test]
fn attribute_binding_describes_tightly_packed_floats() {
    let context = context_or_skip!();

    let buffer = context.create_vertex_buffer(&TRIANGLE_VERTEX_POSITIONS);
    let mut vertex_array = context.create_vertex_array();
    vertex_array.add_attribute(0, &buffer, POSITION_COMPONENTS);

    let binding = vertex_array.attribute(0).unwrap();
    assert_eq!(binding.format, wgpu::VertexFormat::Float32x2);
    assert!(!binding.normalized);
    assert_eq!((binding.stride, binding.offset), (0, 0));
    assert_eq!(binding.effective_stride(), 8);
    assert_eq!(binding.element_count(), TRIANGLE_VERTEX_COUNT as u64);

    vertex_array.add_attribute(1, &buffer, 7);
    assert!(!vertex_array.is_enabled(1));
}
