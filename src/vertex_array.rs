use std::collections::BTreeMap;

use crate::context::GraphicsContext;
use crate::geometry::VertexBuffer;

/// How one attribute location reads from a vertex buffer.
///
/// Elements are `f32`, never normalized, tightly packed from offset zero.
#[derive(Debug, Clone)]
pub struct AttributeBinding {
    pub buffer: VertexBuffer,
    pub component_count: u32,
    pub format: wgpu::VertexFormat,
    pub normalized: bool,
    /// Zero means tightly packed.
    pub stride: u64,
    pub offset: u64,
}

impl AttributeBinding {
    /// Distance in bytes between two consecutive elements.
    pub fn effective_stride(&self) -> u64 {
        if self.stride == 0 {
            self.format.size()
        } else {
            self.stride
        }
    }

    /// Number of whole elements the buffer holds.
    pub fn element_count(&self) -> u64 {
        let available = self.buffer.size_in_bytes().saturating_sub(self.offset);
        available / self.effective_stride()
    }
}

/// Records which buffer feeds each enabled vertex attribute.
#[derive(Debug, Clone, Default)]
pub struct VertexArray {
    attributes: BTreeMap<u32, AttributeBinding>,
}

impl VertexArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that attribute `location` reads `component_count` floats per
    /// vertex from `buffer`, and enables it.
    ///
    /// A negative location (an attribute the program does not have) is
    /// tolerated and leaves the array unchanged, as is an unsupported
    /// component count.
    pub fn add_attribute(&mut self, location: i32, buffer: &VertexBuffer, component_count: u32) {
        let Ok(location) = u32::try_from(location) else {
            log::warn!("ignoring vertex attribute at location {location}");
            return;
        };
        let Some(format) = float_format(component_count) else {
            log::warn!(
                "ignoring vertex attribute {location}: {component_count} components per vertex"
            );
            return;
        };

        let binding = AttributeBinding {
            buffer: buffer.clone(),
            component_count,
            format,
            normalized: false,
            stride: 0,
            offset: 0,
        };
        log::debug!(
            "attribute {location} enabled: {format:?}, {} vertices available",
            binding.element_count()
        );
        self.attributes.insert(location, binding);
    }

    pub fn attribute(&self, location: u32) -> Option<&AttributeBinding> {
        self.attributes.get(&location)
    }

    pub fn is_enabled(&self, location: u32) -> bool {
        self.attributes.contains_key(&location)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl GraphicsContext {
    pub fn create_vertex_array(&self) -> VertexArray {
        VertexArray::new()
    }
}

/// Vertex format of `component_count` 32-bit floats.
pub(crate) fn float_format(component_count: u32) -> Option<wgpu::VertexFormat> {
    match component_count {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_formats_cover_one_to_four_components() {
        assert_eq!(float_format(1), Some(wgpu::VertexFormat::Float32));
        assert_eq!(float_format(2), Some(wgpu::VertexFormat::Float32x2));
        assert_eq!(float_format(4).map(|f| f.size()), Some(16));
        assert_eq!(float_format(0), None);
        assert_eq!(float_format(5), None);
    }

    #[test]
    fn new_array_has_nothing_enabled() {
        let array = VertexArray::new();
        assert!(array.is_empty());
        assert!(!array.is_enabled(0));
    }
}
