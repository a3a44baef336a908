/// Parameters used when acquiring a [`GraphicsContext`](crate::GraphicsContext).
///
/// Nothing here is read from disk or the command line; the defaults describe
/// the triangle demo and tests override single fields.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Colour the framebuffer is cleared to before drawing. Opaque black.
    pub clear_color: wgpu::Color,

    /// Size of the drawable in physical pixels. Window targets use it as the
    /// initial logical size.
    pub width: u32,
    pub height: u32,

    /// Window title, ignored by offscreen targets.
    pub title: String,

    pub power_preference: wgpu::PowerPreference,
    pub backends: wgpu::Backends,

    /// Retry with the software adapter when no hardware adapter is found.
    pub allow_fallback_adapter: bool,

    /// Colour format of offscreen targets. Linear so pixels read back equal
    /// the values the fragment shader wrote.
    pub offscreen_format: wgpu::TextureFormat,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            clear_color: wgpu::Color::BLACK,
            width: 800,
            height: 600,
            title: String::from("wgpu triangle"),
            power_preference: wgpu::PowerPreference::HighPerformance,
            backends: wgpu::Backends::all(),
            allow_fallback_adapter: true,
            offscreen_format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

impl ContextConfig {
    /// A small offscreen configuration, handy for read-back tests.
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clears_to_opaque_black() {
        let config = ContextConfig::default();
        assert_eq!(config.clear_color, wgpu::Color::BLACK);
        assert_eq!(config.clear_color.a, 1.0);
    }

    #[test]
    fn offscreen_keeps_other_defaults() {
        let config = ContextConfig::offscreen(64, 32);
        assert_eq!((config.width, config.height), (64, 32));
        assert_eq!(config.offscreen_format, wgpu::TextureFormat::Rgba8Unorm);
        assert!(config.allow_fallback_adapter);
    }
}
