use std::sync::Once;

/// Where log output is filtered and how it is coloured.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` directives such as `"wgpu_triangle=debug"`. Overrides
    /// `RUST_LOG` when set.
    pub filter: Option<String>,
    pub colors: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            colors: env_logger::WriteStyle::Auto,
        }
    }
}

static LOGGER: Once = Once::new();

/// Installs `env_logger` as the `log` backend. Only the first call has any
/// effect; shader and draw diagnostics are written through it.
pub fn init_logging(config: LoggingConfig) {
    LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        // info for this crate, warn for the driver stack
        builder
            .filter_level(log::LevelFilter::Info)
            .filter_module("wgpu_core", log::LevelFilter::Warn)
            .filter_module("wgpu_hal", log::LevelFilter::Warn)
            .filter_module("naga", log::LevelFilter::Warn)
            .write_style(config.colors);

        if let Some(directives) = config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            builder.parse_filters(&directives);
        }

        // a test harness may own the logger already
        if builder.try_init().is_ok() {
            log::debug!("env_logger installed");
        }
    });
}
