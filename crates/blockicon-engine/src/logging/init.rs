use std::sync::Once;

/// Filter used when neither [`LoggingConfig::env_filter`] nor `RUST_LOG` is
/// set. Renderer messages at info, wgpu internals only from warn up.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn";

/// Where renderer diagnostics go and how they look.
///
/// The renderer itself only writes through the `log` macros: texture
/// failures at warn, frame errors at error, attach/detach and texture
/// collection at debug.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` directives, for example `"blockicon_engine=debug"`.
    /// Takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Directives the logger is built from: explicit filter, then `rust_log`,
    /// then [`DEFAULT_FILTER`].
    fn directives(&self, rust_log: Option<String>) -> String {
        self.env_filter
            .clone()
            .or(rust_log)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Routes the crate's `log` output to stderr through `env_logger`.
///
/// Only the first call in a process does anything. If another logger was
/// installed first it is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let directives = config.directives(std::env::var("RUST_LOG").ok());
        let mut builder = env_logger::Builder::new();
        builder
            .parse_filters(&directives)
            .write_style(config.write_style);

        match builder.try_init() {
            Ok(()) => log::debug!("blockicon logging on ({directives})"),
            Err(_) => log::debug!("a logger was already installed; keeping it"),
        }
    });
}
