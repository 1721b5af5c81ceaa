//! Log subscriber setup and the startup banner.

use tracing::Level;

/// Logging configuration for the detector.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for dependencies
    pub level: Level,
    /// Log level for this crate
    pub crate_level: Level,
    /// Whether to use JSON output format
    pub json_format: bool,
    /// Environment filter override
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            crate_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }

    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!(
                "{},{}={}",
                self.level.as_str().to_lowercase(),
                env!("CARGO_CRATE_NAME"),
                self.crate_level.as_str().to_lowercase()
            ),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `config`.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Name and version this binary was built as.
pub fn version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Log the version banner. Called once from `main` after [`init`].
pub fn log_version() {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "{}", version());
}
