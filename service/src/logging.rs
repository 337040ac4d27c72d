use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder};

/// Dependency modules whose logs are hidden below Trace. Keep-alive and
/// connection churn on long-lived streams makes these very chatty.
const FILTERED_MODULES: &[&str] = &["hyper", "hyper_util", "h2", "tower", "tower_http", "axum"];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger from the configured level.
    ///
    /// At Trace everything is shown, including the HTTP stack; at any other
    /// level the modules in `FILTERED_MODULES` are suppressed.
    pub fn init_logger(config: &Config) {
        let level = Self::to_simplelog_level(config.log_level_filter);
        let log_config = Self::build_log_config(config.log_level_filter != LevelFilter::Trace);

        if let Err(e) = simplelog::TermLogger::init(
            level,
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ) {
            eprintln!("Logger already initialized: {e}");
        }
    }

    fn to_simplelog_level(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn build_log_config(filter_dependencies: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if filter_dependencies {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
