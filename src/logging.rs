use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// sqlx logs every statement at info unless SQL tracing is switched on
fn filter_directives(config: &AppConfig) -> String {
    if config.enable_sql_tracing {
        config.log_level.clone()
    } else {
        format!("{},sqlx=warn", config.log_level)
    }
}

/// Install the global subscriber: rolling file output plus stdout in text mode.
///
/// `RUST_LOG` takes precedence over `log_level`. Keep the returned guard alive
/// for the whole process, dropping it flushes and stops the file writer.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
log_level: debug
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
jwt:
  secret: "0123456789abcdef0123456789abcdef"
card:
  hash_salt: "salt"
rsa:
  allow_ephemeral: true
"#;

    #[test]
    fn test_sql_tracing_switch() {
        let mut config = AppConfig::from_yaml(YAML).unwrap();
        assert_eq!(filter_directives(&config), "debug,sqlx=warn");

        config.enable_sql_tracing = true;
        assert_eq!(filter_directives(&config), "debug");
        assert!(EnvFilter::try_new(filter_directives(&config)).is_ok());
    }
}
