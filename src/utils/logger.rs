use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Default filter when `RUST_LOG` is unset. Verbose mode also lets other
/// crates through at info.
fn default_directive(verbose: bool, level: &str) -> String {
    if verbose {
        "uni_records=debug,info".to_string()
    } else {
        format!("uni_records={}", level.to_lowercase())
    }
}

/// Console logger. Output goes to stderr so it never interleaves with the menus.
pub fn init_cli_logger(verbose: bool, level: &str) {
    init(LogFormat::Compact, &default_directive(verbose, level));
}

/// JSON lines on stderr, for the dump tool whose stdout carries data.
pub fn init_json_logger(level: &str) {
    init(LogFormat::Json, &default_directive(false, level));
}

fn init(format: LogFormat, directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false, "WARN"), "uni_records=warn");
        assert_eq!(default_directive(true, "warn"), "uni_records=debug,info");
    }
}
