use core::fmt;
use std::fs::OpenOptions;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tracingfmt};

#[macro_export]
macro_rules! unimplemented_log {
    ( $($arg:tt)* ) => {{
        tracing::warn!(
            "unimplemented: {}",
            format_args!($($arg)*),
        );
    }};
}

/// if `cond` is false, logs a warning with your message.
#[macro_export]
macro_rules! assert_warn {
    ($cond:expr, $($arg:tt)+) => {{
        if !$cond {
            tracing::warn!(
                target: module_path!(),
                "assertion warning: `{}` failed: {} at {}:{}",
                stringify!($cond),
                format_args!($($arg)+),
                file!(),
                line!(),
            );
        }
    }};
}

/// Width of the location column; messages start after it
const LOCATION_WIDTH: usize = 64;

struct AlignedFormatter;

/// Picks the optional `ch` field so it can be shown as its own column
#[derive(Default)]
struct ChannelVisitor {
    channel: Option<u64>,
}

impl tracing::field::Visit for ChannelVisitor {
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "ch" {
            self.channel = Some(value);
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        if field.name() == "ch" && value >= 0 {
            self.channel = Some(value as u64);
        }
    }

    fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn fmt::Debug) {}
}

/// "crates/pacsat-entities/src/datalink/components/dl_session.rs"
/// becomes "[entities/datalink] dl_session.rs"
fn short_location(file_path: &str) -> String {
    let Some(src_idx) = file_path.find("/src/") else {
        return file_path.to_string();
    };
    let before_src = &file_path[..src_idx];
    let after_src = &file_path[src_idx + 5..];

    let crate_name = match before_src.rfind("pacsat-") {
        Some(idx) => &before_src[idx + 7..],
        None => before_src.rsplit('/').next().unwrap_or("?"),
    };
    match after_src.split_once('/') {
        Some((module, rest)) => {
            let filename = rest.rsplit('/').next().unwrap_or(rest);
            format!("[{}/{}] {}", crate_name, module, filename)
        }
        None => format!("[{}] {}", crate_name, after_src),
    }
}

impl<S, N> FormatEvent<S, N> for AlignedFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut visitor = ChannelVisitor::default();
        event.record(&mut visitor);
        let channel = match visitor.channel {
            Some(ch) => format!("ch{}", ch),
            None => "   ".to_string(),
        };

        let color = if writer.has_ansi_escapes() {
            match *metadata.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            }
        } else {
            ""
        };
        let reset = if color.is_empty() { "" } else { "\x1b[0m" };

        // "LEVEL chN [crate/module] file:line:"
        let location = format!(
            "{}{:<5}{} {} {}:{}:",
            color,
            metadata.level(),
            reset,
            channel,
            short_location(metadata.file().unwrap_or("unknown")),
            metadata.line().unwrap_or(0)
        );

        let mut message_buf = String::new();
        ctx.field_format().format_fields(format::Writer::new(&mut message_buf), event)?;

        // The channel already has its column
        if visitor.channel.is_some() {
            if let Some(idx) = message_buf.find(" ch=") {
                let end = message_buf[idx + 1..].find(' ').map(|e| idx + 1 + e).unwrap_or(message_buf.len());
                message_buf.replace_range(idx..end, "");
            }
        }

        // Inbound/outbound PDU logs ("<-", "->") are outdented slightly
        let mut padding = LOCATION_WIDTH + color.len() + reset.len();
        if message_buf.starts_with("->") || message_buf.starts_with("<-") {
            padding -= 3;
        }

        write!(writer, "{:<width$} {}", location, message_buf, width = padding)?;
        writeln!(writer)
    }
}

static INIT_LOG: Once = Once::new();

/// Sets up logging with maximum verbosity (trace level)
/// Mainly for unit tests
pub fn setup_logging_verbose() {
    let stdout_filter = EnvFilter::new("trace");
    setup_logging(stdout_filter, None);
}

/// Sets up default logging to stdout and optionally, a verbose log file
/// Returns a guard, that needs to be kept alive for logging to file to work
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let stdout_filter = get_default_stdout_filter();
    let logfile_and_filter = verbose_logfile.map(|file| (file, get_default_logfile_filter()));
    setup_logging(stdout_filter, logfile_and_filter)
}

/// RUST_LOG replaces the built-in filter when set
pub fn get_default_stdout_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new("info")
        // Hide per-tick and per-byte noise
        .add_directive("pacsat_entities::messagerouter=warn".parse().unwrap())
        .add_directive("pacsat_core::bytebuffer=warn".parse().unwrap())

        // Radio edge and frame routing
        .add_directive("pacsat_entities::radio=info".parse().unwrap())
        .add_directive("pacsat_entities::classifier=info".parse().unwrap())

        // Link layer
        .add_directive("pacsat_entities::datalink=debug".parse().unwrap())

        // File protocols
        .add_directive("pacsat_entities::uplink=debug".parse().unwrap())
        .add_directive("pacsat_entities::pb=debug".parse().unwrap())
        .add_directive("pacsat_entities::dir=info".parse().unwrap())
}

fn get_default_logfile_filter() -> EnvFilter {
    EnvFilter::new("debug")
}

/// Sets up logging to stdout and optionally, a verbose log file.
/// Returns the file writer's guard, which must be kept alive for the file to be written.
/// A log file that cannot be opened is reported and logging goes to stdout only.
fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    let file = outfile.and_then(|(path, filter)| {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some((file, filter)),
            Err(e) => {
                eprintln!("Cannot open log file {}: {}", path, e);
                None
            }
        }
    });

    // Each branch builds its own stdout layer, the layer type depends on what it sits on
    match file {
        Some((file, filter)) => {
            let (file_writer, guard) = tracing_appender::non_blocking(file);
            INIT_LOG.call_once(|| {
                let file_layer = tracingfmt::layer()
                    .event_format(AlignedFormatter)
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(filter);
                let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter).with_filter(stdout_filter);
                tracing_subscriber::registry().with(file_layer).with(stdout_layer).init();
            });
            Some(guard)
        }
        None => {
            INIT_LOG.call_once(|| {
                let stdout_layer = tracingfmt::layer().event_format(AlignedFormatter).with_filter(stdout_filter);
                tracing_subscriber::registry().with(stdout_layer).init();
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_location() {
        assert_eq!(
            short_location("crates/pacsat-entities/src/datalink/components/dl_session.rs"),
            "[entities/datalink] dl_session.rs"
        );
        assert_eq!(short_location("crates/pacsat-core/src/callsign.rs"), "[core] callsign.rs");
        assert_eq!(short_location("build.rs"), "build.rs");
    }

    #[test]
    fn test_logging_with_file() {
        let path = std::env::temp_dir().join(format!("pacsat-debug-{}.log", std::process::id()));
        let guard = setup_logging_default(Some(path.to_string_lossy().into_owned()));
        assert!(guard.is_some());
        tracing::info!(ch = 1u8, "logging to {}", path.display());
        drop(guard);
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_unopenable_log_file_falls_back() {
        let guard = setup_logging_default(Some("/nonexistent-dir/pacsat.log".to_string()));
        assert!(guard.is_none());
    }
}
