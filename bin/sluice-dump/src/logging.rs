//! Logging.

use std::{fmt, str::FromStr as _, sync::OnceLock};

use chrono::{
    format::{DelayedFormat, StrftimeItems},
    Utc,
};
use chrono_tz::Tz;
use sluice_error::GenericError;
use tracing::{field, level_filters::LevelFilter, Event, Subscriber};
use tracing_subscriber::{
    field::VisitOutput,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt as _,
    registry::LookupSpan,
    util::SubscriberInitExt as _,
    EnvFilter, Layer,
};

const APP_NAME: &str = "SLUICE";

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

/// Initializes the logging subsystem for `tracing`.
///
/// The `DD_LOG_LEVEL` environment variable takes precedence over `default_level` when set. When `DD_LOG_FORMAT_JSON`
/// is `true` or `1`, logs are written as JSON. Otherwise, they are written in the same line format as the Datadog
/// Agent.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(default_level: LevelFilter) -> Result<(), GenericError> {
    let is_json = std::env::var("DD_LOG_FORMAT_JSON")
        .map(|s| s.trim().to_lowercase())
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false);

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("DD_LOG_LEVEL")
        .from_env_lossy();

    let layer = if is_json {
        tracing_subscriber::fmt::Layer::new()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::Layer::new()
            .event_format(AgentLikeFormatter)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;

    Ok(())
}

/// Event formatter that writes lines in the Datadog Agent's log format.
///
/// ```text
/// 2024-12-31 23:59:59 UTC | SLUICE | INFO | (bin/sluice-dump/src/main.rs:42) | kind:series | Sent payloads.
/// ```
struct AgentLikeFormatter;

impl<S, N> FormatEvent<S, N> for AgentLikeFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, _ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        let metadata = event.metadata();

        write!(
            writer,
            "{} | {} | {} | ",
            get_delayed_format_now(),
            APP_NAME,
            metadata.level()
        )?;

        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            write!(writer, "({}:{})", file, line)?;
        } else {
            write!(writer, "(unknown:0)")?;
        }

        let mut v = AgentLikeFieldVisitor::new(writer.by_ref());
        event.record(&mut v);
        v.finish()?;

        writeln!(writer)
    }
}

/// Field visitor that writes structured fields as `| key:value,key2:value2` followed by `| message`.
///
/// The first write error is kept and returned from `finish`; every write after it is skipped.
struct AgentLikeFieldVisitor<'writer> {
    writer: Writer<'writer>,
    fields_written: usize,
    message: String,
    last_result: fmt::Result,
}

impl<'writer> AgentLikeFieldVisitor<'writer> {
    fn new(writer: Writer<'writer>) -> Self {
        Self {
            writer,
            fields_written: 0,
            message: String::new(),
            last_result: Ok(()),
        }
    }

    fn try_write(&mut self, field: &field::Field, f: impl FnOnce(&mut dyn fmt::Write) -> fmt::Result) {
        if self.last_result.is_err() {
            return;
        }

        // The message always comes last, so hold onto it until `finish`.
        if field.name() == "message" {
            self.last_result = f(&mut self.message);
            return;
        }

        let prefix = if self.fields_written == 0 { " | " } else { "," };
        self.last_result = write!(self.writer, "{}{}:", prefix, field.name());
        if self.last_result.is_err() {
            return;
        }

        self.last_result = f(&mut self.writer);
        if self.last_result.is_ok() {
            self.fields_written += 1;
        }
    }
}

impl field::Visit for AgentLikeFieldVisitor<'_> {
    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        self.try_write(field, |w| write!(w, "{:?}", value));
    }

    fn record_str(&mut self, field: &field::Field, value: &str) {
        self.try_write(field, |w| write!(w, "{}", value));
    }
}

impl VisitOutput<fmt::Result> for AgentLikeFieldVisitor<'_> {
    fn finish(mut self) -> fmt::Result {
        self.last_result?;

        if self.message.is_empty() {
            Ok(())
        } else {
            write!(self.writer, " | {}", self.message)
        }
    }
}

/// Gets a delayed formatter for the current time, in the system time zone.
///
/// Falls back to UTC if the system time zone can't be determined.
fn get_delayed_format_now() -> DelayedFormat<StrftimeItems<'static>> {
    static SYSTEM_TZ: OnceLock<Tz> = OnceLock::new();
    let system_tz = SYSTEM_TZ.get_or_init(|| {
        iana_time_zone::get_timezone()
            .map_err(|_| ())
            .and_then(|raw_tz| Tz::from_str(&raw_tz).map_err(|_| ()))
            .unwrap_or(Tz::UTC)
    });

    Utc::now().with_timezone(system_tz).format("%Y-%m-%d %H:%M:%S %Z")
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use tracing::{info, warn};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            let buf = self.0.lock().unwrap();
            String::from_utf8(buf.clone())
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<String> {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(AgentLikeFormatter)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        buffer.lines()
    }

    // Drops the timestamp, which is the only part of the line that varies between runs.
    fn sections(line: &str) -> Vec<String> {
        line.split(" | ").skip(1).map(str::to_owned).collect()
    }

    #[test]
    fn fields_come_before_message() {
        let lines = capture(|| info!(kind = "series", chunks = 2, "Sent payloads."));

        assert_eq!(lines.len(), 1);
        let sections = sections(&lines[0]);
        assert_eq!(sections[0], "SLUICE");
        assert_eq!(sections[1], "INFO");
        assert!(sections[2].contains("logging.rs:"));
        assert_eq!(sections[3], "kind:series,chunks:2");
        assert_eq!(sections[4], "Sent payloads.");
    }

    #[test]
    fn message_only() {
        let lines = capture(|| warn!("Nothing to send."));

        let sections = sections(&lines[0]);
        assert_eq!(sections[1], "WARN");
        assert_eq!(sections.len(), 4);
        assert_eq!(sections[3], "Nothing to send.");
    }
}
