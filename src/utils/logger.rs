use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging.level '{0}'; valid values: trace, debug, info, warn, error")]
    InvalidLevel(String),
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

#[derive(Default)]
struct JsonFieldVisitor {
    fields: Map<String, Value>,
}

impl JsonFieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFieldVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::from(format!("{:?}", value)));
    }
}

/// Writes one OTel log-data-model JSON object per event.
#[derive(Clone)]
struct OtelJsonEventFormatter {
    resource: Map<String, Value>,
}

impl OtelJsonEventFormatter {
    fn new(config: &LoggingConfig) -> Self {
        let mut resource = Map::new();
        resource.insert(
            "service.name".to_string(),
            Value::from(config.service_name.clone()),
        );
        resource.insert(
            "service.version".to_string(),
            Value::from(config.service_version.clone()),
        );
        Self { resource }
    }

    /// Moves the `event_name`/`event_domain` fields to their OTel keys.
    fn promote_event_fields(attributes: &mut Map<String, Value>) {
        for (field, key) in [("event_name", "event.name"), ("event_domain", "event.domain")] {
            if let Some(value) = attributes.remove(field) {
                attributes.insert(key.to_string(), value);
            }
        }
    }

    fn severity_number(level: &Level) -> u64 {
        match *level {
            Level::TRACE => 1,
            Level::DEBUG => 5,
            Level::INFO => 9,
            Level::WARN => 13,
            Level::ERROR => 17,
        }
    }
}

impl<S, N> FormatEvent<S, N> for OtelJsonEventFormatter
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        let mut attributes = visitor.fields;
        Self::promote_event_fields(&mut attributes);
        if let Some(file) = metadata.file() {
            attributes.insert("code.filepath".to_string(), Value::from(file));
        }
        if let Some(line) = metadata.line() {
            attributes.insert("code.lineno".to_string(), Value::from(line));
        }
        attributes.insert("code.target".to_string(), Value::from(metadata.target()));
        if let Some(span) = ctx.lookup_current() {
            attributes.insert("span.name".to_string(), Value::from(span.name()));
        }

        let body = attributes
            .remove("message")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| metadata.name().to_string());

        let mut root = Map::new();
        root.insert(
            "timestamp".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        root.insert(
            "severity_text".to_string(),
            Value::from(metadata.level().as_str()),
        );
        root.insert(
            "severity_number".to_string(),
            Value::from(Self::severity_number(metadata.level())),
        );
        root.insert("body".to_string(), Value::from(body));
        root.insert("resource".to_string(), Value::Object(self.resource.clone()));
        root.insert("attributes".to_string(), Value::Object(attributes));

        let serialized = serde_json::to_string(&Value::Object(root)).map_err(|_| std::fmt::Error)?;
        writer.write_str(&serialized)?;
        writer.write_char('\n')
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    LevelFilter::from_str(level.trim())
        .ok()
        .filter(|filter| *filter != LevelFilter::OFF)
        .ok_or_else(|| LoggingError::InvalidLevel(level.to_string()))
}

/// Installs the global subscriber described by `logging_config`.
///
/// `RUST_LOG` directives are layered on top of the configured level.
pub fn init_logging(logging_config: &LoggingConfig) -> Result<(), LoggingError> {
    let level_filter = parse_level(&logging_config.level)?;
    let filter_layer = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let installed = match logging_config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().event_format(OtelJsonEventFormatter::new(logging_config)))
            .try_init(),
        LogFormat::Console => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().pretty())
            .try_init(),
    };

    installed.map_err(|_| LoggingError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels_case_insensitively() {
        assert_eq!(parse_level("INFO").unwrap(), LevelFilter::INFO);
        assert_eq!(parse_level(" debug ").unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn event_fields_use_otel_keys() {
        let mut attributes = Map::new();
        attributes.insert("event_name".to_string(), Value::from("auth.signin.failed"));
        attributes.insert("event_domain".to_string(), Value::from("auth"));
        attributes.insert("client".to_string(), Value::from("10.0.0.1"));

        OtelJsonEventFormatter::promote_event_fields(&mut attributes);

        assert_eq!(attributes["event.name"], "auth.signin.failed");
        assert_eq!(attributes["event.domain"], "auth");
        assert_eq!(attributes["client"], "10.0.0.1");
        assert!(!attributes.contains_key("event_name"));
        assert!(!attributes.contains_key("event_domain"));
    }

    #[test]
    fn rejects_unknown_and_off_levels() {
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::InvalidLevel(_))
        ));
        assert!(parse_level("off").is_err());
    }
}
