//! Logging setup shared by the mathtree binaries.
//!
//! Library crates log through the `log` facade; [`init_logging`] installs a
//! `LogTracer` so those records flow into `tracing`, then builds a subscriber
//! with an env filter, an optional stderr formatter and the hook bridges.
//! Hosts that want records programmatically register a hook with
//! [`set_log_hook`] or [`set_trace_hook`].

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock};
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

pub const LOG_ENV: &str = "MATHTREE_LOG";

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

/// Span begin/end and instant events, timestamped in microseconds.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub name: String,
    pub cat: String,
    /// `B` (begin), `E` (end) or `i` (instant).
    pub ph: String,
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<JsonValue>,
}

type LogHook = Arc<dyn Fn(&LogRecord) + Send + Sync>;
type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

static LOG_HOOK: Lazy<RwLock<Option<LogHook>>> = Lazy::new(|| RwLock::new(None));
static TRACE_HOOK: Lazy<RwLock<Option<TraceHook>>> = Lazy::new(|| RwLock::new(None));

pub struct LoggingGuard {
    _guard: Option<DefaultGuard>,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Filter directive that takes precedence over the environment
    /// (`RUST_LOG`, then `MATHTREE_LOG`).
    pub filter: Option<String>,
    /// Write formatted records to stderr.
    pub stderr: bool,
    /// Forward span begin/end events to the trace hook.
    pub enable_traces: bool,
}

pub fn set_log_hook<F>(hook: F)
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    if let Ok(mut slot) = LOG_HOOK.write() {
        *slot = Some(Arc::new(hook));
    }
}

pub fn set_trace_hook<F>(hook: F)
where
    F: Fn(&TraceEvent) + Send + Sync + 'static,
{
    if let Ok(mut slot) = TRACE_HOOK.write() {
        *slot = Some(Arc::new(hook));
    }
}

pub fn clear_hooks() {
    if let Ok(mut slot) = LOG_HOOK.write() {
        *slot = None;
    }
    if let Ok(mut slot) = TRACE_HOOK.write() {
        *slot = None;
    }
}

fn log_hook() -> Option<LogHook> {
    LOG_HOOK.read().ok().and_then(|slot| slot.clone())
}

fn trace_hook() -> Option<TraceHook> {
    TRACE_HOOK.read().ok().and_then(|slot| slot.clone())
}

fn env_filter(explicit: Option<&str>) -> EnvFilter {
    explicit
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .or_else(|| EnvFilter::try_from_env(LOG_ENV).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the subscriber globally, or for the current thread when a global
/// default already exists. Keep the guard alive for as long as logging is
/// needed.
pub fn init_logging(opts: LoggingOptions) -> LoggingGuard {
    let _ = LogTracer::init();

    let build_subscriber = || {
        let stderr_layer = opts.stderr.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        });
        let trace_layer = opts.enable_traces.then_some(TraceBridgeLayer);
        tracing_subscriber::registry()
            .with(env_filter(opts.filter.as_deref()))
            .with(stderr_layer)
            .with(LogBridgeLayer)
            .with(trace_layer)
    };

    let guard = match tracing::subscriber::set_global_default(build_subscriber()) {
        Ok(()) => None,
        Err(_) => Some(tracing::subscriber::set_default(build_subscriber())),
    };
    LoggingGuard { _guard: guard }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_timestamp_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

struct LogBridgeLayer;

#[derive(Clone, Copy)]
struct TraceBridgeLayer;

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let Some(hook) = log_hook() else {
            return;
        };
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let record = LogRecord {
            ts: now_rfc3339(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: visitor.message.unwrap_or_else(|| meta.name().to_string()),
            span: ctx.event_span(event).map(|span| span.name().to_string()),
            fields: visitor.fields.filter(|obj| {
                obj.as_object().map(|m| !m.is_empty()).unwrap_or(false)
            }),
        };
        hook(&record);
    }
}

impl<S> Layer<S> for TraceBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let Some(hook) = trace_hook() else {
            return;
        };
        let meta = event.metadata();
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        hook(&TraceEvent {
            name: visitor.message.unwrap_or_else(|| meta.name().to_string()),
            cat: meta.target().to_string(),
            ph: "i".to_string(),
            ts: now_timestamp_micros(),
            args: visitor.fields,
        });
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            emit_span_event(span.name(), span.metadata().target(), "B");
        }
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            emit_span_event(span.name(), span.metadata().target(), "E");
        }
    }
}

fn emit_span_event(name: &str, target: &str, phase: &str) {
    let Some(hook) = trace_hook() else {
        return;
    };
    hook(&TraceEvent {
        name: name.to_string(),
        cat: target.to_string(),
        ph: phase.to_string(),
        ts: now_timestamp_micros(),
        args: None,
    });
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: Option<JsonValue>,
}

impl JsonVisitor {
    fn insert(&mut self, name: &str, entry: JsonValue) {
        let obj = self
            .fields
            .get_or_insert_with(|| JsonValue::Object(Default::default()));
        if let JsonValue::Object(map) = obj {
            map.insert(name.to_string(), entry);
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.insert(field.name(), JsonValue::String(text));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field.name(), JsonValue::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field.name(), JsonValue::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let filter = env_filter(Some("mathtree_compile=trace"));
        assert!(filter.to_string().contains("mathtree_compile=trace"));
    }

    #[test]
    fn records_serialize_without_empty_options() {
        let record = LogRecord {
            ts: "2024-01-01T00:00:00.000Z".to_string(),
            level: "INFO".to_string(),
            target: "mathtree".to_string(),
            message: "ready".to_string(),
            span: None,
            fields: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["message"], "ready");
        assert!(json.get("span").is_none());
        assert!(json.get("fields").is_none());
    }
}
