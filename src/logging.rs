//! Structured logging for the ingest pipeline.
//!
//! One JSON object per line on stdout. Each line carries a run id and a
//! monotonic sequence number so a file's deliveries can be traced in order
//! even when log shipping reorders lines.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::process;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::OnceLock;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    /// `LOG_LEVEL` wins; `DEBUG=true` is honoured for older deployments.
    pub fn from_env() -> Self {
        let level = std::env::var("LOG_LEVEL").ok();
        let debug = std::env::var("DEBUG").ok();
        Self::from_vars(level.as_deref(), debug.as_deref())
    }

    pub fn from_vars(level: Option<&str>, debug: Option<&str>) -> Self {
        match level {
            Some("trace") => Level::Trace,
            Some("debug") => Level::Debug,
            Some("info") => Level::Info,
            Some("warn") => Level::Warn,
            Some("error") => Level::Error,
            _ if debug == Some("true") => Level::Debug,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            _ => Level::Error,
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Scoresheet, // File discovery, parsing, flattening
    Cache,      // Entity cache hits, sweeps
    Entity,     // Entity store get/create calls
    Translate,  // Delivery translation
    Publish,    // Event store posts
    System,     // Startup, config, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Scoresheet => "scoresheet",
            Domain::Cache => "cache",
            Domain::Entity => "entity",
            Domain::Translate => "translate",
            Domain::Publish => "publish",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static RUN_ID: OnceLock<String> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

fn run_id() -> &'static str {
    RUN_ID.get_or_init(|| {
        std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()))
    })
}

/// Set the minimum level for the rest of the process.
pub fn init(level: Level) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
    log(
        Level::Info,
        Domain::System,
        "log_level",
        obj(&[("level", v_str(level.as_str()))]),
    );
}

pub fn min_level() -> Level {
    Level::from_u8(MIN_LEVEL.load(Ordering::SeqCst))
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < min_level() || !domain.is_enabled() {
        return;
    }
    println!("{}", render(level, domain, event, fields));
}

fn render(level: Level, domain: Domain, event: &str, mut fields: Map<String, Value>) -> String {
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

/// Log a failed delivery with its scoresheet coordinates.
pub fn log_delivery_failure(
    stage: &str,
    file: &str,
    innings: u32,
    over: u32,
    ball: u32,
    err: &crate::error::IngestError,
) {
    log(
        Level::Error,
        Domain::Translate,
        "delivery_failed",
        obj(&[
            ("stage", v_str(stage)),
            ("file", v_str(file)),
            ("innings", json!(innings)),
            ("over", json!(over)),
            ("ball", json!(ball)),
            ("error_kind", v_str(err.kind())),
            ("error", v_str(&err.to_string())),
        ]),
    );
}

/// Summary line emitted after each scoresheet.
pub fn log_file_summary(
    file: &str,
    total: usize,
    published: usize,
    translate_failures: usize,
    publish_failures: usize,
) {
    log(
        Level::Info,
        Domain::Scoresheet,
        "file_processed",
        obj(&[
            ("file", v_str(file)),
            ("total", json!(total)),
            ("published", json!(published)),
            ("translate_failures", json!(translate_failures)),
            ("publish_failures", json!(publish_failures)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

pub fn v_int(n: u64) -> Value {
    json!(n)
}

// =============================================================================
// Tests
// =============================================================================
