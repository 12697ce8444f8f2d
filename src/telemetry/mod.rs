//! Usage telemetry — process-wide reporter with graceful degradation.
//!
//! Initialization is lazy and idempotent: the first call with a usable
//! connection string wins, later calls get the same instance and their
//! settings are ignored. A missing or malformed connection string disables
//! reporting entirely; nothing here ever surfaces an error to a caller.
//!
//! Events are `{ name, properties }` records, each stamped with a fixed
//! role tag, posted fire-and-forget to the ingestion endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Tag stamped on every emitted record.
const ROLE_TAG_KEY: &str = "ai.cloud.role";

/// Role name used when the configuration leaves it blank.
pub const DEFAULT_ROLE_NAME: &str = "sidechat";

/// Settings handed to [`initialize_once`].
#[derive(Debug, Clone, Default)]
pub struct TelemetrySettings {
    /// `key=value` pairs separated by `;`. `IngestionEndpoint` is required,
    /// `InstrumentationKey` is carried through when present. Empty or absent
    /// means telemetry stays off.
    pub connection_string: Option<String>,
    pub role_name: String,
}

/// One telemetry record on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub name: String,
    pub properties: HashMap<String, Value>,
    pub tags: HashMap<String, String>,
    #[serde(rename = "iKey", skip_serializing_if = "Option::is_none")]
    pub instrumentation_key: Option<String>,
}

/// Delivers event records to the ingestion endpoint.
#[derive(Debug)]
pub struct Reporter {
    http: reqwest::Client,
    endpoint: String,
    instrumentation_key: Option<String>,
    role_name: String,
}

impl Reporter {
    fn build(connection_string: &str, role_name: &str) -> Result<Self, String> {
        let (endpoint, instrumentation_key) = parse_connection_string(connection_string)?;
        let role_name = if role_name.trim().is_empty() {
            DEFAULT_ROLE_NAME.to_string()
        } else {
            role_name.trim().to_string()
        };
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            instrumentation_key,
            role_name,
        })
    }

    /// Queue one record for delivery. Fire-and-forget: a failed POST is
    /// logged at debug and dropped.
    pub fn track(&self, name: &str, properties: HashMap<String, Value>) {
        let record = self.decorate(EventRecord {
            name: name.to_string(),
            properties,
            tags: HashMap::new(),
            instrumentation_key: None,
        });

        // Without a runtime there is nowhere to send from; drop the record
        // rather than surface anything.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(name, "telemetry event dropped: no async runtime");
            return;
        };

        let http = self.http.clone();
        let url = format!("{}/v2/track", self.endpoint);
        handle.spawn(async move {
            if let Err(error) = http.post(&url).json(&record).send().await {
                debug!(%error, "telemetry event dropped");
            }
        });
    }

    /// Stamp the fixed decorations onto an outgoing record.
    fn decorate(&self, mut record: EventRecord) -> EventRecord {
        record
            .tags
            .insert(ROLE_TAG_KEY.to_string(), self.role_name.clone());
        record.instrumentation_key = self.instrumentation_key.clone();
        record
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn parse_connection_string(raw: &str) -> Result<(String, Option<String>), String> {
    let mut endpoint = None;
    let mut instrumentation_key = None;

    for pair in raw.split(';') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.eq_ignore_ascii_case("IngestionEndpoint") {
            endpoint = Some(value.trim_end_matches('/').to_string());
        } else if key.eq_ignore_ascii_case("InstrumentationKey") {
            instrumentation_key = Some(value.to_string());
        }
    }

    let endpoint = endpoint
        .filter(|e| !e.is_empty())
        .ok_or_else(|| format!("connection string has no IngestionEndpoint: {raw:?}"))?;
    Ok((endpoint, instrumentation_key))
}

static REPORTER: OnceLock<Mutex<Option<Arc<Reporter>>>> = OnceLock::new();

fn slot() -> MutexGuard<'static, Option<Arc<Reporter>>> {
    REPORTER
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Create the process-wide reporter, once.
///
/// - An existing instance is returned unconditionally; `settings` is ignored.
/// - An empty or absent connection string returns `None` and retains nothing,
///   so a later call with a usable string still succeeds.
/// - A construction failure is swallowed (debug log only) and leaves the slot
///   empty for the same reason.
///
/// Check-and-create runs under one lock, so two racing callers cannot both
/// construct a reporter.
pub fn initialize_once(settings: &TelemetrySettings) -> Option<Arc<Reporter>> {
    let mut slot = slot();
    if let Some(existing) = slot.as_ref() {
        return Some(Arc::clone(existing));
    }

    let connection = settings
        .connection_string
        .as_deref()
        .map(str::trim)
        .unwrap_or("");
    if connection.is_empty() {
        return None;
    }

    match Reporter::build(connection, &settings.role_name) {
        Ok(reporter) => {
            let reporter = Arc::new(reporter);
            *slot = Some(Arc::clone(&reporter));
            debug!(endpoint = reporter.endpoint(), "telemetry reporter ready");
            Some(reporter)
        }
        Err(reason) => {
            debug!(%reason, "telemetry disabled: reporter construction failed");
            None
        }
    }
}

/// Emit a named event. No-op until [`initialize_once`] has succeeded.
pub fn report_event(name: &str, properties: HashMap<String, Value>) {
    let reporter = slot().as_ref().map(Arc::clone);
    if let Some(reporter) = reporter {
        reporter.track(name, properties);
    }
}

/// Drop the live reporter. Test isolation only — production code never
/// tears the singleton down.
pub fn reset() {
    slot().take();
}
