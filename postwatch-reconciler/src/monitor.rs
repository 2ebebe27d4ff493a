//! Monitoring backend client.
//!
//! Emits events (notifications) and gauge metrics over the backend's HTTP
//! ingestion API. Emission is strictly fire-and-forget: a failed or slow
//! backend must never affect a reconciliation, so every error path here ends
//! in a log line and nothing else. An unconfigured backend disables the
//! client entirely.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

/// Notification severity, carried as the event's alert type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    title: &'a str,
    text: &'a str,
    alert_type: &'static str,
    date_happened: i64,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: [SeriesEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct SeriesEntry<'a> {
    metric: &'a str,
    points: [(i64, f64); 1],
    #[serde(rename = "type")]
    kind: &'static str,
    tags: &'a [String],
}

#[derive(Debug, Clone)]
struct MonitorBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Client for the monitoring backend's event and metric endpoints.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    backend: Option<MonitorBackend>,
    tags: Vec<String>,
}

impl MonitorClient {
    /// Create a client. When `base_url` is unset the client is disabled and
    /// every emit call is a no-op.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let backend = match base_url {
            Some(base_url) => Some(MonitorBackend {
                http: reqwest::Client::builder()
                    .timeout(timeout)
                    .user_agent(concat!("postwatch/", env!("CARGO_PKG_VERSION")))
                    .build()?,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key,
            }),
            None => {
                tracing::info!("monitoring backend not configured, notifications disabled");
                None
            }
        };

        Ok(Self {
            backend,
            tags: vec!["service:postwatch".to_string()],
        })
    }

    /// A permanently disabled client.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: None,
            tags: Vec::new(),
        }
    }

    /// Whether a backend is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Post a notification event. Failures are logged and swallowed.
    pub async fn emit_event(&self, severity: Severity, title: &str, text: &str) {
        let Some(backend) = &self.backend else { return };

        let payload = EventPayload {
            title,
            text,
            alert_type: severity.as_str(),
            date_happened: Utc::now().timestamp(),
            tags: &self.tags,
        };

        backend.post("/api/v1/events", &payload).await;
        tracing::debug!(severity = severity.as_str(), title, "notification emitted");
    }

    /// Post one gauge data point. Failures are logged and swallowed.
    pub async fn emit_gauge(&self, metric: &str, value: f64) {
        let Some(backend) = &self.backend else { return };

        let payload = SeriesPayload {
            series: [SeriesEntry {
                metric,
                points: [(Utc::now().timestamp(), value)],
                kind: "gauge",
                tags: &self.tags,
            }],
        };

        backend.post("/api/v1/series", &payload).await;
        tracing::debug!(metric, value, "gauge emitted");
    }
}

impl MonitorBackend {
    async fn post<T: Serialize + Sync>(&self, endpoint: &str, payload: &T) {
        let url = format!("{}{endpoint}", self.base_url);

        let mut request = self.http.post(&url).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-Api-Key", api_key.as_str());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(%url, status = %response.status(), "monitoring backend rejected payload");
            }
            Err(error) => {
                tracing::warn!(%url, %error, "could not reach monitoring backend");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_strings() {
        assert_eq!(Severity::Info.as_str(), "info");
        assert_eq!(Severity::Success.as_str(), "success");
        assert_eq!(Severity::Warning.as_str(), "warning");
        assert_eq!(Severity::Error.as_str(), "error");
    }

    #[tokio::test]
    async fn test_disabled_client_is_a_no_op() {
        let client = MonitorClient::disabled();
        assert!(!client.is_enabled());
        // Must return without attempting any I/O.
        client.emit_event(Severity::Info, "title", "text").await;
        client.emit_gauge("postwatch.test", 1.0).await;
    }

    #[test]
    fn test_trailing_slash_is_normalised() {
        let client = MonitorClient::new(
            Some("https://monitor.example.com/".to_string()),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(client.is_enabled());
        let backend = client.backend.unwrap();
        assert_eq!(backend.base_url, "https://monitor.example.com");
    }
}
