//! Per-request access logging in common log format.
//!
//! One line per request:
//!
//! ```text
//! 127.0.0.1 - - [Sun, 08 Apr 2018 06:50:15 +0000] "GET /health HTTP/1.1" 501 40 1.0019ms curl
//! ```

use std::fmt;
use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, FixedOffset, Local};
use hyper::body::Body as _;

/// Timestamp layout inside the brackets (RFC 1123 with numeric zone).
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Everything needed to render one access line.
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub client: Option<IpAddr>,
    pub timestamp: DateTime<FixedOffset>,
    pub method: Method,
    pub path: String,
    pub version: Version,
    pub status: u16,
    pub bytes: u64,
    pub duration: Duration,
    pub user_agent: Option<String>,
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.client {
            Some(ip) => write!(f, "{ip}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " - - [{}] \"{} {} {:?}\" {} {} {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.method,
            self.path,
            self.version,
            self.status,
            self.bytes,
            format_duration(self.duration),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }
}

/// Render a duration using the shortest fitting unit, trimming trailing
/// zeros: `850ns`, `12.5µs`, `1.0019ms`, `2.5s`, `1m30s`, `1h0m0s`.
pub fn format_duration(duration: Duration) -> String {
    const MICRO: u128 = 1_000;
    const MILLI: u128 = 1_000_000;
    const SECOND: u128 = 1_000_000_000;

    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < MICRO {
        return format!("{nanos}ns");
    }
    if nanos < MILLI {
        return format!("{}µs", decimal(nanos, MICRO));
    }
    if nanos < SECOND {
        return format!("{}ms", decimal(nanos, MILLI));
    }

    let secs = nanos / SECOND;
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&decimal(nanos % (60 * SECOND), SECOND));
    out.push('s');
    out
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Destination for access lines. Cloning shares the same sink.
#[derive(Clone)]
pub struct AccessLog {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl AccessLog {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Write one line for the record.
    pub fn write(&self, record: &AccessRecord) {
        let Ok(mut sink) = self.sink.lock() else {
            tracing::warn!("Access log sink poisoned, dropping line");
            return;
        };
        if let Err(e) = writeln!(sink, "{record}").and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write access log line");
        }
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLog").finish_non_exhaustive()
    }
}

/// Axum middleware recording one access line per request.
///
/// Install with `axum::middleware::from_fn_with_state(log, access_log::record)`.
pub async fn record(State(log): State<AccessLog>, request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let method = request.method().clone();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let version = request.version();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;

    log.write(&AccessRecord {
        client,
        timestamp: Local::now().fixed_offset(),
        method,
        path,
        version,
        status: response.status().as_u16(),
        bytes: response_size(&response),
        duration: started.elapsed(),
        user_agent,
    });

    response
}

fn response_size(response: &Response) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn renders_common_log_line() {
        let timestamp = DateTime::parse_from_rfc2822("Sun, 08 Apr 2018 06:50:15 +0000").unwrap();
        let record = AccessRecord {
            client: Some("127.0.0.1".parse().unwrap()),
            timestamp,
            method: Method::GET,
            path: "/health".into(),
            version: Version::HTTP_11,
            status: 501,
            bytes: 40,
            duration: Duration::from_nanos(1_001_900),
            user_agent: Some("curl".into()),
        };

        assert_eq!(
            record.to_string(),
            "127.0.0.1 - - [Sun, 08 Apr 2018 06:50:15 +0000] \"GET /health HTTP/1.1\" \
             501 40 1.0019ms curl"
        );
    }

    #[test]
    fn missing_client_and_agent_render_dash() {
        let record = AccessRecord {
            client: None,
            timestamp: DateTime::parse_from_rfc2822("Mon, 09 Apr 2018 10:00:00 +0200").unwrap(),
            method: Method::POST,
            path: "/v1/nodes?x=1".into(),
            version: Version::HTTP_2,
            status: 200,
            bytes: 0,
            duration: Duration::from_millis(2500),
            user_agent: None,
        };

        assert_eq!(
            record.to_string(),
            "- - - [Mon, 09 Apr 2018 10:00:00 +0200] \"POST /v1/nodes?x=1 HTTP/2.0\" 200 0 2.5s -"
        );
    }

    #[test]
    fn duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(850)), "850ns");
        assert_eq!(format_duration(Duration::from_nanos(12_500)), "12.5µs");
        assert_eq!(format_duration(Duration::from_millis(3)), "3ms");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
    }

    #[tokio::test]
    async fn middleware_writes_one_line_per_request() {
        let buffer = Buffer::default();
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                AccessLog::new(buffer.clone()),
                record,
            ));

        let request = Request::builder()
            .uri("/health")
            .header(header::USER_AGENT, "curl")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), 200);

        let line = buffer.contents();
        assert_eq!(line.lines().count(), 1);
        assert!(line.starts_with("- - - ["));
        assert!(line.contains("\"GET /health HTTP/1.1\" 200 2 "));
        assert!(line.trim_end().ends_with(" curl"));
    }
}
