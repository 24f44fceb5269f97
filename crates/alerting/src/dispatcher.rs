//! Alert Dispatcher Implementation

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::payload::AlertPayload;
use crate::throttle::SnapshotThrottle;
use crate::AlertError;

/// Dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Collector endpoint receiving alerts
    pub collector_url: String,
    /// ipinfo-style endpoint for the location label
    pub geolocation_url: String,
    /// Geolocation lookup timeout (milliseconds)
    pub geolocation_timeout_ms: u64,
    /// Alert POST timeout (milliseconds)
    pub request_timeout_ms: u64,
    /// Minimum stream time between attached snapshots (milliseconds)
    pub snapshot_min_interval_ms: u64,
    /// Attach a JPEG of the triggering frame
    pub attach_snapshots: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            collector_url: "http://127.0.0.1:5000/alert".to_string(),
            geolocation_url: "https://ipinfo.io/json".to_string(),
            geolocation_timeout_ms: 4000,
            request_timeout_ms: 5000,
            snapshot_min_interval_ms: 1000,
            attach_snapshots: true,
        }
    }
}

impl DispatchConfig {
    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn snapshot_min_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_min_interval_ms)
    }
}

/// Boxed send future, so transports can sit behind `dyn`
pub type SendFuture = Pin<Box<dyn Future<Output = Result<(), AlertError>> + Send + 'static>>;

/// Delivers alert payloads to the collector
pub trait AlertTransport: Send + Sync {
    fn send(&self, payload: AlertPayload) -> SendFuture;
}

/// JSON POST over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, url))
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl AlertTransport for HttpTransport {
    fn send(&self, payload: AlertPayload) -> SendFuture {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move {
            let response = client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| AlertError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AlertError::Rejected {
                    status: status.as_u16(),
                });
            }
            Ok(())
        })
    }
}

/// Outcome of waiting for in-flight deliveries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
    /// Still in flight at the deadline, aborted
    pub abandoned: usize,
}

/// Builds alert payloads and sends them without blocking the caller
pub struct AlertDispatcher {
    transport: Arc<dyn AlertTransport>,
    location: String,
    throttle: SnapshotThrottle,
    attach_snapshots: bool,
    runtime: Handle,
    pending: JoinSet<Result<(), AlertError>>,
    finished: DrainReport,
}

impl AlertDispatcher {
    /// Create a dispatcher that spawns deliveries on `runtime`
    pub fn new(
        transport: Arc<dyn AlertTransport>,
        location: impl Into<String>,
        config: &DispatchConfig,
        runtime: Handle,
    ) -> Self {
        let location = location.into();
        info!("Alert dispatcher ready (location: {})", location);
        Self {
            transport,
            location,
            throttle: SnapshotThrottle::new(config.snapshot_min_interval()),
            attach_snapshots: config.attach_snapshots,
            runtime,
            pending: JoinSet::new(),
            finished: DrainReport::default(),
        }
    }

    /// Build the payload for `event`, attaching a snapshot of `frame`
    /// when snapshots are enabled, the frame has pixels and the throttle
    /// allows one.
    pub fn build_payload(&mut self, event: &str, frame: Option<&VideoFrame>) -> AlertPayload {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let payload = AlertPayload::new(timestamp, event, self.location.clone());

        let Some(frame) = frame.filter(|f| self.attach_snapshots && f.has_pixels()) else {
            return payload;
        };
        if !self.throttle.ready(frame.timestamp()) {
            debug!("Snapshot skipped, too soon after the previous one");
            return payload;
        }

        match frame.snapshot() {
            Ok(jpeg) => payload.with_image(&jpeg),
            Err(e) => {
                warn!("Snapshot encoding failed: {}", e);
                payload
            }
        }
    }

    /// Send `event` in the background. Delivery is tracked until
    /// [`drain`](Self::drain).
    pub fn dispatch(&mut self, event: &str, frame: Option<&VideoFrame>) {
        self.reap();

        let payload = self.build_payload(event, frame);
        let event = payload.event.clone();
        let delivery = self.transport.send(payload);

        self.pending.spawn_on(
            async move {
                let result = delivery.await;
                match &result {
                    Ok(()) => info!("Alert '{}' delivered", event),
                    Err(e) => warn!("Alert '{}' not delivered: {}", event, e),
                }
                result
            },
            &self.runtime,
        );
    }

    /// Deliveries not yet collected
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Wait up to `timeout` for in-flight deliveries, aborting the rest.
    /// The report also counts deliveries that finished earlier.
    pub async fn drain(&mut self, timeout: Duration) -> DrainReport {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.pending.join_next()).await {
                Ok(Some(result)) => self.record(result),
                Ok(None) => break,
                Err(_) => {
                    self.finished.abandoned += self.pending.len();
                    warn!("Abandoning {} undelivered alerts", self.pending.len());
                    self.pending.abort_all();
                    break;
                }
            }
        }
        std::mem::take(&mut self.finished)
    }

    fn reap(&mut self) {
        while let Some(result) = self.pending.try_join_next() {
            self.record(result);
        }
    }

    fn record(&mut self, result: Result<Result<(), AlertError>, tokio::task::JoinError>) {
        match result {
            Ok(Ok(())) => self.finished.delivered += 1,
            Ok(Err(_)) => self.finished.failed += 1,
            Err(e) => {
                warn!("Alert delivery task failed: {}", e);
                self.finished.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<AlertPayload>>,
    }

    impl AlertTransport for RecordingTransport {
        fn send(&self, payload: AlertPayload) -> SendFuture {
            self.sent.lock().unwrap().push(payload);
            Box::pin(async { Ok(()) })
        }
    }

    /// Waits before succeeding
    struct SlowTransport {
        delay: Duration,
        delivered: Arc<Mutex<usize>>,
    }

    impl AlertTransport for SlowTransport {
        fn send(&self, _payload: AlertPayload) -> SendFuture {
            let delay = self.delay;
            let delivered = self.delivered.clone();
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                *delivered.lock().unwrap() += 1;
                Ok(())
            })
        }
    }

    fn frame_at(ms: u64) -> VideoFrame {
        VideoFrame::new(vec![0; 8 * 8 * 3], 8, 8, ms * 1_000_000, 0)
    }

    #[tokio::test]
    async fn test_dispatch_attaches_throttled_snapshot() {
        let transport = Arc::new(RecordingTransport::default());
        let mut dispatcher = AlertDispatcher::new(
            transport.clone(),
            "Lyon, FR",
            &DispatchConfig::default(),
            Handle::current(),
        );

        dispatcher.dispatch("drowsy", Some(&frame_at(0)));
        dispatcher.dispatch("drowsy", Some(&frame_at(400)));
        dispatcher.dispatch("drowsy", Some(&frame_at(1200)));

        let report = dispatcher.drain(Duration::from_secs(1)).await;
        assert_eq!(report.delivered, 3);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|p| p.event == "drowsy" && p.location == "Lyon, FR"));
        assert!(sent[0].image.is_some());
        assert!(sent[1].image.is_none());
        assert!(sent[2].image.is_some());
    }

    #[tokio::test]
    async fn test_snapshots_disabled() {
        let transport = Arc::new(RecordingTransport::default());
        let config = DispatchConfig {
            attach_snapshots: false,
            ..Default::default()
        };
        let mut dispatcher =
            AlertDispatcher::new(transport.clone(), "X", &config, Handle::current());

        let payload = dispatcher.build_payload("drowsy", Some(&frame_at(0)));
        assert!(payload.image.is_none());
    }

    #[tokio::test]
    async fn test_frame_without_pixels_sends_without_image() {
        let transport = Arc::new(RecordingTransport::default());
        let mut dispatcher = AlertDispatcher::new(
            transport.clone(),
            "X",
            &DispatchConfig::default(),
            Handle::current(),
        );

        let frame = VideoFrame::without_pixels(640, 480, 0, 0);
        let payload = dispatcher.build_payload("drowsy", Some(&frame));
        assert!(payload.image.is_none());

        // The throttle is untouched, so the next real frame still gets one.
        let payload = dispatcher.build_payload("drowsy", Some(&frame_at(10)));
        assert!(payload.image.is_some());
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_delivery() {
        let delivered = Arc::new(Mutex::new(0));
        let transport = Arc::new(SlowTransport {
            delay: Duration::from_millis(50),
            delivered: delivered.clone(),
        });
        let mut dispatcher =
            AlertDispatcher::new(transport, "X", &DispatchConfig::default(), Handle::current());

        dispatcher.dispatch("drowsy", None);
        assert_eq!(dispatcher.in_flight(), 1);

        let report = dispatcher.drain(Duration::from_secs(2)).await;
        assert_eq!(
            report,
            DrainReport {
                delivered: 1,
                failed: 0,
                abandoned: 0
            }
        );
        assert_eq!(*delivered.lock().unwrap(), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_abandons_after_timeout() {
        let delivered = Arc::new(Mutex::new(0));
        let transport = Arc::new(SlowTransport {
            delay: Duration::from_secs(30),
            delivered: delivered.clone(),
        });
        let mut dispatcher =
            AlertDispatcher::new(transport, "X", &DispatchConfig::default(), Handle::current());

        dispatcher.dispatch("drowsy", None);
        let report = dispatcher.drain(Duration::from_millis(50)).await;

        assert_eq!(report.abandoned, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(*delivered.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_counted() {
        let app = Router::new().route(
            "/alert",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = serve(app).await;
        let transport =
            HttpTransport::new(format!("{}/alert", base), Duration::from_secs(2)).unwrap();
        let mut dispatcher = AlertDispatcher::new(
            Arc::new(transport),
            "X",
            &DispatchConfig::default(),
            Handle::current(),
        );

        dispatcher.dispatch("drowsy", None);
        let report = dispatcher.drain(Duration::from_secs(2)).await;
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_bad_frame_sends_without_image() {
        let transport = Arc::new(RecordingTransport::default());
        let mut dispatcher = AlertDispatcher::new(
            transport.clone(),
            "X",
            &DispatchConfig::default(),
            Handle::current(),
        );

        let broken = VideoFrame::new(vec![0; 3], 8, 8, 0, 0);
        let payload = dispatcher.build_payload("drowsy", Some(&broken));
        assert!(payload.image.is_none());
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_transport_posts_json() {
        let received = Arc::new(Mutex::new(Vec::<AlertPayload>::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/alert",
            post(move |Json(payload): Json<AlertPayload>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(payload);
                    Json(serde_json::json!({"status": "ok"}))
                }
            }),
        );
        let base = serve(app).await;

        let transport =
            HttpTransport::new(format!("{}/alert", base), Duration::from_secs(2)).unwrap();
        transport
            .send(AlertPayload::new("T1", "drowsy", "X"))
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].timestamp, "T1");
    }

    #[tokio::test]
    async fn test_http_transport_reports_rejection() {
        let app = Router::new().route("/alert", post(|| async { StatusCode::BAD_REQUEST }));
        let base = serve(app).await;

        let transport =
            HttpTransport::new(format!("{}/alert", base), Duration::from_secs(2)).unwrap();
        let result = transport.send(AlertPayload::new("T1", "drowsy", "X")).await;
        assert!(matches!(result, Err(AlertError::Rejected { status: 400 })));
    }
}
