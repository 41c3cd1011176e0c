use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use beacon_types::{
    DeliveryError, DeliveryOutcome, DeliveryReport, DeliveryState, PARSE_FAILURE_MARKER, Permission,
    RequestParameters,
};
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, CONTENT_TYPE};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::codec::{PayloadFormat, encode_body};
use crate::config::AgentConfig;
use crate::platform::{GrantAll, PermissionProbe, check_permissions};

pub const CLIENT_SDK_HEADER: &str = "Client-SDK";

/// Shared task state for polling from another thread.
pub struct DeliveryProgress {
    state: AtomicU8,
}

impl DeliveryProgress {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(DeliveryState::Created as u8),
        }
    }

    pub fn state(&self) -> DeliveryState {
        DeliveryState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: DeliveryState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Default for DeliveryProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives the report of a finished task.
pub trait CompletionSink: Send + Sync {
    fn complete(&self, report: DeliveryReport);
}

impl<F> CompletionSink for F
where
    F: Fn(DeliveryReport) + Send + Sync,
{
    fn complete(&self, report: DeliveryReport) {
        self(report)
    }
}

/// Forwards reports to a channel so they are handled on the receiver's side.
pub struct ChannelSink(pub mpsc::UnboundedSender<DeliveryReport>);

impl CompletionSink for ChannelSink {
    fn complete(&self, report: DeliveryReport) {
        if self.0.send(report).is_err() {
            debug!("Completion receiver dropped; report discarded");
        }
    }
}

/// One outbound request to the collector.
///
/// Built in the `Created` state, consumed by [`DeliveryTask::execute`] or
/// [`DeliveryTask::dispatch`], so a task can only ever run once.
pub struct DeliveryTask {
    config: Arc<AgentConfig>,
    path: String,
    success_message: String,
    failure_message: String,
    user_agent: String,
    format: PayloadFormat,
    permissions: Arc<dyn PermissionProbe>,
    progress: Arc<DeliveryProgress>,
}

impl DeliveryTask {
    pub fn new(config: Arc<AgentConfig>, path: impl Into<String>) -> Self {
        Self {
            config,
            path: path.into(),
            success_message: String::new(),
            failure_message: String::new(),
            user_agent: String::new(),
            format: PayloadFormat::default(),
            permissions: Arc::new(GrantAll),
            progress: Arc::new(DeliveryProgress::new()),
        }
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = message.into();
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    /// Fingerprint sent as the `User-Agent` header.
    pub fn user_agent(mut self, fingerprint: impl Into<String>) -> Self {
        self.user_agent = fingerprint.into();
        self
    }

    pub fn payload_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn permissions(mut self, probe: Arc<dyn PermissionProbe>) -> Self {
        self.permissions = probe;
        self
    }

    pub fn progress(&self) -> Arc<DeliveryProgress> {
        self.progress.clone()
    }

    /// Run the request to completion on the current task.
    ///
    /// Never fails: every error ends up in the report's outcome and message.
    pub async fn execute(self, params: RequestParameters) -> DeliveryReport {
        self.progress.set(DeliveryState::Running);

        let outcome = match self.send(&params).await {
            Ok(()) => DeliveryOutcome::Success,
            Err(e) => DeliveryOutcome::Failure(e),
        };

        self.progress.set(if outcome.is_success() {
            DeliveryState::Succeeded
        } else {
            DeliveryState::Failed
        });

        let message = outcome.message(&self.success_message, &self.failure_message);
        debug!("response: {}", message);

        DeliveryReport {
            path: self.path,
            outcome,
            message,
        }
    }

    /// Spawn the task on `runtime` and hand its report to `sink` when done.
    pub fn dispatch(
        self,
        runtime: &Handle,
        params: RequestParameters,
        sink: Arc<dyn CompletionSink>,
    ) -> DeliveryHandle {
        let progress = self.progress.clone();
        progress.set(DeliveryState::Running);

        let join = runtime.spawn(async move {
            let report = self.execute(params).await;
            sink.complete(report.clone());
            report
        });

        DeliveryHandle { progress, join }
    }

    async fn send(&self, params: &RequestParameters) -> Result<(), DeliveryError> {
        if !check_permissions(self.permissions.as_ref()) {
            return Err(DeliveryError::Permission(Permission::Internet));
        }

        let body = encode_body(params, self.format, self.config.form_charset)?;

        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DeliveryError::Encoding(format!("invalid client signature: {}", e)))?;

        let url = self.config.url_for(&self.path);
        let resp = client
            .post(&url)
            .header(ACCEPT_LANGUAGE, self.config.accept_language.as_str())
            .header(CLIENT_SDK_HEADER, self.config.client_sdk.as_str())
            .header(CONTENT_TYPE, body.content_type)
            .body(body.body)
            .send()
            .await
            .map_err(|e| classify(&self.path, e))?;

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(path = %self.path, "Failed reading response body: {}", e);
                PARSE_FAILURE_MARKER.to_string()
            }
        };

        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Server {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

fn classify(path: &str, e: reqwest::Error) -> DeliveryError {
    if e.is_connect() {
        warn!(
            path = %path,
            "This SDK requires the INTERNET permission. You might need to adjust your manifest. See the README for details."
        );
        DeliveryError::Connectivity(e.to_string())
    } else if e.is_builder() {
        DeliveryError::Encoding(e.to_string())
    } else {
        warn!(path = %path, "Request failed: {}", e);
        DeliveryError::Transport(e.to_string())
    }
}

/// Handle to a dispatched task.
pub struct DeliveryHandle {
    progress: Arc<DeliveryProgress>,
    join: JoinHandle<DeliveryReport>,
}

impl DeliveryHandle {
    pub fn state(&self) -> DeliveryState {
        self.progress.state()
    }

    pub fn progress(&self) -> Arc<DeliveryProgress> {
        self.progress.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the report. `None` only if the runtime dropped the task.
    pub async fn finished(self) -> Option<DeliveryReport> {
        match self.join.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Delivery task did not complete: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyAll;

    impl PermissionProbe for DenyAll {
        fn is_granted(&self, _permission: Permission) -> bool {
            false
        }
    }

    fn unroutable_config() -> Arc<AgentConfig> {
        Arc::new(AgentConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..AgentConfig::default()
        })
    }

    #[tokio::test]
    async fn missing_internet_permission_fails_before_sending() {
        let task = DeliveryTask::new(unroutable_config(), "/startup")
            .success_message("Tracked session start")
            .failure_message("Failed to track session start")
            .permissions(Arc::new(DenyAll));
        let progress = task.progress();
        assert_eq!(progress.state(), DeliveryState::Created);

        let report = task.execute(RequestParameters::new().with("a", "1")).await;
        assert_eq!(
            report.outcome,
            DeliveryOutcome::Failure(DeliveryError::Permission(Permission::Internet))
        );
        assert!(report.message.starts_with("Failed to track session start ("));
        assert!(report.message.contains("INTERNET"));
        assert_eq!(progress.state(), DeliveryState::Failed);
    }

    #[tokio::test]
    async fn unusable_client_signature_fails_locally() {
        let report = DeliveryTask::new(unroutable_config(), "/event")
            .failure_message("Failed to track event")
            .user_agent("line\nbreak")
            .execute(RequestParameters::new().with("price", "5\u{20ac}"))
            .await;
        match &report.outcome {
            DeliveryOutcome::Failure(e) => {
                assert!(matches!(e, DeliveryError::Encoding(_)));
                assert!(e.is_local());
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(report.path, "/event");
    }

    #[test]
    fn closures_and_channels_are_sinks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink(tx);
        let report = DeliveryReport {
            path: "/startup".into(),
            outcome: DeliveryOutcome::Success,
            message: "ok".into(),
        };
        sink.complete(report.clone());
        assert_eq!(rx.try_recv().ok(), Some(report.clone()));

        let seen = std::sync::Mutex::new(Vec::new());
        let closure = |r: DeliveryReport| seen.lock().unwrap().push(r.message);
        closure.complete(report);
        assert_eq!(*seen.lock().unwrap(), vec!["ok".to_string()]);
    }
}
