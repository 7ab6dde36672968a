use std::sync::LazyLock;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::ColdstartError;
use crate::poll::{PollOptions, PollOutcome, poll_until};
use crate::types::{Invocation, UpdateStatus};

static TRACE_ID_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"XRAY TraceId: ([\w-]+)").expect("trace id pattern is valid"));

/// The execution platform hosting the function under test.
#[async_trait]
pub trait ExecutionPlatform {
    /// Set one environment variable, keeping the others.
    async fn update_environment(
        &self,
        function: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ColdstartError>;

    async fn update_status(&self, function: &str) -> Result<UpdateStatus, ColdstartError>;

    /// Invoke synchronously, asking for the tail of the execution log.
    async fn invoke_with_log_tail(&self, function: &str) -> Result<Invocation, ColdstartError>;
}

/// Force a new execution environment by writing a fresh token into
/// `variable`. Returns the token.
pub async fn trigger_new_version<P>(
    platform: &P,
    function: &str,
    variable: &str,
) -> Result<String, ColdstartError>
where
    P: ExecutionPlatform + ?Sized,
{
    let token = uuid::Uuid::new_v4().to_string();
    platform.update_environment(function, variable, &token).await?;
    debug!(function, variable, %token, "configuration update accepted");
    Ok(token)
}

/// Block until the last configuration update is no longer in progress.
pub async fn wait_until_ready<P>(
    platform: &P,
    function: &str,
    options: &PollOptions,
) -> Result<(), ColdstartError>
where
    P: ExecutionPlatform + ?Sized,
{
    let outcome = poll_until(
        options,
        || platform.update_status(function),
        |status| (!status.is_in_progress()).then_some(status),
    )
    .await?;

    match outcome {
        PollOutcome::Ready(UpdateStatus::Failed { reason }) => {
            Err(ColdstartError::ConfigUpdateFailed {
                function: function.to_string(),
                detail: reason.unwrap_or_else(|| "update status is Failed".to_string()),
            })
        }
        PollOutcome::Ready(status) => {
            debug!(function, %status, "function is ready");
            Ok(())
        }
        PollOutcome::TimedOut { attempts, elapsed } => Err(ColdstartError::ReadinessTimeout {
            function: function.to_string(),
            attempts,
            elapsed_ms: elapsed.as_millis(),
        }),
    }
}

/// Invoke once and pull the X-Ray trace id out of the returned log tail.
pub async fn invoke_for_trace_id<P>(platform: &P, function: &str) -> Result<String, ColdstartError>
where
    P: ExecutionPlatform + ?Sized,
{
    let invocation = platform.invoke_with_log_tail(function).await?;
    if let Some(ref kind) = invocation.function_error {
        warn!(function, kind = kind.as_str(), "function reported an error during invocation");
    }

    let encoded = invocation
        .log_tail_base64
        .ok_or_else(|| ColdstartError::LogTailMissing {
            detail: "response has no LogResult".to_string(),
        })?;
    let log = decode_log_tail(&encoded)?;
    extract_trace_id(&log).ok_or(ColdstartError::TraceIdMissing)
}

pub fn decode_log_tail(encoded: &str) -> Result<String, ColdstartError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ColdstartError::LogTailMissing {
            detail: format!("log tail is not valid base64: {e}"),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// First `XRAY TraceId: <id>` occurrence in a log.
pub fn extract_trace_id(log: &str) -> Option<String> {
    TRACE_ID_MARKER
        .captures(log)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    const REPORT_LOG: &str = "START RequestId: 5e6c Version: $LATEST\n\
        END RequestId: 5e6c\n\
        REPORT RequestId: 5e6c\tDuration: 2.31 ms\tInit Duration: 180.22 ms\t\n\
        XRAY TraceId: 1-6530f1a2-3c9d4e5f6a7b8c9d0e1f2a3b\tSegmentId: 0a1b2c3d4e5f6a7b\tSampled: true\n";

    struct FakePlatform {
        statuses: Mutex<Vec<UpdateStatus>>,
        invocation: Invocation,
        updates: Mutex<Vec<(String, String)>>,
    }

    impl FakePlatform {
        fn new(statuses: Vec<UpdateStatus>, invocation: Invocation) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                invocation,
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExecutionPlatform for FakePlatform {
        async fn update_environment(
            &self,
            _function: &str,
            key: &str,
            value: &str,
        ) -> Result<(), ColdstartError> {
            self.updates
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
            Ok(())
        }

        async fn update_status(&self, _function: &str) -> Result<UpdateStatus, ColdstartError> {
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }

        async fn invoke_with_log_tail(
            &self,
            _function: &str,
        ) -> Result<Invocation, ColdstartError> {
            Ok(self.invocation.clone())
        }
    }

    fn options() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(500),
            max_attempts: Some(5),
            timeout: None,
        }
    }

    fn tail(log: &str) -> Invocation {
        Invocation {
            log_tail_base64: Some(STANDARD.encode(log)),
            function_error: None,
        }
    }

    #[test]
    fn extracts_trace_id_from_report_line() {
        assert_eq!(
            extract_trace_id(REPORT_LOG).as_deref(),
            Some("1-6530f1a2-3c9d4e5f6a7b8c9d0e1f2a3b")
        );
    }

    #[test]
    fn extract_trace_id_none_without_marker() {
        assert_eq!(extract_trace_id("REPORT RequestId: 5e6c\tDuration: 2 ms"), None);
    }

    #[test]
    fn extract_trace_id_takes_first_match() {
        let log = "XRAY TraceId: first-1\nXRAY TraceId: second-2\n";
        assert_eq!(extract_trace_id(log).as_deref(), Some("first-1"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_log_tail("not base64!!"),
            Err(ColdstartError::LogTailMissing { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_writes_uuid_token() {
        let platform = FakePlatform::new(vec![UpdateStatus::Successful], tail(""));
        let token = trigger_new_version(&platform, "fn", "VERSION").await.unwrap();
        let updates = platform.updates.lock().unwrap();
        assert_eq!(updates.as_slice(), &[("VERSION".to_string(), token.clone())]);
        assert!(uuid::Uuid::parse_str(&token).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn waits_while_in_progress() {
        let platform = FakePlatform::new(
            vec![
                UpdateStatus::InProgress,
                UpdateStatus::InProgress,
                UpdateStatus::Successful,
            ],
            tail(""),
        );
        wait_until_ready(&platform, "fn", &options()).await.unwrap();
        assert!(platform.statuses.lock().unwrap().len() == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_is_reported() {
        let platform = FakePlatform::new(
            vec![UpdateStatus::Failed {
                reason: Some("ENI limit reached".to_string()),
            }],
            tail(""),
        );
        let err = wait_until_ready(&platform, "fn", &options()).await.unwrap_err();
        match err {
            ColdstartError::ConfigUpdateFailed { detail, .. } => {
                assert_eq!(detail, "ENI limit reached")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_counts_as_ready() {
        let platform = FakePlatform::new(vec![UpdateStatus::Other("Pending".into())], tail(""));
        assert!(wait_until_ready(&platform, "fn", &options()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_update_times_out() {
        let platform = FakePlatform::new(vec![UpdateStatus::InProgress], tail(""));
        let err = wait_until_ready(&platform, "fn", &options()).await.unwrap_err();
        assert!(matches!(
            err,
            ColdstartError::ReadinessTimeout { attempts: 5, .. }
        ));
    }

    #[tokio::test]
    async fn invoke_extracts_trace_id() {
        let platform = FakePlatform::new(vec![UpdateStatus::Successful], tail(REPORT_LOG));
        let id = invoke_for_trace_id(&platform, "fn").await.unwrap();
        assert_eq!(id, "1-6530f1a2-3c9d4e5f6a7b8c9d0e1f2a3b");
    }

    #[tokio::test]
    async fn invoke_without_log_tail_fails() {
        let platform = FakePlatform::new(vec![UpdateStatus::Successful], Invocation::default());
        let err = invoke_for_trace_id(&platform, "fn").await.unwrap_err();
        assert!(matches!(err, ColdstartError::LogTailMissing { .. }));
    }

    #[tokio::test]
    async fn invoke_without_marker_fails() {
        let platform = FakePlatform::new(
            vec![UpdateStatus::Successful],
            tail("REPORT RequestId: 5e6c\tDuration: 2.31 ms\n"),
        );
        let err = invoke_for_trace_id(&platform, "fn").await.unwrap_err();
        assert!(matches!(err, ColdstartError::TraceIdMissing));
    }

    #[tokio::test]
    async fn function_error_still_yields_trace_id() {
        let mut invocation = tail(REPORT_LOG);
        invocation.function_error = Some("Unhandled".to_string());
        let platform = FakePlatform::new(vec![UpdateStatus::Successful], invocation);
        assert!(invoke_for_trace_id(&platform, "fn").await.is_ok());
    }
}
