//! AWS SDK adapters for the platform and trace backend capabilities.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::types::{Environment, LastUpdateStatus, LogType};
use tracing::debug;

use crate::errors::ColdstartError;
use crate::platform::ExecutionPlatform;
use crate::traces::TraceBackend;
use crate::types::{Invocation, UpdateStatus};

/// Shared SDK configuration; `region` overrides the default provider chain.
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

pub struct LambdaPlatform {
    client: aws_sdk_lambda::Client,
}

impl LambdaPlatform {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

fn request_error(operation: &'static str, err: impl std::error::Error) -> ColdstartError {
    ColdstartError::PlatformRequest {
        operation,
        detail: DisplayErrorContext(err).to_string(),
    }
}

#[async_trait]
impl ExecutionPlatform for LambdaPlatform {
    async fn update_environment(
        &self,
        function: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ColdstartError> {
        let update_failed = |err: &dyn std::fmt::Display| ColdstartError::ConfigUpdateFailed {
            function: function.to_string(),
            detail: err.to_string(),
        };

        let current = self
            .client
            .get_function_configuration()
            .function_name(function)
            .send()
            .await
            .map_err(|e| update_failed(&DisplayErrorContext(e)))?;

        let mut variables = current
            .environment()
            .and_then(|env| env.variables())
            .cloned()
            .unwrap_or_default();
        variables.insert(key.to_string(), value.to_string());

        self.client
            .update_function_configuration()
            .function_name(function)
            .environment(Environment::builder().set_variables(Some(variables)).build())
            .send()
            .await
            .map_err(|e| update_failed(&DisplayErrorContext(e)))?;
        Ok(())
    }

    async fn update_status(&self, function: &str) -> Result<UpdateStatus, ColdstartError> {
        let output = self
            .client
            .get_function_configuration()
            .function_name(function)
            .send()
            .await
            .map_err(|e| request_error("GetFunctionConfiguration", e))?;

        let status = match output.last_update_status() {
            Some(LastUpdateStatus::InProgress) => UpdateStatus::InProgress,
            Some(LastUpdateStatus::Successful) | None => UpdateStatus::Successful,
            Some(LastUpdateStatus::Failed) => UpdateStatus::Failed {
                reason: output.last_update_status_reason().map(str::to_string),
            },
            Some(other) => UpdateStatus::Other(other.as_str().to_string()),
        };
        debug!(function, %status, "polled update status");
        Ok(status)
    }

    async fn invoke_with_log_tail(&self, function: &str) -> Result<Invocation, ColdstartError> {
        let output = self
            .client
            .invoke()
            .function_name(function)
            .log_type(LogType::Tail)
            .send()
            .await
            .map_err(|e| request_error("Invoke", e))?;

        Ok(Invocation {
            log_tail_base64: output.log_result().map(str::to_string),
            function_error: output.function_error().map(str::to_string),
        })
    }
}

pub struct XrayBackend {
    client: aws_sdk_xray::Client,
}

impl XrayBackend {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_xray::Client::new(config),
        }
    }
}

#[async_trait]
impl TraceBackend for XrayBackend {
    async fn fetch_trace(&self, trace_id: &str) -> Result<Option<Vec<String>>, ColdstartError> {
        let output = self
            .client
            .batch_get_traces()
            .trace_ids(trace_id)
            .send()
            .await
            .map_err(|e| ColdstartError::TraceBackendRequest {
                detail: aws_sdk_xray::error::DisplayErrorContext(e).to_string(),
            })?;

        let Some(trace) = output.traces().first() else {
            return Ok(None);
        };
        let documents: Vec<String> = trace
            .segments()
            .iter()
            .filter_map(|s| s.document().map(str::to_string))
            .collect();
        debug!(trace_id, segments = documents.len(), "fetched trace");
        Ok(Some(documents))
    }
}
