use async_trait::async_trait;
use tracing::debug;

use crate::errors::ColdstartError;
use crate::poll::{PollOptions, PollOutcome, poll_until};
use crate::types::SegmentDocument;

/// A complete cold-start trace has the platform segment and the function segment.
pub const EXPECTED_SEGMENTS: usize = 2;

/// The tracing backend that ingests invocation traces.
#[async_trait]
pub trait TraceBackend {
    /// Raw segment documents of a trace, or `None` while the trace is unknown.
    async fn fetch_trace(&self, trace_id: &str) -> Result<Option<Vec<String>>, ColdstartError>;
}

/// What one fetch of a trace tells us.
#[derive(Debug)]
enum Ingestion {
    Pending,
    Complete(Vec<SegmentDocument>),
}

/// Block until the trace has exactly [`EXPECTED_SEGMENTS`] segments, none of
/// them still in progress, and return them parsed.
///
/// Segments are ingested independently and X-Ray publishes a segment before
/// it is closed, so a missing trace, a trace with one segment and a trace
/// with an in-progress segment are all "not yet" rather than complete.
pub async fn wait_for_trace<B>(
    backend: &B,
    trace_id: &str,
    options: &PollOptions,
) -> Result<Vec<SegmentDocument>, ColdstartError>
where
    B: TraceBackend + ?Sized,
{
    let outcome = poll_until(
        options,
        || async move {
            let documents = backend.fetch_trace(trace_id).await?.unwrap_or_default();
            classify(&documents)
        },
        |ingestion| match ingestion {
            Ingestion::Complete(segments) => Some(segments),
            Ingestion::Pending => None,
        },
    )
    .await?;

    match outcome {
        PollOutcome::Ready(segments) => {
            debug!(trace_id, "trace fully ingested");
            Ok(segments)
        }
        PollOutcome::TimedOut { attempts, elapsed } => {
            Err(ColdstartError::TraceIngestionTimeout {
                trace_id: trace_id.to_string(),
                attempts,
                elapsed_ms: elapsed.as_millis(),
            })
        }
    }
}

fn classify(documents: &[String]) -> Result<Ingestion, ColdstartError> {
    if documents.len() != EXPECTED_SEGMENTS {
        return Ok(Ingestion::Pending);
    }
    if documents.iter().any(|doc| marked_in_progress(doc)) {
        return Ok(Ingestion::Pending);
    }
    let segments = parse_segments(documents)?;
    if segments.iter().all(SegmentDocument::is_complete) {
        Ok(Ingestion::Complete(segments))
    } else {
        Ok(Ingestion::Pending)
    }
}

/// An open segment may lack fields a closed one always has, so it is
/// recognized before the typed parse.
fn marked_in_progress(document: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(document)
        .is_ok_and(|value| value.get("in_progress") == Some(&serde_json::Value::Bool(true)))
}

pub fn parse_segments(documents: &[String]) -> Result<Vec<SegmentDocument>, ColdstartError> {
    documents
        .iter()
        .map(|doc| {
            serde_json::from_str(doc).map_err(|e| ColdstartError::MalformedSegment {
                detail: e.to_string(),
            })
        })
        .collect()
}
