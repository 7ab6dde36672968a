use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ColdstartError {
    #[error("Failed to update configuration of function '{function}': {detail}")]
    ConfigUpdateFailed { function: String, detail: String },

    #[error("Lambda request {operation} failed: {detail}")]
    PlatformRequest { operation: &'static str, detail: String },

    #[error("Function '{function}' was still updating after {attempts} polls ({elapsed_ms} ms)")]
    ReadinessTimeout {
        function: String,
        attempts: u32,
        elapsed_ms: u128,
    },

    #[error("Invocation response carried no usable log tail: {detail}")]
    LogTailMissing { detail: String },

    #[error("TraceId was not found in the invocation log")]
    TraceIdMissing,

    #[error("X-Ray request failed: {detail}")]
    TraceBackendRequest { detail: String },

    #[error("Trace {trace_id} was not fully ingested after {attempts} polls ({elapsed_ms} ms)")]
    TraceIngestionTimeout {
        trace_id: String,
        attempts: u32,
        elapsed_ms: u128,
    },

    #[error("Malformed segment document: {detail}")]
    MalformedSegment { detail: String },

    #[error("{which} segment was not found in the trace")]
    SegmentNotFound { which: &'static str },

    #[error("{name} was not found in the function segment")]
    PhaseNotFound { name: &'static str },

    #[error("Sample count must be a positive integer, got {value}")]
    InvalidSampleCount { value: i64 },

    #[error("None of the {attempted} samples succeeded")]
    NoSuccessfulSamples { attempted: u32 },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}
