//! Error types for metrics collection and admission handling

use std::num::ParseFloatError;
use thiserror::Error;

/// Failure while querying or reducing data from the metrics store.
///
/// None of these abort an admission: the aggregator logs them and
/// nullifies the affected dimension.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to metrics store failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metrics store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("metrics store rejected query ({error_type}): {error}")]
    Api { error_type: String, error: String },

    #[error("failed to decode metrics store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported result type {0}, expected vector")]
    UnsupportedResultType(&'static str),

    #[error("failed to parse sample value {value:?} as float: {source}")]
    SampleParse {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Failure that aborts the admission of a pod.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("admission request carries no object")]
    MissingObject,

    #[error("failed to decode pod from admission request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("cannot parse annotation {key}={value:?} as bool")]
    AnnotationParse { key: String, value: String },

    #[error("failed to serialize mutated pod: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("failed to attach patch to admission response: {0}")]
    Patch(#[from] kube::core::admission::SerializePatchError),
}

impl AdmissionError {
    /// HTTP-equivalent status code placed in the errored admission response
    pub fn status_code(&self) -> u16 {
        match self {
            AdmissionError::MissingObject
            | AdmissionError::Decode(_)
            | AdmissionError::AnnotationParse { .. } => 400,
            AdmissionError::Serialization(_) | AdmissionError::Patch(_) => 500,
        }
    }
}
