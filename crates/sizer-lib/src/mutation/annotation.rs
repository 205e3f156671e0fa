//! Opt-in annotation gate

use crate::error::AdmissionError;
use k8s_openapi::api::core::v1::Pod;

/// Default pod annotation that opts a pod into resizing
pub const DEFAULT_ANNOTATION: &str = "resource-sizer.io/set-resources";

/// Outcome of checking a pod against the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Continue with resizing
    Resize,
    /// Admit unchanged
    Skip(String),
}

/// Opt-in annotation gate.
///
/// When disabled every pod is resized. When enabled a pod is resized only if
/// the annotation is present and parses as true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationGate {
    pub enabled: bool,
    pub key: String,
}

impl Default for AnnotationGate {
    fn default() -> Self {
        Self {
            enabled: true,
            key: DEFAULT_ANNOTATION.to_string(),
        }
    }
}

impl AnnotationGate {
    pub fn new(enabled: bool, key: impl Into<String>) -> Self {
        Self {
            enabled,
            key: key.into(),
        }
    }

    /// Gate that lets every pod through
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn check(&self, pod: &Pod) -> Result<GateDecision, AdmissionError> {
        if !self.enabled {
            return Ok(GateDecision::Resize);
        }

        let value = pod
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(&self.key));

        let Some(value) = value else {
            return Ok(GateDecision::Skip(format!(
                "pod has no {} annotation",
                self.key
            )));
        };

        match parse_bool(value) {
            Some(true) => Ok(GateDecision::Resize),
            Some(false) => Ok(GateDecision::Skip(format!(
                "annotation {} is set to false",
                self.key
            ))),
            None => Err(AdmissionError::AnnotationParse {
                key: self.key.clone(),
                value: value.clone(),
            }),
        }
    }
}

/// Parse the boolean literals accepted for the opt-in annotation
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
