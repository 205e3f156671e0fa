//! Webhook configuration

use anyhow::Result;
use serde::Deserialize;
use sizer_lib::health::DEFAULT_STORE_FAILURE_THRESHOLD;
use sizer_lib::mutation::DEFAULT_ANNOTATION;
use sizer_lib::{AnnotationGate, PrometheusConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Base address of the Prometheus-compatible metrics store
    #[serde(default = "default_metrics_endpoint")]
    pub metrics_endpoint: String,

    /// Timeout for a single instant query in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Port serving the mutate endpoint
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,

    /// Port serving health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Incomplete metrics fetches in a row before the store is reported degraded
    #[serde(default = "default_store_failure_threshold")]
    pub store_failure_threshold: u32,

    /// Only resize pods carrying the opt-in annotation
    #[serde(default = "default_annotation_gate")]
    pub annotation_gate: bool,

    /// Opt-in annotation key
    #[serde(default = "default_annotation_key")]
    pub annotation_key: String,

    /// PEM certificate chain for the mutate endpoint
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,

    /// PEM private key for the mutate endpoint
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
}

fn default_metrics_endpoint() -> String {
    std::env::var("METRICS_ENDPOINT_ADDR").unwrap_or_else(|_| "http://prometheus:9090".to_string())
}

fn default_query_timeout() -> u64 {
    10
}

fn default_webhook_port() -> u16 {
    8443
}

fn default_api_port() -> u16 {
    8080
}

fn default_store_failure_threshold() -> u32 {
    DEFAULT_STORE_FAILURE_THRESHOLD
}

fn default_annotation_gate() -> bool {
    true
}

fn default_annotation_key() -> String {
    DEFAULT_ANNOTATION.to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            metrics_endpoint: default_metrics_endpoint(),
            query_timeout_secs: default_query_timeout(),
            webhook_port: default_webhook_port(),
            api_port: default_api_port(),
            store_failure_threshold: default_store_failure_threshold(),
            annotation_gate: default_annotation_gate(),
            annotation_key: default_annotation_key(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl WebhookConfig {
    /// Load configuration from `SIZER_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("SIZER").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn prometheus(&self) -> PrometheusConfig {
        PrometheusConfig {
            endpoint: self.metrics_endpoint.clone(),
            timeout: Duration::from_secs(self.query_timeout_secs),
        }
    }

    pub fn gate(&self) -> AnnotationGate {
        AnnotationGate::new(self.annotation_gate, self.annotation_key.clone())
    }

    /// Certificate and key paths when both are configured
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            _ => None,
        }
    }
}
