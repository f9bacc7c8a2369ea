use crate::consts::{
    DEFAULT_PROBE_PATH, DEFAULT_RUNTIME_HTTP_PORT, FUNCTIONS_DEFAULT_NAMESPACE, FUNCTION_LABEL,
    RESERVED_NAMESPACE, UID_LABEL,
};
use clap::ValueEnum;
use std::fmt::Display;

/// How annotation maps on the workload, its pod template and the endpoint are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AnnotationPolicy {
    /// The request's annotations replace the existing ones. A request without annotations clears them.
    #[default]
    Replace,
    /// The request's annotations are written over the existing ones. Nothing is removed.
    Merge,
}

impl Display for AnnotationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationPolicy::Replace => write!(f, "replace"),
            AnnotationPolicy::Merge => write!(f, "merge"),
        }
    }
}

/// Selects the security context configurator applied to function containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SecurityContextMode {
    /// Only the read-only root filesystem flag is managed.
    #[default]
    RootFilesystem,
    /// Like `root-filesystem`, and containers also run as a fixed non-root user.
    NonRoot,
}

impl Display for SecurityContextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityContextMode::RootFilesystem => write!(f, "root-filesystem"),
            SecurityContextMode::NonRoot => write!(f, "non-root"),
        }
    }
}

/// The two pod template label keys owned by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedLabels {
    /// Marks a deployment as a function. Its value is the function name.
    pub function_key: String,
    /// Changes on every reconcile so that a rollout is always triggered.
    pub version_key: String,
}

impl Default for OwnedLabels {
    fn default() -> Self {
        Self {
            function_key: String::from(FUNCTION_LABEL),
            version_key: String::from(UID_LABEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Use an HTTP GET probe. Otherwise the watchdog lock file is checked.
    pub http_probe: bool,
    pub path: String,
    pub initial_delay_seconds: i32,
    pub period_seconds: i32,
    pub timeout_seconds: i32,
    pub failure_threshold: i32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            http_probe: true,
            path: String::from(DEFAULT_PROBE_PATH),
            initial_delay_seconds: 2,
            period_seconds: 2,
            timeout_seconds: 1,
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub functions_namespace: String,
    pub reserved_namespace: String,
    pub annotation_policy: AnnotationPolicy,
    pub security_context: SecurityContextMode,
    pub owned_labels: OwnedLabels,
    pub probes: ProbeConfig,
    /// Used when the existing container declares no port.
    pub runtime_http_port: i32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            functions_namespace: String::from(FUNCTIONS_DEFAULT_NAMESPACE),
            reserved_namespace: String::from(RESERVED_NAMESPACE),
            annotation_policy: AnnotationPolicy::default(),
            security_context: SecurityContextMode::default(),
            owned_labels: OwnedLabels::default(),
            probes: ProbeConfig::default(),
            runtime_http_port: DEFAULT_RUNTIME_HTTP_PORT,
        }
    }
}

impl ProviderConfig {
    /// The namespace a request targets: the requested one, or the functions namespace if none was given.
    pub fn lookup_namespace(&self, requested: Option<&str>) -> String {
        match requested {
            Some(namespace) if !namespace.is_empty() => namespace.to_string(),
            _ => self.functions_namespace.clone(),
        }
    }

    pub fn is_reserved_namespace(&self, namespace: &str) -> bool {
        namespace == self.reserved_namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_namespace_falls_back_to_functions_namespace() {
        let config = ProviderConfig::default();

        assert_eq!(config.lookup_namespace(None), FUNCTIONS_DEFAULT_NAMESPACE);
        assert_eq!(config.lookup_namespace(Some("")), FUNCTIONS_DEFAULT_NAMESPACE);
        assert_eq!(config.lookup_namespace(Some("staging")), "staging");
    }

    #[test]
    fn kube_system_is_reserved() {
        let config = ProviderConfig::default();

        assert!(config.is_reserved_namespace("kube-system"));
        assert!(!config.is_reserved_namespace("openfaas-fn"));
    }
}
