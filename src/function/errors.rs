use axum::http::StatusCode;
use kube::Error as KubeError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, PartialEq)]
pub enum ParseError {
    #[error("Invalid constraint {0:?}: expected key=value.")]
    InvalidConstraintSyntax(String),
    #[error("Invalid {resource} quantity {value:?}: {reason}")]
    InvalidResourceQuantity {
        resource: String,
        value: String,
        reason: String,
    },
}

#[derive(ThisError, Debug, PartialEq)]
pub enum ProbeError {
    #[error("Invalid {annotation} annotation {value:?}: {reason}.")]
    InvalidProbeConfig {
        annotation: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(ThisError, Debug)]
pub enum SecretError {
    #[error("Secret {0} not found.")]
    NotFound(String),
    #[error("Failed to get secret {name}: {error}")]
    Get {
        name: String,
        #[source]
        error: KubeError,
    },
}

#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("{kind} {name} not found in namespace {namespace}.")]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },
    #[error("{kind} {name} was modified concurrently.")]
    Conflict { kind: &'static str, name: String },
    #[error("Kubernetes error: {0}")]
    Unavailable(#[source] KubeError),
}

/// Rejected before any mutation is applied.
#[derive(ThisError, Debug)]
pub enum ValidationError {
    #[error("service is required")]
    MissingService,
    #[error("{0}")]
    Parse(#[source] ParseError),
    #[error("{0}")]
    Probe(#[source] ProbeError),
}

#[derive(ThisError, Debug)]
pub enum ReconcileError {
    #[error("{0}")]
    NotFound(#[source] StoreError),
    #[error("Invalid request: {0}")]
    Validation(#[source] ValidationError),
    #[error("Secrets error: {0}")]
    Secrets(#[source] SecretError),
    #[error("Deployment {name} has {containers} containers, expected exactly one.")]
    InconsistentWorkload { name: String, containers: usize },
    #[error("Conflict: {0}")]
    Conflict(#[source] StoreError),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
    #[error("Deployment updated, endpoint update may lag: {0}")]
    PartialReconcile(#[source] StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => ReconcileError::NotFound(error),
            StoreError::Conflict { .. } => ReconcileError::Conflict(error),
            StoreError::Unavailable(_) => ReconcileError::StoreUnavailable(error),
        }
    }
}

impl From<ParseError> for ReconcileError {
    fn from(error: ParseError) -> Self {
        ReconcileError::Validation(ValidationError::Parse(error))
    }
}

impl From<ProbeError> for ReconcileError {
    fn from(error: ProbeError) -> Self {
        ReconcileError::Validation(ValidationError::Probe(error))
    }
}

impl ReconcileError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReconcileError::NotFound(_) => StatusCode::NOT_FOUND,
            ReconcileError::Validation(_) => StatusCode::BAD_REQUEST,
            ReconcileError::Secrets(SecretError::NotFound(_)) => StatusCode::NOT_FOUND,
            ReconcileError::Secrets(SecretError::Get { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ReconcileError::InconsistentWorkload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ReconcileError::Conflict(_) => StatusCode::CONFLICT,
            ReconcileError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReconcileError::PartialReconcile(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ReconcileError::PartialReconcile(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum ReadError {
    #[error("Failed to list functions: {0}")]
    List(#[source] StoreError),
    #[error("Failed to get function: {0}")]
    Get(#[source] StoreError),
}
