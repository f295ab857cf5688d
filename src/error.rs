use bollard::errors::Error as BollardError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvergeError>;

/// Errors reported by a [`ContainerRuntime`](crate::runtime::ContainerRuntime).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container runtime unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("name already in use: {0}")]
    NameConflict(String),
    #[error("invalid container configuration: {0}")]
    InvalidConfig(String),
    #[error("image pull failed: {0}")]
    PullFailed(String),
    #[error("container start failed: {0}")]
    StartFailed(String),
    #[error(transparent)]
    Docker(#[from] BollardError),
}

impl RuntimeError {
    /// Classify a docker error by the HTTP status the engine answered with.
    pub(crate) fn from_docker(error: BollardError) -> Self {
        match error {
            BollardError::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            BollardError::DockerResponseServerError {
                status_code: 409,
                message,
            } => RuntimeError::NameConflict(message),
            BollardError::DockerResponseServerError {
                status_code: 400,
                message,
            } => RuntimeError::InvalidConfig(message),
            other => RuntimeError::Docker(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}

/// Errors that abort a convergence pass.
#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("cannot reach container runtime: {0}")]
    RuntimeUnavailable(#[source] RuntimeError),
    #[error("malformed image reference `{reference}`: {reason}")]
    ImageReferenceMalformed { reference: String, reason: String },
    #[error("{operation} failed for {target}: {source}")]
    RuntimeOperationFailed {
        operation: Operation,
        target: String,
        #[source]
        source: RuntimeError,
    },
}

impl ConvergeError {
    pub(crate) fn operation(
        operation: Operation,
        target: impl Into<String>,
    ) -> impl FnOnce(RuntimeError) -> Self {
        let target = target.into();
        move |source| ConvergeError::RuntimeOperationFailed {
            operation,
            target,
            source,
        }
    }
}

impl From<serde_json::Error> for ConvergeError {
    fn from(value: serde_json::Error) -> Self {
        ConvergeError::ConfigInvalid(value.to_string())
    }
}

/// The runtime call a pass was executing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Inspect,
    InspectImage,
    Pull,
    Create,
    Start,
    Stop,
    Remove,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Inspect => write!(f, "inspect container"),
            Operation::InspectImage => write!(f, "inspect image"),
            Operation::Pull => write!(f, "pull image"),
            Operation::Create => write!(f, "create container"),
            Operation::Start => write!(f, "start container"),
            Operation::Stop => write!(f, "stop container"),
            Operation::Remove => write!(f, "remove container"),
        }
    }
}
