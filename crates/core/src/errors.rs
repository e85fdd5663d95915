use thiserror::Error;

/// Failure of a single generation-pass provider call. Parse trouble is not
/// an error at this level; executors return an empty batch for that.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation provider request failed: {0}")]
    Provider(String),
    #[error("generation provider timed out after {0}s")]
    Timeout(u64),
    #[error("generation provider rejected credentials")]
    Auth,
}

/// Failure of a single product-search lookup. Always degradable: the
/// affected idea simply carries no product match.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("product search failed: {0}")]
pub struct ProductSearchError(pub String);

/// Failure of a suggestion-store operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("suggestion store error: {0}")]
pub struct StoreError(pub String);

/// Request-ending failures of the suggestion engine. Everything else the
/// engine encounters is degraded and logged, not raised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("recipient not found for this user")]
    RecipientNotFound,
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(#[source] GenerationError),
    #[error("no usable suggestions after {passes} passes")]
    NoIdeasAccepted { passes: u32 },
    #[error("failed to persist suggestion run: {0}")]
    Persistence(String),
    #[error("recipient lookup failed: {0}")]
    RecipientLookup(String),
}

/// HTTP-facing error with a caller-safe message, in the shape the rest of
/// the interface layer expects.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "A valid access token is required.",
            Self::NotFound { .. } => "That recipient could not be found.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "Gift suggestions are temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl EngineError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Unauthorized { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<EngineError> for InterfaceError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::RecipientNotFound => Self::NotFound {
                message: "recipient not found or not owned by caller".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            EngineError::GenerationUnavailable(source) => Self::ServiceUnavailable {
                message: source.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            EngineError::NoIdeasAccepted { passes } => Self::ServiceUnavailable {
                message: format!("no suggestions returned after {passes} passes"),
                correlation_id: "unassigned".to_owned(),
            },
            EngineError::Persistence(message) => Self::ServiceUnavailable {
                message,
                correlation_id: "unassigned".to_owned(),
            },
            EngineError::RecipientLookup(message) => Self::ServiceUnavailable {
                message,
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}
