use crate::api::ApiResponse;
use crate::models::{PresentationMode, SessionStatus};
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// A quiz definition that cannot back a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DefinitionError {
    #[error("quiz '{quiz_id}' has no questions")]
    EmptyQuiz { quiz_id: String },

    #[error("question {index} of quiz '{quiz_id}' is malformed: {reason}")]
    MalformedQuestion {
        quiz_id: String,
        index: usize,
        reason: String,
    },
}

/// A rejected session operation. The session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {action} while the session is {status}")]
    InvalidTransition {
        action: &'static str,
        status: SessionStatus,
    },

    #[error("question index {index} is out of range (quiz has {len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("option '{option}' is not offered by question {index}")]
    OptionNotOffered { index: usize, option: String },

    #[error("{action} is only available in {required} mode")]
    ModeMismatch {
        action: &'static str,
        required: PresentationMode,
    },

    #[error("already at the last question")]
    NoNextQuestion,

    #[error("the answer must be revealed before rating confidence")]
    AnswerNotRevealed,

    #[error("confidence level {0} is outside 1..=5")]
    InvalidConfidence(u8),

    #[error("a confidence rating for question {question_index} is required before finishing")]
    ConfidenceRequired { question_index: usize },

    #[error(transparent)]
    InvalidDefinition(#[from] DefinitionError),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("quiz '{0}' not found")]
    NotFound(String),

    #[error("quiz '{0}' already exists")]
    Duplicate(String),

    #[error(transparent)]
    InvalidDefinition(#[from] DefinitionError),

    #[error("failed to read quiz catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse quiz catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("LLM service error: {0}")]
    LLMError(String),

    #[error("Resource already exists: {0}")]
    DuplicateResource(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Rejected request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::InvalidState(_) => {
                // Expected during normal use, e.g. a late "answer" after expiry.
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Operation not allowed in current session state"
                );
                (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::DuplicateResource(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Duplicate resource"
                );
                (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::LLMError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "LLM service error"
                );
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse::error(
                        "AI service temporarily unavailable. Please try again.".to_string(),
                    )),
                )
            }
            ApiError::InternalError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Internal server error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(
                        "An internal error occurred. Please try again.".to_string(),
                    )),
                )
            }
        }
    }

    /// Simple conversion without context
    pub fn to_response(self) -> (StatusCode, Json<ApiResponse<()>>) {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::QuestionOutOfRange { .. }
            | SessionError::OptionNotOffered { .. }
            | SessionError::InvalidConfidence(_)
            | SessionError::InvalidDefinition(_) => ApiError::ValidationError(err.to_string()),
            _ => ApiError::InvalidState(err.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Duplicate(_) => ApiError::DuplicateResource(err.to_string()),
            CatalogError::InvalidDefinition(_) => ApiError::ValidationError(err.to_string()),
            CatalogError::Io(_) | CatalogError::Parse(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Helper macro for structured error responses
#[macro_export]
macro_rules! api_error {
    (not_found, $operation:expr, $resource_type:expr, $id:expr) => {
        $crate::errors::ApiError::NotFound(format!("{} with id '{}' not found", $resource_type, $id))
            .to_response_with_context(
                $crate::errors::ErrorContext::new($operation, $resource_type).with_id($id),
            )
    };

    (validation, $operation:expr, $resource_type:expr, $message:expr) => {
        $crate::errors::ApiError::ValidationError($message.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };

    (llm, $operation:expr, $resource_type:expr, $error:expr) => {
        $crate::errors::ApiError::LLMError($error.to_string())
            .to_response_with_context($crate::errors::ErrorContext::new($operation, $resource_type))
    };
}
