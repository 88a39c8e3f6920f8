//! Subscriber setup and standardized logging macros.
//!
//! The macros keep field names consistent across the HTTP layer, the session
//! controller and the quiz generator.

use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "quiz-session.log";

/// Install console and/or daily-rotated file output.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    let (file_layer, guard) = if config.file_enabled {
        fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, LOG_FILE_NAME);
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

        // No ANSI colors in files
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!(
        file_enabled = config.file_enabled,
        console_enabled = config.console_enabled,
        log_directory = %config.log_directory,
        "Logging initialized"
    );

    Ok(guard)
}

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, session_id = $session_id:expr) => {
        tracing::debug!(
            operation = $operation,
            session_id = %$session_id,
            "API operation started"
        );
    };
    ($operation:expr, quiz_id = $quiz_id:expr) => {
        tracing::debug!(
            operation = $operation,
            quiz_id = %$quiz_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            session_id = %$session_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, quiz_id = $quiz_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            quiz_id = %$quiz_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, session_id = $session_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            session_id = %$session_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            session_id = %$session_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, quiz_id = $quiz_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            quiz_id = %$quiz_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Session Lifecycle Logging Macros
// ============================================================================

/// Log quiz session lifecycle transitions
#[macro_export]
macro_rules! log_session_event {
    ($event:expr, session_id = $session_id:expr, quiz_id = $quiz_id:expr, mode = $mode:expr) => {
        tracing::info!(
            component = "session",
            event = $event,
            session_id = %$session_id,
            quiz_id = %$quiz_id,
            mode = %$mode,
            "Session event"
        );
    };
    ($event:expr, session_id = $session_id:expr, remaining_seconds = $remaining:expr) => {
        tracing::info!(
            component = "session",
            event = $event,
            session_id = %$session_id,
            remaining_seconds = $remaining,
            "Session event"
        );
    };
    ($event:expr, session_id = $session_id:expr, $msg:expr) => {
        tracing::info!(
            component = "session",
            event = $event,
            session_id = %$session_id,
            "Session event: {}", $msg
        );
    };
    ($event:expr, session_id = $session_id:expr) => {
        tracing::info!(
            component = "session",
            event = $event,
            session_id = %$session_id,
            "Session event"
        );
    };
}

// ============================================================================
// LLM Operation Logging Macros
// ============================================================================

/// Log quiz generation requests with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, model = $model:expr, question_count = $count:expr) => {
        tracing::info!(
            component = "quiz_generator",
            operation = $operation,
            model = %$model,
            question_count = $count,
            "LLM operation started"
        );
    };
    (success, $operation:expr, model = $model:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = "quiz_generator",
            operation = $operation,
            model = %$model,
            duration_ms = $duration,
            "LLM operation completed successfully"
        );
    };
    (error, $operation:expr, model = $model:expr, error = $error:expr) => {
        tracing::error!(
            component = "quiz_generator",
            operation = $operation,
            model = %$model,
            error = %$error,
            "LLM operation failed"
        );
    };
    (warn, $operation:expr, $msg:expr) => {
        tracing::warn!(
            component = "quiz_generator",
            operation = $operation,
            "LLM operation warning: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
