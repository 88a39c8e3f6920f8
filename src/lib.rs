pub mod api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod errors;
pub mod llm_providers;
pub mod logging;
pub mod models;
pub mod quiz_generator;
pub mod scoring;
pub mod session;
pub mod timer;

pub use api::{create_router, ApiResponse, AppState};
pub use catalog::QuizCatalog;
pub use config::Config;
pub use controller::SessionController;
pub use errors::*;
pub use llm_providers::{CompletionProvider, JsonResponseParser, OpenAIProvider};
pub use models::*;
pub use quiz_generator::{QuizGenerationRequest, QuizGenerator};
pub use session::{QuizSession, TickOutcome};
