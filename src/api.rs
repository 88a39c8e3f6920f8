use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    catalog::QuizCatalog,
    controller::{SessionController, DEFAULT_TICK_PERIOD},
    errors::{ApiError, ErrorContext, SessionError},
    models::*,
    quiz_generator::{QuizGenerationRequest, QuizGenerator},
    timer::{CountdownTimer, TickControl},
};

use crate::{api_error, log_api_error, log_api_start, log_api_success, log_api_warn};

pub type SessionRegistry = Arc<Mutex<HashMap<Uuid, SessionController>>>;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

pub const DEFAULT_SESSION_RETENTION: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct AppState {
    pub catalog: QuizCatalog,
    pub generator: QuizGenerator,
    pub sessions: SessionRegistry,
    pub tick_period: Duration,
    /// Idle and completed sessions older than this are evicted.
    pub session_retention: Duration,
}

impl AppState {
    pub fn new(catalog: QuizCatalog, generator: QuizGenerator) -> Self {
        Self {
            catalog,
            generator,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tick_period: DEFAULT_TICK_PERIOD,
            session_retention: DEFAULT_SESSION_RETENTION,
        }
    }

    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    pub fn with_session_retention(mut self, retention: Duration) -> Self {
        self.session_retention = retention;
        self
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Deserialize)]
pub struct QuizListParams {
    pub topic: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub quiz_id: String,
    #[serde(default)]
    pub mode: PresentationMode,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    pub option: String,
}

#[derive(Deserialize)]
pub struct GoToRequest {
    pub question_index: usize,
}

#[derive(Deserialize)]
pub struct ConfidenceRequest {
    pub level: u8,
}

#[derive(Serialize)]
pub struct FinishResponse {
    pub result: SessionResult,
    pub review: Vec<QuestionReview>,
}

#[derive(Serialize)]
pub struct CloseResponse {
    pub session_id: Uuid,
    pub result: Option<SessionResult>,
}

fn lock_sessions(sessions: &SessionRegistry) -> MutexGuard<'_, HashMap<Uuid, SessionController>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop every idle or completed session past `retention`, returning how many went.
pub fn evict_stale_sessions(sessions: &SessionRegistry, retention: Duration) -> usize {
    let mut sessions = lock_sessions(sessions);
    let before = sessions.len();
    sessions.retain(|_, controller| !controller.is_stale(retention));

    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, remaining = sessions.len(), "Evicted stale sessions");
    }
    evicted
}

/// Sweep the registry every `period` until the state is dropped.
pub fn spawn_session_sweeper(state: &AppState, period: Duration) -> CountdownTimer {
    let sessions = Arc::downgrade(&state.sessions);
    let retention = state.session_retention;

    CountdownTimer::spawn(period, move || {
        let Some(sessions) = sessions.upgrade() else {
            return TickControl::Stop;
        };
        evict_stale_sessions(&sessions, retention);
        TickControl::Continue
    })
}

/// Run `action` against a live session, mapping a missing session to 404 and
/// rejected operations to their API errors.
fn with_session<T>(
    state: &AppState,
    session_id: Uuid,
    operation: &str,
    action: impl FnOnce(&SessionController) -> Result<T, SessionError>,
) -> Result<T, (StatusCode, Json<ApiResponse<()>>)> {
    let sessions = lock_sessions(&state.sessions);
    let Some(controller) = sessions.get(&session_id) else {
        log_api_warn!(operation, session_id = session_id, "session not found");
        return Err(api_error!(not_found, operation, "session", &session_id.to_string()));
    };

    action(controller).map_err(|e| {
        ApiError::from(e).to_response_with_context(
            ErrorContext::new(operation, "session").with_id(&session_id.to_string()),
        )
    })
}

// Quiz endpoints
pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(params): Query<QuizListParams>,
) -> ApiResult<Vec<QuizSummary>> {
    log_api_start!("list_quizzes");

    let quizzes = state.catalog.list(params.topic.as_deref()).await;
    log_api_success!("list_quizzes", count = quizzes.len(), "quizzes listed");
    Ok(Json(ApiResponse::success(quizzes)))
}

pub async fn get_quiz(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<QuizSummary> {
    log_api_start!("get_quiz", quiz_id = id);

    match state.catalog.get(&id).await {
        Some(quiz) => Ok(Json(ApiResponse::success(QuizSummary::from(quiz.as_ref())))),
        None => {
            log_api_warn!("get_quiz", quiz_id = id, "quiz not found");
            Err(api_error!(not_found, "get_quiz", "quiz", &id))
        }
    }
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<QuizGenerationRequest>,
) -> ApiResult<QuizDefinition> {
    info!(
        lesson = %request.lesson,
        topic = %request.topic,
        question_count = request.question_count,
        answer_type = request.answer_type.label(),
        "Generating quiz"
    );

    if let Err(e) = request.validate() {
        return Err(api_error!(validation, "generate_quiz", "quiz", e));
    }

    let quiz = match state.generator.generate(&request).await {
        Ok(quiz) => quiz,
        Err(e) => {
            log_api_error!("generate_quiz", error = e, "quiz generation failed");
            return Err(api_error!(llm, "generate_quiz", "quiz", e));
        }
    };

    match state.catalog.insert(quiz).await {
        Ok(quiz) => {
            log_api_success!("generate_quiz", quiz_id = quiz.id, "quiz generated and added to catalog");
            Ok(Json(ApiResponse::success(quiz.as_ref().clone())))
        }
        Err(e) => {
            let context = ErrorContext::new("generate_quiz", "quiz");
            Err(ApiError::from(e).to_response_with_context(context))
        }
    }
}

// Session endpoints
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("create_session", quiz_id = request.quiz_id);

    let definition = match state.catalog.select_quiz(&request.quiz_id).await {
        Ok(definition) => definition,
        Err(e) => {
            let context = ErrorContext::new("create_session", "quiz").with_id(&request.quiz_id);
            return Err(ApiError::from(e).to_response_with_context(context));
        }
    };

    let controller = SessionController::with_tick_period(definition, request.mode, state.tick_period)
        .map_err(|e| api_error!(validation, "create_session", "quiz", e))?;

    evict_stale_sessions(&state.sessions, state.session_retention);

    let snapshot = controller.snapshot();
    lock_sessions(&state.sessions).insert(controller.id(), controller);

    log_api_success!("create_session", session_id = snapshot.session_id, "session created");
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn get_session(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> ApiResult<SessionSnapshot> {
    log_api_start!("get_session", session_id = session_id);
    let snapshot = with_session(&state, session_id, "get_session", |c| Ok(c.snapshot()))?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("start_session", session_id = session_id);
    let snapshot = with_session(&state, session_id, "start_session", |c| {
        c.start()?;
        Ok(c.snapshot())
    })?;

    log_api_success!("start_session", session_id = session_id, "countdown started");
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<SessionSnapshot> {
    debug!(
        session_id = %session_id,
        question_index = request.question_index,
        option = %request.option,
        "Submitting answer"
    );
    let snapshot = with_session(&state, session_id, "submit_answer", |c| {
        c.answer(request.question_index, &request.option)?;
        Ok(c.snapshot())
    })?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn advance_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("advance_question", session_id = session_id);
    let snapshot = with_session(&state, session_id, "advance_question", |c| {
        c.advance()?;
        Ok(c.snapshot())
    })?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn go_to_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<GoToRequest>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("go_to_question", session_id = session_id);
    let snapshot = with_session(&state, session_id, "go_to_question", |c| {
        c.go_to(request.question_index)?;
        Ok(c.snapshot())
    })?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn reveal_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("reveal_answer", session_id = session_id);
    let snapshot = with_session(&state, session_id, "reveal_answer", |c| {
        c.reveal_answer()?;
        Ok(c.snapshot())
    })?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn select_confidence(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ConfidenceRequest>,
) -> ApiResult<SessionSnapshot> {
    log_api_start!("select_confidence", session_id = session_id);
    let snapshot = with_session(&state, session_id, "select_confidence", |c| {
        c.select_confidence(request.level)?;
        Ok(c.snapshot())
    })?;
    Ok(Json(ApiResponse::success(snapshot)))
}

pub async fn finish_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<FinishResponse> {
    log_api_start!("finish_session", session_id = session_id);
    let response = with_session(&state, session_id, "finish_session", |c| {
        let result = c.finish()?;
        Ok(FinishResponse {
            result,
            review: c.review().unwrap_or_default(),
        })
    })?;

    log_api_success!("finish_session", session_id = session_id, "session completed");
    Ok(Json(ApiResponse::success(response)))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<CloseResponse> {
    log_api_start!("close_session", session_id = session_id);

    let removed = lock_sessions(&state.sessions).remove(&session_id);
    let Some(controller) = removed else {
        log_api_warn!("close_session", session_id = session_id, "session not found");
        return Err(api_error!(not_found, "close_session", "session", &session_id.to_string()));
    };

    let result = controller.close();
    log_api_success!("close_session", session_id = session_id, "session discarded");
    Ok(Json(ApiResponse::success(CloseResponse { session_id, result })))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Quiz routes
        .route("/api/quizzes", get(list_quizzes))
        .route("/api/quizzes/generate", post(generate_quiz))
        .route("/api/quizzes/:id", get(get_quiz))
        // Session routes
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(close_session))
        .route("/api/sessions/:id/start", post(start_session))
        .route("/api/sessions/:id/answer", post(submit_answer))
        .route("/api/sessions/:id/advance", post(advance_question))
        .route("/api/sessions/:id/goto", post(go_to_question))
        .route("/api/sessions/:id/reveal", post(reveal_answer))
        .route("/api/sessions/:id/confidence", post(select_confidence))
        .route("/api/sessions/:id/finish", post(finish_session))
        .with_state(state)
}
