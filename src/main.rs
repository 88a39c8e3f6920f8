use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use quiz_session::{
    api::{create_router, spawn_session_sweeper, AppState},
    catalog::QuizCatalog,
    config::Config,
    logging::init_logging,
    quiz_generator::QuizGenerator,
};

use quiz_session::log_system_event;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_logging(&config.logging)?;

    config.validate()?;
    config.log_configuration_summary();

    log_system_event!(startup, component = "server", "Starting quiz session server");

    let catalog = match QuizCatalog::load_from_file(&config.catalog.path).await {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(
                path = %config.catalog.path,
                error = %e,
                "Could not load quiz catalog, starting with an empty one"
            );
            QuizCatalog::default()
        }
    };

    let generator = QuizGenerator::from_config(&config.llm);
    info!(
        provider = generator.provider_name(),
        model = %generator.model_name(),
        "Initialized quiz generator"
    );

    let state = AppState::new(catalog, generator)
        .with_tick_period(config.session.tick_period())
        .with_session_retention(config.session.retention());
    let _sweeper = spawn_session_sweeper(&state, config.session.sweep_period());

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = config.server.address();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
