//! Prospect Concierge server.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use prospect_concierge::adapters::ai::{AnthropicConfig, AnthropicProvider, OpenAIConfig, OpenAIProvider};
use prospect_concierge::adapters::auth::{JwtAgentValidator, JwtValidatorConfig};
use prospect_concierge::adapters::http::{conversation_routes, inbound_routes, ConversationApiState};
use prospect_concierge::adapters::messaging::{CloudApiConfig, CloudApiMessenger};
use prospect_concierge::adapters::postgres::{
    run_migrations, PostgresConversationRepository, PostgresListingReader,
    PostgresMessageRepository,
};
use prospect_concierge::adapters::websocket::{
    websocket_router, RoomManager, WebSocketEventBridge, WebSocketState,
};
use prospect_concierge::adapters::InMemoryEventBus;
use prospect_concierge::application::{
    ConversationOrchestrator, ConversationQueries, GroundingProvider, LeadExtractionEngine,
    OutboundChannelAdapter, ResponseGenerator,
};
use prospect_concierge::config::{AiConfig, AiProvider, AppConfig, ConfigError, ServerConfig};
use prospect_concierge::ports::{
    AIError, AIProvider, AgentTokenValidator, ConversationRepository, ListingReader,
    MessageRepository, MessagingError,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrations(#[from] sqlx::migrate::MigrateError),

    #[error("language model client: {0}")]
    LanguageModel(#[from] AIError),

    #[error("messaging client: {0}")]
    Messaging(#[from] MessagingError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate().map_err(ConfigError::from)?;

    tracing::info!(
        environment = ?config.server.environment,
        database = %config.database.redacted_url(),
        "starting prospect concierge"
    );

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("migrations applied");
    }

    let conversations: Arc<dyn ConversationRepository> =
        Arc::new(PostgresConversationRepository::new(pool.clone()));
    let messages: Arc<dyn MessageRepository> =
        Arc::new(PostgresMessageRepository::new(pool.clone()));
    let listings: Arc<dyn ListingReader> = Arc::new(PostgresListingReader::new(pool));

    let bus = Arc::new(InMemoryEventBus::new());
    let room_manager = Arc::new(RoomManager::with_default_capacity());
    WebSocketEventBridge::new_shared(room_manager.clone()).register(bus.as_ref());

    let provider = language_model(&config.ai)?;
    match &provider {
        Some(p) => {
            let info = p.provider_info();
            tracing::info!(provider = %info.name, model = %info.model, "language model ready");
        }
        None => tracing::warn!("no language model key configured, prospects get the fallback reply"),
    }

    let mut generator = ResponseGenerator::new(provider.clone());
    if let Some(deadline) = config.ai.generation_deadline() {
        generator = generator.with_deadline(deadline);
    }

    if !config.messaging.is_configured() {
        tracing::warn!("phone messaging credentials missing, phone replies will fail delivery");
    }
    let messenger = CloudApiMessenger::new(
        CloudApiConfig::new(
            config.messaging.api_base_url.clone(),
            config.messaging.access_token.clone(),
            config.messaging.sender_id.clone(),
        )
        .with_timeout(config.messaging.timeout()),
    )?;

    let orchestrator = Arc::new(
        ConversationOrchestrator::new(
            conversations.clone(),
            messages.clone(),
            GroundingProvider::new(listings.clone(), config.assistant.prompt_settings()),
            generator,
            Arc::new(LeadExtractionEngine::new(
                conversations.clone(),
                messages.clone(),
                listings,
                provider,
            )),
            OutboundChannelAdapter::new(Arc::new(messenger)),
            bus,
        )
        .with_history_limit(config.assistant.history_limit),
    );
    let queries = Arc::new(ConversationQueries::new(conversations, messages));

    let mut jwt = JwtValidatorConfig::new(config.auth.jwt_secret.clone());
    if let Some(issuer) = &config.auth.issuer {
        jwt = jwt.with_issuer(issuer.clone());
    }
    if let Some(audience) = &config.auth.audience {
        jwt = jwt.with_audience(audience.clone());
    }
    let validator: Arc<dyn AgentTokenValidator> = Arc::new(JwtAgentValidator::new(jwt));

    let api_state = ConversationApiState::new(orchestrator.clone(), queries.clone());
    let ws_state = WebSocketState::new(room_manager, orchestrator, queries, validator.clone());

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/api/conversations",
            conversation_routes(api_state.clone(), validator),
        )
        .nest("/api/inbound", inbound_routes(api_state))
        .merge(websocket_router().with_state(ws_state))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr().map_err(ConfigError::from)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG`
/// overrides the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if server.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn language_model(config: &AiConfig) -> Result<Option<Arc<dyn AIProvider>>, AIError> {
    let provider: Arc<dyn AIProvider> = match config.selected_provider() {
        None => return Ok(None),
        Some(AiProvider::OpenAI) => {
            let key = config.openai_api_key.clone().unwrap_or_default();
            let mut settings = OpenAIConfig::new(key)
                .with_timeout(config.timeout())
                .with_max_retries(config.max_retries);
            if let Some(model) = &config.model {
                settings = settings.with_model(model.clone());
            }
            Arc::new(OpenAIProvider::new(settings)?)
        }
        Some(AiProvider::Anthropic) => {
            let key = config.anthropic_api_key.clone().unwrap_or_default();
            let mut settings = AnthropicConfig::new(key)
                .with_timeout(config.timeout())
                .with_max_retries(config.max_retries);
            if let Some(model) = &config.model {
                settings = settings.with_model(model.clone());
            }
            Arc::new(AnthropicProvider::new(settings)?)
        }
    };
    Ok(Some(provider))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
