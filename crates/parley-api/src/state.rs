//! Application state wiring all services together.
//!
//! Services are generic over repository/hasher/token traits; AppState pins
//! them to the concrete infra implementations. Used by both the CLI commands
//! and the REST API handlers.

use std::path::Path;
use std::sync::Arc;

use parley_core::ai::box_provider::BoxChatProvider;
use parley_core::auth::service::AuthService;
use parley_core::persona::service::PersonaService;
use parley_core::session::service::SessionService;
use parley_core::stt::box_provider::BoxSpeechToText;
use parley_infra::auth::jwt::JwtIssuer;
use parley_infra::crypto::password::Argon2Hasher;
use parley_infra::llm::create_chat_provider;
use parley_infra::sqlite::message::SqliteMessageRepository;
use parley_infra::sqlite::persona::SqlitePersonaRepository;
use parley_infra::sqlite::pool::{DatabasePool, database_url_in};
use parley_infra::sqlite::session::SqliteSessionRepository;
use parley_infra::sqlite::user::SqliteUserRepository;
use parley_infra::stt::WhisperClient;
use parley_types::ai::GenerationParams;
use parley_types::config::{GeminiConfig, ParleyConfig};

pub type ConcreteAuthService = AuthService<SqliteUserRepository, Argon2Hasher, JwtIssuer>;

pub type ConcretePersonaService = PersonaService<SqlitePersonaRepository>;

pub type ConcreteSessionService =
    SessionService<SqliteSessionRepository, SqlitePersonaRepository, SqliteMessageRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<ConcreteAuthService>,
    pub persona_service: Arc<ConcretePersonaService>,
    pub session_service: Arc<ConcreteSessionService>,
    pub chat_provider: Arc<BoxChatProvider>,
    pub speech_to_text: Arc<BoxSpeechToText>,
    /// Sampling defaults for chat requests that omit `params`.
    pub chat_defaults: Arc<GenerationParams>,
}

impl AppState {
    /// Initialize the application state: connect to DB, build providers, wire services.
    pub async fn init(config: &ParleyConfig, data_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        let db_url = config
            .database
            .url
            .clone()
            .unwrap_or_else(|| database_url_in(data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        let chat_provider = create_chat_provider(&config.ai)?;
        let speech_to_text = BoxSpeechToText::new(WhisperClient::new(&config.ai.whisper)?);

        Ok(Self::from_parts(db_pool, config, chat_provider, speech_to_text))
    }

    /// Wire services over an open pool and already-built providers.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: &ParleyConfig,
        chat_provider: BoxChatProvider,
        speech_to_text: BoxSpeechToText,
    ) -> Self {
        let auth_service = AuthService::new(
            SqliteUserRepository::new(db_pool.clone()),
            Argon2Hasher::new(),
            JwtIssuer::from_config(&config.auth),
        );
        let persona_service = PersonaService::new(SqlitePersonaRepository::new(db_pool.clone()));
        let session_service = SessionService::new(
            SqliteSessionRepository::new(db_pool.clone()),
            SqlitePersonaRepository::new(db_pool.clone()),
            SqliteMessageRepository::new(db_pool.clone()),
        );

        Self {
            auth_service: Arc::new(auth_service),
            persona_service: Arc::new(persona_service),
            session_service: Arc::new(session_service),
            chat_provider: Arc::new(chat_provider),
            speech_to_text: Arc::new(speech_to_text),
            chat_defaults: Arc::new(chat_defaults(&config.ai.gemini)),
        }
    }
}

/// Sampling parameters taken from the configured model settings.
pub fn chat_defaults(gemini: &GeminiConfig) -> GenerationParams {
    GenerationParams {
        max_tokens: gemini.max_output_tokens,
        temperature: gemini.temperature,
        top_p: gemini.top_p,
        top_k: gemini.top_k,
        stop_sequences: Vec::new(),
    }
}
