//! In-memory test doubles for the repository and provider ports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::stream;
use parley_types::ai::{
    AiError, AiErrorCode, GenerationRequest, GenerationResponse, StreamChunk,
};
use parley_types::error::{RepositoryError, TokenError};
use parley_types::message::{Message, NewMessage};
use parley_types::persona::{
    DifficultyLevel, Persona, PersonaRecord, PersonaStats, PersonalityType,
};
use parley_types::session::{Session, SessionRecord, SessionStatus};
use parley_types::user::{AuthUser, TokenClaims, TokenType, User};
use uuid::Uuid;

use crate::ai::provider::{ChatProvider, ChunkStream};
use crate::auth::password::PasswordHasher;
use crate::auth::token::{IssuedToken, TokenIssuer};
use crate::repository::message::{MessageFilter, MessageRepository};
use crate::repository::persona::{PersonaFilter, PersonaRepository, PersonaVisibility};
use crate::repository::session::{SessionFilter, SessionRepository};
use crate::repository::user::UserRepository;

pub fn auth_user(is_staff: bool) -> AuthUser {
    let id = Uuid::now_v7();
    AuthUser {
        id,
        email: format!("{id}@parley.test"),
        is_staff,
    }
}

pub fn sample_persona(name: &str) -> Persona {
    let now = Utc::now();
    Persona {
        id: Uuid::now_v7(),
        name: name.to_string(),
        avatar: None,
        description: "Phụ huynh của một học sinh tiểu học".to_string(),
        personality_type: PersonalityType::Friendly,
        difficulty_level: DifficultyLevel::Easy,
        background: String::new(),
        child_name: String::new(),
        child_age: None,
        child_grade: String::new(),
        communication_style: String::new(),
        common_concerns: String::new(),
        system_prompt: "Bạn là một phụ huynh thân thiện, luôn hỏi han về việc học của con."
            .to_string(),
        is_active: true,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
    blacklist: Mutex<HashSet<String>>,
    stale_lookups: AtomicBool,
}

impl MemoryUserRepo {
    /// Make email and username lookups miss, as if another request
    /// inserted the row between the service's check and its write.
    pub fn set_stale_lookups(&self, stale: bool) {
        self.stale_lookups.store(stale, Ordering::SeqCst);
    }

    fn lookup(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        if self.stale_lookups.load(Ordering::SeqCst) {
            return None;
        }
        self.users.lock().unwrap().iter().find(|u| pred(u)).cloned()
    }
}

/// The column a UNIQUE violation is reported on, email first.
fn conflicting_column(existing: &User, user: &User) -> Option<&'static str> {
    if existing.email == user.email {
        Some("email")
    } else if existing.username == user.username {
        Some("username")
    } else {
        None
    }
}

impl UserRepository for MemoryUserRepo {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if let Some(column) = users.iter().find_map(|u| conflicting_column(u, user)) {
            return Err(RepositoryError::Conflict(column.to_string()));
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.lookup(|u| u.email == email))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.lookup(|u| u.username == username))
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if let Some(column) = users
            .iter()
            .filter(|u| u.id != user.id)
            .find_map(|u| conflicting_column(u, user))
        {
            return Err(RepositoryError::Conflict(column.to_string()));
        }
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn blacklist_token(
        &self,
        jti: &str,
        _user_id: &Uuid,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.blacklist.lock().unwrap().insert(jti.to_string());
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, RepositoryError> {
        Ok(self.blacklist.lock().unwrap().contains(jti))
    }
}

/// Reversible stand-in for argon2.
pub struct FakeHasher;

impl PasswordHasher for FakeHasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("hashed:") == Some(password)
    }
}

/// Tokens of the form `{type}:{user_id}:{jti}`.
#[derive(Default)]
pub struct FakeTokens {
    counter: AtomicU64,
}

impl TokenIssuer for FakeTokens {
    fn issue(&self, user_id: &Uuid, kind: TokenType) -> Result<IssuedToken, TokenError> {
        let jti = format!("jti-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now().timestamp();
        Ok(IssuedToken {
            token: format!("{kind}:{user_id}:{jti}"),
            claims: TokenClaims {
                sub: user_id.to_string(),
                exp: now + 3600,
                iat: now,
                jti,
                token_type: kind,
            },
        })
    }

    fn decode(&self, token: &str, expected: TokenType) -> Result<TokenClaims, TokenError> {
        let mut parts = token.splitn(3, ':');
        let (Some(kind), Some(sub), Some(jti)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TokenError::Invalid);
        };
        let kind: TokenType = kind.parse().map_err(|_| TokenError::Invalid)?;
        if kind != expected {
            return Err(TokenError::WrongType {
                expected: expected.to_string(),
            });
        }
        let now = Utc::now().timestamp();
        Ok(TokenClaims {
            sub: sub.to_string(),
            exp: now + 3600,
            iat: now,
            jti: jti.to_string(),
            token_type: kind,
        })
    }
}

// ---------------------------------------------------------------------------
// Personas, sessions, messages
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    personas: Vec<Persona>,
    sessions: Vec<Session>,
    messages: Vec<Message>,
    active_override: HashMap<Uuid, i64>,
    stats_override: HashMap<Uuid, PersonaStats>,
}

/// One shared in-memory database behind the persona, session and message
/// ports. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn insert_persona(&self, persona: Persona) {
        self.inner.lock().unwrap().personas.push(persona);
    }

    pub fn set_active_sessions(&self, persona_id: Uuid, count: i64) {
        self.inner
            .lock()
            .unwrap()
            .active_override
            .insert(persona_id, count);
    }

    pub fn set_stats(&self, persona_id: Uuid, stats: PersonaStats) {
        self.inner
            .lock()
            .unwrap()
            .stats_override
            .insert(persona_id, stats);
    }
}

impl StoreInner {
    fn persona_record(&self, persona: &Persona) -> PersonaRecord {
        PersonaRecord {
            persona: persona.clone(),
            session_count: self
                .sessions
                .iter()
                .filter(|s| s.persona_id == persona.id)
                .count() as i64,
            created_by_email: persona.created_by.map(|id| format!("{id}@parley.test")),
        }
    }

    fn session_record(&self, session: &Session) -> SessionRecord {
        let persona = self.personas.iter().find(|p| p.id == session.persona_id);
        SessionRecord {
            session: session.clone(),
            persona_name: persona.map(|p| p.name.clone()).unwrap_or_default(),
            persona_avatar: persona.and_then(|p| p.avatar.clone()),
            user_email: format!("{}@parley.test", session.user_id),
        }
    }
}

fn visible(persona: &Persona, visibility: &PersonaVisibility) -> bool {
    match visibility {
        PersonaVisibility::All => true,
        PersonaVisibility::ActiveOnly => persona.is_active,
        PersonaVisibility::ActiveOrOwnedBy(user) => {
            persona.is_active || persona.created_by == Some(*user)
        }
    }
}

impl PersonaRepository for MemoryStore {
    async fn create(&self, persona: &Persona) -> Result<PersonaRecord, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.personas.push(persona.clone());
        Ok(inner.persona_record(persona))
    }

    async fn get(
        &self,
        id: &Uuid,
        visibility: &PersonaVisibility,
    ) -> Result<Option<PersonaRecord>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .personas
            .iter()
            .find(|p| p.id == *id && visible(p, visibility))
            .map(|p| inner.persona_record(p)))
    }

    async fn list(&self, filter: &PersonaFilter) -> Result<Vec<PersonaRecord>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let search = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut records: Vec<PersonaRecord> = inner
            .personas
            .iter()
            .filter(|p| visible(p, &filter.visibility))
            .filter(|p| {
                search.as_ref().is_none_or(|s| {
                    [&p.name, &p.description, &p.background, &p.child_name]
                        .iter()
                        .any(|f| f.to_lowercase().contains(s))
                })
            })
            .filter(|p| filter.personality.is_none_or(|v| p.personality_type == v))
            .filter(|p| filter.difficulty.is_none_or(|v| p.difficulty_level == v))
            .filter(|p| filter.is_active.is_none_or(|v| p.is_active == v))
            .filter(|p| filter.created_by.is_none_or(|v| p.created_by == Some(v)))
            .map(|p| inner.persona_record(p))
            .collect();
        records.reverse();
        Ok(records)
    }

    async fn update(&self, persona: &Persona) -> Result<PersonaRecord, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .personas
            .iter_mut()
            .find(|p| p.id == persona.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = persona.clone();
        Ok(inner.persona_record(persona))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let sessions: Vec<Uuid> = inner
            .sessions
            .iter()
            .filter(|s| s.persona_id == *id)
            .map(|s| s.id)
            .collect();
        inner.messages.retain(|m| !sessions.contains(&m.session_id));
        inner.sessions.retain(|s| s.persona_id != *id);
        inner.personas.retain(|p| p.id != *id);
        Ok(())
    }

    async fn name_exists(&self, name: &str, exclude: Option<&Uuid>) -> Result<bool, RepositoryError> {
        let name = name.to_lowercase();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .personas
            .iter()
            .any(|p| p.name.to_lowercase() == name && Some(&p.id) != exclude))
    }

    async fn count_active_sessions(&self, id: &Uuid) -> Result<i64, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        if let Some(n) = inner.active_override.get(id) {
            return Ok(*n);
        }
        Ok(inner
            .sessions
            .iter()
            .filter(|s| s.persona_id == *id && s.status == SessionStatus::Active)
            .count() as i64)
    }

    async fn stats(&self, id: &Uuid) -> Result<PersonaStats, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        if let Some(stats) = inner.stats_override.get(id) {
            return Ok(stats.clone());
        }
        let sessions: Vec<&Session> = inner.sessions.iter().filter(|s| s.persona_id == *id).collect();
        let ratings: Vec<i64> = sessions.iter().filter_map(|s| s.rating).collect();
        Ok(PersonaStats {
            total_sessions: sessions.len() as i64,
            completed_sessions: sessions
                .iter()
                .filter(|s| s.status == SessionStatus::Completed)
                .count() as i64,
            average_rating: (!ratings.is_empty())
                .then(|| ratings.iter().sum::<i64>() as f64 / ratings.len() as f64),
            average_duration_seconds: 0,
        })
    }

    async fn delete_unowned(&self) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.personas.len();
        inner.personas.retain(|p| p.created_by.is_some());
        Ok((before - inner.personas.len()) as u64)
    }
}

impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> Result<SessionRecord, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(session.clone());
        Ok(inner.session_record(session))
    }

    async fn get_for_user(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .find(|s| s.id == *id && s.user_id == *user_id)
            .map(|s| inner.session_record(s)))
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<SessionRecord> = inner
            .sessions
            .iter()
            .filter(|s| s.user_id == *user_id)
            .filter(|s| filter.status.is_none_or(|v| s.status == v))
            .filter(|s| filter.persona.is_none_or(|v| s.persona_id == v))
            .map(|s| inner.session_record(s))
            .collect();
        records.reverse();
        Ok(records)
    }

    async fn update(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or(RepositoryError::NotFound)?;
        let total_messages = slot.total_messages;
        *slot = session.clone();
        slot.total_messages = total_messages;
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        inner.messages.retain(|m| m.session_id != *id);
        inner.sessions.retain(|s| s.id != *id);
        Ok(())
    }
}

impl MessageRepository for MemoryStore {
    async fn append(&self, message: &NewMessage) -> Result<Message, RepositoryError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .messages
            .iter()
            .filter(|m| m.session_id == message.session_id)
            .map(|m| m.order)
            .max()
            .unwrap_or(0)
            + 1;
        let stored = Message {
            id: Uuid::now_v7(),
            session_id: message.session_id,
            role: message.role,
            content: message.content.clone(),
            message_type: message.message_type,
            audio_url: message.audio_url.clone(),
            audio_duration_seconds: message.audio_duration_seconds,
            tokens_used: message.tokens_used,
            order,
            created_at: Utc::now(),
        };
        inner.messages.push(stored.clone());
        if let Some(session) = inner.sessions.iter_mut().find(|s| s.id == message.session_id) {
            session.total_messages = order;
        }
        Ok(stored)
    }

    async fn list_for_session(&self, session_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.order, m.created_at));
        Ok(messages)
    }

    async fn list_for_user_session(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        let owned = self
            .inner
            .lock()
            .unwrap()
            .sessions
            .iter()
            .any(|s| s.id == *session_id && s.user_id == *user_id);
        if !owned {
            return Ok(Vec::new());
        }
        let messages = self.list_for_session(session_id).await?;
        Ok(messages
            .into_iter()
            .filter(|m| filter.role.is_none_or(|r| m.role == r))
            .filter(|m| filter.message_type.is_none_or(|t| m.message_type == t))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Chat provider
// ---------------------------------------------------------------------------

/// Canned chat provider that records the last request it saw.
pub struct FakeChat {
    reply: Result<String, AiErrorCode>,
    configured: bool,
    last: Mutex<Option<GenerationRequest>>,
}

impl FakeChat {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            configured: true,
            last: Mutex::new(None),
        }
    }

    pub fn failing(code: AiErrorCode) -> Self {
        Self {
            reply: Err(code),
            configured: true,
            last: Mutex::new(None),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            reply: Err(AiErrorCode::ApiKey),
            configured: false,
            last: Mutex::new(None),
        }
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

impl ChatProvider for FakeChat {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError> {
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Ok(text) => Ok(GenerationResponse {
                content: text.clone(),
                finish_reason: "stop".to_string(),
                tokens_used: 42,
                model: "fake-model".to_string(),
                latency_ms: 1.5,
                cached: false,
            }),
            Err(code) => Err(AiError::from_code(*code)),
        }
    }

    fn generate_stream(&self, _request: GenerationRequest) -> ChunkStream {
        let items: Vec<Result<StreamChunk, AiError>> = match &self.reply {
            Ok(text) => vec![
                Ok(StreamChunk {
                    content: text.clone(),
                    is_final: false,
                    tokens_used: 0,
                }),
                Ok(StreamChunk {
                    content: String::new(),
                    is_final: true,
                    tokens_used: 42,
                }),
            ],
            Err(code) => vec![Err(AiError::from_code(*code))],
        };
        Box::pin(stream::iter(items))
    }
}
