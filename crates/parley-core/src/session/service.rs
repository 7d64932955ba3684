//! Session service: lifecycle, messages and AI replies for one user's sessions.

use std::time::Instant;

use chrono::Utc;
use parley_types::ai::{ChatTurn, GenerationParams, GenerationRequest, PersonaContext};
use parley_types::error::{ServiceError, ValidationErrors};
use parley_types::message::{Message, MessageInput, MessageRole, MessageView, NewMessage};
use parley_types::persona::{Persona, PersonaSummary};
use parley_types::session::{
    Session, SessionCreateInput, SessionDetail, SessionEndInput, SessionRecord, SessionStatus,
    SessionSummary, SessionUpdateInput,
};
use parley_types::user::AuthUser;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::validation::{
    PERSONA_UNAVAILABLE, apply_update, check_title, persona_not_found, validate_end,
    validate_message,
};
use crate::ai::provider::ChatProvider;
use crate::repository::message::{MessageFilter, MessageRepository};
use crate::repository::persona::{PersonaRepository, PersonaVisibility};
use crate::repository::session::{SessionFilter, SessionRepository};
use crate::validation::{self, REQUIRED};

pub const SESSION_ALREADY_ENDED: &str = "Session này đã kết thúc.";
pub const SESSION_CLOSED_FOR_MESSAGES: &str = "Không thể thêm tin nhắn vào session đã kết thúc.";

/// Body of a successful `reply`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyOutcome {
    pub user_message: MessageView,
    pub assistant_message: MessageView,
    pub finish_reason: String,
    pub model: String,
    pub latency_ms: f64,
}

/// Character sheet handed to the chat model for `persona`.
pub fn persona_context(persona: &Persona) -> PersonaContext {
    PersonaContext {
        name: persona.name.clone(),
        personality_type: persona.personality_type.label().to_string(),
        description: persona.description.clone(),
        background: persona.background.clone(),
        communication_style: persona.communication_style.clone(),
        common_concerns: persona.common_concerns.clone(),
        child_name: persona.child_name.clone(),
        child_age: persona.child_age,
        child_grade: persona.child_grade.clone(),
        system_prompt: persona.system_prompt.clone(),
    }
}

pub struct SessionService<S, P, M>
where
    S: SessionRepository,
    P: PersonaRepository,
    M: MessageRepository,
{
    sessions: S,
    personas: P,
    messages: M,
}

impl<S, P, M> SessionService<S, P, M>
where
    S: SessionRepository,
    P: PersonaRepository,
    M: MessageRepository,
{
    pub fn new(sessions: S, personas: P, messages: M) -> Self {
        Self {
            sessions,
            personas,
            messages,
        }
    }

    pub async fn list(
        &self,
        caller: &AuthUser,
        filter: SessionFilter,
    ) -> Result<Vec<SessionSummary>, ServiceError> {
        let records = self.sessions.list_for_user(&caller.id, &filter).await?;
        Ok(records.iter().map(SessionSummary::from).collect())
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        input: SessionCreateInput,
    ) -> Result<SessionDetail, ServiceError> {
        let mut errors = ValidationErrors::new();

        let persona_id = match input.persona.as_deref() {
            None => {
                errors.add("persona", REQUIRED);
                None
            }
            Some(raw) => validation::parse_uuid(&mut errors, "persona", raw),
        };
        if let Some(id) = persona_id {
            match self.personas.get(&id, &PersonaVisibility::All).await? {
                None => errors.add("persona", persona_not_found(&id.to_string())),
                Some(record) if !record.persona.is_active => {
                    errors.add("persona", PERSONA_UNAVAILABLE)
                }
                Some(_) => {}
            }
        }
        let title = check_title(&mut errors, input.title.as_deref());
        errors.into_result()?;

        let persona_id = persona_id.ok_or(ServiceError::NotFound)?;
        let session = Session::new(
            caller.id,
            persona_id,
            title,
            input.scenario.unwrap_or_default(),
        );
        let record = self.sessions.create(&session).await?;
        info!(session_id = %session.id, persona_id = %persona_id, user_id = %caller.id, "Session started");
        self.detail(record).await
    }

    pub async fn retrieve(&self, caller: &AuthUser, id: &Uuid) -> Result<SessionDetail, ServiceError> {
        let record = self.owned(caller, id).await?;
        self.detail(record).await
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        id: &Uuid,
        input: SessionUpdateInput,
    ) -> Result<SessionDetail, ServiceError> {
        let mut record = self.owned(caller, id).await?;
        apply_update(&mut record.session, &input).into_result()?;
        self.sessions.update(&record.session).await?;
        info!(session_id = %id, status = %record.session.status, "Session updated");
        self.detail(record).await
    }

    pub async fn destroy(&self, caller: &AuthUser, id: &Uuid) -> Result<(), ServiceError> {
        self.owned(caller, id).await?;
        self.sessions.delete(id).await?;
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Complete an active session, optionally with a rating and feedback.
    pub async fn end(
        &self,
        caller: &AuthUser,
        id: &Uuid,
        input: SessionEndInput,
    ) -> Result<SessionDetail, ServiceError> {
        let mut record = self.owned(caller, id).await?;
        if !record.session.is_active() {
            return Err(ServiceError::Rejected(SESSION_ALREADY_ENDED.to_string()));
        }
        let (rating, feedback) = validate_end(&input)?;

        let now = Utc::now();
        let session = &mut record.session;
        session.ended_at = Some(now);
        session.finish(SessionStatus::Completed, now);
        if rating.is_some() {
            session.rating = rating;
        }
        if let Some(feedback) = feedback {
            session.feedback = feedback;
        }
        self.sessions.update(session).await?;
        info!(
            session_id = %id,
            duration_secs = session.total_duration_seconds,
            rating = ?session.rating,
            "Session completed"
        );
        self.detail(record).await
    }

    pub async fn abandon(&self, caller: &AuthUser, id: &Uuid) -> Result<SessionDetail, ServiceError> {
        let mut record = self.owned(caller, id).await?;
        if !record.session.is_active() {
            return Err(ServiceError::Rejected(SESSION_ALREADY_ENDED.to_string()));
        }
        let now = Utc::now();
        record.session.ended_at = Some(now);
        record.session.finish(SessionStatus::Abandoned, now);
        self.sessions.update(&record.session).await?;
        info!(session_id = %id, "Session abandoned");
        self.detail(record).await
    }

    pub async fn add_message(
        &self,
        caller: &AuthUser,
        id: &Uuid,
        input: MessageInput,
    ) -> Result<MessageView, ServiceError> {
        let record = self.owned(caller, id).await?;
        if !record.session.is_active() {
            return Err(ServiceError::Rejected(SESSION_CLOSED_FOR_MESSAGES.to_string()));
        }
        let new = validate_message(*id, &input)?;
        let message = self.messages.append(&new).await?;
        Ok(MessageView::from(&message))
    }

    pub async fn messages(&self, caller: &AuthUser, id: &Uuid) -> Result<Vec<MessageView>, ServiceError> {
        self.owned(caller, id).await?;
        let messages = self.messages.list_for_session(id).await?;
        Ok(messages.iter().map(MessageView::from).collect())
    }

    /// `GET /api/messages/`: without a session id the listing is empty.
    pub async fn list_messages(
        &self,
        caller: &AuthUser,
        session: Option<Uuid>,
        filter: MessageFilter,
    ) -> Result<Vec<MessageView>, ServiceError> {
        let Some(session) = session else {
            return Ok(Vec::new());
        };
        let messages = self
            .messages
            .list_for_user_session(&session, &caller.id, &filter)
            .await?;
        Ok(messages.iter().map(MessageView::from).collect())
    }

    /// Store the caller's message, ask the chat model to answer in
    /// character, and store the reply.
    ///
    /// The user message stays stored when generation fails.
    pub async fn reply<C: ChatProvider>(
        &self,
        caller: &AuthUser,
        id: &Uuid,
        mut input: MessageInput,
        provider: &C,
        params: &GenerationParams,
    ) -> Result<ReplyOutcome, ServiceError> {
        let record = self.owned(caller, id).await?;
        if !record.session.is_active() {
            return Err(ServiceError::Rejected(SESSION_CLOSED_FOR_MESSAGES.to_string()));
        }
        input.role = Some(MessageRole::User.to_string());
        let new = validate_message(*id, &input)?;

        let persona = self
            .personas
            .get(&record.session.persona_id, &PersonaVisibility::All)
            .await?
            .ok_or(ServiceError::NotFound)?
            .persona;
        let history: Vec<ChatTurn> = self
            .messages
            .list_for_session(id)
            .await?
            .into_iter()
            .map(|m: Message| ChatTurn::new(m.role, m.content))
            .collect();

        let user_message = self.messages.append(&new).await?;
        let request = GenerationRequest {
            prompt: user_message.content.clone(),
            history,
            persona: Some(persona_context(&persona)),
            params: params.clone(),
        };

        let started = Instant::now();
        let response = provider.generate(&request).await.map_err(|e| {
            warn!(session_id = %id, code = %e.code, "Reply generation failed");
            e
        })?;

        let assistant_message = self
            .messages
            .append(&NewMessage {
                session_id: *id,
                role: MessageRole::Assistant,
                content: response.content.clone(),
                message_type: Default::default(),
                audio_url: String::new(),
                audio_duration_seconds: None,
                tokens_used: response.tokens_used,
            })
            .await?;
        info!(
            session_id = %id,
            tokens = response.tokens_used,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Persona replied"
        );

        Ok(ReplyOutcome {
            user_message: MessageView::from(&user_message),
            assistant_message: MessageView::from(&assistant_message),
            finish_reason: response.finish_reason,
            model: response.model,
            latency_ms: response.latency_ms,
        })
    }

    async fn owned(&self, caller: &AuthUser, id: &Uuid) -> Result<SessionRecord, ServiceError> {
        self.sessions
            .get_for_user(id, &caller.id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn detail(&self, record: SessionRecord) -> Result<SessionDetail, ServiceError> {
        let persona = self
            .personas
            .get(&record.session.persona_id, &PersonaVisibility::All)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let messages = self.messages.list_for_session(&record.session.id).await?;
        // Counters may have moved since `record` was read.
        let mut record = record;
        record.session.total_messages = messages.len() as i64;
        Ok(SessionDetail::new(
            &record,
            PersonaSummary::from(&persona),
            messages.iter().map(MessageView::from).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::validation::VOICE_NEEDS_AUDIO;
    use crate::testing::{FakeChat, MemoryStore, auth_user, sample_persona};
    use parley_types::ai::AiErrorCode;

    type Service = SessionService<MemoryStore, MemoryStore, MemoryStore>;

    fn setup() -> (Service, MemoryStore, Persona) {
        let store = MemoryStore::default();
        let persona = sample_persona("Chị Hương");
        store.insert_persona(persona.clone());
        (
            SessionService::new(store.clone(), store.clone(), store.clone()),
            store,
            persona,
        )
    }

    fn create_input(persona: &Persona) -> SessionCreateInput {
        SessionCreateInput {
            persona: Some(persona.id.to_string()),
            title: Some("  Họp phụ huynh  ".to_string()),
            scenario: None,
        }
    }

    fn text(content: &str) -> MessageInput {
        MessageInput {
            role: Some("user".to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_checks_persona() {
        let (svc, store, persona) = setup();
        let caller = auth_user(false);

        let detail = svc.create(&caller, create_input(&persona)).await.unwrap();
        assert_eq!(detail.title, "Họp phụ huynh");
        assert_eq!(detail.persona.name, "Chị Hương");
        assert_eq!(detail.status, SessionStatus::Active);
        assert!(detail.messages.is_empty());

        let mut inactive = sample_persona("Ẩn");
        inactive.is_active = false;
        store.insert_persona(inactive.clone());
        match svc.create(&caller, create_input(&inactive)).await.unwrap_err() {
            ServiceError::Validation(e) => {
                assert_eq!(e.get("persona").unwrap()[0], PERSONA_UNAVAILABLE)
            }
            other => panic!("unexpected {other:?}"),
        }

        let missing = Uuid::now_v7();
        let input = SessionCreateInput {
            persona: Some(missing.to_string()),
            ..Default::default()
        };
        match svc.create(&caller, input).await.unwrap_err() {
            ServiceError::Validation(e) => {
                assert_eq!(e.get("persona").unwrap()[0], persona_not_found(&missing.to_string()))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_users_sessions_are_not_found() {
        let (svc, _, persona) = setup();
        let owner = auth_user(false);
        let detail = svc.create(&owner, create_input(&persona)).await.unwrap();
        let stranger = auth_user(false);
        assert!(matches!(
            svc.retrieve(&stranger, &detail.id).await.unwrap_err(),
            ServiceError::NotFound
        ));
        assert!(matches!(
            svc.destroy(&stranger, &detail.id).await.unwrap_err(),
            ServiceError::NotFound
        ));
        assert!(svc.list(&stranger, SessionFilter::default()).await.unwrap().is_empty());
        assert_eq!(svc.list(&owner, SessionFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn messages_are_ordered_and_counted() {
        let (svc, _, persona) = setup();
        let caller = auth_user(false);
        let session = svc.create(&caller, create_input(&persona)).await.unwrap();

        let first = svc.add_message(&caller, &session.id, text("Chào chị")).await.unwrap();
        let mut reply = text("Chào cô");
        reply.role = Some("assistant".to_string());
        let second = svc.add_message(&caller, &session.id, reply).await.unwrap();
        assert_eq!(first.order, 1);
        assert_eq!(second.order, 2);

        let detail = svc.retrieve(&caller, &session.id).await.unwrap();
        assert_eq!(detail.total_messages, 2);
        assert_eq!(detail.messages.len(), 2);

        let mut voice = text("Nghe này");
        voice.message_type = Some("voice".to_string());
        match svc.add_message(&caller, &session.id, voice).await.unwrap_err() {
            ServiceError::Validation(e) => {
                assert_eq!(e.get("audio_url").unwrap()[0], VOICE_NEEDS_AUDIO)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_then_reject_further_actions() {
        let (svc, _, persona) = setup();
        let caller = auth_user(false);
        let session = svc.create(&caller, create_input(&persona)).await.unwrap();

        let ended = svc
            .end(
                &caller,
                &session.id,
                SessionEndInput {
                    rating: Some(5),
                    feedback: Some("Rất hay".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(ended.status, SessionStatus::Completed);
        assert_eq!(ended.rating, Some(5));
        assert!(ended.ended_at.is_some());

        assert!(matches!(
            svc.end(&caller, &session.id, SessionEndInput::default()).await.unwrap_err(),
            ServiceError::Rejected(m) if m == SESSION_ALREADY_ENDED
        ));
        assert!(matches!(
            svc.abandon(&caller, &session.id).await.unwrap_err(),
            ServiceError::Rejected(m) if m == SESSION_ALREADY_ENDED
        ));
        assert!(matches!(
            svc.add_message(&caller, &session.id, text("còn đó không?")).await.unwrap_err(),
            ServiceError::Rejected(m) if m == SESSION_CLOSED_FOR_MESSAGES
        ));
    }

    #[tokio::test]
    async fn end_validation_happens_after_state_check() {
        let (svc, _, persona) = setup();
        let caller = auth_user(false);
        let session = svc.create(&caller, create_input(&persona)).await.unwrap();
        let err = svc
            .end(
                &caller,
                &session.id,
                SessionEndInput {
                    rating: Some(9),
                    feedback: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(svc.retrieve(&caller, &session.id).await.unwrap().status == SessionStatus::Active);
    }

    #[tokio::test]
    async fn list_messages_requires_session_and_ownership() {
        let (svc, _, persona) = setup();
        let owner = auth_user(false);
        let session = svc.create(&owner, create_input(&persona)).await.unwrap();
        svc.add_message(&owner, &session.id, text("Chào")).await.unwrap();

        assert!(svc.list_messages(&owner, None, MessageFilter::default()).await.unwrap().is_empty());
        assert_eq!(
            svc.list_messages(&owner, Some(session.id), MessageFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            svc.list_messages(&auth_user(false), Some(session.id), MessageFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn reply_stores_both_messages() {
        let (svc, _, persona) = setup();
        let caller = auth_user(false);
        let session = svc.create(&caller, create_input(&persona)).await.unwrap();
        svc.add_message(&caller, &session.id, text("Chào chị")).await.unwrap();

        let chat = FakeChat::replying("Chào cô, cháu nhà tôi dạo này thế nào?");
        let outcome = svc
            .reply(&caller, &session.id, text("Cháu học tốt ạ"), &chat, &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(outcome.user_message.order, 2);
        assert_eq!(outcome.assistant_message.order, 3);
        assert_eq!(outcome.assistant_message.role, MessageRole::Assistant);
        assert_eq!(outcome.assistant_message.tokens_used, 42);

        let seen = chat.last_request().unwrap();
        assert_eq!(seen.prompt, "Cháu học tốt ạ");
        assert_eq!(seen.history.len(), 1);
        let persona_ctx = seen.persona.unwrap();
        assert_eq!(persona_ctx.name, "Chị Hương");
        assert_eq!(persona_ctx.personality_type, "Thân thiện");
    }

    #[tokio::test]
    async fn reply_failure_keeps_user_message() {
        let (svc, _, persona) = setup();
        let caller = auth_user(false);
        let session = svc.create(&caller, create_input(&persona)).await.unwrap();

        let chat = FakeChat::failing(AiErrorCode::RateLimit);
        let err = svc
            .reply(&caller, &session.id, text("Alo"), &chat, &GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ai(e) if e.code == AiErrorCode::RateLimit));
        assert_eq!(svc.messages(&caller, &session.id).await.unwrap().len(), 1);
    }
}
