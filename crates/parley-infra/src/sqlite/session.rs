//! SQLite session repository. Every read is scoped to the owning user.

use parley_core::repository::SortOrder;
use parley_core::repository::session::{SessionFilter, SessionRepository};
use parley_types::error::RepositoryError;
use parley_types::session::{Session, SessionRecord, SessionStatus};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::persona::like_pattern;
use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

const SELECT_RECORD: &str = "SELECT s.*, p.name AS persona_name, p.avatar AS persona_avatar, \
     u.email AS user_email \
     FROM sessions s \
     JOIN personas p ON p.id = s.persona_id \
     JOIN users u ON u.id = s.user_id";

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SessionRow {
    id: String,
    user_id: String,
    persona_id: String,
    title: String,
    scenario: String,
    status: String,
    total_messages: i64,
    total_duration_seconds: i64,
    rating: Option<i64>,
    feedback: String,
    ai_feedback: String,
    score: Option<i64>,
    started_at: String,
    ended_at: Option<String>,
    persona_name: String,
    persona_avatar: Option<String>,
    user_email: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            persona_id: row.try_get("persona_id")?,
            title: row.try_get("title")?,
            scenario: row.try_get("scenario")?,
            status: row.try_get("status")?,
            total_messages: row.try_get("total_messages")?,
            total_duration_seconds: row.try_get("total_duration_seconds")?,
            rating: row.try_get("rating")?,
            feedback: row.try_get("feedback")?,
            ai_feedback: row.try_get("ai_feedback")?,
            score: row.try_get("score")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            persona_name: row.try_get("persona_name")?,
            persona_avatar: row.try_get("persona_avatar")?,
            user_email: row.try_get("user_email")?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, RepositoryError> {
        let status: SessionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(SessionRecord {
            session: Session {
                id: parse_uuid(&self.id)?,
                user_id: parse_uuid(&self.user_id)?,
                persona_id: parse_uuid(&self.persona_id)?,
                title: self.title,
                scenario: self.scenario,
                status,
                total_messages: self.total_messages,
                total_duration_seconds: self.total_duration_seconds,
                rating: self.rating,
                feedback: self.feedback,
                ai_feedback: self.ai_feedback,
                score: self.score,
                started_at: parse_datetime(&self.started_at)?,
                ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            },
            persona_name: self.persona_name,
            persona_avatar: self.persona_avatar,
            user_email: self.user_email,
        })
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> Result<SessionRecord, RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, persona_id, title, scenario, status, total_messages, total_duration_seconds, rating, feedback, ai_feedback, score, started_at, ended_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.persona_id.to_string())
        .bind(&session.title)
        .bind(&session.scenario)
        .bind(session.status.to_string())
        .bind(session.total_messages)
        .bind(session.total_duration_seconds)
        .bind(session.rating)
        .bind(&session.feedback)
        .bind(&session.ai_feedback)
        .bind(session.score)
        .bind(format_datetime(&session.started_at))
        .bind(session.ended_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        self.get_for_user(&session.id, &session.user_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_for_user(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_RECORD} WHERE s.id = ? AND s.user_id = ?"))
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                SessionRow::from_row(&row).map_err(query_error)?.into_record()?,
            )),
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionRecord>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
        qb.push(" WHERE s.user_id = ").push_bind(user_id.to_string());

        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status.to_string());
        }
        if let Some(persona) = filter.persona {
            qb.push(" AND s.persona_id = ").push_bind(persona.to_string());
        }
        if let Some(ref name) = filter.persona_name {
            qb.push(" AND p.name LIKE ")
                .push_bind(like_pattern(name))
                .push(" ESCAPE '\\'");
        }
        if let Some(min) = filter.rating_min {
            qb.push(" AND s.rating >= ").push_bind(min);
        }
        if let Some(max) = filter.rating_max {
            qb.push(" AND s.rating <= ").push_bind(max);
        }
        match filter.has_feedback {
            Some(true) => {
                qb.push(" AND s.feedback != ''");
            }
            Some(false) => {
                qb.push(" AND s.feedback = ''");
            }
            None => {}
        }
        if let Some(after) = filter.started_after {
            qb.push(" AND s.started_at >= ")
                .push_bind(format_datetime(&after));
        }
        if let Some(before) = filter.started_before {
            qb.push(" AND s.started_at <= ")
                .push_bind(format_datetime(&before));
        }

        let sort_field = match filter.sort_by.as_deref() {
            Some(field @ ("started_at" | "rating" | "total_messages")) => field,
            _ => "started_at",
        };
        let order = match filter.sort_order.unwrap_or_default() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        qb.push(format!(" ORDER BY s.{sort_field} {order}, s.id {order}"));

        if filter.limit.is_some() || filter.offset.is_some() {
            qb.push(" LIMIT ").push_bind(filter.limit.unwrap_or(-1));
            qb.push(" OFFSET ").push_bind(filter.offset.unwrap_or(0));
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(SessionRow::from_row(row).map_err(query_error)?.into_record()?);
        }
        Ok(records)
    }

    async fn update(&self, session: &Session) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE sessions SET title = ?, scenario = ?, status = ?, total_messages = ?, total_duration_seconds = ?, rating = ?, feedback = ?, ai_feedback = ?, score = ?, ended_at = ?
             WHERE id = ?",
        )
        .bind(&session.title)
        .bind(&session.scenario)
        .bind(session.status.to_string())
        .bind(session.total_messages)
        .bind(session.total_duration_seconds)
        .bind(session.rating)
        .bind(&session.feedback)
        .bind(&session.ai_feedback)
        .bind(session.score)
        .bind(session.ended_at.as_ref().map(format_datetime))
        .bind(session.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::persona::SqlitePersonaRepository;
    use crate::sqlite::test_support::{make_persona, make_user, test_pool};
    use crate::sqlite::user::SqliteUserRepository;
    use chrono::{Duration, Utc};
    use parley_core::repository::persona::PersonaRepository;
    use parley_core::repository::user::UserRepository;
    use parley_types::persona::Persona;
    use parley_types::user::User;

    struct Fixture {
        repo: SqliteSessionRepository,
        user: User,
        persona: Persona,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let user = make_user("lan");
        SqliteUserRepository::new(pool.clone()).create(&user).await.unwrap();
        let mut persona = make_persona("Chị Hương", None);
        persona.avatar = Some("huong.png".to_string());
        SqlitePersonaRepository::new(pool.clone()).create(&persona).await.unwrap();
        Fixture {
            repo: SqliteSessionRepository::new(pool),
            user,
            persona,
        }
    }

    #[tokio::test]
    async fn test_create_joins_persona_and_user() {
        let f = fixture().await;
        let session = Session::new(f.user.id, f.persona.id, "Họp phụ huynh".to_string(), String::new());
        let record = f.repo.create(&session).await.unwrap();

        assert_eq!(record.persona_name, "Chị Hương");
        assert_eq!(record.persona_avatar.as_deref(), Some("huong.png"));
        assert_eq!(record.user_email, "lan@parley.test");
        assert_eq!(record.session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_scoped_to_owner() {
        let f = fixture().await;
        let session = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        f.repo.create(&session).await.unwrap();

        let stranger = Uuid::now_v7();
        assert!(f.repo.get_for_user(&session.id, &stranger).await.unwrap().is_none());
        assert!(f
            .repo
            .list_for_user(&stranger, &SessionFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_end_state() {
        let f = fixture().await;
        let mut session = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        f.repo.create(&session).await.unwrap();

        session.rating = Some(4);
        session.feedback = "Tốt".to_string();
        session.finish(SessionStatus::Completed, session.started_at + Duration::seconds(90));
        f.repo.update(&session).await.unwrap();

        let found = f.repo.get_for_user(&session.id, &f.user.id).await.unwrap().unwrap();
        assert_eq!(found.session.status, SessionStatus::Completed);
        assert_eq!(found.session.total_duration_seconds, 90);
        assert_eq!(found.session.rating, Some(4));
        assert!(found.session.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let f = fixture().await;

        let mut rated = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        rated.started_at = Utc::now() - Duration::days(3);
        rated.rating = Some(5);
        rated.feedback = "Rất hữu ích".to_string();
        rated.status = SessionStatus::Completed;
        f.repo.create(&rated).await.unwrap();

        let mut low = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        low.started_at = Utc::now() - Duration::days(1);
        low.rating = Some(2);
        f.repo.create(&low).await.unwrap();

        let open = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        f.repo.create(&open).await.unwrap();

        let all = f.repo.list_for_user(&f.user.id, &SessionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].session.id, open.id, "newest first by default");

        let completed = f
            .repo
            .list_for_user(
                &f.user.id,
                &SessionFilter {
                    status: Some(SessionStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);

        let high = f
            .repo
            .list_for_user(
                &f.user.id,
                &SessionFilter {
                    rating_min: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].session.id, rated.id);

        let without_feedback = f
            .repo
            .list_for_user(
                &f.user.id,
                &SessionFilter {
                    has_feedback: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(without_feedback.len(), 2);

        let by_persona_name = f
            .repo
            .list_for_user(
                &f.user.id,
                &SessionFilter {
                    persona_name: Some("Hương".to_string()),
                    started_after: Some(Utc::now() - Duration::days(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_persona_name.len(), 2);

        let by_rating = f
            .repo
            .list_for_user(
                &f.user.id,
                &SessionFilter {
                    sort_by: Some("rating".to_string()),
                    sort_order: Some(SortOrder::Desc),
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_rating[0].session.id, rated.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture().await;
        let session = Session::new(f.user.id, f.persona.id, String::new(), String::new());
        f.repo.create(&session).await.unwrap();
        f.repo.delete(&session.id).await.unwrap();
        assert!(f.repo.get_for_user(&session.id, &f.user.id).await.unwrap().is_none());
        assert!(matches!(
            f.repo.delete(&session.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }
}
