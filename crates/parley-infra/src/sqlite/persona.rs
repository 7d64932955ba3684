//! SQLite persona repository.
//!
//! Listing builds its WHERE clause with `QueryBuilder` so every user-supplied
//! value is bound; only whitelisted column names are interpolated.

use parley_core::repository::SortOrder;
use parley_core::repository::persona::{PersonaFilter, PersonaRepository, PersonaVisibility};
use parley_types::error::RepositoryError;
use parley_types::persona::{
    DifficultyLevel, Persona, PersonaRecord, PersonaStats, PersonalityType,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

const SELECT_RECORD: &str = "SELECT p.*, \
     (SELECT COUNT(*) FROM sessions s WHERE s.persona_id = p.id) AS session_count, \
     u.email AS created_by_email \
     FROM personas p LEFT JOIN users u ON u.id = p.created_by";

/// SQLite-backed implementation of `PersonaRepository`.
pub struct SqlitePersonaRepository {
    pool: DatabasePool,
}

impl SqlitePersonaRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch_record(&self, id: &Uuid) -> Result<PersonaRecord, RepositoryError> {
        self.get(id, &PersonaVisibility::All)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

struct PersonaRow {
    id: String,
    name: String,
    avatar: Option<String>,
    description: String,
    personality_type: String,
    difficulty_level: String,
    background: String,
    child_name: String,
    child_age: Option<i64>,
    child_grade: String,
    communication_style: String,
    common_concerns: String,
    system_prompt: String,
    is_active: bool,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
    session_count: i64,
    created_by_email: Option<String>,
}

impl PersonaRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            avatar: row.try_get("avatar")?,
            description: row.try_get("description")?,
            personality_type: row.try_get("personality_type")?,
            difficulty_level: row.try_get("difficulty_level")?,
            background: row.try_get("background")?,
            child_name: row.try_get("child_name")?,
            child_age: row.try_get("child_age")?,
            child_grade: row.try_get("child_grade")?,
            communication_style: row.try_get("communication_style")?,
            common_concerns: row.try_get("common_concerns")?,
            system_prompt: row.try_get("system_prompt")?,
            is_active: row.try_get("is_active")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            session_count: row.try_get("session_count")?,
            created_by_email: row.try_get("created_by_email")?,
        })
    }

    fn into_record(self) -> Result<PersonaRecord, RepositoryError> {
        let personality_type: PersonalityType = self
            .personality_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let difficulty_level: DifficultyLevel = self
            .difficulty_level
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(PersonaRecord {
            persona: Persona {
                id: parse_uuid(&self.id)?,
                name: self.name,
                avatar: self.avatar,
                description: self.description,
                personality_type,
                difficulty_level,
                background: self.background,
                child_name: self.child_name,
                child_age: self.child_age,
                child_grade: self.child_grade,
                communication_style: self.communication_style,
                common_concerns: self.common_concerns,
                system_prompt: self.system_prompt,
                is_active: self.is_active,
                created_by: self.created_by.as_deref().map(parse_uuid).transpose()?,
                created_at: parse_datetime(&self.created_at)?,
                updated_at: parse_datetime(&self.updated_at)?,
            },
            session_count: self.session_count,
            created_by_email: self.created_by_email,
        })
    }
}

/// Escape LIKE wildcards so user text matches literally (`ESCAPE '\'`).
pub(crate) fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_visibility(qb: &mut QueryBuilder<'_, Sqlite>, visibility: &PersonaVisibility) {
    match visibility {
        PersonaVisibility::All => {}
        PersonaVisibility::ActiveOnly => {
            qb.push(" AND p.is_active = 1");
        }
        PersonaVisibility::ActiveOrOwnedBy(user_id) => {
            qb.push(" AND (p.is_active = 1 OR p.created_by = ")
                .push_bind(user_id.to_string())
                .push(")");
        }
    }
}

impl PersonaRepository for SqlitePersonaRepository {
    async fn create(&self, persona: &Persona) -> Result<PersonaRecord, RepositoryError> {
        sqlx::query(
            "INSERT INTO personas (id, name, avatar, description, personality_type, difficulty_level, background, child_name, child_age, child_grade, communication_style, common_concerns, system_prompt, is_active, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(persona.id.to_string())
        .bind(&persona.name)
        .bind(&persona.avatar)
        .bind(&persona.description)
        .bind(persona.personality_type.to_string())
        .bind(persona.difficulty_level.to_string())
        .bind(&persona.background)
        .bind(&persona.child_name)
        .bind(persona.child_age)
        .bind(&persona.child_grade)
        .bind(&persona.communication_style)
        .bind(&persona.common_concerns)
        .bind(&persona.system_prompt)
        .bind(persona.is_active)
        .bind(persona.created_by.map(|id| id.to_string()))
        .bind(format_datetime(&persona.created_at))
        .bind(format_datetime(&persona.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        self.fetch_record(&persona.id).await
    }

    async fn get(
        &self,
        id: &Uuid,
        visibility: &PersonaVisibility,
    ) -> Result<Option<PersonaRecord>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
        qb.push(" WHERE p.id = ").push_bind(id.to_string());
        push_visibility(&mut qb, visibility);

        let row = qb
            .build()
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => Ok(Some(
                PersonaRow::from_row(&row).map_err(query_error)?.into_record()?,
            )),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &PersonaFilter) -> Result<Vec<PersonaRecord>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
        qb.push(" WHERE 1 = 1");
        push_visibility(&mut qb, &filter.visibility);

        if let Some(ref search) = filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (");
            for (i, column) in ["p.name", "p.description", "p.background", "p.child_name"]
                .iter()
                .enumerate()
            {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column)
                    .push(" LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
        if let Some(ref name) = filter.name {
            qb.push(" AND p.name LIKE ")
                .push_bind(like_pattern(name))
                .push(" ESCAPE '\\'");
        }
        if let Some(ref description) = filter.description {
            qb.push(" AND p.description LIKE ")
                .push_bind(like_pattern(description))
                .push(" ESCAPE '\\'");
        }
        if let Some(personality) = filter.personality {
            qb.push(" AND p.personality_type = ")
                .push_bind(personality.to_string());
        }
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND p.difficulty_level = ")
                .push_bind(difficulty.to_string());
        }
        if let Some(is_active) = filter.is_active {
            qb.push(" AND p.is_active = ").push_bind(is_active);
        }
        if let Some(created_by) = filter.created_by {
            qb.push(" AND p.created_by = ")
                .push_bind(created_by.to_string());
        }
        if let Some(after) = filter.created_after {
            qb.push(" AND p.created_at >= ")
                .push_bind(format_datetime(&after));
        }
        if let Some(before) = filter.created_before {
            qb.push(" AND p.created_at <= ")
                .push_bind(format_datetime(&before));
        }

        // Whitelist allowed sort fields to prevent SQL injection
        let sort_field = match filter.sort_by.as_deref() {
            Some(field @ ("name" | "created_at" | "difficulty_level")) => field,
            _ => "created_at",
        };
        let order = match filter.sort_order.unwrap_or_default() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        qb.push(format!(" ORDER BY p.{sort_field} {order}, p.id {order}"));

        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
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
            records.push(PersonaRow::from_row(row).map_err(query_error)?.into_record()?);
        }
        Ok(records)
    }

    async fn update(&self, persona: &Persona) -> Result<PersonaRecord, RepositoryError> {
        let result = sqlx::query(
            "UPDATE personas SET name = ?, avatar = ?, description = ?, personality_type = ?, difficulty_level = ?, background = ?, child_name = ?, child_age = ?, child_grade = ?, communication_style = ?, common_concerns = ?, system_prompt = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&persona.name)
        .bind(&persona.avatar)
        .bind(&persona.description)
        .bind(persona.personality_type.to_string())
        .bind(persona.difficulty_level.to_string())
        .bind(&persona.background)
        .bind(&persona.child_name)
        .bind(persona.child_age)
        .bind(&persona.child_grade)
        .bind(&persona.communication_style)
        .bind(&persona.common_concerns)
        .bind(&persona.system_prompt)
        .bind(persona.is_active)
        .bind(format_datetime(&persona.updated_at))
        .bind(persona.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.fetch_record(&persona.id).await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM personas WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn name_exists(&self, name: &str, exclude: Option<&Uuid>) -> Result<bool, RepositoryError> {
        // SQLite's LOWER() only folds ASCII, so compare in Rust for Vietnamese names.
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, name FROM personas")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let wanted = name.trim().to_lowercase();
        let exclude = exclude.map(|id| id.to_string());
        Ok(rows.iter().any(|(id, existing)| {
            exclude.as_deref() != Some(id.as_str()) && existing.to_lowercase() == wanted
        }))
    }

    async fn count_active_sessions(&self, id: &Uuid) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sessions WHERE persona_id = ? AND status = 'active'",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;
        Ok(count)
    }

    async fn stats(&self, id: &Uuid) -> Result<PersonaStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
                    AVG(rating) AS avg_rating,
                    AVG(total_duration_seconds) AS avg_duration
             FROM sessions WHERE persona_id = ?",
        )
        .bind(id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let avg_duration: Option<f64> = row.try_get("avg_duration").map_err(query_error)?;
        Ok(PersonaStats {
            total_sessions: row.try_get("total").map_err(query_error)?,
            completed_sessions: row.try_get("completed").map_err(query_error)?,
            average_rating: row.try_get("avg_rating").map_err(query_error)?,
            average_duration_seconds: avg_duration.map(|d| d as i64).unwrap_or(0),
        })
    }

    async fn delete_unowned(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM personas WHERE created_by IS NULL")
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::{make_persona, make_user, test_pool};
    use crate::sqlite::user::SqliteUserRepository;
    use chrono::{Duration, Utc};
    use parley_core::repository::user::UserRepository;

    async fn insert_session(pool: &DatabasePool, user: &Uuid, persona: &Uuid, status: &str, rating: Option<i64>, duration: i64) {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, persona_id, status, rating, total_duration_seconds, started_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user.to_string())
        .bind(persona.to_string())
        .bind(status)
        .bind(rating)
        .bind(duration)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool.writer)
        .await
        .unwrap();
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn test_create_and_get_with_owner_email() {
        let pool = test_pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let repo = SqlitePersonaRepository::new(pool);
        let owner = make_user("lan");
        users.create(&owner).await.unwrap();

        let persona = make_persona("Chị Hương", Some(owner.id));
        let record = repo.create(&persona).await.unwrap();
        assert_eq!(record.persona.name, "Chị Hương");
        assert_eq!(record.persona.child_age, Some(8));
        assert_eq!(record.session_count, 0);
        assert_eq!(record.created_by_email.as_deref(), Some("lan@parley.test"));
    }

    #[tokio::test]
    async fn test_visibility() {
        let pool = test_pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let repo = SqlitePersonaRepository::new(pool);
        let owner = make_user("lan");
        users.create(&owner).await.unwrap();

        let mut hidden = make_persona("Hidden", Some(owner.id));
        hidden.is_active = false;
        repo.create(&hidden).await.unwrap();
        repo.create(&make_persona("Public", None)).await.unwrap();

        let active_only = repo.list(&PersonaFilter::default()).await.unwrap();
        assert_eq!(active_only.len(), 1);
        assert!(repo.get(&hidden.id, &PersonaVisibility::ActiveOnly).await.unwrap().is_none());

        let owned = PersonaVisibility::ActiveOrOwnedBy(owner.id);
        assert!(repo.get(&hidden.id, &owned).await.unwrap().is_some());
        let stranger = PersonaVisibility::ActiveOrOwnedBy(Uuid::now_v7());
        assert!(repo.get(&hidden.id, &stranger).await.unwrap().is_none());

        let all = repo
            .list(&PersonaFilter {
                visibility: PersonaVisibility::All,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_ordering() {
        let pool = test_pool().await;
        let repo = SqlitePersonaRepository::new(pool);

        let mut anh = make_persona("Anh Tuấn", None);
        anh.personality_type = PersonalityType::Busy;
        anh.difficulty_level = DifficultyLevel::Medium;
        anh.created_at = Utc::now() - Duration::days(2);
        let mut ba = make_persona("Bà Lan", None);
        ba.personality_type = PersonalityType::Strict;
        ba.difficulty_level = DifficultyLevel::Hard;
        ba.background = "Cựu giáo viên về hưu".to_string();
        ba.created_at = Utc::now() - Duration::days(1);
        let chi = make_persona("Chị Hương", None);
        for p in [&anh, &ba, &chi] {
            repo.create(p).await.unwrap();
        }

        let newest_first = repo.list(&PersonaFilter::default()).await.unwrap();
        let names: Vec<&str> = newest_first.iter().map(|r| r.persona.name.as_str()).collect();
        assert_eq!(names, vec!["Chị Hương", "Bà Lan", "Anh Tuấn"]);

        let by_name = repo
            .list(&PersonaFilter {
                sort_by: Some("name".to_string()),
                sort_order: Some(SortOrder::Asc),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name[0].persona.name, "Anh Tuấn");

        let strict = repo
            .list(&PersonaFilter {
                personality: Some(PersonalityType::Strict),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(strict.len(), 1);

        let search = repo
            .list(&PersonaFilter {
                search: Some("giáo viên".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].persona.name, "Bà Lan");

        let recent = repo
            .list(&PersonaFilter {
                created_after: Some(Utc::now() - Duration::hours(36)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);

        let skipped = repo
            .list(&PersonaFilter {
                offset: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_name_exists_is_case_insensitive() {
        let repo = SqlitePersonaRepository::new(test_pool().await);
        let persona = make_persona("Chị Hương", None);
        repo.create(&persona).await.unwrap();

        assert!(repo.name_exists("CHỊ HƯƠNG", None).await.unwrap());
        assert!(!repo.name_exists("chị hương", Some(&persona.id)).await.unwrap());
        assert!(!repo.name_exists("Anh Tuấn", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_counts_and_stats() {
        let pool = test_pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let repo = SqlitePersonaRepository::new(pool.clone());
        let user = make_user("lan");
        users.create(&user).await.unwrap();
        let persona = make_persona("Chị Hương", None);
        repo.create(&persona).await.unwrap();

        let empty = repo.stats(&persona.id).await.unwrap();
        assert_eq!(empty.total_sessions, 0);
        assert_eq!(empty.average_rating, None);
        assert_eq!(empty.average_duration_seconds, 0);

        insert_session(&pool, &user.id, &persona.id, "active", None, 0).await;
        insert_session(&pool, &user.id, &persona.id, "completed", Some(4), 100).await;
        insert_session(&pool, &user.id, &persona.id, "completed", Some(5), 201).await;

        assert_eq!(repo.count_active_sessions(&persona.id).await.unwrap(), 1);
        let record = repo.get(&persona.id, &PersonaVisibility::All).await.unwrap().unwrap();
        assert_eq!(record.session_count, 3);

        let stats = repo.stats(&persona.id).await.unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.completed_sessions, 2);
        assert_eq!(stats.average_rating, Some(4.5));
        assert_eq!(stats.average_duration_seconds, 100);
    }

    #[tokio::test]
    async fn test_update_delete_and_delete_unowned() {
        let pool = test_pool().await;
        let users = SqliteUserRepository::new(pool.clone());
        let repo = SqlitePersonaRepository::new(pool);
        let owner = make_user("lan");
        users.create(&owner).await.unwrap();

        let mut mine = make_persona("Mine", Some(owner.id));
        repo.create(&mine).await.unwrap();
        let seeded = make_persona("Seeded", None);
        repo.create(&seeded).await.unwrap();

        mine.description = "Một mô tả mới hoàn toàn.".to_string();
        let updated = repo.update(&mine).await.unwrap();
        assert_eq!(updated.persona.description, "Một mô tả mới hoàn toàn.");

        assert_eq!(repo.delete_unowned().await.unwrap(), 1);
        assert!(repo.get(&seeded.id, &PersonaVisibility::All).await.unwrap().is_none());

        repo.delete(&mine.id).await.unwrap();
        assert!(matches!(
            repo.delete(&mine.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }
}
