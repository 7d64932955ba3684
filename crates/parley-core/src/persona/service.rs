//! Persona service: visibility, ownership and seeding on top of the repository.

use chrono::Utc;
use parley_types::error::{ServiceError, ValidationErrors};
use parley_types::persona::{
    Persona, PersonaDetail, PersonaInput, PersonaRecord, PersonaStats, PersonaSummary,
};
use parley_types::user::{AuthUser, Viewer};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::validation::{NAME_TAKEN, apply_input, check_child};
use crate::repository::persona::{PersonaFilter, PersonaRepository, PersonaVisibility};

/// Outcome of loading the built-in personas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub cleared: u64,
    pub created: Vec<String>,
    pub skipped: Vec<String>,
}

pub fn active_sessions_message(count: i64) -> String {
    format!("Không thể xóa persona đang có {count} session đang hoạt động.")
}

/// Which personas `viewer` may see.
pub fn visibility_for(viewer: &Viewer) -> PersonaVisibility {
    match viewer {
        Viewer::Anonymous => PersonaVisibility::ActiveOnly,
        Viewer::User(user) if user.is_staff => PersonaVisibility::All,
        Viewer::User(user) => PersonaVisibility::ActiveOrOwnedBy(user.id),
    }
}

pub struct PersonaService<P: PersonaRepository> {
    personas: P,
}

impl<P: PersonaRepository> PersonaService<P> {
    pub fn new(personas: P) -> Self {
        Self { personas }
    }

    pub fn repository(&self) -> &P {
        &self.personas
    }

    pub async fn list(
        &self,
        viewer: &Viewer,
        mut filter: PersonaFilter,
    ) -> Result<Vec<PersonaSummary>, ServiceError> {
        filter.visibility = visibility_for(viewer);
        let records = self.personas.list(&filter).await?;
        Ok(records.iter().map(PersonaSummary::from).collect())
    }

    pub async fn retrieve(&self, viewer: &Viewer, id: &Uuid) -> Result<PersonaDetail, ServiceError> {
        let record = self.visible(viewer, id).await?;
        Ok(PersonaDetail::new(&record, viewer))
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        input: PersonaInput,
    ) -> Result<PersonaDetail, ServiceError> {
        let now = Utc::now();
        let mut persona = Persona {
            id: Uuid::now_v7(),
            name: String::new(),
            avatar: None,
            description: String::new(),
            personality_type: Default::default(),
            difficulty_level: Default::default(),
            background: String::new(),
            child_name: String::new(),
            child_age: None,
            child_grade: String::new(),
            communication_style: String::new(),
            common_concerns: String::new(),
            system_prompt: String::new(),
            is_active: true,
            created_by: Some(caller.id),
            created_at: now,
            updated_at: now,
        };
        self.validate(&mut persona, &input, false, None).await?;

        let record = self.personas.create(&persona).await.map_err(name_conflict)?;
        info!(persona_id = %persona.id, user_id = %caller.id, "Persona created");
        Ok(PersonaDetail::new(&record, &Viewer::User(caller.clone())))
    }

    /// PUT (`partial = false`) or PATCH. Owner or staff only.
    pub async fn update(
        &self,
        caller: &AuthUser,
        id: &Uuid,
        input: PersonaInput,
        partial: bool,
    ) -> Result<PersonaDetail, ServiceError> {
        let viewer = Viewer::User(caller.clone());
        let record = self.visible(&viewer, id).await?;
        ensure_can_edit(caller, &record.persona)?;

        let mut persona = record.persona;
        self.validate(&mut persona, &input, partial, Some(id)).await?;
        persona.updated_at = Utc::now();

        let record = self.personas.update(&persona).await.map_err(name_conflict)?;
        info!(persona_id = %id, user_id = %caller.id, "Persona updated");
        Ok(PersonaDetail::new(&record, &viewer))
    }

    /// Delete a persona unless it still has active sessions. Owner or staff only.
    pub async fn destroy(&self, caller: &AuthUser, id: &Uuid) -> Result<(), ServiceError> {
        let record = self.visible(&Viewer::User(caller.clone()), id).await?;
        ensure_can_edit(caller, &record.persona)?;

        let active = self.personas.count_active_sessions(id).await?;
        if active > 0 {
            return Err(ServiceError::Rejected(active_sessions_message(active)));
        }
        self.personas.delete(id).await?;
        info!(persona_id = %id, user_id = %caller.id, "Persona deleted");
        Ok(())
    }

    /// The caller's own personas, active or not.
    pub async fn my_personas(&self, caller: &AuthUser) -> Result<Vec<PersonaSummary>, ServiceError> {
        let filter = PersonaFilter {
            visibility: PersonaVisibility::All,
            created_by: Some(caller.id),
            ..Default::default()
        };
        let records = self.personas.list(&filter).await?;
        Ok(records.iter().map(PersonaSummary::from).collect())
    }

    pub async fn stats(&self, viewer: &Viewer, id: &Uuid) -> Result<PersonaStats, ServiceError> {
        self.visible(viewer, id).await?;
        let mut stats = self.personas.stats(id).await?;
        stats.average_rating = stats.average_rating.map(|r| (r * 100.0).round() / 100.0);
        Ok(stats)
    }

    /// Insert `seeds`, skipping names that already exist. With `clear`,
    /// personas without a creator are removed first.
    pub async fn seed(&self, seeds: Vec<Persona>, clear: bool) -> Result<SeedReport, ServiceError> {
        let mut report = SeedReport::default();
        if clear {
            report.cleared = self.personas.delete_unowned().await?;
            info!(count = report.cleared, "Cleared unowned personas");
        }
        for persona in seeds {
            if self.personas.name_exists(&persona.name, None).await? {
                report.skipped.push(persona.name);
                continue;
            }
            self.personas.create(&persona).await?;
            info!(persona_id = %persona.id, name = %persona.name, "Seeded persona");
            report.created.push(persona.name);
        }
        Ok(report)
    }

    async fn visible(&self, viewer: &Viewer, id: &Uuid) -> Result<PersonaRecord, ServiceError> {
        self.personas
            .get(id, &visibility_for(viewer))
            .await?
            .ok_or(ServiceError::NotFound)
    }

    async fn validate(
        &self,
        persona: &mut Persona,
        input: &PersonaInput,
        partial: bool,
        exclude: Option<&Uuid>,
    ) -> Result<(), ServiceError> {
        let mut errors = apply_input(persona, input, partial);
        if input.name.is_some()
            && !errors.contains("name")
            && self.personas.name_exists(&persona.name, exclude).await?
        {
            errors.add("name", NAME_TAKEN);
        }
        errors.into_result()?;
        check_child(input).into_result()?;
        Ok(())
    }
}

fn ensure_can_edit(caller: &AuthUser, persona: &Persona) -> Result<(), ServiceError> {
    if caller.is_staff || persona.created_by == Some(caller.id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

fn name_conflict(err: parley_types::error::RepositoryError) -> ServiceError {
    match err {
        parley_types::error::RepositoryError::Conflict(_) => {
            ServiceError::Validation(ValidationErrors::single("name", NAME_TAKEN))
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::validation::CHILD_AGE_MISSING;
    use crate::testing::{MemoryStore, auth_user, sample_persona};

    fn input(name: &str) -> PersonaInput {
        PersonaInput {
            name: Some(name.to_string()),
            description: Some("Một phụ huynh rất bận rộn".to_string()),
            system_prompt: Some("Bạn là một phụ huynh bận rộn. ".repeat(3)),
            personality_type: Some("busy".to_string()),
            ..Default::default()
        }
    }

    fn service() -> (PersonaService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::default();
        (PersonaService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_sets_owner_and_detail() {
        let (svc, _) = service();
        let caller = auth_user(false);
        let detail = svc.create(&caller, input("Anh Nam")).await.unwrap();
        assert_eq!(detail.created_by, Some(caller.id));
        assert!(detail.is_owner);
        assert_eq!(detail.personality_type_display, "Bận rộn");
    }

    #[tokio::test]
    async fn duplicate_name_is_case_insensitive() {
        let (svc, _) = service();
        let caller = auth_user(false);
        svc.create(&caller, input("Anh Nam")).await.unwrap();
        let err = svc.create(&caller, input("anh nam")).await.unwrap_err();
        match err {
            ServiceError::Validation(e) => assert_eq!(e.get("name").unwrap()[0], NAME_TAKEN),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn cross_field_runs_after_field_rules() {
        let (svc, _) = service();
        let caller = auth_user(false);
        let mut with_child = input("Chị Hoa");
        with_child.child_name = Some("Bé Bông".to_string());
        let err = svc.create(&caller, with_child).await.unwrap_err();
        match err {
            ServiceError::Validation(e) => {
                assert_eq!(e.get("child_age").unwrap()[0], CHILD_AGE_MISSING)
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut both = PersonaInput {
            child_name: Some("Bé Bông".to_string()),
            ..Default::default()
        };
        both.name = Some("X".to_string());
        match svc.create(&caller, both).await.unwrap_err() {
            ServiceError::Validation(e) => {
                assert!(e.contains("name"));
                assert!(!e.contains("child_age"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn visibility_rules() {
        let (svc, store) = service();
        let owner = auth_user(false);
        let other = auth_user(false);
        let staff = auth_user(true);

        let mut hidden = sample_persona("Ẩn");
        hidden.is_active = false;
        hidden.created_by = Some(owner.id);
        store.insert_persona(hidden.clone());
        store.insert_persona(sample_persona("Công khai"));

        let anon = svc.list(&Viewer::Anonymous, PersonaFilter::default()).await.unwrap();
        assert_eq!(anon.len(), 1);
        let mine = svc
            .list(&Viewer::User(owner.clone()), PersonaFilter::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        let theirs = svc
            .list(&Viewer::User(other.clone()), PersonaFilter::default())
            .await
            .unwrap();
        assert_eq!(theirs.len(), 1);
        let all = svc
            .list(&Viewer::User(staff), PersonaFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        assert!(matches!(
            svc.retrieve(&Viewer::User(other), &hidden.id).await.unwrap_err(),
            ServiceError::NotFound
        ));
        assert!(svc.retrieve(&Viewer::User(owner), &hidden.id).await.is_ok());
    }

    #[tokio::test]
    async fn only_owner_or_staff_may_edit() {
        let (svc, _) = service();
        let owner = auth_user(false);
        let stranger = auth_user(false);
        let created = svc.create(&owner, input("Anh Nam")).await.unwrap();

        let patch = PersonaInput {
            difficulty_level: Some("expert".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(&stranger, &created.id, patch.clone(), true)
                .await
                .unwrap_err(),
            ServiceError::Forbidden
        ));
        let updated = svc
            .update(&auth_user(true), &created.id, patch, true)
            .await
            .unwrap();
        assert_eq!(updated.difficulty_level_display, "Chuyên gia");

        // Renaming to its own name does not trip the uniqueness rule.
        svc.update(&owner, &created.id, input("Anh Nam"), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn destroy_blocked_by_active_sessions() {
        let (svc, store) = service();
        let owner = auth_user(false);
        let created = svc.create(&owner, input("Anh Nam")).await.unwrap();
        store.set_active_sessions(created.id, 2);

        match svc.destroy(&owner, &created.id).await.unwrap_err() {
            ServiceError::Rejected(msg) => {
                assert_eq!(msg, "Không thể xóa persona đang có 2 session đang hoạt động.")
            }
            other => panic!("unexpected {other:?}"),
        }
        store.set_active_sessions(created.id, 0);
        svc.destroy(&owner, &created.id).await.unwrap();
        assert!(matches!(
            svc.retrieve(&Viewer::User(owner), &created.id).await.unwrap_err(),
            ServiceError::NotFound
        ));
    }

    #[tokio::test]
    async fn my_personas_includes_inactive() {
        let (svc, _) = service();
        let owner = auth_user(false);
        let created = svc.create(&owner, input("Anh Nam")).await.unwrap();
        let patch = PersonaInput {
            is_active: Some(false),
            ..Default::default()
        };
        svc.update(&owner, &created.id, patch, true).await.unwrap();
        svc.create(&auth_user(false), input("Chị Hoa")).await.unwrap();

        let mine = svc.my_personas(&owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(!mine[0].is_active);
    }

    #[tokio::test]
    async fn seed_skips_existing_and_clears() {
        let (svc, store) = service();
        store.insert_persona(sample_persona("Chị Hương"));
        let seeds = vec![sample_persona("Chị Hương"), sample_persona("Anh Tuấn")];

        let report = svc.seed(seeds.clone(), false).await.unwrap();
        assert_eq!(report.created, vec!["Anh Tuấn".to_string()]);
        assert_eq!(report.skipped, vec!["Chị Hương".to_string()]);

        let fresh: Vec<Persona> = ["Chị Hương", "Anh Tuấn"]
            .into_iter()
            .map(sample_persona)
            .collect();
        let report = svc.seed(fresh, true).await.unwrap();
        assert_eq!(report.cleared, 2);
        assert_eq!(report.created.len(), 2);
    }

    #[tokio::test]
    async fn stats_round_average_rating() {
        let (svc, store) = service();
        let persona = sample_persona("Chị Hương");
        store.insert_persona(persona.clone());
        store.set_stats(
            persona.id,
            PersonaStats {
                total_sessions: 3,
                completed_sessions: 3,
                average_rating: Some(11.0 / 3.0),
                average_duration_seconds: 95,
            },
        );
        let stats = svc.stats(&Viewer::Anonymous, &persona.id).await.unwrap();
        assert_eq!(stats.average_rating, Some(3.67));
        assert_eq!(stats.average_duration_seconds, 95);
    }
}
