//! Persona form rules.

use parley_types::error::ValidationErrors;
use parley_types::persona::{DifficultyLevel, Persona, PersonaInput, PersonalityType};

use crate::validation::{self, BLANK, REQUIRED};

pub const NAME_TOO_SHORT: &str = "Tên persona phải có ít nhất 2 ký tự.";
pub const NAME_TOO_LONG: &str = "Tên persona không được quá 100 ký tự.";
pub const NAME_TAKEN: &str = "Đã tồn tại persona với tên này.";
pub const DESCRIPTION_TOO_SHORT: &str = "Mô tả phải có ít nhất 10 ký tự.";
pub const DESCRIPTION_TOO_LONG: &str = "Mô tả không được quá 1000 ký tự.";
pub const PROMPT_TOO_SHORT: &str =
    "System prompt phải có ít nhất 50 ký tự để đảm bảo AI có đủ context.";
pub const PROMPT_TOO_LONG: &str = "System prompt không được quá 4000 ký tự.";
pub const CHILD_AGE_RANGE: &str = "Tuổi con phải từ 1 đến 25.";
pub const CHILD_AGE_MISSING: &str = "Vui lòng cung cấp tuổi của con.";

const CHILD_NAME_MAX: usize = 100;
const CHILD_GRADE_MAX: usize = 50;

/// Apply `input` onto `target`, collecting per-field errors.
///
/// Required fields (`name`, `description`, `system_prompt`) must be present
/// unless `partial`. Absent optional fields keep their current value.
/// Name uniqueness is not checked here; it needs the repository.
pub fn apply_input(target: &mut Persona, input: &PersonaInput, partial: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if let Some(name) = bounded_text(
        &mut errors,
        "name",
        input.name.as_deref(),
        partial,
        (2, NAME_TOO_SHORT),
        (100, NAME_TOO_LONG),
    ) {
        target.name = name;
    }
    if let Some(description) = bounded_text(
        &mut errors,
        "description",
        input.description.as_deref(),
        partial,
        (10, DESCRIPTION_TOO_SHORT),
        (1000, DESCRIPTION_TOO_LONG),
    ) {
        target.description = description;
    }
    if let Some(prompt) = bounded_text(
        &mut errors,
        "system_prompt",
        input.system_prompt.as_deref(),
        partial,
        (50, PROMPT_TOO_SHORT),
        (4000, PROMPT_TOO_LONG),
    ) {
        target.system_prompt = prompt;
    }

    if let Some(raw) = &input.personality_type {
        if let Some(p) = validation::parse_choice::<PersonalityType>(&mut errors, "personality_type", raw) {
            target.personality_type = p;
        }
    }
    if let Some(raw) = &input.difficulty_level {
        if let Some(d) = validation::parse_choice::<DifficultyLevel>(&mut errors, "difficulty_level", raw) {
            target.difficulty_level = d;
        }
    }

    if let Some(age) = input.child_age {
        if (1..=25).contains(&age) {
            target.child_age = Some(age);
        } else {
            errors.add("child_age", CHILD_AGE_RANGE);
        }
    }
    if let Some(child_name) = &input.child_name {
        let child_name = child_name.trim();
        if validation::char_len(child_name) > CHILD_NAME_MAX {
            errors.add("child_name", validation::max_length(CHILD_NAME_MAX));
        }
        target.child_name = child_name.to_string();
    }
    if let Some(grade) = &input.child_grade {
        let grade = grade.trim();
        if validation::char_len(grade) > CHILD_GRADE_MAX {
            errors.add("child_grade", validation::max_length(CHILD_GRADE_MAX));
        }
        target.child_grade = grade.to_string();
    }
    if let Some(avatar) = &input.avatar {
        target.avatar = Some(avatar.trim().to_string()).filter(|a| !a.is_empty());
    }
    if let Some(background) = &input.background {
        target.background = background.trim().to_string();
    }
    if let Some(style) = &input.communication_style {
        target.communication_style = style.trim().to_string();
    }
    if let Some(concerns) = &input.common_concerns {
        target.common_concerns = concerns.trim().to_string();
    }
    if let Some(active) = input.is_active {
        target.is_active = active;
    }

    errors
}

/// Cross-field rule, judged on the submitted values only: a child name
/// without an age is rejected.
pub fn check_child(input: &PersonaInput) -> ValidationErrors {
    let named = input
        .child_name
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());
    let aged = input.child_age.is_some_and(|a| a != 0);
    if named && !aged {
        ValidationErrors::single("child_age", CHILD_AGE_MISSING)
    } else {
        ValidationErrors::new()
    }
}

fn bounded_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    partial: bool,
    (min, too_short): (usize, &str),
    (max, too_long): (usize, &str),
) -> Option<String> {
    let Some(value) = value else {
        if !partial {
            errors.add(field, REQUIRED);
        }
        return None;
    };
    let value = value.trim();
    let len = validation::char_len(value);
    if len == 0 {
        errors.add(field, BLANK);
    } else if len < min {
        errors.add(field, too_short);
    } else if len > max {
        errors.add(field, too_long);
    } else {
        return Some(value.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_persona;

    fn full_input() -> PersonaInput {
        PersonaInput {
            name: Some("  Chị Lan  ".to_string()),
            description: Some("Phụ huynh quan tâm đến con".to_string()),
            system_prompt: Some("x".repeat(60)),
            personality_type: Some("anxious".to_string()),
            difficulty_level: Some("hard".to_string()),
            child_name: Some("Bé Na".to_string()),
            child_age: Some(6),
            ..Default::default()
        }
    }

    #[test]
    fn applies_trimmed_values() {
        let mut persona = sample_persona("old");
        let errors = apply_input(&mut persona, &full_input(), false);
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(persona.name, "Chị Lan");
        assert_eq!(persona.personality_type, PersonalityType::Anxious);
        assert_eq!(persona.difficulty_level, DifficultyLevel::Hard);
        assert_eq!(persona.child_age, Some(6));
    }

    #[test]
    fn full_update_requires_core_fields() {
        let mut persona = sample_persona("old");
        let errors = apply_input(&mut persona, &PersonaInput::default(), false);
        for field in ["name", "description", "system_prompt"] {
            assert_eq!(errors.get(field).unwrap()[0], REQUIRED, "{field}");
        }
        let errors = apply_input(&mut persona, &PersonaInput::default(), true);
        assert!(errors.is_empty());
        assert_eq!(persona.name, "old");
    }

    #[test]
    fn length_bounds_and_choices() {
        let mut persona = sample_persona("old");
        let input = PersonaInput {
            name: Some("A".to_string()),
            description: Some("short".to_string()),
            system_prompt: Some("too short".to_string()),
            personality_type: Some("grumpy".to_string()),
            child_age: Some(30),
            ..Default::default()
        };
        let errors = apply_input(&mut persona, &input, true);
        assert_eq!(errors.get("name").unwrap()[0], NAME_TOO_SHORT);
        assert_eq!(errors.get("description").unwrap()[0], DESCRIPTION_TOO_SHORT);
        assert_eq!(errors.get("system_prompt").unwrap()[0], PROMPT_TOO_SHORT);
        assert_eq!(errors.get("child_age").unwrap()[0], CHILD_AGE_RANGE);
        assert!(errors.contains("personality_type"));

        let long = PersonaInput {
            name: Some("n".repeat(101)),
            ..Default::default()
        };
        let errors = apply_input(&mut persona, &long, true);
        assert_eq!(errors.get("name").unwrap()[0], NAME_TOO_LONG);
    }

    #[test]
    fn blank_name_is_blank_not_short() {
        let mut persona = sample_persona("old");
        let input = PersonaInput {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        let errors = apply_input(&mut persona, &input, true);
        assert_eq!(errors.get("name").unwrap()[0], BLANK);
    }

    #[test]
    fn child_name_needs_age() {
        let input = PersonaInput {
            child_name: Some("Bé Na".to_string()),
            ..Default::default()
        };
        assert_eq!(check_child(&input).get("child_age").unwrap()[0], CHILD_AGE_MISSING);
        assert!(check_child(&full_input()).is_empty());
        assert!(check_child(&PersonaInput::default()).is_empty());
    }
}
