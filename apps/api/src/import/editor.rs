//! Entry Editor — typed, per-field edits against a staged entry.
//!
//! Each edit replaces exactly one field of the working copy. The field name an edit
//! reports is the key the uncertainty tracker resolves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::entry::{ParsedEntry, Proficiency, SectionType, SkillCategory};

const EDUCATION_FIELDS: &[&str] = &[
    "degree",
    "institution",
    "field",
    "startYear",
    "endYear",
    "current",
    "gpa",
    "honors",
];

const EXPERIENCE_FIELDS: &[&str] = &[
    "title",
    "company",
    "location",
    "startDate",
    "endDate",
    "current",
    "achievements",
];

const SKILL_FIELDS: &[&str] = &["name", "category", "proficiency"];

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("field '{field}' does not exist on {section} entries")]
    FieldMismatch {
        field: &'static str,
        section: SectionType,
    },

    #[error("field '{0}' is disabled while 'current' is checked")]
    FieldDisabled(&'static str),

    #[error("achievement {index} does not exist (entry has {len})")]
    AchievementOutOfRange { index: usize, len: usize },
}

/// One form input change. Serialized as `{"field": "...", "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldEdit {
    Degree(String),
    Institution(String),
    #[serde(rename = "field")]
    FieldOfStudy(String),
    StartYear(Option<i32>),
    EndYear(Option<i32>),
    Gpa(Option<String>),
    Honors(Option<String>),

    Title(String),
    Company(String),
    Location(String),
    StartDate(String),
    EndDate(String),
    AddAchievement(String),
    SetAchievement { index: usize, text: String },
    RemoveAchievement(usize),

    /// Education "currently enrolled" and experience "current position".
    Current(bool),

    Name(String),
    Category(SkillCategory),
    Proficiency(Option<Proficiency>),
}

impl FieldEdit {
    /// The entry field this edit touches. All achievement list operations touch `achievements`.
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldEdit::Degree(_) => "degree",
            FieldEdit::Institution(_) => "institution",
            FieldEdit::FieldOfStudy(_) => "field",
            FieldEdit::StartYear(_) => "startYear",
            FieldEdit::EndYear(_) => "endYear",
            FieldEdit::Gpa(_) => "gpa",
            FieldEdit::Honors(_) => "honors",
            FieldEdit::Title(_) => "title",
            FieldEdit::Company(_) => "company",
            FieldEdit::Location(_) => "location",
            FieldEdit::StartDate(_) => "startDate",
            FieldEdit::EndDate(_) => "endDate",
            FieldEdit::AddAchievement(_)
            | FieldEdit::SetAchievement { .. }
            | FieldEdit::RemoveAchievement(_) => "achievements",
            FieldEdit::Current(_) => "current",
            FieldEdit::Name(_) => "name",
            FieldEdit::Category(_) => "category",
            FieldEdit::Proficiency(_) => "proficiency",
        }
    }
}

/// Applies `edit` to `entry` in place.
///
/// Checking `current` clears the end year / end date, which stays disabled until
/// `current` is unchecked again.
pub fn apply_edit(entry: &mut ParsedEntry, edit: FieldEdit) -> Result<(), EditError> {
    let field = edit.field_name();
    let section = entry.section();

    match (entry, edit) {
        (ParsedEntry::Education(e), FieldEdit::Degree(v)) => e.degree = v,
        (ParsedEntry::Education(e), FieldEdit::Institution(v)) => e.institution = v,
        (ParsedEntry::Education(e), FieldEdit::FieldOfStudy(v)) => e.field = v,
        (ParsedEntry::Education(e), FieldEdit::StartYear(v)) => e.start_year = v,
        (ParsedEntry::Education(e), FieldEdit::EndYear(v)) => {
            if e.current {
                return Err(EditError::FieldDisabled(field));
            }
            e.end_year = v;
        }
        (ParsedEntry::Education(e), FieldEdit::Current(current)) => {
            e.current = current;
            if current {
                e.end_year = None;
            }
        }
        (ParsedEntry::Education(e), FieldEdit::Gpa(v)) => e.gpa = v,
        (ParsedEntry::Education(e), FieldEdit::Honors(v)) => e.honors = v,

        (ParsedEntry::Experience(x), FieldEdit::Title(v)) => x.title = v,
        (ParsedEntry::Experience(x), FieldEdit::Company(v)) => x.company = v,
        (ParsedEntry::Experience(x), FieldEdit::Location(v)) => x.location = v,
        (ParsedEntry::Experience(x), FieldEdit::StartDate(v)) => x.start_date = v,
        (ParsedEntry::Experience(x), FieldEdit::EndDate(v)) => {
            if x.current {
                return Err(EditError::FieldDisabled(field));
            }
            x.end_date = v;
        }
        (ParsedEntry::Experience(x), FieldEdit::Current(current)) => {
            x.current = current;
            if current {
                x.end_date.clear();
            }
        }
        (ParsedEntry::Experience(x), FieldEdit::AddAchievement(text)) => x.achievements.push(text),
        (ParsedEntry::Experience(x), FieldEdit::SetAchievement { index, text }) => {
            let len = x.achievements.len();
            let slot = x
                .achievements
                .get_mut(index)
                .ok_or(EditError::AchievementOutOfRange { index, len })?;
            *slot = text;
        }
        (ParsedEntry::Experience(x), FieldEdit::RemoveAchievement(index)) => {
            let len = x.achievements.len();
            if index >= len {
                return Err(EditError::AchievementOutOfRange { index, len });
            }
            x.achievements.remove(index);
        }

        (ParsedEntry::Skill(s), FieldEdit::Name(v)) => s.name = v,
        (ParsedEntry::Skill(s), FieldEdit::Category(v)) => s.category = v,
        (ParsedEntry::Skill(s), FieldEdit::Proficiency(v)) => s.proficiency = v,

        _ => return Err(EditError::FieldMismatch { field, section }),
    }

    Ok(())
}

/// Form inputs currently disabled for `entry`.
pub fn disabled_fields(entry: &ParsedEntry) -> Vec<&'static str> {
    match entry {
        ParsedEntry::Education(e) if e.current => vec!["endYear"],
        ParsedEntry::Experience(x) if x.current => vec!["endDate"],
        _ => Vec::new(),
    }
}

/// Editable field names of a section, in form order.
pub fn editable_fields(section: SectionType) -> &'static [&'static str] {
    match section {
        SectionType::Education => EDUCATION_FIELDS,
        SectionType::Experience => EXPERIENCE_FIELDS,
        SectionType::Skills => SKILL_FIELDS,
    }
}

/// Maps a field name as the parser spelled it ("start_year", "StartYear", "field_of_study")
/// to the editor's field name. Returns `None` for fields the editor does not know.
pub fn canonical_field(section: SectionType, raw: &str) -> Option<&'static str> {
    let squashed: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let aliased = match (section, squashed.as_str()) {
        (SectionType::Education, "fieldofstudy" | "major") => "field",
        (SectionType::Education, "school" | "university") => "institution",
        (SectionType::Experience, "role" | "position") => "title",
        (SectionType::Experience, "employer") => "company",
        (SectionType::Experience, "bullets" | "highlights" | "responsibilities") => "achievements",
        (SectionType::Skills, "skill" | "skillname") => "name",
        (SectionType::Skills, "level") => "proficiency",
        _ => squashed.as_str(),
    };

    editable_fields(section)
        .iter()
        .copied()
        .find(|f| f.eq_ignore_ascii_case(aliased))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{EducationEntry, SkillEntry, WorkExperience};

    fn education() -> ParsedEntry {
        ParsedEntry::Education(EducationEntry {
            degree: "BSc".to_string(),
            institution: "MIT".to_string(),
            field: "CS".to_string(),
            start_year: Some(2018),
            end_year: Some(2022),
            ..Default::default()
        })
    }

    fn experience(achievements: &[&str]) -> ParsedEntry {
        ParsedEntry::Experience(WorkExperience {
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            start_date: "Jan 2020".to_string(),
            end_date: "Mar 2022".to_string(),
            achievements: achievements.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn test_edit_replaces_single_field() {
        let mut entry = education();
        apply_edit(
            &mut entry,
            FieldEdit::FieldOfStudy("Computer Science".to_string()),
        )
        .unwrap();

        let ParsedEntry::Education(e) = &entry else {
            panic!("expected education");
        };
        assert_eq!(e.field, "Computer Science");
        assert_eq!(e.degree, "BSc");
        assert_eq!(e.start_year, Some(2018));
    }

    #[test]
    fn test_current_clears_and_disables_end_year() {
        let mut entry = education();
        apply_edit(&mut entry, FieldEdit::Current(true)).unwrap();

        assert_eq!(disabled_fields(&entry), vec!["endYear"]);
        assert_eq!(
            apply_edit(&mut entry, FieldEdit::EndYear(Some(2024))),
            Err(EditError::FieldDisabled("endYear"))
        );

        apply_edit(&mut entry, FieldEdit::Current(false)).unwrap();
        apply_edit(&mut entry, FieldEdit::EndYear(Some(2024))).unwrap();
        let ParsedEntry::Education(e) = &entry else {
            panic!("expected education");
        };
        assert_eq!(e.end_year, Some(2024));
    }

    #[test]
    fn test_current_position_disables_end_date() {
        let mut entry = experience(&[]);
        apply_edit(&mut entry, FieldEdit::Current(true)).unwrap();
        let ParsedEntry::Experience(x) = &entry else {
            panic!("expected experience");
        };
        assert!(x.end_date.is_empty());
        assert_eq!(
            apply_edit(&mut entry, FieldEdit::EndDate("Present".to_string())),
            Err(EditError::FieldDisabled("endDate"))
        );
    }

    #[test]
    fn test_achievement_add_set_remove() {
        let mut entry = experience(&["Cut costs 20%"]);
        apply_edit(&mut entry, FieldEdit::AddAchievement(String::new())).unwrap();
        apply_edit(
            &mut entry,
            FieldEdit::SetAchievement {
                index: 1,
                text: "Led 4 engineers".to_string(),
            },
        )
        .unwrap();
        apply_edit(&mut entry, FieldEdit::RemoveAchievement(0)).unwrap();

        let ParsedEntry::Experience(x) = &entry else {
            panic!("expected experience");
        };
        assert_eq!(x.achievements, vec!["Led 4 engineers".to_string()]);
    }

    #[test]
    fn test_removing_all_achievements_leaves_empty_list() {
        let mut entry = experience(&["Only one"]);
        apply_edit(&mut entry, FieldEdit::RemoveAchievement(0)).unwrap();
        let ParsedEntry::Experience(x) = &entry else {
            panic!("expected experience");
        };
        assert!(x.achievements.is_empty());

        assert_eq!(
            apply_edit(&mut entry, FieldEdit::RemoveAchievement(0)),
            Err(EditError::AchievementOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_mismatched_field_rejected() {
        let mut entry = ParsedEntry::Skill(SkillEntry::default());
        assert_eq!(
            apply_edit(&mut entry, FieldEdit::Degree("BSc".to_string())),
            Err(EditError::FieldMismatch {
                field: "degree",
                section: SectionType::Skills
            })
        );
    }

    #[test]
    fn test_skill_proficiency_can_be_unset() {
        let mut entry = ParsedEntry::Skill(SkillEntry {
            name: "Rust".to_string(),
            proficiency: Some(Proficiency::Advanced),
            ..Default::default()
        });
        apply_edit(&mut entry, FieldEdit::Proficiency(None)).unwrap();
        apply_edit(&mut entry, FieldEdit::Category(SkillCategory::Tool)).unwrap();
        let ParsedEntry::Skill(s) = &entry else {
            panic!("expected skill");
        };
        assert_eq!(s.proficiency, None);
        assert_eq!(s.category, SkillCategory::Tool);
    }

    #[test]
    fn test_field_edit_wire_format() {
        let edit: FieldEdit =
            serde_json::from_str(r#"{"field": "field", "value": "Computer Science"}"#).unwrap();
        assert_eq!(edit, FieldEdit::FieldOfStudy("Computer Science".to_string()));

        let edit: FieldEdit = serde_json::from_str(
            r#"{"field": "setAchievement", "value": {"index": 2, "text": "x"}}"#,
        )
        .unwrap();
        assert_eq!(edit.field_name(), "achievements");
    }

    #[test]
    fn test_canonical_field_aliases() {
        assert_eq!(
            canonical_field(SectionType::Education, "start_year"),
            Some("startYear")
        );
        assert_eq!(
            canonical_field(SectionType::Education, "field_of_study"),
            Some("field")
        );
        assert_eq!(
            canonical_field(SectionType::Experience, "bullets"),
            Some("achievements")
        );
        assert_eq!(canonical_field(SectionType::Skills, "degree"), None);
    }
}
