use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Profile section an import targets. Every entry in one import belongs to the same section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Education,
    Experience,
    Skills,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Education => "education",
            SectionType::Experience => "experience",
            SectionType::Skills => "skills",
        }
    }

    /// The `type` tag carried by entries of this section on the wire.
    pub fn entry_tag(&self) -> &'static str {
        match self {
            SectionType::Education => "education",
            SectionType::Experience => "experience",
            SectionType::Skills => "skill",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "education" => Ok(SectionType::Education),
            "experience" => Ok(SectionType::Experience),
            "skills" | "skill" => Ok(SectionType::Skills),
            other => Err(format!("unknown section type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    #[default]
    Technical,
    Soft,
    Language,
    Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub degree: String,
    pub institution: String,
    /// Field of study.
    pub field: String,
    #[serde(deserialize_with = "loose_year")]
    pub start_year: Option<i32>,
    #[serde(deserialize_with = "loose_year")]
    pub end_year: Option<i32>,
    pub current: bool,
    #[serde(deserialize_with = "loose_string")]
    pub gpa: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub honors: Option<String>,
}

/// Dates are kept verbatim ("Jan 2020", "Present", "2019") and never parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkExperience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub category: SkillCategory,
    pub proficiency: Option<Proficiency>,
}

/// One record produced by AI parsing of a CV section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedEntry {
    Education(EducationEntry),
    Experience(WorkExperience),
    Skill(SkillEntry),
}

impl ParsedEntry {
    pub fn section(&self) -> SectionType {
        match self {
            ParsedEntry::Education(_) => SectionType::Education,
            ParsedEntry::Experience(_) => SectionType::Experience,
            ParsedEntry::Skill(_) => SectionType::Skills,
        }
    }

    /// Short human label used in logs, e.g. "BSc, MIT".
    pub fn label(&self) -> String {
        match self {
            ParsedEntry::Education(e) => format!("{}, {}", e.degree, e.institution),
            ParsedEntry::Experience(e) => format!("{}, {}", e.title, e.company),
            ParsedEntry::Skill(e) => e.name.clone(),
        }
    }
}

/// The parser was not confident about `field` of the entry at `entry_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uncertainty {
    pub entry_index: usize,
    pub field: String,
    pub reason: String,
}

/// Accepts `"2018"`, `2018` or null. LLM output is inconsistent about year types.
fn loose_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    })
}

/// Accepts strings or numbers (GPA is often emitted as `3.8`). Blank strings become `None`.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
