//! Section Parser — turns raw CV text into staged entries plus the fields the model was unsure of.
//!
//! The model's output is normalised before it reaches a session: each entry is tagged with
//! the requested section, malformed entries are skipped, and uncertainty indices are
//! re-pointed at the surviving entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::import::editor::canonical_field;
use crate::import::prompts::{
    EDUCATION_SCHEMA, EXPERIENCE_SCHEMA, SECTION_PARSE_PROMPT, SECTION_PARSE_SYSTEM,
    SKILLS_SCHEMA,
};
use crate::llm_client::prompts::UNCERTAINTY_INSTRUCTION;
use crate::llm_client::{generate_json, TextGenerator};
use crate::models::entry::{ParsedEntry, SectionType, Uncertainty};

/// What the parse step hands to an import session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub success: bool,
    pub data: Vec<ParsedEntry>,
    pub uncertainties: Vec<Uncertainty>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawParse {
    entries: Vec<Value>,
    uncertainties: Vec<RawUncertainty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUncertainty {
    #[serde(alias = "entry_index", alias = "index")]
    entry_index: usize,
    field: String,
    #[serde(default)]
    reason: String,
}

fn schema_for(section: SectionType) -> &'static str {
    match section {
        SectionType::Education => EDUCATION_SCHEMA,
        SectionType::Experience => EXPERIENCE_SCHEMA,
        SectionType::Skills => SKILLS_SCHEMA,
    }
}

/// Parses one CV section with the LLM.
pub async fn parse_section(
    raw_text: &str,
    section: SectionType,
    llm: &dyn TextGenerator,
) -> Result<ParseResult, AppError> {
    if raw_text.trim().is_empty() {
        return Err(AppError::Validation("raw_text cannot be empty".to_string()));
    }

    let prompt = SECTION_PARSE_PROMPT
        .replace("{section}", section.as_str())
        .replace("{schema}", schema_for(section))
        .replace("{uncertainty}", UNCERTAINTY_INSTRUCTION)
        .replace("{raw_text}", raw_text.trim());

    let raw: RawParse = generate_json(llm, &prompt, SECTION_PARSE_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to parse {section} section: {e}")))?;

    let result = normalize(section, raw);
    info!(
        "Parsed {} {} entries ({} uncertain fields)",
        result.data.len(),
        section,
        result.uncertainties.len()
    );
    Ok(result)
}

fn normalize(section: SectionType, raw: RawParse) -> ParseResult {
    let mut data = Vec::with_capacity(raw.entries.len());
    // model index -> index in `data`
    let mut kept: HashMap<usize, usize> = HashMap::new();

    for (index, value) in raw.entries.into_iter().enumerate() {
        let Value::Object(mut object) = value else {
            warn!("Skipping {section} entry {index}: not a JSON object");
            continue;
        };
        object.insert(
            "type".to_string(),
            Value::String(section.entry_tag().to_string()),
        );
        match serde_json::from_value::<ParsedEntry>(Value::Object(object)) {
            Ok(entry) => {
                kept.insert(index, data.len());
                data.push(entry);
            }
            Err(e) => warn!("Skipping malformed {section} entry {index}: {e}"),
        }
    }

    let uncertainties = raw
        .uncertainties
        .into_iter()
        .filter_map(|u| {
            let Some(&entry_index) = kept.get(&u.entry_index) else {
                warn!(
                    "Dropping uncertainty for missing {section} entry {}",
                    u.entry_index
                );
                return None;
            };
            let Some(field) = canonical_field(section, &u.field) else {
                warn!("Dropping uncertainty on unknown {section} field '{}'", u.field);
                return None;
            };
            let reason = if u.reason.trim().is_empty() {
                "Please double-check this value".to_string()
            } else {
                u.reason
            };
            Some(Uncertainty {
                entry_index,
                field: field.to_string(),
                reason,
            })
        })
        .collect();

    ParseResult {
        success: true,
        data,
        uncertainties,
    }
}
