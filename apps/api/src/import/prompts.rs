// Section import LLM prompt templates.
// Placeholders: {section}, {schema}, {raw_text}.

pub const SECTION_PARSE_SYSTEM: &str = "\
You are a precise CV data extractor. \
You turn one section of a CV (pasted text or text extracted from a PDF) into structured JSON. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
Keep entries in the order they appear in the text, most recent first when the text does.";

pub const SECTION_PARSE_PROMPT: &str = r#"Extract every {section} entry from the CV text below.

INPUT TEXT:
{raw_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "entries": [ {schema} ],
  "uncertainties": [
    {"entryIndex": number, "field": "string", "reason": "string"}
  ]
}

RULES:
1. One object per entry. Use only the field names shown in the entry schema.
2. {uncertainty}
3. If the text contains no {section} entries, return {"entries": [], "uncertainties": []}.
4. Return ONLY the JSON object — nothing else, no code fences."#;

pub const EDUCATION_SCHEMA: &str = r#"{
    "degree": "string", "institution": "string", "field": "string (field of study)",
    "startYear": number | null, "endYear": number | null,
    "current": boolean (true if still enrolled),
    "gpa": "string" | null, "honors": "string" | null
  }"#;

pub const EXPERIENCE_SCHEMA: &str = r#"{
    "title": "string", "company": "string", "location": "string",
    "startDate": "string, exactly as written", "endDate": "string, exactly as written",
    "current": boolean (true if this is the current position),
    "achievements": ["string"]
  }"#;

pub const SKILLS_SCHEMA: &str = r#"{
    "name": "string",
    "category": "technical" | "soft" | "language" | "tool",
    "proficiency": "beginner" | "intermediate" | "advanced" | "expert" | null
  }"#;
