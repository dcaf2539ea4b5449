//! CV text structuring.
//!
//! Rebuilds name, contact details, summary and sections from AI-generated markdown-ish
//! text. Lines that fit no pattern are kept as plain text, never dropped.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const SUMMARY_TITLES: &[&str] = &["summary", "profile", "about", "objective"];
/// Words that mark an ALL-CAPS line as a section heading rather than a skill or acronym.
const SECTION_WORDS: &[&str] = &[
    "about", "achievements", "activities", "affiliations", "awards", "certificates",
    "certifications", "competencies", "courses", "education", "employment", "experience",
    "history", "hobbies", "honors", "honours", "interests", "languages", "licenses",
    "memberships", "objective", "profile", "projects", "publications", "qualifications",
    "references", "research", "skills", "summary", "training", "volunteer", "volunteering",
    "work",
];
const HEADING_SEPARATORS: &[char] = &['|', ',', '-', '–', '—', '·'];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvDocument {
    pub name: Option<String>,
    pub contact: Vec<String>,
    pub summary: Option<String>,
    pub sections: Vec<CvSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvSection {
    pub title: String,
    pub items: Vec<CvItem>,
    /// Lines that belong to the section but to no item (skill lists, free prose).
    pub text: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvItem {
    pub title: String,
    /// Company, institution or whatever followed the title in the heading.
    pub subtitle: Option<String>,
    /// Verbatim date range, e.g. "Jan 2020 – Present".
    pub dates: Option<String>,
    pub bullets: Vec<String>,
    pub text: Vec<String>,
}

pub fn parse_cv(text: &str) -> CvDocument {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut doc = CvDocument::default();

    let name_index = lines
        .iter()
        .position(|l| heading_level(l) == Some(1))
        .or_else(|| {
            lines
                .iter()
                .position(|l| !l.is_empty() && heading_level(l).map_or(true, |level| level == 1))
        });
    if let Some(i) = name_index {
        doc.name = Some(strip_emphasis(lines[i].trim_start_matches('#')));
    }

    let mut current: Option<CvSection> = None;
    let mut in_summary = false;

    for (i, line) in lines.iter().enumerate() {
        if Some(i) == name_index || line.is_empty() || is_rule(line) {
            continue;
        }

        if let Some(title) = section_title(line) {
            doc.sections.extend(current.take());
            in_summary = is_summary_title(&title);
            if !in_summary {
                current = Some(CvSection {
                    title,
                    ..Default::default()
                });
            }
            continue;
        }

        match current.as_mut() {
            Some(section) => section.push_line(line),
            None if !in_summary && is_contact(line) => doc.contact.extend(split_contact(line)),
            None => push_summary(&mut doc.summary, line),
        }
    }
    doc.sections.extend(current);

    doc
}

impl CvSection {
    fn push_line(&mut self, line: &str) {
        if let Some(heading) = item_heading(line) {
            self.items.push(CvItem::from_heading(&heading));
            return;
        }

        if let Some(bullet) = bullet_text(line) {
            match self.items.last_mut() {
                Some(item) => item.bullets.push(bullet),
                None => self.text.push(bullet),
            }
            return;
        }

        let text = strip_emphasis(line);
        match self.items.last_mut() {
            Some(item) if item.dates.is_none() && is_date_range(&text) => {
                item.dates = Some(clean_dates(&text));
            }
            Some(item) => item.text.push(text),
            None => self.text.push(text),
        }
    }
}

impl CvItem {
    /// Splits `Title | Company | Dates`, `Title at Company (Dates)` and similar headings.
    fn from_heading(heading: &str) -> Self {
        let (rest, dates) = split_trailing_dates(heading);

        let (title, subtitle) = if rest.contains('|') {
            let mut parts = rest.split('|').map(str::trim).filter(|p| !p.is_empty());
            let title = parts.next().unwrap_or_default().to_string();
            let subtitle = parts.collect::<Vec<_>>().join(" | ");
            (title, Some(subtitle).filter(|s| !s.is_empty()))
        } else {
            match [" at ", " — ", " – ", ", "]
                .iter()
                .find_map(|sep| rest.split_once(sep))
            {
                Some((title, subtitle)) => (
                    title.trim().to_string(),
                    Some(subtitle.trim().to_string()).filter(|s| !s.is_empty()),
                ),
                None => (rest.trim().to_string(), None),
            }
        };

        CvItem {
            title,
            subtitle,
            dates,
            ..Default::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Line classification
// ────────────────────────────────────────────────────────────────────────────

/// Number of leading `#` when the line is a markdown heading.
fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|c| *c == '#').count();
    let is_heading = level > 0 && line[level..].starts_with(' ');
    is_heading.then_some(level)
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '=' | '_' | '*'))
}

fn section_title(line: &str) -> Option<String> {
    match heading_level(line) {
        Some(1) | Some(2) => return Some(clean_title(line.trim_start_matches('#'))),
        Some(_) => return None,
        None => {}
    }

    if let Some(caps) = bold_line().captures(line) {
        let inner = caps[1].trim();
        let trailing = caps[2].trim();
        if (inner.ends_with(':') && trailing.is_empty()) || (!inner.is_empty() && trailing == ":") {
            return Some(clean_title(inner));
        }
        return None;
    }

    is_all_caps_heading(line).then(|| clean_title(line))
}

fn clean_title(raw: &str) -> String {
    strip_emphasis(raw).trim_end_matches(':').trim().to_string()
}

/// `WORK EXPERIENCE`, `SKILLS & LANGUAGES:`. Bare acronyms such as `AWS` stay text.
fn is_all_caps_heading(line: &str) -> bool {
    let text = line.trim_end_matches(':');
    let shaped = text.split_whitespace().count() <= 4
        && text.chars().next().is_some_and(|c| c.is_alphabetic())
        && text
            .chars()
            .all(|c| c.is_uppercase() || matches!(c, ' ' | '&' | '/' | '-' | '\''));

    shaped
        && text
            .split(|c: char| !c.is_alphabetic())
            .any(|word| SECTION_WORDS.contains(&word.to_lowercase().as_str()))
}

fn is_summary_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    SUMMARY_TITLES.iter().any(|t| lower.contains(t))
}

fn item_heading(line: &str) -> Option<String> {
    if heading_level(line).is_some_and(|level| level >= 3) {
        return Some(strip_emphasis(line.trim_start_matches('#')));
    }
    let caps = bold_line().captures(line)?;
    // `**Languages:** Rust, Go` is a labelled line, not a heading.
    let labelled = caps[1].trim().ends_with(':') && !caps[2].trim().is_empty();
    (!labelled).then(|| strip_emphasis(line))
}

fn bullet_text(line: &str) -> Option<String> {
    ["- ", "* ", "• ", "•", "– "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(strip_emphasis)
}

fn is_contact(line: &str) -> bool {
    line.contains('@') || line.contains('|') || phone().is_match(line) || url().is_match(line)
}

fn split_contact(line: &str) -> Vec<String> {
    line.split(['|', '•', '·'])
        .map(strip_emphasis)
        .filter(|part| !part.is_empty())
        .collect()
}

fn push_summary(summary: &mut Option<String>, line: &str) {
    let text = bullet_text(line).unwrap_or_else(|| strip_emphasis(line));
    match summary {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(&text);
        }
        None => *summary = Some(text),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dates and emphasis
// ────────────────────────────────────────────────────────────────────────────

fn split_trailing_dates(heading: &str) -> (String, Option<String>) {
    match date_range().find(heading) {
        Some(m) => {
            let rest = heading[..m.start()]
                .trim_end()
                .trim_end_matches(|c: char| HEADING_SEPARATORS.contains(&c) || c.is_whitespace());
            (rest.to_string(), Some(clean_dates(m.as_str())))
        }
        None => (heading.trim().to_string(), None),
    }
}

fn is_date_range(text: &str) -> bool {
    date_range().find(text).is_some_and(|m| m.start() == 0)
}

fn clean_dates(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}

pub(crate) fn strip_emphasis(text: &str) -> String {
    let text = text.trim().replace("**", "").replace("__", "");
    single_emphasis().replace_all(&text, "$1").trim().to_string()
}

fn date_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let date = r"(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+)?(?:\d{1,2}/)?\d{4}";
        Regex::new(&format!(
            r"(?i)\(?\s*{date}\s*(?:-|–|—|to)\s*(?:{date}|present|current|now)\s*\)?\s*$"
        ))
        .expect("date range pattern is valid")
    })
}

fn bold_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*\*(.+?)\*\*(.*)$").expect("bold pattern is valid"))
}

fn single_emphasis() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*([^*\s][^*]*?)\*").expect("emphasis pattern is valid"))
}

fn phone() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("phone pattern is valid"))
}

fn url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)https?://\S+|www\.\S+|\b(?:linkedin|github|gitlab)\.com/\S*")
            .expect("url pattern is valid")
    })
}
