use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::documents::cv::strip_emphasis;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    /// Lines above the greeting: sender address, date, recipient.
    pub header: Vec<String>,
    pub greeting: Option<String>,
    pub paragraphs: Vec<String>,
    pub closing: Option<String>,
    pub signature: Vec<String>,
}

/// Splits a cover letter into greeting, body paragraphs, closing and signature.
pub fn parse_cover_letter(text: &str) -> CoverLetter {
    let lines: Vec<String> = text.lines().map(clean_line).collect();
    let mut letter = CoverLetter::default();

    let greeting = lines.iter().position(|l| is_greeting(l));
    let body_start = match greeting {
        Some(i) => {
            letter.header = non_empty(&lines[..i]);
            letter.greeting = Some(lines[i].clone());
            i + 1
        }
        None => 0,
    };

    let closing = lines[body_start..]
        .iter()
        .position(|l| closing_line().is_match(l))
        .map(|offset| body_start + offset);
    let body_end = match closing {
        Some(i) => {
            letter.closing = Some(lines[i].clone());
            letter.signature = non_empty(&lines[i + 1..]);
            i
        }
        None => lines.len(),
    };

    letter.paragraphs = paragraphs(&lines[body_start..body_end]);
    letter
}

fn clean_line(line: &str) -> String {
    let line = line.trim();
    if line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '=' | '_' | '*')) {
        return String::new();
    }
    strip_emphasis(line.trim_start_matches('#'))
}

fn is_greeting(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.starts_with("dear ") || lower.starts_with("to whom it may concern")
}

fn non_empty(lines: &[String]) -> Vec<String> {
    lines.iter().filter(|l| !l.is_empty()).cloned().collect()
}

/// Blank-line separated blocks, each joined into one line.
fn paragraphs(lines: &[String]) -> Vec<String> {
    lines
        .split(|l| l.is_empty())
        .filter(|block| !block.is_empty())
        .map(|block| block.join(" "))
        .collect()
}

/// A whole line that is only a sign-off phrase, e.g. "Best regards,".
fn closing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:sincerely(?: yours)?|(?:best|kind|warm|warmest) regards|regards|best|yours(?: \w+)?|thank you|thanks|respectfully)\s*[,.!]?$",
        )
        .expect("closing pattern is valid")
    })
}
