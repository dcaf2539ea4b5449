// Structuring of AI-generated CVs and cover letters. Pure text heuristics, no LLM calls.

pub mod cover_letter;
pub mod cv;
pub mod handlers;
