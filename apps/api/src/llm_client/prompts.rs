// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// this file only holds what several of them repeat.

/// Asks the model to flag what it guessed instead of silently inventing it.
pub const UNCERTAINTY_INSTRUCTION: &str = "\
    Never invent values. If a value is missing, leave it empty. \
    If a value is present but ambiguous (abbreviations, unclear dates, several possible \
    readings), keep your best reading AND report it in \"uncertainties\" with the entry's \
    zero-based index, the field name, and a short reason a user can act on.";
