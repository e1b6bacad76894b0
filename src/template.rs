//! Tolerant `${name}` placeholder substitution for prompt templates.
//!
//! Unknown or missing placeholders are left as literal text rather than
//! erroring, so a template that mentions `${something_else}` still
//! renders.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const QUESTION_PLACEHOLDER: &str = "user_question";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"))
}

pub fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Substitute the test question into a prompt template.
pub fn substitute_question(template: &str, question: &str) -> String {
    let mut vars = HashMap::new();
    vars.insert(QUESTION_PLACEHOLDER, question.to_string());
    substitute(template, &vars)
}
