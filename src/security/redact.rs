//! Pattern-based redaction of sensitive text.
//!
//! The rule list is fixed and ordered. Each pass applies every rule once,
//! left to right; passes repeat until the text stops changing. No rule can
//! match inside a label, so the loop terminates and its output matches no
//! rule at all.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Category of sensitive data a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrubKind {
    ApiKey,
    Email,
    Phone,
    NationalId,
    PaymentCard,
}

impl fmt::Display for ScrubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrubKind::ApiKey => write!(f, "api_key"),
            ScrubKind::Email => write!(f, "email"),
            ScrubKind::Phone => write!(f, "phone"),
            ScrubKind::NationalId => write!(f, "national_id"),
            ScrubKind::PaymentCard => write!(f, "payment_card"),
        }
    }
}

/// A single redaction rule.
#[derive(Debug)]
pub struct ScrubRule {
    pub kind: ScrubKind,
    pub matcher: Regex,
    pub label: &'static str,
}

impl ScrubRule {
    fn new(kind: ScrubKind, pattern: &str, label: &'static str) -> Self {
        Self {
            kind,
            matcher: Regex::new(pattern).expect("built-in scrub pattern must compile"),
            label,
        }
    }
}

static RULES: LazyLock<Vec<ScrubRule>> = LazyLock::new(|| {
    vec![
        ScrubRule::new(
            ScrubKind::ApiKey,
            r"\bsk-[A-Za-z0-9]{20,}\b",
            "[API_KEY_REDACTED]",
        ),
        ScrubRule::new(
            ScrubKind::Email,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            "[EMAIL_REDACTED]",
        ),
        ScrubRule::new(
            ScrubKind::Phone,
            r"(?:(?:\+1[-.\s]?)?\([0-9]{3}\)|(?:\+1[-.\s]?|\b)[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
            "[PHONE_REDACTED]",
        ),
        ScrubRule::new(
            ScrubKind::NationalId,
            r"\b[0-9]{3}-?[0-9]{2}-?[0-9]{4}\b",
            "[SSN_REDACTED]",
        ),
        ScrubRule::new(
            ScrubKind::PaymentCard,
            r"\b[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4}[-\s]?[0-9]{4}\b",
            "[CARD_REDACTED]",
        ),
    ]
});

/// The ordered rule list.
pub fn rules() -> &'static [ScrubRule] {
    &RULES
}

/// Replace every sensitive substring of `text` with its category label.
pub fn scrub(text: &str) -> String {
    let mut current = text.to_owned();
    loop {
        let mut changed = false;
        for rule in rules() {
            if rule.matcher.is_match(&current) {
                current = rule.matcher.replace_all(&current, rule.label).into_owned();
                changed = true;
            }
        }
        if !changed {
            return current;
        }
    }
}

/// Scrub every string reachable inside `value`, preserving shape and key order.
pub fn scrub_deep(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(scrub(s)),
        Value::Array(items) => Value::Array(items.iter().map(scrub_deep).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), scrub_deep(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Like [`scrub_deep`], also reporting whether anything was replaced.
pub fn scrub_deep_tracked(value: &Value) -> (Value, bool) {
    let scrubbed = scrub_deep(value);
    let altered = scrubbed != *value;
    (scrubbed, altered)
}

/// Categories present in `text`, in rule order.
pub fn detect(text: &str) -> Vec<ScrubKind> {
    rules()
        .iter()
        .filter(|rule| rule.matcher.is_match(text))
        .map(|rule| rule.kind)
        .collect()
}
