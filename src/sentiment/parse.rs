// src/sentiment/parse.rs
//! Tolerant decoding of the model reply into a [`SentimentRecord`].
//!
//! Order of attempts: strip a code fence, parse the whole text as a JSON
//! object, then parse the first balanced `{...}` span found by a depth scan.
//! A reply that carries the refusal sentence and no object is a refusal.

use serde_json::{Map, Value};

use super::prompt::REFUSAL_SENTENCE;
use super::{SentimentCounts, SentimentRecord, DEFAULT_EXPLANATION, DEFAULT_SENTIMENT};

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Record(SentimentRecord),
    /// Off-topic input; carries the model's refusal text, quotes removed.
    Refusal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    Empty,
    NoJson,
    BadJson(String),
}

/// Decode a raw model reply.
pub fn interpret(raw: &str) -> Result<Reply, ReplyError> {
    let content = strip_code_fences(raw);
    if content.is_empty() {
        return Err(ReplyError::Empty);
    }

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(content) {
        return Ok(Reply::Record(record_from_object(&obj)));
    }

    let Some(span) = first_balanced_object(content) else {
        if is_refusal(content) {
            return Ok(Reply::Refusal(unquote(content).to_string()));
        }
        return Err(ReplyError::NoJson);
    };

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(obj)) => Ok(Reply::Record(record_from_object(&obj))),
        Ok(_) => Err(ReplyError::BadJson("expected a JSON object".to_string())),
        Err(e) => Err(ReplyError::BadJson(e.to_string())),
    }
}

/// Remove a leading fence marker (```` ``` ```` plus an optional language tag)
/// and a trailing fence. Works for one-line replies too.
pub fn strip_code_fences(s: &str) -> &str {
    let mut s = s.trim();
    if let Some(rest) = s.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        s = &rest[tag_len..];
    }
    if let Some(head) = s.trim_end().strip_suffix("```") {
        s = head;
    }
    s.trim()
}

/// First `{...}` span whose braces balance, ignoring braces inside JSON strings.
pub fn first_balanced_object(s: &str) -> Option<&str> {
    s.char_indices()
        .filter(|&(_, c)| c == '{')
        .find_map(|(start, _)| balanced_from(s, start))
}

fn balanced_from(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

// The prompt shows the sentence in quotes; models often echo them.
fn unquote(s: &str) -> &str {
    s.trim().trim_matches(['"', '\u{201c}', '\u{201d}']).trim()
}

fn is_refusal(content: &str) -> bool {
    let normalized = content.replace('\u{2019}', "'");
    normalized.contains(REFUSAL_SENTENCE)
}

fn record_from_object(obj: &Map<String, Value>) -> SentimentRecord {
    let bullets = match obj.get("summary_points") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };

    SentimentRecord {
        bullets,
        overall_sentiment: non_empty_str(obj.get("overall_sentiment"))
            .unwrap_or(DEFAULT_SENTIMENT)
            .to_string(),
        counts: counts_from(obj.get("counts")),
        explanation: non_empty_str(obj.get("sentiment_explainer"))
            .unwrap_or(DEFAULT_EXPLANATION)
            .to_string(),
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn counts_from(v: Option<&Value>) -> SentimentCounts {
    let Some(Value::Object(map)) = v else {
        return SentimentCounts::default();
    };
    SentimentCounts {
        positive: count_value(map.get("positive")),
        neutral: count_value(map.get("neutral")),
        negative: count_value(map.get("negative")),
    }
}

// Negative or non-numeric counts read as 0.
fn count_value(v: Option<&Value>) -> u32 {
    let n = match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    n.map(|x| x.min(u32::MAX as u64) as u32).unwrap_or(0)
}
