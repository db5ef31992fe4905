//! Turns raw provider output into a schema-valid [`PersonaRecord`].
//!
//! Parsing is attempted strictly first, then leniently (surrounding prose,
//! markdown fences, trailing commas), and finally each known field is coerced
//! to its expected shape. A field that still does not fit rejects the record.
//! Citations are then resolved against the activity samples the provider saw.

use std::sync::LazyLock;

use persona_core::{ActivityItem, Citation, Demographics, PersonaRecord, ScoreMap};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::provider::RawProviderOutput;

const MAX_LIST_ENTRIES: usize = 10;
const MAX_ENTRY_CHARS: usize = 300;
const MAX_QUOTE_CHARS: usize = 500;
const MAX_CITATIONS: usize = 10;
pub(crate) const CITATION_EXCERPT_CHARS: usize = 100;

static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid fenced block regex")
});
static FIRST_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer regex"));

/// Source keys for each list field, canonical name first.
const LIST_FIELDS: &[&[&str]] = &[
    &["traits"],
    &["behavior_habits", "behaviors"],
    &["frustrations"],
    &["goals", "goals_needs"],
    &["interests"],
    &["social_views"],
];
const TEXT_FIELDS: &[&[&str]] = &[
    &["name"],
    &["tier"],
    &["archetype"],
    &["personality_type", "mbti", "mbti_type"],
    &["quote"],
];
const SCORE_FIELDS: &[&str] = &["motivations", "personality"];
const DEMOGRAPHIC_FIELDS: &[&str] = &["age", "gender", "occupation", "status", "location"];

/// Normalizes `raw` into a record for `username`.
///
/// The returned record's metadata is a placeholder; the caller stamps source
/// and confidence.
///
/// # Errors
///
/// Returns [`SchemaError`] when no JSON object can be recovered, when the
/// object carries no persona fields, or when a field is structurally invalid
/// after coercion.
pub fn normalize(raw: &RawProviderOutput, username: &str) -> Result<PersonaRecord, SchemaError> {
    let object = match raw {
        RawProviderOutput::Json(Value::Object(map)) => map.clone(),
        RawProviderOutput::Json(_) => return Err(SchemaError::NotAnObject),
        RawProviderOutput::Text(text) => parse_text(text)?,
    };
    coerce_record(&object, username)
}

fn parse_text(text: &str) -> Result<Map<String, Value>, SchemaError> {
    let strict_is_json = match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => true,
        Err(_) => false,
    };

    match parse_lenient(text) {
        Some(map) => Ok(map),
        None if strict_is_json => Err(SchemaError::NotAnObject),
        None => Err(SchemaError::NoJsonPayload),
    }
}

fn parse_lenient(text: &str) -> Option<Map<String, Value>> {
    let body = FENCED
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &body[start..=end];
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => return Some(map),
        Ok(_) => return None,
        Err(_) => {}
    }
    match serde_json::from_str::<Value>(&strip_trailing_commas(candidate)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Drops commas that directly precede `}` or `]`, leaving string literals
/// untouched.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = json.chars();

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let rest = chars.clone().find(|n| !n.is_whitespace());
                if !matches!(rest, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn lookup<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k))
}

fn has_persona_fields(object: &Map<String, Value>) -> bool {
    let mut known = LIST_FIELDS
        .iter()
        .chain(TEXT_FIELDS)
        .flat_map(|keys| keys.iter())
        .chain(SCORE_FIELDS)
        .chain(DEMOGRAPHIC_FIELDS)
        .chain(&["demographics"]);
    known.any(|k| object.contains_key(*k))
}

fn coerce_record(object: &Map<String, Value>, username: &str) -> Result<PersonaRecord, SchemaError> {
    if !has_persona_fields(object) {
        return Err(SchemaError::NoPersonaFields);
    }

    let mut record = PersonaRecord::empty(username, "");
    record.name = text_field(object, TEXT_FIELDS[0])?;
    record.tier = text_field(object, TEXT_FIELDS[1])?;
    record.archetype = text_field(object, TEXT_FIELDS[2])?;
    record.personality_type = text_field(object, TEXT_FIELDS[3])?;
    record.quote = text_field(object, TEXT_FIELDS[4])?
        .map(|q| truncate(&q, MAX_QUOTE_CHARS))
        .unwrap_or_default();

    record.traits = list_field(object, LIST_FIELDS[0])?;
    record.behavior_habits = list_field(object, LIST_FIELDS[1])?;
    record.frustrations = list_field(object, LIST_FIELDS[2])?;
    record.goals = list_field(object, LIST_FIELDS[3])?;
    record.interests = list_field(object, LIST_FIELDS[4])?;
    record.social_views = list_field(object, LIST_FIELDS[5])?;

    record.motivations = score_field(object, "motivations")?;
    record.personality = score_field(object, "personality")?;
    record.demographics = demographics(object)?;
    record.citations = citations(object)?;

    Ok(record)
}

/// Coerces the `citations` list. Entries lacking a trait or a source id are
/// skipped; entries that are not objects reject the record.
fn citations(object: &Map<String, Value>) -> Result<Vec<Citation>, SchemaError> {
    const FIELD: &str = "citations";
    let entries = match object.get(FIELD) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(_) => return Err(SchemaError::invalid(FIELD, "expected a list")),
    };

    let mut citations = Vec::new();
    for entry in entries {
        let Value::Object(map) = entry else {
            return Err(SchemaError::invalid(FIELD, "expected a list of objects"));
        };
        let text = |keys: &[&str]| match lookup(map, keys) {
            Some(value) => scalar_text(FIELD, value),
            None => Ok(None),
        };
        let (Some(trait_name), Some(source_id)) =
            (text(&["trait", "trait_name"])?, text(&["source_id", "source"])?)
        else {
            continue;
        };
        citations.push(Citation {
            trait_name: truncate(&trait_name, MAX_ENTRY_CHARS),
            evidence: text(&["evidence"])?
                .map(|e| truncate(&e, MAX_ENTRY_CHARS))
                .unwrap_or_default(),
            source_id,
            community: text(&["subreddit", "community"])?
                .map(|c| c.trim_start_matches("r/").to_string()),
            quote: text(&["quote"])?
                .map(|q| truncate(&q, MAX_ENTRY_CHARS))
                .unwrap_or_default(),
            ..Citation::default()
        });
        if citations.len() == MAX_CITATIONS {
            break;
        }
    }
    Ok(citations)
}

/// Links each citation to the sample it names and fills the source fields
/// from that item. Citations naming an item outside `samples` are dropped.
pub fn resolve_citations(record: &mut PersonaRecord, samples: &[ActivityItem]) {
    let citations = std::mem::take(&mut record.citations);
    record.citations = citations
        .into_iter()
        .filter_map(|citation| {
            let item = samples
                .iter()
                .find(|item| same_item(&item.id, &citation.source_id))?;
            Some(cite(citation, item))
        })
        .collect();
}

/// Fills a citation's source fields from `item`.
pub(crate) fn cite(mut citation: Citation, item: &ActivityItem) -> Citation {
    citation.source_id.clone_from(&item.id);
    citation.source_type = Some(item.kind);
    citation.community = Some(item.community.clone());
    citation.score = Some(item.score);
    citation.permalink = (!item.permalink.is_empty()).then(|| item.permalink.clone());
    if citation.quote.is_empty() {
        citation.quote = item.excerpt(CITATION_EXCERPT_CHARS);
    }
    citation
}

/// Compares ids with or without the `t1_`/`t3_` kind prefix.
fn same_item(item_id: &str, cited: &str) -> bool {
    bare_id(item_id).eq_ignore_ascii_case(bare_id(cited))
}

fn bare_id(id: &str) -> &str {
    let id = id.trim();
    match id.split_once('_') {
        Some((prefix, rest)) if prefix.len() == 2 && prefix.starts_with(['t', 'T']) => rest,
        _ => id,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn scalar_text(field: &str, value: &Value) -> Result<Option<String>, SchemaError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(SchemaError::invalid(field, "expected text")),
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, SchemaError> {
    match lookup(object, keys) {
        Some(value) => scalar_text(keys[0], value),
        None => Ok(None),
    }
}

fn list_field(object: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>, SchemaError> {
    let field = keys[0];
    let entries = match lookup(object, keys) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| scalar_text(field, v))
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::Object(_)) => return Err(SchemaError::invalid(field, "expected a list")),
        Some(scalar) => vec![scalar_text(field, scalar)?],
    };

    Ok(entries
        .into_iter()
        .flatten()
        .map(|e| truncate(&e, MAX_ENTRY_CHARS))
        .take(MAX_LIST_ENTRIES)
        .collect())
}

fn score_field(object: &Map<String, Value>, field: &str) -> Result<ScoreMap, SchemaError> {
    let map = match object.get(field) {
        None | Some(Value::Null) => return Ok(ScoreMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(SchemaError::invalid(field, "expected an object of scores")),
    };

    let mut scores = ScoreMap::new();
    for (name, value) in map {
        let name = name.trim();
        if name.is_empty() || value.is_null() {
            continue;
        }
        let score = coerce_score(value)
            .ok_or_else(|| SchemaError::invalid(field, format!("score for `{name}` is not numeric")))?;
        scores.insert(name, score);
    }
    Ok(scores)
}

/// Numbers, numeric strings, and percent strings, rounded and clamped to
/// `0..=100`.
fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = number.round().clamp(0.0, 100.0) as u8;
    Some(score)
}

fn coerce_age(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => FIRST_INT.find(s)?.as_str().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let age = number.round().min(f64::from(u8::MAX)) as u8;
    Some(age)
}

fn demographics(object: &Map<String, Value>) -> Result<Demographics, SchemaError> {
    let nested = match object.get("demographics") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(SchemaError::invalid("demographics", "expected an object")),
    };
    let field = |key: &str| nested.and_then(|m| m.get(key)).or_else(|| object.get(key));
    let text = |key: &str| match field(key) {
        Some(value) => scalar_text(key, value),
        None => Ok(None),
    };

    Ok(Demographics {
        age: field("age").and_then(coerce_age),
        gender: text("gender")?,
        occupation: text("occupation")?,
        status: text("status")?,
        location: text("location")?,
    })
}
