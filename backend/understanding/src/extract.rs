//! Correction extractor: turns a free-form model reply into a `CorrectionResult`.
//!
//! The reply format is not contractually fixed, so each field is recovered by
//! an ordered list of strategies, strict to loose, and the first one that
//! yields data wins. A fenced JSON block carrying an `errors` list short-cuts
//! the whole pipeline; otherwise every field is parsed out of labeled text
//! sections and falls back to the generic defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use quill_core::{
    default_grammar_errors, default_suggestions, ChatFrame, CorrectionResult, DetailedError,
    MAX_DETAILED_ERRORS, MAX_GRAMMAR_ERRORS, MAX_SUGGESTIONS,
};

/// Error type attached to pairs recovered from arrow notation.
pub const ARROW_ERROR_TYPE: &str = "语法错误";

/// Explanation attached to pairs recovered from arrow notation.
pub const ARROW_EXPLANATION: &str = "需要修改的语法问题";

// --- Section labels ---

const SUGGESTIONS: &str = "改进建议";
const GRAMMAR_ERRORS: &str = "语法错误";
const DETAILED_ANALYSIS: &str = "详细错误分析";
const CORRECTED_TEXT: &str = "修改后的(?:完整)?文本";
const CORRECTED: &str = "修正后";
const SCORE: &str = "评分";

/// A label followed by a colon, tolerating markdown bold around it.
fn label_pattern(label: &str) -> Regex {
    Regex::new(&format!(r"\**(?:{label})\**\s*[:：]\**")).unwrap()
}

static SUGGESTIONS_RE: Lazy<Regex> = Lazy::new(|| label_pattern(SUGGESTIONS));
static GRAMMAR_ERRORS_RE: Lazy<Regex> = Lazy::new(|| label_pattern(GRAMMAR_ERRORS));
static DETAILED_ANALYSIS_RE: Lazy<Regex> = Lazy::new(|| label_pattern(DETAILED_ANALYSIS));
static CORRECTED_TEXT_RE: Lazy<Regex> = Lazy::new(|| label_pattern(CORRECTED_TEXT));
static CORRECTED_RE: Lazy<Regex> = Lazy::new(|| label_pattern(CORRECTED));

/// Any known label, including a leading list number or heading marker, so a
/// section body stops cleanly before "5. 评分：" or "### 改进建议：".
static ANY_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    let labels = [
        SUGGESTIONS,
        GRAMMAR_ERRORS,
        DETAILED_ANALYSIS,
        CORRECTED_TEXT,
        CORRECTED,
        SCORE,
    ]
    .join("|");
    Regex::new(&format!(
        r"(?:#+[ \t]*)?(?:\d+[.、)][ \t]*)?\**(?:{labels})\**\s*[:：]"
    ))
    .unwrap()
});

static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());

static FENCED_ANY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").unwrap());

/// Sub-field labels inside the detailed analysis section.
static SUBFIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\**(原始|修改|类型|解释)\**\s*[:：]").unwrap());

static ARROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"→|⇒|->").unwrap());

type Strategy<T> = fn(&str) -> Option<T>;

/// Detailed-error strategies, strict to loose.
const DETAILED_STRATEGIES: [Strategy<Vec<DetailedError>>; 3] =
    [fenced_records, labeled_records, arrow_records];

/// Corrected-text strategies, strict to loose.
const CORRECTED_STRATEGIES: [Strategy<String>; 3] =
    [corrected_text_section, corrected_section, fenced_corrected_text];

fn first_success<T>(text: &str, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(text))
}

/// Extract a result from the accumulated frames of one session.
pub fn extract(frames: &[ChatFrame]) -> CorrectionResult {
    let response = concat_frames(frames);
    info!(
        frames = frames.len(),
        response_len = response.len(),
        "Extracting correction from reply"
    );
    extract_from_text(&response)
}

/// Join every content fragment in arrival order.
///
/// `payload.choices` is the normal location; `payload.message` is only
/// consulted when no frame carried anything under `choices`.
pub fn concat_frames(frames: &[ChatFrame]) -> String {
    let primary: String = frames.iter().flat_map(|f| f.choice_texts()).collect();
    if !primary.is_empty() {
        return primary;
    }
    frames.iter().flat_map(|f| f.message_texts()).collect()
}

/// Extract a result from the concatenated reply text.
pub fn extract_from_text(response: &str) -> CorrectionResult {
    let result = match structured_result(response) {
        Some(result) => {
            debug!(
                errors = result.detailed_errors.len(),
                "Structured block supplied the correction"
            );
            result
        }
        None => pattern_result(response),
    };
    result.capped()
}

/// Whole-result strategy: a fenced JSON block with an error list.
fn structured_result(response: &str) -> Option<CorrectionResult> {
    let value = fenced_json(response)?;
    let (candidates, suggestions, corrected_text) = match &value {
        Value::Array(items) => (items.as_slice(), Vec::new(), String::new()),
        Value::Object(map) => {
            let errors = map.get("errors")?.as_array()?;
            let suggestions = string_list(map.get("improvement_suggestions"), MAX_SUGGESTIONS);
            let corrected_text = string_field(map, "corrected_text").unwrap_or_default();
            (errors.as_slice(), suggestions, corrected_text)
        }
        _ => return None,
    };

    let detailed_errors = admit_records(candidates);
    if detailed_errors.is_empty() {
        debug!("Structured block had no complete error records");
        return None;
    }

    Some(CorrectionResult {
        feedback: String::new(),
        suggestions,
        grammar_errors: Vec::new(),
        detailed_errors,
        corrected_text,
    })
}

/// Field-by-field parse of labeled text sections.
fn pattern_result(response: &str) -> CorrectionResult {
    let suggestions = labeled_lines(response, &SUGGESTIONS_RE, MAX_SUGGESTIONS)
        .unwrap_or_else(default_suggestions);
    let grammar_errors = labeled_lines(response, &GRAMMAR_ERRORS_RE, MAX_GRAMMAR_ERRORS)
        .unwrap_or_else(default_grammar_errors);
    let detailed_errors = first_success(response, &DETAILED_STRATEGIES).unwrap_or_default();
    let corrected_text = first_success(response, &CORRECTED_STRATEGIES).unwrap_or_default();

    debug!(
        suggestions = suggestions.len(),
        grammar_errors = grammar_errors.len(),
        detailed_errors = detailed_errors.len(),
        corrected_len = corrected_text.len(),
        "Text sections parsed"
    );

    CorrectionResult {
        feedback: response.to_string(),
        suggestions,
        grammar_errors,
        detailed_errors,
        corrected_text,
    }
}

// --- Section helpers ---

/// Body of the first section introduced by `label`, up to the next known
/// label or the end of the text.
fn section<'a>(text: &'a str, label: &Regex) -> Option<&'a str> {
    let start = label.find(text)?.end();
    let rest = &text[start..];
    let end = ANY_LABEL_RE.find(rest).map_or(rest.len(), |m| m.start());
    Some(rest[..end].trim())
}

/// Non-empty trimmed lines of a section, capped. `None` when the section is
/// absent or has no content.
fn labeled_lines(text: &str, label: &Regex, cap: usize) -> Option<Vec<String>> {
    let body = section(text, label)?;
    let lines: Vec<String> = body
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .take(cap)
        .map(str::to_string)
        .collect();
    (!lines.is_empty()).then_some(lines)
}

fn clean_line(line: &str) -> &str {
    line.trim().trim_matches('*').trim()
}

/// Remove fenced JSON blocks and unwrap any other fences.
fn strip_fences(text: &str) -> String {
    let without_json = FENCED_JSON_RE.replace_all(text, "");
    let unwrapped = FENCED_ANY_RE.replace_all(&without_json, "$1");
    unwrapped.replace("```", "").trim().to_string()
}

// --- Structured block helpers ---

/// The first fenced JSON block that parses.
fn fenced_json(text: &str) -> Option<Value> {
    FENCED_JSON_RE.captures_iter(text).find_map(|caps| {
        match serde_json::from_str::<Value>(&caps[1]) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Skipping unparseable fenced block");
                None
            }
        }
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>, cap: usize) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(text)) => text.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .iter()
        .map(|s| clean_line(s))
        .filter(|s| !s.is_empty())
        .take(cap)
        .map(str::to_string)
        .collect()
}

fn record_from_value(value: &Value) -> Option<DetailedError> {
    let map = value.as_object()?;
    let field = |key: &str| map.get(key).and_then(Value::as_str);
    DetailedError::new(
        field("original")?,
        field("corrected")?,
        field("error_type").or_else(|| field("type"))?,
        field("explanation")?,
    )
}

/// Complete records only, capped.
fn admit_records(candidates: &[Value]) -> Vec<DetailedError> {
    candidates
        .iter()
        .filter_map(record_from_value)
        .take(MAX_DETAILED_ERRORS)
        .collect()
}

// --- Detailed error strategies ---

/// A fenced block holding a list, an `errors` list, or a single record.
fn fenced_records(text: &str) -> Option<Vec<DetailedError>> {
    let value = fenced_json(text)?;
    let records = match &value {
        Value::Array(items) => admit_records(items),
        Value::Object(map) => match map.get("errors").and_then(Value::as_array) {
            Some(errors) => admit_records(errors),
            None => admit_records(std::slice::from_ref(&value)),
        },
        _ => Vec::new(),
    };
    (!records.is_empty()).then_some(records)
}

#[derive(Default)]
struct PartialRecord {
    original: Option<String>,
    corrected: Option<String>,
    error_type: Option<String>,
    explanation: Option<String>,
}

impl PartialRecord {
    fn set(&mut self, label: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        let slot = match label {
            "原始" => &mut self.original,
            "修改" => &mut self.corrected,
            "类型" => &mut self.error_type,
            "解释" => &mut self.explanation,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    /// Take the record once all four fields are collected.
    fn take_complete(&mut self) -> Option<DetailedError> {
        if self.original.is_none()
            || self.corrected.is_none()
            || self.error_type.is_none()
            || self.explanation.is_none()
        {
            return None;
        }
        let done = std::mem::take(self);
        DetailedError::new(
            done.original.unwrap_or_default(),
            done.corrected.unwrap_or_default(),
            done.error_type.unwrap_or_default(),
            done.explanation.unwrap_or_default(),
        )
    }
}

/// Line scan of the detailed analysis section for 原始/修改/类型/解释 fields.
fn labeled_records(text: &str) -> Option<Vec<DetailedError>> {
    let body = section(text, &DETAILED_ANALYSIS_RE)?;
    let mut records = Vec::new();
    let mut current = PartialRecord::default();

    for line in body.lines() {
        let labels: Vec<_> = SUBFIELD_RE.captures_iter(line).collect();
        for (i, caps) in labels.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let value_end = labels
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(line.len(), |m| m.start());
            current.set(name.as_str(), &line[whole.end()..value_end]);
            if let Some(record) = current.take_complete() {
                records.push(record);
            }
        }
        if records.len() >= MAX_DETAILED_ERRORS {
            break;
        }
    }

    records.truncate(MAX_DETAILED_ERRORS);
    (!records.is_empty()).then_some(records)
}

/// Lines of the form `original → corrected` anywhere in the reply.
fn arrow_records(text: &str) -> Option<Vec<DetailedError>> {
    let records: Vec<DetailedError> = text
        .lines()
        .filter_map(|line| {
            let arrow = ARROW_RE.find(line)?;
            DetailedError::new(
                clean_line(&line[..arrow.start()]),
                clean_line(&line[arrow.end()..]),
                ARROW_ERROR_TYPE,
                ARROW_EXPLANATION,
            )
        })
        .take(MAX_DETAILED_ERRORS)
        .collect();
    (!records.is_empty()).then_some(records)
}

// --- Corrected text strategies ---

fn corrected_text_section(text: &str) -> Option<String> {
    section(text, &CORRECTED_TEXT_RE)
        .map(strip_fences)
        .filter(|s| !s.is_empty())
}

fn corrected_section(text: &str) -> Option<String> {
    section(text, &CORRECTED_RE)
        .map(strip_fences)
        .filter(|s| !s.is_empty())
}

fn fenced_corrected_text(text: &str) -> Option<String> {
    match fenced_json(text)? {
        Value::Object(map) => string_field(&map, "corrected_text"),
        _ => None,
    }
}
