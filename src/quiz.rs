//! Quiz response normalizer.
//!
//! Turns untrusted model output into a validated, non-empty list of
//! [`QuizQuestion`]s. The caller never sees malformed data:
//!
//! 1. Take the first fenced (```) segment if there is one, dropping a leading
//!    language tag such as `json`.
//! 2. Truncate to the span between the first `[` and the last `]`.
//! 3. Strict JSON parse.
//! 4. Keep only well-formed entries.
//! 5. Nothing usable: the topic fallback set (10 questions).
//! 6. Structurally broken entries abort the run: the generic fallback set (5 questions).
//!
//! Pure and deterministic: the same input always yields the same output.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{AnswerKey, QuizQuestion};
use crate::seeds::{generic_fallback_quiz, topic_fallback_quiz};

const FENCE: &str = "```";

/// Where the returned questions came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizSource {
  Generated,
  TopicFallback,
  GenericFallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedQuiz {
  pub questions: Vec<QuizQuestion>,
  pub source: QuizSource,
}

impl NormalizedQuiz {
  /// The fixed, topic-independent set.
  pub fn generic() -> Self {
    Self { questions: generic_fallback_quiz(), source: QuizSource::GenericFallback }
  }

  fn topic(topic: &str) -> Self {
    Self { questions: topic_fallback_quiz(topic), source: QuizSource::TopicFallback }
  }
}

/// Entry shapes the validator cannot reason about. Any of these aborts the run.
#[derive(Debug, thiserror::Error, PartialEq)]
enum ShapeError {
  #[error("entry {0} is a bare {1}")]
  ScalarEntry(usize, &'static str),
  #[error("entry {0} has options of type {1}")]
  UnsizedOptions(usize, &'static str),
}

/// Normalize raw model text into questions about `topic`.
pub fn normalize_quiz(raw: &str, topic: &str) -> NormalizedQuiz {
  match parse_questions(raw) {
    Ok(Some(questions)) => {
      debug!(target: "quiz", %topic, count = questions.len(), "Model questions accepted");
      NormalizedQuiz { questions, source: QuizSource::Generated }
    }
    Ok(None) => {
      debug!(target: "quiz", %topic, raw_len = raw.len(), "No usable questions; topic fallback");
      NormalizedQuiz::topic(topic)
    }
    Err(e) => {
      warn!(target: "quiz", %topic, error = %e, "Malformed quiz payload; generic fallback");
      NormalizedQuiz::generic()
    }
  }
}

/// `Ok(None)` means "nothing usable", `Err` means the payload was structurally broken.
fn parse_questions(raw: &str) -> Result<Option<Vec<QuizQuestion>>, ShapeError> {
  let text = match fenced_segment(raw) {
    Some(seg) => strip_language_tag(seg),
    None => raw,
  };
  let span = bracket_span(text).trim();

  let items = match serde_json::from_str::<Value>(span) {
    Ok(Value::Array(items)) if !items.is_empty() => items,
    Ok(_) => return Ok(None),
    Err(e) => {
      debug!(target: "quiz", error = %e, "Quiz JSON did not parse");
      return Ok(None);
    }
  };

  let mut valid = Vec::with_capacity(items.len());
  for (index, item) in items.iter().enumerate() {
    if let Some(q) = validate_entry(index, item)? {
      valid.push(q);
    }
  }

  if valid.is_empty() {
    Ok(None)
  } else {
    Ok(Some(valid))
  }
}

/// First fenced segment: text after the first fence up to the next one (or end of text).
fn fenced_segment(text: &str) -> Option<&str> {
  let start = text.find(FENCE)? + FENCE.len();
  let rest = &text[start..];
  Some(match rest.find(FENCE) {
    Some(end) => &rest[..end],
    None => rest,
  })
}

/// Drop a leading language tag (`json`, `JSON`, `javascript`…) that directly follows the fence.
fn strip_language_tag(segment: &str) -> &str {
  let token_end = segment.find(char::is_whitespace).unwrap_or(segment.len());
  let token = &segment[..token_end];
  let is_tag = !token.is_empty()
    && token.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+'));
  if is_tag {
    segment[token_end..].trim()
  } else {
    segment.trim()
  }
}

fn bracket_span(text: &str) -> &str {
  match (text.find('['), text.rfind(']')) {
    (Some(start), Some(end)) if end > start => &text[start..=end],
    _ => text,
  }
}

fn json_type(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  obj.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// `Ok(None)` drops the entry; `Err` aborts the whole run.
fn validate_entry(index: usize, item: &Value) -> Result<Option<QuizQuestion>, ShapeError> {
  let obj = match item {
    Value::Object(obj) => obj,
    // Stray prose or nested lists: skip the entry.
    Value::String(_) | Value::Array(_) => return Ok(None),
    other => return Err(ShapeError::ScalarEntry(index, json_type(other))),
  };

  let required = ["question", "options", "correct", "explanation"];
  if !required.iter().all(|k| obj.contains_key(*k)) {
    return Ok(None);
  }

  let options = match &obj["options"] {
    Value::Array(opts) => opts,
    // Sized but wrong kind: just an invalid entry.
    Value::String(_) | Value::Object(_) => return Ok(None),
    other => return Err(ShapeError::UnsizedOptions(index, json_type(other))),
  };
  if options.len() != 4 {
    return Ok(None);
  }
  let texts: Vec<String> = options.iter().filter_map(|o| o.as_str().map(str::to_string)).collect();
  let Ok(options) = <[String; 4]>::try_from(texts) else {
    return Ok(None);
  };

  let Some(correct) = obj["correct"].as_str().and_then(AnswerKey::from_marker) else {
    return Ok(None);
  };
  let (Some(question), Some(explanation)) = (non_empty_str(obj, "question"), non_empty_str(obj, "explanation")) else {
    return Ok(None);
  };

  Ok(Some(QuizQuestion {
    question: question.to_string(),
    options,
    correct,
    explanation: explanation.to_string(),
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn question(i: usize) -> Value {
    json!({
      "question": format!("Q{i}: what does HashMap.get return for a missing key?"),
      "options": ["null", "0", "throws", "empty Optional"],
      "correct": "A",
      "explanation": format!("E{i}: get returns null when no mapping exists."),
    })
  }

  fn assert_all_valid(qs: &[QuizQuestion]) {
    assert!(!qs.is_empty());
    for q in qs {
      assert_eq!(q.options.len(), 4);
      assert!(!q.question.trim().is_empty());
      assert!(!q.explanation.trim().is_empty());
    }
  }

  #[test]
  fn fenced_json_with_tag_is_preserved() {
    for n in [1usize, 7, 50] {
      let arr = Value::Array((0..n).map(question).collect());
      let raw = format!("Sure! Here you go:\n```json\n{}\n```\nGood luck.", serde_json::to_string_pretty(&arr).unwrap());
      let out = normalize_quiz(&raw, "Hash Tables and HashMap");
      assert_eq!(out.source, QuizSource::Generated);
      assert_eq!(out.questions.len(), n);
      assert_eq!(out.questions[0].question, "Q0: what does HashMap.get return for a missing key?");
      assert_eq!(out.questions[n - 1].explanation, format!("E{}: get returns null when no mapping exists.", n - 1));
      assert_eq!(out.questions[0].correct, AnswerKey::A);
    }
  }

  #[test]
  fn prose_around_bare_array_is_trimmed() {
    let raw = format!("Here are the questions: {} Hope that helps [really].", json!([question(1)]));
    let out = normalize_quiz(&raw, "Heaps");
    // The trailing "[really]" widens the span past the array, so strict parsing fails.
    assert_eq!(out.source, QuizSource::TopicFallback);

    let raw = format!("Here are the questions: {} Hope that helps.", json!([question(1), question(2)]));
    let out = normalize_quiz(&raw, "Heaps");
    assert_eq!(out.source, QuizSource::Generated);
    assert_eq!(out.questions.len(), 2);
  }

  #[test]
  fn unterminated_fence_still_extracts() {
    let raw = format!("```json\n{}", json!([question(3)]));
    let out = normalize_quiz(&raw, "Stacks");
    assert_eq!(out.source, QuizSource::Generated);
    assert_eq!(out.questions.len(), 1);
  }

  #[test]
  fn no_array_gives_topic_fallback() {
    let out = normalize_quiz("I cannot help with that request.", "Greedy Algorithms");
    assert_eq!(out.source, QuizSource::TopicFallback);
    assert_eq!(out.questions.len(), 10);
    assert!(out.questions[0].question.contains("Greedy Algorithms"));
  }

  #[test]
  fn empty_array_and_non_array_give_topic_fallback() {
    assert_eq!(normalize_quiz("[]", "Graphs").source, QuizSource::TopicFallback);
    assert_eq!(normalize_quiz("{\"questions\": 3}", "Graphs").source, QuizSource::TopicFallback);
    assert_eq!(normalize_quiz("", "Graphs").source, QuizSource::TopicFallback);
  }

  #[test]
  fn invalid_entries_are_filtered() {
    let mut missing = question(2);
    missing.as_object_mut().unwrap().remove("explanation");
    let three_options = json!({
      "question": "Q", "options": ["a", "b", "c"], "correct": "A", "explanation": "E"
    });
    let bad_marker = json!({
      "question": "Q", "options": ["a", "b", "c", "d"], "correct": "E", "explanation": "E"
    });
    let lowercase_marker = json!({
      "question": "Q", "options": ["a", "b", "c", "d"], "correct": "b", "explanation": "E"
    });
    let empty_question = json!({
      "question": "  ", "options": ["a", "b", "c", "d"], "correct": "B", "explanation": "E"
    });
    let numeric_option = json!({
      "question": "Q", "options": ["a", 2, "c", "d"], "correct": "B", "explanation": "E"
    });
    let string_options = json!({
      "question": "Q", "options": "abcd", "correct": "B", "explanation": "E"
    });
    let arr = json!([question(1), missing, three_options, bad_marker, lowercase_marker, empty_question, numeric_option, string_options, question(9)]);

    let out = normalize_quiz(&arr.to_string(), "Sorting");
    assert_eq!(out.source, QuizSource::Generated);
    assert_eq!(out.questions.len(), 2);
    assert!(out.questions[0].question.starts_with("Q1"));
    assert!(out.questions[1].question.starts_with("Q9"));
  }

  #[test]
  fn all_invalid_entries_give_topic_fallback() {
    let arr = json!([{ "question": "Q", "options": ["a"], "correct": "A", "explanation": "E" }]);
    let out = normalize_quiz(&arr.to_string(), "Recursion Fundamentals");
    assert_eq!(out.source, QuizSource::TopicFallback);
    assert_eq!(out.questions.len(), 10);
  }

  #[test]
  fn stray_text_and_list_entries_are_skipped() {
    let arr = json!([question(1), "Here are your questions", ["x"], question(2)]);
    let out = normalize_quiz(&arr.to_string(), "Two Pointers Technique");
    assert_eq!(out.source, QuizSource::Generated);
    assert_eq!(out.questions.len(), 2);
    assert!(out.questions[1].question.starts_with("Q2"));
  }

  #[test]
  fn structural_breakage_gives_generic_fallback() {
    let not_object = json!([question(1), 42]);
    let out = normalize_quiz(&not_object.to_string(), "Backtracking Techniques");
    assert_eq!(out.source, QuizSource::GenericFallback);
    assert_eq!(out.questions.len(), 5);
    assert!(out.questions.iter().all(|q| !q.question.contains("Backtracking")));

    let numeric_options = json!([{ "question": "Q", "options": 4, "correct": "A", "explanation": "E" }]);
    let out = normalize_quiz(&numeric_options.to_string(), "Backtracking Techniques");
    assert_eq!(out, NormalizedQuiz::generic());
  }

  #[test]
  fn every_input_yields_valid_questions() {
    let inputs = [
      String::new(),
      "```".to_string(),
      "``````".to_string(),
      "]][[".to_string(),
      "[1, 2, 3]".to_string(),
      "[\"a\", [\"b\"]]".to_string(),
      "[null]".to_string(),
      "```python\nprint('hi')\n```".to_string(),
      json!([question(0)]).to_string(),
      "日本語のテキスト [ ] ``` json".to_string(),
    ];
    for raw in inputs {
      let out = normalize_quiz(&raw, "Searching Algorithms");
      assert_all_valid(&out.questions);
    }
  }

  #[test]
  fn normalizing_is_idempotent() {
    let raw = format!("```json\n{}\n```", json!([question(4), { "question": "x" }]));
    assert_eq!(normalize_quiz(&raw, "Linked Lists"), normalize_quiz(&raw, "Linked Lists"));
    assert_eq!(normalize_quiz("garbage", "Linked Lists"), normalize_quiz("garbage", "Linked Lists"));
  }

  #[test]
  fn language_tag_is_only_stripped_when_present() {
    assert_eq!(strip_language_tag("json\n[1]"), "[1]");
    assert_eq!(strip_language_tag("\n[1]\n"), "[1]");
    assert_eq!(strip_language_tag("[1]"), "[1]");
    assert_eq!(strip_language_tag("JSON [1]"), "[1]");
  }
}
