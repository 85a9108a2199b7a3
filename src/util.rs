//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass, so placeholders inside substituted values are never expanded.
/// Braces that do not name a provided key are left untouched, so JSON samples
/// inside prompts survive.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let tail = &rest[open + 1..];
    let hit = pairs.iter().find(|(k, _)| {
      tail.strip_prefix(*k).is_some_and(|after| after.starts_with('}'))
    });
    match hit {
      Some((k, v)) => {
        out.push_str(v);
        rest = &tail[k.len() + 1..];
      }
      None => {
        out.push('{');
        rest = tail;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Log-safe truncation for large strings.
/// Cuts on a char boundary so multi-byte text never panics.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// Canonical form for account emails (trimmed, lowercase).
pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_leaves_unknown_braces() {
    let out = fill_template("[{ \"q\": \"{topic}\" }] x{count}", &[("topic", "Heaps"), ("count", "3")]);
    assert_eq!(out, "[{ \"q\": \"Heaps\" }] x3");
  }

  #[test]
  fn fill_template_does_not_expand_inside_values() {
    let out = fill_template("Quiz on {topic}, {count} questions", &[("topic", "{count}"), ("count", "10")]);
    assert_eq!(out, "Quiz on {count}, 10 questions");

    let out = fill_template("Q{context}: {doubt}", &[("context", " about {doubt}"), ("doubt", "why?")]);
    assert_eq!(out, "Q about {doubt}: why?");
    assert_eq!(fill_template("{{topic}} {", &[("topic", "x")]), "{x} {");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    let s = "ééééé";
    let t = trunc_for_log(s, 3);
    assert!(t.starts_with('é'));
    assert!(t.contains("10 bytes total"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }
}
