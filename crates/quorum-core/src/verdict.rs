//! Verdict parser (C4, spec.md §4.4).
//!
//! Mirrors the JSON-extraction-then-lexical-fallback shape of the teacher's own
//! judge response parsing (`judge::judge_internal::client::call_judge_impl`), but
//! targets the `{verdict, reasoning}` schema this spec's prompt asks for rather than
//! the teacher's `{passed, rationale}` one.

use crate::model::Verdict;
use serde::Deserialize;

const MAX_REASONING_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
struct VerdictSchema {
    verdict: String,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parses raw provider text into `(verdict, reasoning)` (spec.md §4.4). Attempts a
/// strict JSON parse against `{verdict, reasoning?}` first; on parse or validation
/// failure, falls back to a lexical heuristic over the lowercased raw text.
pub fn parse(raw: &str) -> (Verdict, String) {
    if let Some(parsed) = try_parse_json(raw) {
        return parsed;
    }
    lexical_fallback(raw)
}

fn try_parse_json(raw: &str) -> Option<(Verdict, String)> {
    let parsed: VerdictSchema = serde_json::from_str(raw.trim()).ok()?;
    let verdict = Verdict::parse(&parsed.verdict)?;
    let reasoning = parsed.reasoning.unwrap_or_default().trim().to_string();
    Some((verdict, reasoning))
}

fn lexical_fallback(raw: &str) -> (Verdict, String) {
    let lower = raw.to_lowercase();
    let has_pass = lower.contains("pass");
    let has_fail = lower.contains("fail");
    let verdict = if has_pass && !has_fail {
        Verdict::Pass
    } else if has_fail && !has_pass {
        Verdict::Fail
    } else {
        Verdict::Inconclusive
    };
    let reasoning = truncate(raw.trim(), MAX_REASONING_CHARS);
    (verdict, reasoning)
}

/// Truncates `s` to at most `max_chars` Unicode scalar values (spec.md §3: reasoning
/// is bounded to 1000 chars).
pub fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json() {
        let (v, r) = parse(r#"{"verdict":"pass","reasoning":"looks correct"}"#);
        assert_eq!(v, Verdict::Pass);
        assert_eq!(r, "looks correct");
    }

    #[test]
    fn trims_reasoning_whitespace() {
        let (_, r) = parse(r#"{"verdict":"fail","reasoning":"  needs work  "}"#);
        assert_eq!(r, "needs work");
    }

    #[test]
    fn defaults_missing_reasoning_to_empty_string() {
        let (v, r) = parse(r#"{"verdict":"inconclusive"}"#);
        assert_eq!(v, Verdict::Inconclusive);
        assert_eq!(r, "");
    }

    #[test]
    fn falls_back_to_lexical_pass() {
        let (v, _) = parse("I think this should PASS overall.");
        assert_eq!(v, Verdict::Pass);
    }

    #[test]
    fn falls_back_to_lexical_fail() {
        let (v, _) = parse("this is a clear fail");
        assert_eq!(v, Verdict::Fail);
    }

    #[test]
    fn both_pass_and_fail_present_is_inconclusive() {
        // spec.md §8 boundary behavior: verdict field missing, raw text containing
        // both "pass" and "fail" → inconclusive.
        let (v, _) = parse("it could pass or fail depending on interpretation");
        assert_eq!(v, Verdict::Inconclusive);
    }

    #[test]
    fn neither_keyword_is_inconclusive() {
        let (v, _) = parse("not sure what to make of this");
        assert_eq!(v, Verdict::Inconclusive);
    }

    #[test]
    fn fallback_reasoning_is_truncated_to_1000_chars() {
        let long = "fail ".repeat(400); // > 1000 chars, contains only "fail"
        let (v, r) = parse(&long);
        assert_eq!(v, Verdict::Fail);
        assert_eq!(r.chars().count(), 1000);
    }

    #[test]
    fn invalid_verdict_value_falls_back_to_lexical() {
        let (v, _) = parse(r#"{"verdict":"maybe","reasoning":"pass i guess"}"#);
        assert_eq!(v, Verdict::Pass);
    }
}
