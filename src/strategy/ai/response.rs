/// Parsing and validation of reasoning-service responses.
///
/// Model output is untrusted text. Nothing from it reaches a report before
/// it is clamped to the verdict taxonomy and the problem's case count.
use crate::config::types::Verdict;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FEEDBACK: &str = "Code analysis completed";
pub const DEFAULT_ESTIMATED_TIME_MS: u64 = 50;
pub const MAX_SUGGESTIONS: usize = 10;

/// Validated AI verdict
#[derive(Debug, Clone, PartialEq)]
pub struct AiVerdict {
    pub verdict: Verdict,
    pub test_cases_passed: usize,
    pub feedback: String,
    pub analysis: String,
    pub estimated_time_ms: u64,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExplanation {
    pub explanation: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hints {
    pub hints: Vec<String>,
}

/// Outermost `{...}` span: first `{` to last `}`
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(extract_json_object(text)?) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn non_negative_floor(value: Option<&Value>) -> Option<u64> {
    let n = value?.as_f64()?;
    if !n.is_finite() {
        return None;
    }
    Some(n.max(0.0).floor() as u64)
}

/// Parse and clamp a judge response. `None` when no JSON object can be
/// extracted.
pub fn parse_judge_response(text: &str, total_test_cases: usize) -> Option<AiVerdict> {
    let object = parse_object(text)?;

    let verdict = object
        .get("verdict")
        .and_then(Value::as_str)
        .and_then(Verdict::parse_reportable)
        .unwrap_or(Verdict::RuntimeError);

    let test_cases_passed = non_negative_floor(object.get("testCasesPassed"))
        .map(|n| (n as usize).min(total_test_cases))
        .unwrap_or(0);

    let feedback = object
        .get("feedback")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_FEEDBACK)
        .to_string();

    let analysis = object
        .get("analysis")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let estimated_time_ms =
        non_negative_floor(object.get("estimatedTimeMs").or_else(|| object.get("estimatedTime")))
            .unwrap_or(DEFAULT_ESTIMATED_TIME_MS);

    let suggestions = object
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default();

    Some(AiVerdict {
        verdict,
        test_cases_passed,
        feedback,
        analysis,
        estimated_time_ms,
        suggestions,
    })
}

pub fn parse_error_explanation(text: &str) -> Option<ErrorExplanation> {
    serde_json::from_str(extract_json_object(text)?).ok()
}

pub fn parse_hints(text: &str) -> Option<Hints> {
    serde_json::from_str(extract_json_object(text)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_fenced_text() {
        let text = "Sure!\n```json\n{\"verdict\": \"accepted\", \"x\": {\"y\": 1}}\n```\nbye";
        assert_eq!(
            extract_json_object(text),
            Some("{\"verdict\": \"accepted\", \"x\": {\"y\": 1}}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_well_formed_response() {
        let text = r#"{"verdict":"wrong_answer","testCasesPassed":2,"feedback":"Off by one",
            "analysis":"loop bound","estimatedTimeMs":12,"suggestions":["use <="]}"#;
        let verdict = parse_judge_response(text, 5).unwrap();
        assert_eq!(
            verdict,
            AiVerdict {
                verdict: Verdict::WrongAnswer,
                test_cases_passed: 2,
                feedback: "Off by one".to_string(),
                analysis: "loop bound".to_string(),
                estimated_time_ms: 12,
                suggestions: vec!["use <=".to_string()],
            }
        );
    }

    #[test]
    fn test_unknown_or_unreportable_verdict_becomes_runtime_error() {
        for raw in ["\"segfault\"", "\"memory_limit\"", "7", "null"] {
            let text = format!("{{\"verdict\": {}}}", raw);
            assert_eq!(
                parse_judge_response(&text, 3).unwrap().verdict,
                Verdict::RuntimeError,
                "verdict {}",
                raw
            );
        }
    }

    #[test]
    fn test_passed_count_is_clamped() {
        let passed = |raw: &str| {
            parse_judge_response(&format!("{{\"testCasesPassed\": {}}}", raw), 4)
                .unwrap()
                .test_cases_passed
        };
        assert_eq!(passed("99"), 4);
        assert_eq!(passed("-3"), 0);
        assert_eq!(passed("2.9"), 2);
        assert_eq!(passed("\"three\""), 0);
        assert_eq!(passed("null"), 0);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let verdict = parse_judge_response("{}", 2).unwrap();
        assert_eq!(verdict.feedback, DEFAULT_FEEDBACK);
        assert_eq!(verdict.estimated_time_ms, DEFAULT_ESTIMATED_TIME_MS);
        assert_eq!(verdict.analysis, "");
        assert!(verdict.suggestions.is_empty());
    }

    #[test]
    fn test_estimated_time_alias_and_clamp() {
        assert_eq!(
            parse_judge_response(r#"{"estimatedTime": 300}"#, 1)
                .unwrap()
                .estimated_time_ms,
            300
        );
        assert_eq!(
            parse_judge_response(r#"{"estimatedTimeMs": -20}"#, 1)
                .unwrap()
                .estimated_time_ms,
            0
        );
    }

    #[test]
    fn test_suggestions_are_capped() {
        let many: Vec<String> = (0..25).map(|i| format!("\"s{}\"", i)).collect();
        let text = format!("{{\"suggestions\": [{}, 5]}}", many.join(","));
        let verdict = parse_judge_response(&text, 1).unwrap();
        assert_eq!(verdict.suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(verdict.suggestions[0], "s0");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(parse_judge_response("the code looks fine", 1).is_none());
        assert!(parse_judge_response("{not json}", 1).is_none());
    }

    #[test]
    fn test_auxiliary_parsers() {
        let explanation =
            parse_error_explanation(r#"Here: {"explanation":"missing paren","suggestion":"add )"}"#)
                .unwrap();
        assert_eq!(explanation.explanation, "missing paren");
        assert_eq!(explanation.example, None);

        let hints = parse_hints(r#"{"hints":["a","b","c"]}"#).unwrap();
        assert_eq!(hints.hints.len(), 3);
        assert!(parse_hints("{}").is_none());
    }
}
