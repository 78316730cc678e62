/// Bounded prompt construction.
///
/// Every user-controlled field is truncated before it is embedded, and the
/// assembled prompt is truncated once more, so no submission can produce an
/// unbounded request.
use crate::config::types::Verdict;
use crate::core::types::{Problem, TestCase};
use std::fmt::Write as _;

pub const MAX_CODE_CHARS: usize = 16_000;
pub const MAX_CASE_FIELD_CHARS: usize = 1_000;
pub const MAX_PROMPT_CHARS: usize = 32_000;
pub const PROMPT_CASES: usize = 3;

const TRUNCATION_MARK: &str = "\n...[truncated]";

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARK),
        None => text.to_string(),
    }
}

fn push_optional_section(prompt: &mut String, title: &str, body: Option<&str>) {
    if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
        let _ = writeln!(prompt, "{}:\n{}\n", title, body);
    }
}

/// Prompt asking the service for a structured verdict
pub fn build_judge_prompt(
    problem: &Problem,
    language: &str,
    code: &str,
    test_cases: &[TestCase],
) -> String {
    let total = test_cases.len();
    let mut prompt = String::new();

    prompt.push_str("You are an expert code judge for a programming contest platform.\n\n");
    prompt.push_str("**Problem:**\n");
    let _ = writeln!(prompt, "Title: {}", problem.title);
    let _ = writeln!(prompt, "Difficulty: {}\n", problem.difficulty);
    let _ = writeln!(prompt, "Description:\n{}\n", problem.description);
    push_optional_section(&mut prompt, "Input Format", problem.input_format.as_deref());
    push_optional_section(&mut prompt, "Output Format", problem.output_format.as_deref());
    push_optional_section(&mut prompt, "Constraints", problem.constraints.as_deref());

    prompt.push_str("**Student's Solution:**\n");
    let _ = writeln!(prompt, "Language: {}", language);
    let _ = writeln!(
        prompt,
        "```{}\n{}\n```\n",
        language,
        truncate_chars(code, MAX_CODE_CHARS)
    );

    prompt.push_str("**Test Cases:**\n");
    for (i, case) in test_cases.iter().take(PROMPT_CASES).enumerate() {
        let _ = writeln!(
            prompt,
            "Test Case {}:\nInput: {}\nExpected Output: {}\n",
            i + 1,
            truncate_chars(&case.input, MAX_CASE_FIELD_CHARS),
            truncate_chars(&case.expected_output, MAX_CASE_FIELD_CHARS)
        );
    }

    let verdicts = Verdict::AI_REPORTABLE
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(" | ");

    let _ = write!(
        prompt,
        r#"**Your Task:**
Analyze this code and determine whether it correctly solves the problem and
produces the expected output for all {total} test cases. Look for logical
errors, syntax errors and runtime issues.

**IMPORTANT:** Return ONLY a JSON object with NO additional text.

JSON Structure:
{{
  "verdict": {verdicts},
  "testCasesPassed": <number between 0 and {total}>,
  "feedback": "<constructive feedback in 1-2 sentences>",
  "analysis": "<brief technical analysis>",
  "estimatedTimeMs": <estimated execution time in milliseconds>,
  "suggestions": ["<improvement suggestion>"]
}}

**Rules:**
- "accepted" if the logic is correct and passes all test cases
- "wrong_answer" if the output differs from the expected output for any test case
- "runtime_error" if the code fails at runtime (out of bounds, division by zero)
- "compile_error" if the code has syntax errors
- "time_limit" if the algorithm is too slow for the constraints

Return ONLY the JSON:"#
    );

    truncate_chars(&prompt, MAX_PROMPT_CHARS)
}

/// Prompt asking for a plain-language explanation of an error
pub fn build_explain_prompt(code: &str, language: &str, error_message: &str) -> String {
    let prompt = format!(
        r#"Explain this {language} error in simple terms:

Code:
```{language}
{code}
```

Error Message: {error}

Return ONLY this JSON:
{{
  "explanation": "<simple explanation of what went wrong>",
  "suggestion": "<specific suggestion to fix it>",
  "example": "<corrected code snippet if applicable>"
}}"#,
        code = truncate_chars(code, MAX_CODE_CHARS),
        error = truncate_chars(error_message, MAX_CASE_FIELD_CHARS),
    );
    truncate_chars(&prompt, MAX_PROMPT_CHARS)
}

/// Prompt asking for graded hints without a full solution
pub fn build_hints_prompt(problem: &Problem, code: &str, language: &str) -> String {
    let prompt = format!(
        r#"The student is stuck on this problem:

**Problem:** {title}
{description}

**Student's attempt:**
```{language}
{code}
```

Provide 3 helpful hints without giving away the complete solution.

Return ONLY this JSON:
{{
  "hints": [
    "<hint 1 - most general>",
    "<hint 2 - more specific>",
    "<hint 3 - most specific but not a complete solution>"
  ]
}}"#,
        title = problem.title,
        description = problem.description,
        code = truncate_chars(code, MAX_CODE_CHARS),
    );
    truncate_chars(&prompt, MAX_PROMPT_CHARS)
}
