/// Verdict classification
///
/// Pure functions over a finished [`RunOutcome`]. Precedence for a test case
/// run is: judge timeout, then output ceiling, then abnormal exit, then
/// output comparison.
use crate::config::types::{RunOutcome, Verdict};

pub const TIME_LIMIT_MESSAGE: &str = "Time Limit Exceeded";
pub const WRONG_ANSWER_MESSAGE: &str = "Wrong Answer";
pub const OUTPUT_LIMIT_MESSAGE: &str = "Output limit exceeded";
pub const COMPILE_FALLBACK_MESSAGE: &str = "Compilation failed";

/// Error messages are stored on the submission record; keep them bounded.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Classification of one test case run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseVerdict {
    pub verdict: Verdict,
    /// Present on every non-accepted verdict
    pub message: Option<String>,
}

impl CaseVerdict {
    pub fn passed(&self) -> bool {
        self.verdict.is_accepted()
    }

    fn fail(verdict: Verdict, message: String) -> Self {
        Self {
            verdict,
            message: Some(message),
        }
    }
}

/// Verdict classifier - pure functions over run outcomes
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Classify one test case run against its expected output
    pub fn classify_case(outcome: &RunOutcome, expected_output: &str) -> CaseVerdict {
        if outcome.timed_out {
            return CaseVerdict::fail(Verdict::TimeLimit, TIME_LIMIT_MESSAGE.to_string());
        }
        if outcome.output_exceeded {
            return CaseVerdict::fail(Verdict::RuntimeError, OUTPUT_LIMIT_MESSAGE.to_string());
        }
        if !outcome.exited_normally {
            return CaseVerdict::fail(Verdict::RuntimeError, Self::runtime_message(outcome));
        }
        if !outputs_match(&outcome.stdout, expected_output) {
            return CaseVerdict::fail(Verdict::WrongAnswer, WRONG_ANSWER_MESSAGE.to_string());
        }
        CaseVerdict {
            verdict: Verdict::Accepted,
            message: None,
        }
    }

    /// `None` when compilation succeeded, otherwise the compile error message
    /// (stderr, falling back to stdout, then a generic message).
    pub fn classify_compile(outcome: &RunOutcome) -> Option<String> {
        if outcome.exited_normally {
            return None;
        }
        if outcome.timed_out {
            return Some(format!(
                "Compilation timed out after {} ms",
                outcome.elapsed_ms
            ));
        }
        let diagnostics = first_non_blank(&[outcome.stderr.as_str(), outcome.stdout.as_str()])
            .unwrap_or(COMPILE_FALLBACK_MESSAGE);
        Some(bounded(diagnostics))
    }

    /// stderr when the program wrote any, otherwise a description of how it
    /// ended
    pub fn runtime_message(outcome: &RunOutcome) -> String {
        if let Some(stderr) = first_non_blank(&[outcome.stderr.as_str()]) {
            return bounded(stderr);
        }
        match (outcome.exit_code, outcome.signal) {
            (_, Some(signal)) => format!(
                "Process terminated by signal {} ({})",
                signal,
                signal_name(signal)
            ),
            (Some(code), None) => format!("Process exited with code {}", code),
            (None, None) => "Process terminated abnormally".to_string(),
        }
    }
}

/// Leading/trailing whitespace is insignificant; internal whitespace is.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}

fn first_non_blank<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
}

fn bounded(message: &str) -> String {
    match message.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}\n... (truncated)", &message[..cut]),
        None => message.to_string(),
    }
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGABRT => "SIGABRT",
        libc::SIGFPE => "SIGFPE",
        libc::SIGKILL => "SIGKILL",
        libc::SIGBUS => "SIGBUS",
        libc::SIGILL => "SIGILL",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGTERM => "SIGTERM",
        libc::SIGXCPU => "SIGXCPU",
        _ => "unknown",
    }
}
