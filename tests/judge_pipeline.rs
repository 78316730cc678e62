//! End-to-end judging through the orchestrator with real child processes.
//!
//! A POSIX shell profile stands in for a compiled language: `sh -n` is the
//! "compiler" and `sh` runs the solution, so these tests only need `/bin/sh`.

use judgebox::config::settings::{FailurePolicy, JudgeConfig};
use judgebox::config::types::{JudgeError, Result, SubmissionStatus, Verdict};
use judgebox::core::orchestrator::JudgeOrchestrator;
use judgebox::core::types::{Problem, StrategyKind, Submission, TestCase};
use judgebox::judge::adapter::LanguageProfile;
use judgebox::judge::registry::LanguageRegistry;
use judgebox::observability::metrics::get_metrics;
use judgebox::store::{MemoryStore, SubmissionStore};
use judgebox::strategy::ai::ReasoningClient;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct ShellProfile;

impl LanguageProfile for ShellProfile {
    fn language(&self) -> &'static str {
        "shell"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["sh"]
    }

    fn extension(&self) -> &'static str {
        "sh"
    }

    fn compile_command(&self, source: &Path) -> Option<Vec<String>> {
        Some(vec![
            "sh".to_string(),
            "-n".to_string(),
            source.display().to_string(),
        ])
    }

    fn run_command(&self, source: &Path) -> Vec<String> {
        vec!["sh".to_string(), source.display().to_string()]
    }

    fn toolchain(&self) -> &'static [&'static str] {
        &["sh"]
    }
}

struct Harness {
    _root: TempDir,
    workspace_root: std::path::PathBuf,
    store: Arc<MemoryStore>,
    orchestrator: Arc<JudgeOrchestrator>,
}

fn harness(policy: FailurePolicy, ai_enabled: bool, client: Option<Arc<dyn ReasoningClient>>) -> Harness {
    let root = TempDir::new().unwrap();
    let workspace_root = root.path().join("workspaces");

    let mut config = JudgeConfig::default();
    config.workspace_root = workspace_root.clone();
    config.failure_policy = policy;
    config.compile_timeout_ms = 5_000;
    config.ai.enabled = ai_enabled;

    let mut registry = LanguageRegistry::empty();
    registry.register(ShellProfile);

    let store = Arc::new(MemoryStore::new());
    let mut orchestrator = JudgeOrchestrator::new(config, store.clone(), store.clone())
        .with_registry(Arc::new(registry));
    if let Some(client) = client {
        orchestrator = orchestrator.with_ai_client(client);
    }

    Harness {
        _root: root,
        workspace_root,
        store,
        orchestrator: Arc::new(orchestrator),
    }
}

fn plus_problem(time_limit_ms: u64) -> Problem {
    Problem {
        id: "a-plus-b".to_string(),
        title: "A Plus B".to_string(),
        difficulty: "easy".to_string(),
        description: "Print a + b".to_string(),
        input_format: Some("two integers".to_string()),
        output_format: None,
        constraints: None,
        time_limit_ms,
        memory_limit_mb: 16,
    }
}

fn sum_cases() -> Vec<TestCase> {
    let mut cases = vec![
        TestCase::new("1 2\n", "3\n"),
        TestCase::new("5 7\n", "12"),
        TestCase::new("-4 4\n", "0").hidden(),
    ];
    cases[2].points = 3;
    cases
}

const SUM_SOLUTION: &str = "read a b\necho $((a + b))\n";

impl Harness {
    fn judge(&self, code: &str, problem: &Problem, cases: &[TestCase]) -> (Submission, Result<judgebox::JudgeReport>) {
        let id = self
            .orchestrator
            .submit(Submission::new("alice", problem.id.clone(), "shell", code))
            .unwrap();
        let report = self.orchestrator.judge(&id, problem, cases);
        (self.store.get(&id).unwrap(), report)
    }

    fn workspace_entries(&self) -> usize {
        std::fs::read_dir(&self.workspace_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[test]
fn test_correct_solution_is_accepted() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let (record, report) = h.judge(SUM_SOLUTION, &plus_problem(2_000), &sum_cases());
    let report = report.unwrap();

    assert_eq!(report.verdict, Verdict::Accepted);
    assert_eq!(record.status, SubmissionStatus::Accepted);
    assert_eq!(record.test_cases_passed, 3);
    assert_eq!(record.total_test_cases, 3);
    assert_eq!(record.points_earned, 5);
    assert_eq!(record.strategy, Some(StrategyKind::Traditional));
    assert!(record.error_message.is_none());
    assert!(record.judged_at.is_some());

    let stats = h.store.problem_stats("a-plus-b");
    assert_eq!((stats.total_submissions, stats.accepted_submissions), (1, 1));
    assert_eq!(h.store.user_solved("alice"), 1);
    assert_eq!(h.workspace_entries(), 0, "workspace must be removed");
}

#[test]
fn test_wrong_answer_stops_at_first_failure() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let (record, report) = h.judge("echo 3\n", &plus_problem(2_000), &sum_cases());
    let report = report.unwrap();

    assert_eq!(report.verdict, Verdict::WrongAnswer);
    assert_eq!(record.status, SubmissionStatus::WrongAnswer);
    assert_eq!(record.test_cases_passed, 1);
    assert_eq!(record.points_earned, 1);
    assert_eq!(report.case_results.len(), 2);
    assert_eq!(record.error_message.as_deref(), Some("Wrong Answer"));
    assert_eq!(h.store.user_solved("alice"), 0);
}

#[test]
fn test_run_all_keeps_counting_after_failure() {
    let h = harness(FailurePolicy::RunAll, false, None);
    // right for the first and last case only
    let code = "read a b\nif [ \"$a\" = 5 ]; then echo wrong; else echo $((a + b)); fi\n";
    let (record, report) = h.judge(code, &plus_problem(2_000), &sum_cases());
    let report = report.unwrap();

    assert_eq!(report.verdict, Verdict::WrongAnswer);
    assert_eq!(report.case_results.len(), 3);
    assert_eq!(record.test_cases_passed, 2);
    assert_eq!(record.points_earned, 4);
}

#[test]
fn test_compile_error_runs_no_cases() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let (record, report) = h.judge("if then fi (\n", &plus_problem(2_000), &sum_cases());
    let report = report.unwrap();

    assert_eq!(report.verdict, Verdict::CompileError);
    assert_eq!(record.status, SubmissionStatus::CompileError);
    assert_eq!(record.test_cases_passed, 0);
    assert!(report.case_results.is_empty());
    assert!(!record.error_message.unwrap_or_default().trim().is_empty());
    assert_eq!(h.workspace_entries(), 0);
}

#[test]
fn test_infinite_loop_hits_time_limit() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let started = Instant::now();
    let (record, report) = h.judge("while :; do :; done\n", &plus_problem(300), &sum_cases());
    let report = report.unwrap();

    assert_eq!(report.verdict, Verdict::TimeLimit);
    assert_eq!(record.error_message.as_deref(), Some("Time Limit Exceeded"));
    assert_eq!(report.case_results.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_nonzero_exit_is_runtime_error_with_stderr() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let (record, report) = h.judge(
        "echo 'division by zero' >&2\nexit 3\n",
        &plus_problem(2_000),
        &sum_cases(),
    );

    assert_eq!(report.unwrap().verdict, Verdict::RuntimeError);
    assert_eq!(record.error_message.as_deref(), Some("division by zero"));
}

#[test]
fn test_unsupported_language_is_compile_error() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let id = h
        .orchestrator
        .submit(Submission::new("bob", "a-plus-b", "cobol", "DISPLAY 1."))
        .unwrap();
    let report = h.orchestrator.judge(&id, &plus_problem(1_000), &sum_cases()).unwrap();

    assert_eq!(report.verdict, Verdict::CompileError);
    assert_eq!(
        report.error_message.as_deref(),
        Some("Unsupported language: cobol")
    );
    assert_eq!(h.workspace_entries(), 0);
}

#[test]
fn test_judging_twice_is_rejected() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let id = h
        .orchestrator
        .submit(Submission::new("alice", "a-plus-b", "sh", SUM_SOLUTION))
        .unwrap();
    h.orchestrator.judge(&id, &plus_problem(2_000), &sum_cases()).unwrap();

    let again = h.orchestrator.judge(&id, &plus_problem(2_000), &sum_cases());
    assert!(matches!(again, Err(JudgeError::InvalidTransition { .. })));
    assert_eq!(h.store.problem_stats("a-plus-b").total_submissions, 1);
}

struct UnreachableClient;

impl ReasoningClient for UnreachableClient {
    fn is_available(&self) -> bool {
        true
    }

    fn generate(&self, _prompt: &str) -> Result<String> {
        Err(JudgeError::StrategyUnavailable("connection refused".to_string()))
    }
}

#[test]
fn test_ai_failure_falls_back_to_execution() {
    let client: Arc<dyn ReasoningClient> = Arc::new(UnreachableClient);
    let h = harness(FailurePolicy::FailFast, true, Some(client));
    let fallbacks_before = get_metrics().ai_fallbacks.get();

    let (record, report) = h.judge(SUM_SOLUTION, &plus_problem(2_000), &sum_cases());

    assert_eq!(report.unwrap().verdict, Verdict::Accepted);
    assert_eq!(record.strategy, Some(StrategyKind::Traditional));
    assert!(record.ai_feedback.is_none());
    assert!(get_metrics().ai_fallbacks.get() > fallbacks_before);
    // recorded once, by the strategy that produced the verdict
    assert_eq!(h.store.problem_stats("a-plus-b").total_submissions, 1);
}

#[test]
fn test_ai_enabled_without_client_uses_execution() {
    let h = harness(FailurePolicy::FailFast, true, None);
    let (record, _) = h.judge(SUM_SOLUTION, &plus_problem(2_000), &sum_cases());
    assert_eq!(record.status, SubmissionStatus::Accepted);
    assert_eq!(record.strategy, Some(StrategyKind::Traditional));
}

struct SignedOutClient;

impl ReasoningClient for SignedOutClient {
    fn is_available(&self) -> bool {
        false
    }

    fn generate(&self, _prompt: &str) -> Result<String> {
        panic!("an unavailable client must not be called");
    }
}

#[test]
fn test_ai_enabled_with_unavailable_client_uses_execution() {
    let client: Arc<dyn ReasoningClient> = Arc::new(SignedOutClient);
    let h = harness(FailurePolicy::FailFast, true, Some(client));
    let (record, report) = h.judge(SUM_SOLUTION, &plus_problem(2_000), &sum_cases());

    assert_eq!(report.unwrap().verdict, Verdict::Accepted);
    assert_eq!(record.status, SubmissionStatus::Accepted);
    assert_eq!(record.strategy, Some(StrategyKind::Traditional));
    assert!(record.ai_feedback.is_none());
}

fn two_sum_problem() -> Problem {
    Problem {
        id: "two-sum".to_string(),
        title: "Two Sum".to_string(),
        difficulty: "easy".to_string(),
        description: "Print the indices of the two numbers that add up to the target".to_string(),
        input_format: Some("numbers on the first line, target on the second".to_string()),
        output_format: Some("two ascending indices".to_string()),
        constraints: None,
        time_limit_ms: 2_000,
        memory_limit_mb: 16,
    }
}

/// Pairs are printed as `$FIRST $SECOND`
fn two_sum_solution(first: &str, second: &str) -> String {
    format!(
        r#"read -r nums
read -r target
set -- $nums
i=0
for a in "$@"; do
  j=0
  for b in "$@"; do
    if [ "$j" -gt "$i" ] && [ $((a + b)) -eq "$target" ]; then
      echo "${} ${}"
      exit 0
    fi
    j=$((j + 1))
  done
  i=$((i + 1))
done
"#,
        first, second
    )
}

#[test]
fn test_two_sum_accepted_with_trailing_newline() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let cases = vec![TestCase::new("2 7 11 15\n9", "0 1")];
    let (record, report) = h.judge(&two_sum_solution("i", "j"), &two_sum_problem(), &cases);

    assert_eq!(report.unwrap().verdict, Verdict::Accepted);
    assert_eq!(record.status, SubmissionStatus::Accepted);
    assert_eq!(record.test_cases_passed, 1);
    assert_eq!(record.total_test_cases, 1);
}

#[test]
fn test_two_sum_reversed_pair_is_wrong_answer() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let cases = vec![TestCase::new("2 7 11 15\n9", "0 1")];
    let (record, report) = h.judge(&two_sum_solution("j", "i"), &two_sum_problem(), &cases);

    assert_eq!(report.unwrap().verdict, Verdict::WrongAnswer);
    assert_eq!(record.status, SubmissionStatus::WrongAnswer);
    assert_eq!(record.test_cases_passed, 0);
    assert_eq!(h.store.problem_stats("two-sum").accepted_submissions, 0);
}

#[test]
fn test_concurrent_submissions_are_isolated() {
    let h = harness(FailurePolicy::FailFast, false, None);
    let problem = plus_problem(5_000);

    // ids sanitize to the same workspace prefix
    let ids = ["same/id", "same?id", "same id", "same:id", "same*id", "same|id"];
    let handles: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let code = if i % 2 == 0 { SUM_SOLUTION } else { "echo nope\n" };
            h.orchestrator
                .submit(Submission::new(format!("user{}", i), "a-plus-b", "shell", code).with_id(*id))
                .unwrap();
            Arc::clone(&h.orchestrator)
                .dispatch(id.to_string(), problem.clone(), sum_cases())
                .unwrap()
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.join().unwrap().unwrap();
        let expected = if i % 2 == 0 {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        };
        assert_eq!(report.verdict, expected, "submission {}", ids[i]);
    }

    let stats = h.store.problem_stats("a-plus-b");
    assert_eq!((stats.total_submissions, stats.accepted_submissions), (6, 3));
    assert_eq!(h.workspace_entries(), 0);
}
