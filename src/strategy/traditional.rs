/// Traditional judging: compile once, run every test case, compare output.
use crate::config::settings::{FailurePolicy, JudgeConfig};
use crate::config::types::{JudgeError, Result, Verdict};
use crate::core::types::{CaseResult, JudgeReport, StrategyKind};
use crate::exec::runner::{ProcessRunner, RunRequest};
use crate::judge::adapter::LanguageProfile;
use crate::judge::registry::LanguageRegistry;
use crate::observability::audit::events;
use crate::observability::metrics::get_metrics;
use crate::safety::workspace::WorkspaceManager;
use crate::store::StatsSink;
use crate::strategy::{JudgeStrategy, JudgeTask};
use crate::verdict::verdict::{CaseVerdict, VerdictClassifier};
use std::path::Path;
use std::sync::Arc;

pub struct TraditionalJudge {
    registry: Arc<LanguageRegistry>,
    runner: Arc<dyn ProcessRunner>,
    workspaces: WorkspaceManager,
    stats: Arc<dyn StatsSink>,
    compile_timeout_ms: u64,
    compile_output_limit_bytes: usize,
    failure_policy: FailurePolicy,
}

impl TraditionalJudge {
    pub fn new(
        config: &JudgeConfig,
        runner: Arc<dyn ProcessRunner>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            registry: Arc::new(LanguageRegistry::global().clone()),
            runner,
            workspaces: WorkspaceManager::new(config.workspace_root.clone()),
            stats,
            compile_timeout_ms: config.compile_timeout_ms,
            compile_output_limit_bytes: config.compile_output_limit_bytes,
            failure_policy: config.failure_policy,
        }
    }

    /// Replace the language table (custom or test profiles)
    pub fn with_registry(mut self, registry: Arc<LanguageRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    fn judge_in_workspace(
        &self,
        task: &JudgeTask<'_>,
        profile: &dyn LanguageProfile,
        source: &Path,
        workdir: &Path,
    ) -> JudgeReport {
        let total = task.test_cases.len();

        if let Some(message) = self.compile(profile, source, workdir) {
            events::compile_failed(&task.submission.id, profile.language());
            return JudgeReport::failed(
                StrategyKind::Traditional,
                Verdict::CompileError,
                total,
                message,
            );
        }

        let run_command = profile.run_command(source);
        let mut report = JudgeReport::empty(StrategyKind::Traditional, Verdict::Accepted, total);
        let mut first_failure: Option<CaseVerdict> = None;

        for (index, case) in task.test_cases.iter().enumerate() {
            let (case_verdict, elapsed_ms, memory_kb) = self.run_case(task, &run_command, workdir, index);

            report.case_results.push(CaseResult {
                index,
                verdict: case_verdict.verdict,
                elapsed_ms,
                memory_kb,
                is_hidden: case.is_hidden,
            });

            if case_verdict.passed() {
                report.test_cases_passed += 1;
                report.execution_time_ms += elapsed_ms;
                report.points_earned += case.points;
                report.memory_kb = max_memory(report.memory_kb, memory_kb);
                continue;
            }

            log::debug!(
                "submission {} case {} failed: {}",
                task.submission.id,
                index,
                case_verdict.verdict
            );
            if first_failure.is_none() {
                first_failure = Some(case_verdict);
            }
            if self.failure_policy == FailurePolicy::FailFast {
                break;
            }
        }

        if let Some(failure) = first_failure {
            report.verdict = failure.verdict;
            report.error_message = failure.message;
        }
        report
    }

    /// `Some(message)` when the submission does not compile
    fn compile(&self, profile: &dyn LanguageProfile, source: &Path, workdir: &Path) -> Option<String> {
        let command = profile.compile_command(source)?;
        let request = RunRequest {
            command: &command,
            workdir,
            stdin: "",
            time_limit_ms: self.compile_timeout_ms,
            output_limit_bytes: self.compile_output_limit_bytes,
        };

        match self.runner.run(&request) {
            Ok(outcome) => VerdictClassifier::classify_compile(&outcome),
            Err(e) => Some(format!("Compiler unavailable: {}", e)),
        }
    }

    fn run_case(
        &self,
        task: &JudgeTask<'_>,
        command: &[String],
        workdir: &Path,
        index: usize,
    ) -> (CaseVerdict, u64, Option<u64>) {
        let case = &task.test_cases[index];
        let request = RunRequest {
            command,
            workdir,
            stdin: &case.input,
            time_limit_ms: task.problem.time_limit_ms,
            output_limit_bytes: task.problem.output_limit_bytes(),
        };

        let metrics = get_metrics();
        metrics.test_case_runs.inc();

        match self.runner.run(&request) {
            Ok(outcome) => {
                if outcome.timed_out {
                    metrics.timeout_kills.inc();
                }
                if outcome.output_exceeded {
                    metrics.output_limit_kills.inc();
                }
                let verdict = VerdictClassifier::classify_case(&outcome, &case.expected_output);
                (verdict, outcome.elapsed_ms, outcome.memory_kb)
            }
            Err(e) => (
                CaseVerdict {
                    verdict: Verdict::RuntimeError,
                    message: Some(e.to_string()),
                },
                0,
                None,
            ),
        }
    }
}

impl JudgeStrategy for TraditionalJudge {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Traditional
    }

    fn judge(&self, task: &JudgeTask<'_>) -> Result<JudgeReport> {
        let submission = task.submission;
        get_metrics().strategy_traditional.inc();

        let report = match self.registry.resolve(&submission.language) {
            Ok(profile) => {
                let mut workspace = self.workspaces.create_workspace(&submission.id)?;
                let source = workspace.write_source(&profile.source_file_name(), &submission.code)?;
                let workdir = workspace.run_dir().to_path_buf();
                let report = self.judge_in_workspace(task, profile.as_ref(), &source, &workdir);
                workspace.cleanup();
                report
            }
            Err(e @ JudgeError::UnsupportedLanguage(_)) => JudgeReport::failed(
                StrategyKind::Traditional,
                Verdict::CompileError,
                task.test_cases.len(),
                e.to_string(),
            ),
            Err(e) => return Err(e),
        };

        self.stats.record_judged(
            &submission.problem_id,
            &submission.user_id,
            report.is_accepted(),
        );
        Ok(report)
    }
}

fn max_memory(current: Option<u64>, sample: Option<u64>) -> Option<u64> {
    match (current, sample) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
