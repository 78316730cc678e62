/// Judge orchestrator: strategy selection, AI fallback and every submission
/// state transition.
///
/// Strategies compute reports; only this type writes submission status. A
/// submission moves `pending -> judging` when judging starts and
/// `judging -> <verdict>` exactly once when it ends, whatever happened in
/// between (AI failure, strategy error, strategy panic).
use crate::config::settings::JudgeConfig;
use crate::config::types::{JudgeError, Result, Verdict};
use crate::core::types::{JudgeReport, Problem, StrategyKind, Submission, TestCase};
use crate::exec::runner::{ProcessGroupRunner, ProcessRunner};
use crate::judge::registry::LanguageRegistry;
use crate::observability::audit::events;
use crate::observability::metrics::get_metrics;
use crate::safety::workspace::WorkspaceManager;
use crate::store::{StatsSink, SubmissionStore};
use crate::strategy::ai::{AiJudge, ReasoningClient};
use crate::strategy::traditional::TraditionalJudge;
use crate::strategy::{JudgeStrategy, JudgeTask};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal judge error";

/// Keeps the active-judgement gauge balanced on every exit path
struct ActiveJudgement;

impl ActiveJudgement {
    fn enter() -> Self {
        get_metrics().active_judgements.inc();
        ActiveJudgement
    }
}

impl Drop for ActiveJudgement {
    fn drop(&mut self) {
        get_metrics().active_judgements.dec();
    }
}

pub struct JudgeOrchestrator {
    config: JudgeConfig,
    store: Arc<dyn SubmissionStore>,
    stats: Arc<dyn StatsSink>,
    runner: Arc<dyn ProcessRunner>,
    registry: Arc<LanguageRegistry>,
    traditional: Arc<dyn JudgeStrategy>,
    ai: Option<AiJudge>,
}

impl JudgeOrchestrator {
    /// Traditional-only orchestrator with the built-in languages and the
    /// process-group runner
    pub fn new(
        config: JudgeConfig,
        store: Arc<dyn SubmissionStore>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(ProcessGroupRunner::default());
        let registry = Arc::new(LanguageRegistry::global().clone());
        let traditional = Self::build_traditional(&config, &runner, &registry, &stats);
        Self {
            config,
            store,
            stats,
            runner,
            registry,
            traditional,
            ai: None,
        }
    }

    fn build_traditional(
        config: &JudgeConfig,
        runner: &Arc<dyn ProcessRunner>,
        registry: &Arc<LanguageRegistry>,
        stats: &Arc<dyn StatsSink>,
    ) -> Arc<dyn JudgeStrategy> {
        Arc::new(
            TraditionalJudge::new(config, Arc::clone(runner), Arc::clone(stats))
                .with_registry(Arc::clone(registry)),
        )
    }

    fn rebuild_traditional(&mut self) {
        self.traditional =
            Self::build_traditional(&self.config, &self.runner, &self.registry, &self.stats);
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self.rebuild_traditional();
        self
    }

    pub fn with_registry(mut self, registry: Arc<LanguageRegistry>) -> Self {
        self.registry = registry;
        self.rebuild_traditional();
        self
    }

    /// Inject the reasoning client used when `ai.enabled` is set
    pub fn with_ai_client(mut self, client: Arc<dyn ReasoningClient>) -> Self {
        self.ai = Some(AiJudge::new(client, Arc::clone(&self.stats)));
        self
    }

    /// Replace the execution strategy outright
    pub fn with_traditional(mut self, strategy: Arc<dyn JudgeStrategy>) -> Self {
        self.traditional = strategy;
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// AI helpers (error explanations, hints), when a client is configured
    pub fn ai(&self) -> Option<&AiJudge> {
        self.ai.as_ref()
    }

    /// Persist a new pending submission and return its id
    pub fn submit(&self, submission: Submission) -> Result<String> {
        let id = submission.id.clone();
        self.store.insert(submission)?;
        Ok(id)
    }

    /// Remove workspaces abandoned by a previous judge process
    pub fn sweep_stale_workspaces(&self) -> usize {
        let manager = WorkspaceManager::new(self.config.workspace_root.clone());
        let max_age = Duration::from_secs(self.config.stale_workspace_max_age_secs);
        match manager.sweep_stale(max_age) {
            Ok(removed) => removed,
            Err(e) => {
                log::warn!(
                    "Stale workspace sweep of {} failed: {}",
                    manager.root().display(),
                    e
                );
                0
            }
        }
    }

    /// Judge one pending submission to a terminal state.
    ///
    /// Fails only when the submission cannot enter or leave `judging`
    /// (unknown id, not pending, store failure); every judging failure ends
    /// up in the returned report.
    pub fn judge(
        &self,
        submission_id: &str,
        problem: &Problem,
        test_cases: &[TestCase],
    ) -> Result<JudgeReport> {
        let started = Instant::now();
        let submission = match self.store.mark_judging(submission_id) {
            Ok(submission) => submission,
            Err(e) => {
                if let JudgeError::InvalidTransition { .. } = e {
                    events::invalid_transition(submission_id, &e.to_string());
                }
                return Err(e);
            }
        };
        let _active = ActiveJudgement::enter();
        events::judge_start(&submission.id, &submission.problem_id, &submission.language);

        let report = self.compute_report(&submission, problem, test_cases);

        self.store.complete(submission_id, &report).map_err(|e| {
            log::error!("Failed to record verdict for {}: {}", submission_id, e);
            e
        })?;

        get_metrics().record_verdict(report.verdict, started.elapsed());
        events::judge_end(
            submission_id,
            report.strategy.as_str(),
            report.verdict,
            format!(
                "{}/{} cases passed in {} ms",
                report.test_cases_passed, report.total_test_cases, report.execution_time_ms
            ),
        );
        Ok(report)
    }

    /// Judge on a dedicated thread
    pub fn dispatch(
        self: Arc<Self>,
        submission_id: String,
        problem: Problem,
        test_cases: Vec<TestCase>,
    ) -> Result<JoinHandle<Result<JudgeReport>>> {
        thread::Builder::new()
            .name(format!("judge-{}", submission_id))
            .spawn(move || {
                let result = self.judge(&submission_id, &problem, &test_cases);
                if let Err(e) = &result {
                    log::error!("Judging {} failed: {}", submission_id, e);
                }
                result
            })
            .map_err(JudgeError::Io)
    }

    fn selected_ai(&self) -> Option<&AiJudge> {
        if !self.config.ai.enabled {
            return None;
        }
        self.ai.as_ref().filter(|ai| ai.is_available())
    }

    fn compute_report(
        &self,
        submission: &Submission,
        problem: &Problem,
        test_cases: &[TestCase],
    ) -> JudgeReport {
        let total = test_cases.len();

        if !self.registry.supports(&submission.language) {
            self.record_stats(submission, false);
            return JudgeReport::failed(
                StrategyKind::Traditional,
                Verdict::CompileError,
                total,
                JudgeError::UnsupportedLanguage(submission.language.clone()).to_string(),
            );
        }

        let task = JudgeTask {
            submission,
            problem,
            test_cases,
        };

        if let Some(ai) = self.selected_ai() {
            events::strategy_selected(&submission.id, StrategyKind::Ai.as_str());
            match run_guarded(ai, &task) {
                Ok(report) => return report,
                Err(e) => {
                    log::warn!(
                        "AI judging of {} failed, falling back to traditional: {}",
                        submission.id,
                        e
                    );
                    get_metrics().ai_fallbacks.inc();
                    events::ai_fallback(&submission.id, &e.to_string());
                }
            }
        }

        events::strategy_selected(&submission.id, self.traditional.kind().as_str());
        match run_guarded(self.traditional.as_ref(), &task) {
            Ok(report) => report,
            Err(e) => {
                log::error!("Judging {} failed internally: {}", submission.id, e);
                get_metrics().internal_errors.inc();
                events::internal_error(&submission.id, &e.to_string());
                self.record_stats(submission, false);
                JudgeReport::failed(
                    StrategyKind::Traditional,
                    Verdict::RuntimeError,
                    total,
                    INTERNAL_ERROR_MESSAGE,
                )
            }
        }
    }

    fn record_stats(&self, submission: &Submission, accepted: bool) {
        self.stats
            .record_judged(&submission.problem_id, &submission.user_id, accepted);
    }
}

/// Run a strategy, turning a panic into an error
fn run_guarded(strategy: &dyn JudgeStrategy, task: &JudgeTask<'_>) -> Result<JudgeReport> {
    match catch_unwind(AssertUnwindSafe(|| strategy.judge(task))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(JudgeError::InternalJudgeError(format!(
                "{} strategy panicked: {}",
                strategy.kind(),
                detail
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SubmissionStatus;
    use crate::store::MemoryStore;

    struct FixedStrategy(Result<JudgeReport>);

    impl JudgeStrategy for FixedStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Traditional
        }

        fn judge(&self, _task: &JudgeTask<'_>) -> Result<JudgeReport> {
            match &self.0 {
                Ok(report) => Ok(report.clone()),
                Err(e) => Err(JudgeError::ExecutionFault(e.to_string())),
            }
        }
    }

    struct PanickingStrategy;

    impl JudgeStrategy for PanickingStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Traditional
        }

        fn judge(&self, _task: &JudgeTask<'_>) -> Result<JudgeReport> {
            panic!("runner exploded")
        }
    }

    fn problem() -> Problem {
        Problem {
            id: "p1".to_string(),
            title: "t".to_string(),
            difficulty: "easy".to_string(),
            description: String::new(),
            input_format: None,
            output_format: None,
            constraints: None,
            time_limit_ms: 1000,
            memory_limit_mb: 16,
        }
    }

    fn setup(strategy: Arc<dyn JudgeStrategy>) -> (JudgeOrchestrator, Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = JudgeOrchestrator::new(JudgeConfig::default(), store.clone(), store.clone())
            .with_traditional(strategy);
        let id = orchestrator
            .submit(Submission::new("u1", "p1", "python", "print(1)"))
            .unwrap();
        (orchestrator, store, id)
    }

    #[test]
    fn test_strategy_report_is_persisted() {
        let accepted = JudgeReport::empty(StrategyKind::Traditional, Verdict::Accepted, 1);
        let (orchestrator, store, id) = setup(Arc::new(FixedStrategy(Ok(accepted))));

        let report = orchestrator.judge(&id, &problem(), &[TestCase::new("", "")]).unwrap();
        assert_eq!(report.verdict, Verdict::Accepted);
        let record = store.get(&id).unwrap();
        assert_eq!(record.status, SubmissionStatus::Accepted);
        assert!(record.judged_at.is_some());
    }

    #[test]
    fn test_strategy_error_becomes_internal_error() {
        let failing = FixedStrategy(Err(JudgeError::Workspace("disk full".to_string())));
        let (orchestrator, store, id) = setup(Arc::new(failing));

        let report = orchestrator.judge(&id, &problem(), &[]).unwrap();
        assert_eq!(report.verdict, Verdict::RuntimeError);
        assert_eq!(report.error_message.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
        assert_eq!(store.get(&id).unwrap().status, SubmissionStatus::RuntimeError);
        assert_eq!(store.problem_stats("p1").total_submissions, 1);
    }

    #[test]
    fn test_strategy_panic_still_reaches_terminal_state() {
        let (orchestrator, store, id) = setup(Arc::new(PanickingStrategy));

        let report = orchestrator.judge(&id, &problem(), &[]).unwrap();
        assert_eq!(report.verdict, Verdict::RuntimeError);
        assert_eq!(store.get(&id).unwrap().status, SubmissionStatus::RuntimeError);
    }

    #[test]
    fn test_second_judge_is_rejected_without_effect() {
        let accepted = JudgeReport::empty(StrategyKind::Traditional, Verdict::Accepted, 0);
        let (orchestrator, store, id) = setup(Arc::new(FixedStrategy(Ok(accepted))));

        orchestrator.judge(&id, &problem(), &[]).unwrap();
        let again = orchestrator.judge(&id, &problem(), &[]);
        assert!(matches!(again, Err(JudgeError::InvalidTransition { .. })));
        assert_eq!(store.problem_stats("p1").total_submissions, 0);
        assert_eq!(store.get(&id).unwrap().status, SubmissionStatus::Accepted);
    }

    #[test]
    fn test_unsupported_language_skips_strategies() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = JudgeOrchestrator::new(JudgeConfig::default(), store.clone(), store.clone())
            .with_traditional(Arc::new(PanickingStrategy));
        let id = orchestrator
            .submit(Submission::new("u1", "p1", "brainfuck", "+++"))
            .unwrap();

        let report = orchestrator.judge(&id, &problem(), &[TestCase::new("", "")]).unwrap();
        assert_eq!(report.verdict, Verdict::CompileError);
        assert_eq!(
            report.error_message.as_deref(),
            Some("Unsupported language: brainfuck")
        );
        assert_eq!(store.problem_stats("p1").total_submissions, 1);
    }

    #[test]
    fn test_unknown_submission() {
        let (orchestrator, _, _) = setup(Arc::new(PanickingStrategy));
        assert!(matches!(
            orchestrator.judge("missing", &problem(), &[]),
            Err(JudgeError::NotFound(_))
        ));
    }

    #[test]
    fn test_dispatch_runs_on_its_own_thread() {
        let accepted = JudgeReport::empty(StrategyKind::Traditional, Verdict::Accepted, 0);
        let (orchestrator, store, id) = setup(Arc::new(FixedStrategy(Ok(accepted))));

        let handle = Arc::new(orchestrator)
            .dispatch(id.clone(), problem(), Vec::new())
            .unwrap();
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.verdict, Verdict::Accepted);
        assert_eq!(store.get(&id).unwrap().status, SubmissionStatus::Accepted);
    }
}
