use crate::config::types::{JudgeError, Result, SubmissionStatus};
use crate::core::types::{JudgeReport, Submission};
use crate::store::{ProblemStats, StatsSink, SubmissionStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    submissions: HashMap<String, Submission>,
    problems: HashMap<String, ProblemStats>,
    users_solved: HashMap<String, u64>,
}

/// In-process store. Every read-modify-write happens under one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problem_stats(&self, problem_id: &str) -> ProblemStats {
        self.lock()
            .map(|state| state.problems.get(problem_id).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn user_solved(&self, user_id: &str) -> u64 {
        self.lock()
            .map(|state| state.users_solved.get(user_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| JudgeError::InternalJudgeError("store lock poisoned".to_string()))
    }

    fn transition<F>(&self, id: &str, next: SubmissionStatus, apply: F) -> Result<Submission>
    where
        F: FnOnce(&mut Submission),
    {
        let mut state = self.lock()?;
        let submission = state
            .submissions
            .get_mut(id)
            .ok_or_else(|| JudgeError::NotFound(id.to_string()))?;

        if !submission.status.can_transition_to(next) {
            return Err(JudgeError::InvalidTransition {
                id: id.to_string(),
                from: submission.status,
                to: next,
            });
        }
        apply(submission);
        submission.status = next;
        Ok(submission.clone())
    }
}

impl SubmissionStore for MemoryStore {
    fn insert(&self, submission: Submission) -> Result<()> {
        let mut state = self.lock()?;
        if state.submissions.contains_key(&submission.id) {
            return Err(JudgeError::Config(format!(
                "Submission {} already exists",
                submission.id
            )));
        }
        state.submissions.insert(submission.id.clone(), submission);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Submission> {
        self.lock()?
            .submissions
            .get(id)
            .cloned()
            .ok_or_else(|| JudgeError::NotFound(id.to_string()))
    }

    fn mark_judging(&self, id: &str) -> Result<Submission> {
        self.transition(id, SubmissionStatus::Judging, |_| {})
    }

    fn complete(&self, id: &str, report: &JudgeReport) -> Result<Submission> {
        self.transition(id, report.verdict.into(), |submission| {
            submission.apply_report(report)
        })
    }
}

impl StatsSink for MemoryStore {
    fn record_judged(&self, problem_id: &str, user_id: &str, accepted: bool) {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                log::error!("Dropping stats update for {}: {}", problem_id, e);
                return;
            }
        };
        let stats = state.problems.entry(problem_id.to_string()).or_default();
        stats.total_submissions += 1;
        if accepted {
            stats.accepted_submissions += 1;
            *state.users_solved.entry(user_id.to_string()).or_insert(0) += 1;
        }
    }
}
