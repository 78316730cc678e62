// Judge metrics
//
// In-process counters for judging outcomes, strategy selection, AI fallbacks
// and workspace hygiene, plus a duration histogram. Exported in Prometheus
// text format by `export_prometheus`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::types::Verdict;

/// Counter metric (monotonically increasing)
#[derive(Debug)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gauge metric (can go up or down)
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Histogram bucket
#[derive(Debug)]
pub struct HistogramBucket {
    pub le: f64, // upper bound in seconds
    pub count: AtomicU64,
}

/// Histogram for durations
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
    sum: AtomicU64, // microseconds
    count: AtomicU64,
}

impl Histogram {
    /// Buckets sized for whole-submission judging (compile + all cases)
    pub fn new_judging() -> Self {
        let bounds = [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];
        Self {
            buckets: bounds
                .iter()
                .map(|&le| HistogramBucket {
                    le,
                    count: AtomicU64::new(0),
                })
                .collect(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: Duration) {
        let seconds = value.as_secs_f64();
        self.sum
            .fetch_add(value.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for bucket in &self.buckets {
            if seconds <= bucket.le {
                bucket.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_micros(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }
}

/// Judge metrics registry
#[derive(Debug)]
pub struct JudgeMetrics {
    pub judgements_total: Counter,
    pub active_judgements: Gauge,

    // Terminal verdicts
    pub verdict_accepted: Counter,
    pub verdict_wrong_answer: Counter,
    pub verdict_time_limit: Counter,
    pub verdict_memory_limit: Counter,
    pub verdict_runtime_error: Counter,
    pub verdict_compile_error: Counter,

    // Strategy selection
    pub strategy_traditional: Counter,
    pub strategy_ai: Counter,
    pub ai_fallbacks: Counter,
    pub internal_errors: Counter,

    pub test_case_runs: Counter,
    pub output_limit_kills: Counter,
    pub timeout_kills: Counter,

    pub workspace_cleanup_failures: Counter,
    pub stale_workspaces_removed: Counter,

    pub judge_duration: Histogram,
}

impl JudgeMetrics {
    pub fn new() -> Self {
        Self {
            judgements_total: Counter::new(),
            active_judgements: Gauge::default(),

            verdict_accepted: Counter::new(),
            verdict_wrong_answer: Counter::new(),
            verdict_time_limit: Counter::new(),
            verdict_memory_limit: Counter::new(),
            verdict_runtime_error: Counter::new(),
            verdict_compile_error: Counter::new(),

            strategy_traditional: Counter::new(),
            strategy_ai: Counter::new(),
            ai_fallbacks: Counter::new(),
            internal_errors: Counter::new(),

            test_case_runs: Counter::new(),
            output_limit_kills: Counter::new(),
            timeout_kills: Counter::new(),

            workspace_cleanup_failures: Counter::new(),
            stale_workspaces_removed: Counter::new(),

            judge_duration: Histogram::new_judging(),
        }
    }

    /// Record a terminal verdict
    pub fn record_verdict(&self, verdict: Verdict, duration: Duration) {
        self.judgements_total.inc();
        self.judge_duration.observe(duration);
        self.verdict_counter(verdict).inc();
    }

    pub fn verdict_counter(&self, verdict: Verdict) -> &Counter {
        match verdict {
            Verdict::Accepted => &self.verdict_accepted,
            Verdict::WrongAnswer => &self.verdict_wrong_answer,
            Verdict::TimeLimit => &self.verdict_time_limit,
            Verdict::MemoryLimit => &self.verdict_memory_limit,
            Verdict::RuntimeError => &self.verdict_runtime_error,
            Verdict::CompileError => &self.verdict_compile_error,
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP judgebox_judgements_total Submissions judged to a terminal verdict\n");
        output.push_str("# TYPE judgebox_judgements_total counter\n");
        output.push_str(&format!(
            "judgebox_judgements_total {}\n",
            self.judgements_total.get()
        ));

        output.push_str("# HELP judgebox_verdicts_total Terminal verdicts by kind\n");
        output.push_str("# TYPE judgebox_verdicts_total counter\n");
        for verdict in [
            Verdict::Accepted,
            Verdict::WrongAnswer,
            Verdict::TimeLimit,
            Verdict::MemoryLimit,
            Verdict::RuntimeError,
            Verdict::CompileError,
        ] {
            output.push_str(&format!(
                "judgebox_verdicts_total{{verdict=\"{}\"}} {}\n",
                verdict,
                self.verdict_counter(verdict).get()
            ));
        }

        output.push_str("# HELP judgebox_strategy_total Strategy runs by kind\n");
        output.push_str("# TYPE judgebox_strategy_total counter\n");
        output.push_str(&format!(
            "judgebox_strategy_total{{strategy=\"traditional\"}} {}\n",
            self.strategy_traditional.get()
        ));
        output.push_str(&format!(
            "judgebox_strategy_total{{strategy=\"ai\"}} {}\n",
            self.strategy_ai.get()
        ));

        output.push_str("# TYPE judgebox_ai_fallbacks_total counter\n");
        output.push_str(&format!(
            "judgebox_ai_fallbacks_total {}\n",
            self.ai_fallbacks.get()
        ));
        output.push_str("# TYPE judgebox_internal_errors_total counter\n");
        output.push_str(&format!(
            "judgebox_internal_errors_total {}\n",
            self.internal_errors.get()
        ));
        output.push_str("# TYPE judgebox_test_case_runs_total counter\n");
        output.push_str(&format!(
            "judgebox_test_case_runs_total {}\n",
            self.test_case_runs.get()
        ));
        output.push_str("# TYPE judgebox_workspace_cleanup_failures_total counter\n");
        output.push_str(&format!(
            "judgebox_workspace_cleanup_failures_total {}\n",
            self.workspace_cleanup_failures.get()
        ));

        output.push_str("# TYPE judgebox_active_judgements gauge\n");
        output.push_str(&format!(
            "judgebox_active_judgements {}\n",
            self.active_judgements.get()
        ));

        output.push_str("# HELP judgebox_judge_duration_seconds Wall time per judgement\n");
        output.push_str("# TYPE judgebox_judge_duration_seconds histogram\n");
        for bucket in &self.judge_duration.buckets {
            output.push_str(&format!(
                "judgebox_judge_duration_seconds_bucket{{le=\"{}\"}} {}\n",
                bucket.le,
                bucket.count.load(Ordering::Relaxed)
            ));
        }
        output.push_str(&format!(
            "judgebox_judge_duration_seconds_sum {}\n",
            self.judge_duration.get_sum_micros() as f64 / 1_000_000.0
        ));
        output.push_str(&format!(
            "judgebox_judge_duration_seconds_count {}\n",
            self.judge_duration.get_count()
        ));

        output
    }
}

impl Default for JudgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Global metrics instance
static METRICS: once_cell::sync::Lazy<Arc<JudgeMetrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(JudgeMetrics::new()));

/// Get global metrics registry
pub fn get_metrics() -> Arc<JudgeMetrics> {
    Arc::clone(&METRICS)
}
