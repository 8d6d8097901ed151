//! End-to-end run: acquire → normalize → locale filter → dedup → sink → commit.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use jobsweep_normalize::{NormalizeContext, filter_us, normalize_all};
use jobsweep_shared::{
    AppConfig, JobsweepError, NormalizedRecord, RegistryStats, Result, RunId, Tier,
};
use jobsweep_sources::{AcquisitionPlan, Orchestrator, TierSummary};
use jobsweep_storage::{JobSink, SeenRegistry, open_registry, open_sink};

use crate::dedup::Deduplicator;

/// Records shown in a dry-run preview.
const PREVIEW_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// Pipeline stage, reported to [`ProgressReporter::stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Acquiring,
    Normalizing,
    LocaleFiltering,
    Deduping,
    Sinking,
    CommittingRegistry,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::Acquiring => "acquiring postings",
            Stage::Normalizing => "normalizing",
            Stage::LocaleFiltering => "filtering to US postings",
            Stage::Deduping => "deduplicating",
            Stage::Sinking => "writing to sink",
            Stage::CommittingRegistry => "committing to registry",
        };
        f.write_str(label)
    }
}

/// What one run should do.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub tiers: Vec<Tier>,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    /// Stop after dedup and only log what would be written.
    pub dry_run: bool,
    /// Wall-clock limit for the whole run.
    pub timeout: Option<Duration>,
}

impl RunRequest {
    /// All tiers, configured keywords and locations, configured timeout.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tiers: Tier::ALL.to_vec(),
            keywords: config.search.keywords.clone(),
            locations: config.search.locations.clone(),
            dry_run: false,
            timeout: (config.run.timeout_secs > 0)
                .then(|| Duration::from_secs(config.run.timeout_secs)),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Acquisition produced nothing.
    NoRecords,
    /// Everything acquired was already delivered.
    NothingNew,
    DryRun { would_write: usize },
    /// The sink could not be initialized; nothing written or committed.
    SinkUnavailable,
    /// The sink accepted nothing; nothing committed.
    NotWritten,
    Delivered {
        written: usize,
        committed: usize,
        commit_failures: usize,
    },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoRecords => f.write_str("no records acquired"),
            RunOutcome::NothingNew => f.write_str("nothing new"),
            RunOutcome::DryRun { would_write } => write!(f, "dry run, would write {would_write}"),
            RunOutcome::SinkUnavailable => f.write_str("sink unavailable"),
            RunOutcome::NotWritten => f.write_str("nothing written"),
            RunOutcome::Delivered {
                written,
                committed,
                commit_failures,
            } => write!(
                f,
                "delivered {written}, committed {committed}, {commit_failures} commit failures"
            ),
        }
    }
}

/// Record counts after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub raw: usize,
    pub normalized: usize,
    pub us: usize,
    pub new: usize,
    pub written: usize,
    pub committed: usize,
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: StageCounts,
    pub tiers: Vec<TierSummary>,
    /// Failed acquisition combinations (label, error message).
    pub acquisition_errors: Vec<(String, String)>,
    /// Registry statistics after the run; `None` if they could not be read.
    pub registry: Option<RegistryStats>,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, stage: Stage);
    /// Called as each tier finishes acquiring.
    fn tier_progress(&self, summary: &TierSummary);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn tier_progress(&self, _summary: &TierSummary) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    orchestrator: Orchestrator,
    registry: Arc<dyn SeenRegistry>,
    sink: Arc<dyn JobSink>,
    running: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        orchestrator: Orchestrator,
        registry: Arc<dyn SeenRegistry>,
        sink: Arc<dyn JobSink>,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            sink,
            running: Mutex::new(()),
        }
    }

    /// Wire sources, registry, and sink from config.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let orchestrator = Orchestrator::from_config(config)?;
        let registry = open_registry(&config.registry).await?;
        let sink = open_sink(&config.sink);
        Ok(Self::new(orchestrator, registry, sink))
    }

    /// Run the pipeline once. Fails with [`JobsweepError::RunInProgress`]
    /// if another run on this pipeline has not finished.
    pub async fn run(
        &self,
        request: &RunRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| JobsweepError::RunInProgress)?;

        match request.timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute(request, progress))
                .await
                .map_err(|_| {
                    error!(timeout_secs = limit.as_secs(), "run timed out");
                    JobsweepError::Timeout(limit)
                })?,
            None => self.execute(request, progress).await,
        }
    }

    #[instrument(skip_all, fields(dry_run = request.dry_run))]
    async fn execute(
        &self,
        request: &RunRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport {
            run_id: RunId::new(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            counts: StageCounts::default(),
            tiers: Vec::new(),
            acquisition_errors: Vec::new(),
            registry: None,
            outcome: RunOutcome::NoRecords,
            elapsed: Duration::ZERO,
        };

        info!(
            run_id = %report.run_id,
            tiers = ?request.tiers.iter().map(|t| t.number()).collect::<Vec<_>>(),
            keywords = request.keywords.len(),
            locations = request.locations.len(),
            "starting run"
        );

        // --- Acquire ---
        progress.stage(Stage::Acquiring);
        let plan = AcquisitionPlan {
            tiers: request.tiers.clone(),
            keywords: request.keywords.clone(),
            locations: request.locations.clone(),
        };

        let mut raw = Vec::new();
        for tier in plan.ordered_tiers() {
            let part = self.orchestrator.acquire_tier(tier, &plan).await;
            for summary in &part.tiers {
                progress.tier_progress(summary);
            }
            raw.extend(part.records);
            report.tiers.extend(part.tiers);
            report.acquisition_errors.extend(part.errors);
        }
        report.counts.raw = raw.len();

        if raw.is_empty() {
            warn!("no postings acquired, check API keys and network connectivity");
            return Ok(self.finish(report, RunOutcome::NoRecords, start, progress).await);
        }

        // --- Normalize ---
        progress.stage(Stage::Normalizing);
        let normalized = normalize_all(&raw, &NormalizeContext::now());
        report.counts.normalized = normalized.len();

        // --- Locale filter ---
        progress.stage(Stage::LocaleFiltering);
        let us = filter_us(normalized);
        report.counts.us = us.len();

        // --- Dedup ---
        progress.stage(Stage::Deduping);
        let dedup = Deduplicator::new(self.registry.as_ref());
        let fresh = dedup.filter_new(us).await?;
        report.counts.new = fresh.len();

        if fresh.is_empty() {
            info!("no new postings, everything was already delivered");
            return Ok(self.finish(report, RunOutcome::NothingNew, start, progress).await);
        }

        if request.dry_run {
            log_preview(&fresh);
            let outcome = RunOutcome::DryRun {
                would_write: fresh.len(),
            };
            return Ok(self.finish(report, outcome, start, progress).await);
        }

        // --- Sink ---
        progress.stage(Stage::Sinking);
        if let Err(e) = self.sink.initialize().await {
            error!(error = %e, "sink initialization failed, nothing written");
            return Ok(self.finish(report, RunOutcome::SinkUnavailable, start, progress).await);
        }

        let written = match self.sink.write(&fresh).await {
            Ok(n) => n.min(fresh.len()),
            Err(e) => {
                error!(error = %e, "sink write failed");
                0
            }
        };
        report.counts.written = written;

        if written == 0 {
            warn!("sink accepted no rows, registry left untouched");
            return Ok(self.finish(report, RunOutcome::NotWritten, start, progress).await);
        }
        if written < fresh.len() {
            warn!(
                written,
                pending = fresh.len() - written,
                "partial write, unwritten postings will be offered again next run"
            );
        }

        // --- Commit ---
        progress.stage(Stage::CommittingRegistry);
        let committed = dedup.mark_seen(&fresh[..written]).await;
        report.counts.committed = committed.committed;

        let outcome = RunOutcome::Delivered {
            written,
            committed: committed.committed,
            commit_failures: committed.failed,
        };
        Ok(self.finish(report, outcome, start, progress).await)
    }

    async fn finish(
        &self,
        mut report: RunReport,
        outcome: RunOutcome,
        start: Instant,
        progress: &dyn ProgressReporter,
    ) -> RunReport {
        report.registry = match self.registry.stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "could not read registry stats");
                None
            }
        };
        report.outcome = outcome;
        report.finished_at = Utc::now();
        report.elapsed = start.elapsed();

        let c = report.counts;
        info!(
            run_id = %report.run_id,
            raw = c.raw,
            normalized = c.normalized,
            us = c.us,
            new = c.new,
            written = c.written,
            committed = c.committed,
            outcome = %report.outcome,
            duration_ms = report.elapsed.as_millis(),
            "run complete"
        );

        progress.stage(Stage::Idle);
        progress.done(&report);
        report
    }
}

fn log_preview(records: &[NormalizedRecord]) {
    info!(would_write = records.len(), "dry run, sink skipped");
    for record in records.iter().take(PREVIEW_LIMIT) {
        info!(
            company = %record.company_name,
            title = %record.job_title,
            source = %record.source,
            "would write"
        );
    }
    if records.len() > PREVIEW_LIMIT {
        info!(more = records.len() - PREVIEW_LIMIT, "preview truncated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobsweep_shared::{ApplyOption, BoardCard, GoogleJobsPosting, RawRecord};
    use jobsweep_sources::{JobSource, LocationScope};
    use jobsweep_storage::{MemoryRegistry, MemorySink};

    /// Returns the same records for every keyword, optionally after a delay.
    struct StubSource {
        tier: Tier,
        records: Vec<RawRecord>,
        delay: Duration,
    }

    #[async_trait]
    impl JobSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn tier(&self) -> Tier {
            self.tier
        }

        fn location_scope(&self) -> LocationScope {
            LocationScope::KeywordOnly
        }

        async fn search(&self, _keyword: &str, _location: Option<&str>) -> Result<Vec<RawRecord>> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.records.clone())
        }
    }

    fn google(company: &str, title: &str, location: &str, url: &str) -> RawRecord {
        RawRecord::GoogleJobs(GoogleJobsPosting {
            title: Some(title.into()),
            company_name: Some(company.into()),
            location: Some(location.into()),
            apply_options: vec![ApplyOption {
                title: Some("Indeed".into()),
                link: Some(url.into()),
            }],
            ..GoogleJobsPosting::default()
        })
    }

    fn card(company: &str, title: &str, city: &str, state: &str) -> RawRecord {
        RawRecord::NicheBoard(BoardCard {
            title: title.into(),
            company: company.into(),
            location: format!("{city}, {state}"),
            city: city.into(),
            state: state.into(),
            board: "accountingcrossing.com".into(),
            ..BoardCard::default()
        })
    }

    struct Harness {
        pipeline: Pipeline,
        registry: Arc<MemoryRegistry>,
        sink: Arc<MemorySink>,
    }

    fn harness(sources: Vec<StubSource>) -> Harness {
        let registry = Arc::new(MemoryRegistry::new());
        let sink = Arc::new(MemorySink::new());
        let mut orchestrator = Orchestrator::new(2);
        for source in sources {
            orchestrator = orchestrator.with_source(Arc::new(source));
        }
        Harness {
            pipeline: Pipeline::new(orchestrator, registry.clone(), sink.clone()),
            registry,
            sink,
        }
    }

    fn stub(tier: Tier, records: Vec<RawRecord>) -> StubSource {
        StubSource {
            tier,
            records,
            delay: Duration::ZERO,
        }
    }

    fn request() -> RunRequest {
        RunRequest {
            tiers: Tier::ALL.to_vec(),
            keywords: vec!["Accounts Payable".into()],
            locations: vec!["Austin, TX".into()],
            dry_run: false,
            timeout: None,
        }
    }

    fn two_postings() -> Vec<RawRecord> {
        vec![
            google("Acme Inc", "Accounts Payable Clerk", "Austin, TX", "https://jobs.example/1"),
            google("Globex", "AP Specialist", "Denver, CO", "https://jobs.example/2"),
        ]
    }

    #[tokio::test]
    async fn delivers_then_is_idempotent() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);

        let first = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(
            first.outcome,
            RunOutcome::Delivered {
                written: 2,
                committed: 2,
                commit_failures: 0
            }
        );
        assert_eq!(h.sink.rows().len(), 2);
        assert_eq!(first.registry.as_ref().map(|s| s.total), Some(2));

        let second = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(second.outcome, RunOutcome::NothingNew);
        assert_eq!(second.counts.raw, 2);
        assert_eq!(h.sink.rows().len(), 2);
    }

    #[tokio::test]
    async fn same_posting_across_tiers_is_delivered_once() {
        let h = harness(vec![
            stub(
                Tier::Primary,
                vec![google("Acme Inc", "Accounts Payable Clerk", "Austin, TX", "https://jobs.example/u")],
            ),
            stub(Tier::Niche, vec![card("Acme", "accounts payable clerk", "Austin", "TX")]),
        ]);

        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.counts.raw, 2);
        assert_eq!(report.counts.us, 2);
        assert_eq!(report.counts.new, 1);

        let rows = h.sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_url, "https://jobs.example/u");
        assert_eq!(report.tiers.len(), 3);
        assert!(report.tiers[1].skipped);
    }

    #[tokio::test]
    async fn known_url_is_duplicate_even_with_new_content() {
        let h = harness(vec![stub(
            Tier::Primary,
            vec![google("Globex", "Controller", "Austin, TX", "https://jobs.example/1")],
        )]);
        h.pipeline.run(&request(), &SilentProgress).await.unwrap();

        let orchestrator = Orchestrator::new(1).with_source(Arc::new(stub(
            Tier::Primary,
            vec![google("Initech", "AP Lead", "Austin, TX", "https://jobs.example/1")],
        )));
        let rerun = Pipeline::new(orchestrator, h.registry.clone(), h.sink.clone());

        let report = rerun.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::NothingNew);
        assert_eq!(h.registry.entries().len(), 1);
        assert_eq!(h.sink.rows().len(), 1);
    }

    #[tokio::test]
    async fn foreign_postings_are_filtered_out() {
        let h = harness(vec![stub(
            Tier::Primary,
            vec![
                google("Maple Ltd", "AP Clerk", "Toronto, ON, Canada", "https://jobs.example/ca"),
                google("Acme", "AP Clerk", "Austin, TX", "https://jobs.example/us"),
            ],
        )]);

        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.counts.normalized, 2);
        assert_eq!(report.counts.us, 1);
        assert_eq!(h.sink.rows()[0].company_name, "Acme");
    }

    #[tokio::test]
    async fn uncommitted_delivery_is_offered_again() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        h.registry.set_reject_inserts(true);

        let first = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(
            first.outcome,
            RunOutcome::Delivered {
                written: 2,
                committed: 0,
                commit_failures: 2
            }
        );

        h.registry.set_reject_inserts(false);
        let second = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(second.counts.new, 2);
        assert_eq!(h.sink.rows().len(), 4);
    }

    #[tokio::test]
    async fn only_written_prefix_is_committed() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        h.sink.set_write_cap(Some(1));

        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.counts.written, 1);
        assert_eq!(report.counts.committed, 1);

        let entries = h.registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company, "Acme Inc");
    }

    #[tokio::test]
    async fn zero_writes_commit_nothing() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        h.sink.set_write_cap(Some(0));

        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::NotWritten);
        assert!(h.registry.entries().is_empty());

        h.sink.set_write_cap(None);
        h.sink.set_fail_write(true);
        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::NotWritten);
        assert!(h.registry.entries().is_empty());
    }

    #[tokio::test]
    async fn dry_run_touches_neither_sink_nor_registry() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        let mut req = request();
        req.dry_run = true;

        let report = h.pipeline.run(&req, &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::DryRun { would_write: 2 });
        assert!(h.sink.rows().is_empty());
        assert!(h.registry.entries().is_empty());
    }

    #[tokio::test]
    async fn sink_init_failure_reports_counts() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        h.sink.set_fail_initialize(true);

        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::SinkUnavailable);
        assert_eq!(report.counts.new, 2);
        assert!(h.registry.entries().is_empty());
    }

    #[tokio::test]
    async fn registry_failure_aborts_before_sink() {
        let h = harness(vec![stub(Tier::Primary, two_postings())]);
        h.registry.set_unavailable(true);

        let err = h.pipeline.run(&request(), &SilentProgress).await.unwrap_err();
        assert!(matches!(err, JobsweepError::Storage(_)));
        assert!(h.sink.rows().is_empty());
    }

    #[tokio::test]
    async fn empty_acquisition_ends_early() {
        let h = harness(vec![stub(Tier::Primary, Vec::new())]);
        let report = h.pipeline.run(&request(), &SilentProgress).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::NoRecords);
        assert_eq!(report.counts, StageCounts::default());
    }

    #[tokio::test]
    async fn concurrent_run_is_rejected() {
        let h = harness(vec![StubSource {
            tier: Tier::Primary,
            records: two_postings(),
            delay: Duration::from_millis(50),
        }]);
        let req = request();

        let (first, second) = tokio::join!(
            h.pipeline.run(&req, &SilentProgress),
            h.pipeline.run(&req, &SilentProgress)
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(JobsweepError::RunInProgress)));
    }

    #[tokio::test]
    async fn run_times_out() {
        let h = harness(vec![StubSource {
            tier: Tier::Primary,
            records: two_postings(),
            delay: Duration::from_millis(500),
        }]);
        let mut req = request();
        req.timeout = Some(Duration::from_millis(20));

        let err = h.pipeline.run(&req, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, JobsweepError::Timeout(_)));
        assert!(h.sink.rows().is_empty());

        // The guard is released after a timeout.
        req.timeout = None;
        req.dry_run = true;
        assert!(h.pipeline.run(&req, &SilentProgress).await.is_ok());
    }
}
