//! Tiered acquisition orchestrator.
//!
//! Expands each tier into keyword × location combinations, runs them with
//! bounded parallelism, and isolates every combination's failure. Output order
//! is deterministic: tiers in plan order, combinations in expansion order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use jobsweep_shared::{
    AppConfig, JobsweepError, RawRecord, Result, Tier, resolve_secret,
};

use crate::{GoogleJobsSource, JSearchSource, JobSource, LocationScope, NicheBoardSource};

// ---------------------------------------------------------------------------
// Plan and report
// ---------------------------------------------------------------------------

/// What to acquire in one run.
#[derive(Debug, Clone)]
pub struct AcquisitionPlan {
    pub tiers: Vec<Tier>,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
}

impl AcquisitionPlan {
    /// Requested tiers, deduplicated, in canonical run order.
    pub fn ordered_tiers(&self) -> Vec<Tier> {
        Tier::ALL
            .into_iter()
            .filter(|tier| self.tiers.contains(tier))
            .collect()
    }
}

/// Outcome of one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSummary {
    pub tier: Tier,
    /// Combinations attempted.
    pub combinations: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Raw records produced.
    pub records: usize,
    /// No source was configured for this tier (e.g. missing API key).
    pub skipped: bool,
    pub elapsed: Duration,
}

/// Summary of an acquisition pass.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionReport {
    pub records: Vec<RawRecord>,
    pub tiers: Vec<TierSummary>,
    /// Failed combinations (label, error message).
    pub errors: Vec<(String, String)>,
}

impl AcquisitionReport {
    /// Append another report's records, summaries, and errors.
    pub fn absorb(&mut self, other: AcquisitionReport) {
        self.records.extend(other.records);
        self.tiers.extend(other.tiers);
        self.errors.extend(other.errors);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Fans out registered sources over the plan's combinations.
pub struct Orchestrator {
    sources: Vec<Arc<dyn JobSource>>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(concurrency: usize) -> Self {
        Self {
            sources: Vec::new(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn JobSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Register every source the config enables. Sources without an API key
    /// are left out with a warning, so their tier is reported as skipped.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.acquisition.http_timeout_secs);
        let mut orchestrator = Self::new(config.acquisition.concurrency as usize);

        match resolve_secret(&config.google_jobs.api_key_env) {
            Some(key) => {
                let source = GoogleJobsSource::new(key, config.google_jobs.clone(), timeout)?;
                orchestrator = orchestrator.with_source(Arc::new(source));
            }
            None => warn!(
                tier = %Tier::Primary,
                env = %config.google_jobs.api_key_env,
                "API key not set, tier will be skipped"
            ),
        }

        match resolve_secret(&config.jsearch.api_key_env) {
            Some(key) => {
                let source = JSearchSource::new(key, config.jsearch.clone(), timeout)?;
                orchestrator = orchestrator.with_source(Arc::new(source));
            }
            None => warn!(
                tier = %Tier::Supplementary,
                env = %config.jsearch.api_key_env,
                "API key not set, tier will be skipped"
            ),
        }

        let niche = NicheBoardSource::new(&config.niche, timeout)?;
        if niche.has_boards() {
            orchestrator = orchestrator.with_source(Arc::new(niche));
        } else {
            warn!(tier = %Tier::Niche, "no niche boards enabled, tier will be skipped");
        }

        Ok(orchestrator)
    }

    /// Acquire every tier in the plan.
    pub async fn acquire(&self, plan: &AcquisitionPlan) -> AcquisitionReport {
        let mut report = AcquisitionReport::default();
        for tier in plan.ordered_tiers() {
            report.absorb(self.acquire_tier(tier, plan).await);
        }
        report
    }

    /// Acquire a single tier. Never fails as a whole; failed combinations are
    /// logged and counted.
    #[instrument(skip_all, fields(tier = %tier))]
    pub async fn acquire_tier(&self, tier: Tier, plan: &AcquisitionPlan) -> AcquisitionReport {
        let start = Instant::now();
        let sources: Vec<&Arc<dyn JobSource>> =
            self.sources.iter().filter(|s| s.tier() == tier).collect();

        if sources.is_empty() {
            warn!("no source configured, skipping tier");
            return AcquisitionReport {
                tiers: vec![TierSummary {
                    tier,
                    combinations: 0,
                    succeeded: 0,
                    failed: 0,
                    records: 0,
                    skipped: true,
                    elapsed: start.elapsed(),
                }],
                ..AcquisitionReport::default()
            };
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = SearchTasks(Vec::new());

        for source in sources {
            for (keyword, location) in combinations(source.location_scope(), plan) {
                let label = match &location {
                    Some(loc) => format!("{} '{keyword}' @ '{loc}'", source.name()),
                    None => format!("{} '{keyword}'", source.name()),
                };
                let source = Arc::clone(source);
                let sem = Arc::clone(&semaphore);

                tasks.0.push((
                    label,
                    tokio::spawn(async move {
                        let _permit = sem
                            .acquire_owned()
                            .await
                            .map_err(|e| JobsweepError::Network(format!("semaphore closed: {e}")))?;
                        source.search(&keyword, location.as_deref()).await
                    }),
                ));
            }
        }

        let combinations_run = tasks.0.len();
        let mut report = AcquisitionReport::default();
        let mut failed = 0;

        // Awaited in spawn order; dropping `tasks` early aborts the rest.
        for (label, handle) in tasks.0.iter_mut() {
            match handle.await {
                Ok(Ok(records)) => report.records.extend(records),
                Ok(Err(e)) => {
                    warn!(combination = %label, error = %e, "combination failed");
                    report.errors.push((label.clone(), e.to_string()));
                    failed += 1;
                }
                Err(e) => {
                    warn!(combination = %label, error = %e, "combination task panicked");
                    report.errors.push((label.clone(), e.to_string()));
                    failed += 1;
                }
            }
        }

        let summary = TierSummary {
            tier,
            combinations: combinations_run,
            succeeded: combinations_run - failed,
            failed,
            records: report.records.len(),
            skipped: false,
            elapsed: start.elapsed(),
        };

        info!(
            combinations = summary.combinations,
            failed = summary.failed,
            records = summary.records,
            duration_ms = summary.elapsed.as_millis(),
            "tier acquisition completed"
        );

        report.tiers.push(summary);
        report
    }
}

/// Spawned searches, labelled. Aborts whatever is still running when
/// dropped, so a cancelled run stops spending API quota.
struct SearchTasks(Vec<(String, JoinHandle<Result<Vec<RawRecord>>>)>);

impl Drop for SearchTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

/// Expand the plan into (keyword, location) pairs for one source.
fn combinations(scope: LocationScope, plan: &AcquisitionPlan) -> Vec<(String, Option<String>)> {
    let locations: Vec<Option<String>> = match scope {
        LocationScope::KeywordOnly => vec![None],
        LocationScope::All | LocationScope::First(_) if plan.locations.is_empty() => vec![None],
        LocationScope::All => plan.locations.iter().cloned().map(Some).collect(),
        LocationScope::First(n) => plan.locations.iter().take(n).cloned().map(Some).collect(),
    };

    plan.keywords
        .iter()
        .flat_map(|keyword| {
            locations
                .iter()
                .map(move |location| (keyword.clone(), location.clone()))
        })
        .collect()
}
