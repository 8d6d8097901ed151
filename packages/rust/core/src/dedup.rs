//! Registry-backed deduplication.
//!
//! A record is a duplicate when its URL or its company/title fingerprint has
//! been delivered before, or was already emitted earlier in the same batch.
//! Marking records as seen is the caller's job and must only happen after the
//! sink confirmed delivery.

use std::collections::HashSet;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use jobsweep_shared::{NormalizedRecord, RegistryStats, Result, SeenEntry};
use jobsweep_storage::SeenRegistry;

/// Trailing company tokens ignored when fingerprinting.
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "llc",
    "ltd",
    "limited",
    "corp",
    "corporation",
    "co",
    "company",
    "plc",
    "lp",
    "llp",
];

/// Result of committing delivered records to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkSeenOutcome {
    pub committed: usize,
    pub failed: usize,
}

pub struct Deduplicator<'a> {
    registry: &'a dyn SeenRegistry,
}

impl<'a> Deduplicator<'a> {
    pub fn new(registry: &'a dyn SeenRegistry) -> Self {
        Self { registry }
    }

    /// Keep records never seen before, in input order. First occurrence wins
    /// within the batch. Registry errors abort the whole filter.
    #[instrument(skip_all, fields(input = records.len()))]
    pub async fn filter_new(&self, records: Vec<NormalizedRecord>) -> Result<Vec<NormalizedRecord>> {
        let total = records.len();
        let mut batch_keys: HashSet<String> = HashSet::new();
        let mut fresh = Vec::new();

        for record in records {
            let url = record.source_url.trim();
            let print = fingerprint(&record.company_name, &record.job_title);

            let in_batch = (!url.is_empty() && batch_keys.contains(url))
                || print.as_ref().is_some_and(|p| batch_keys.contains(p));
            if in_batch {
                debug!(company = %record.company_name, title = %record.job_title, "duplicate within batch");
                continue;
            }

            if !url.is_empty() && self.registry.exists_by_url(url).await? {
                debug!(url, "duplicate by url");
                continue;
            }

            if let Some(p) = &print {
                if self.registry.exists_by_fingerprint(p).await? {
                    debug!(company = %record.company_name, title = %record.job_title, "duplicate by content");
                    continue;
                }
            }

            if !url.is_empty() {
                batch_keys.insert(url.to_string());
            }
            if let Some(p) = print {
                batch_keys.insert(p);
            }
            fresh.push(record);
        }

        info!(new = fresh.len(), duplicates = total - fresh.len(), "dedup complete");
        Ok(fresh)
    }

    /// Record delivered postings. Each insert stands alone; failures are
    /// logged and counted.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn mark_seen(&self, records: &[NormalizedRecord]) -> MarkSeenOutcome {
        let mut outcome = MarkSeenOutcome::default();

        for record in records {
            let entry = SeenEntry {
                url: record.source_url.trim().to_string(),
                fingerprint: fingerprint(&record.company_name, &record.job_title)
                    .unwrap_or_default(),
                source: record.source.clone(),
                company: record.company_name.clone(),
                title: record.job_title.clone(),
                seen_at: Utc::now(),
            };

            match self.registry.insert(&entry).await {
                Ok(()) => outcome.committed += 1,
                Err(e) => {
                    warn!(
                        company = %entry.company,
                        title = %entry.title,
                        error = %e,
                        "failed to mark job as seen"
                    );
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    pub async fn stats(&self) -> Result<RegistryStats> {
        self.registry.stats().await
    }
}

/// Content fingerprint of a posting: SHA-256 hex of `"{company}|{title}"`
/// after folding case, punctuation, whitespace, and corporate suffixes.
/// `None` when either part is empty after folding.
pub fn fingerprint(company: &str, title: &str) -> Option<String> {
    let mut company_tokens = fold_tokens(company);
    while company_tokens.len() > 1
        && company_tokens
            .last()
            .is_some_and(|t| CORPORATE_SUFFIXES.contains(&t.as_str()))
    {
        company_tokens.pop();
    }
    let title_tokens = fold_tokens(title);

    if company_tokens.is_empty() || title_tokens.is_empty() {
        return None;
    }

    let content = format!("{}|{}", company_tokens.join(" "), title_tokens.join(" "));
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Some(format!("{:x}", hasher.finalize()))
}

fn fold_tokens(input: &str) -> Vec<String> {
    input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobsweep_shared::{EmploymentType, ExperienceLevel, PostedDate};
    use jobsweep_storage::MemoryRegistry;

    fn record(company: &str, title: &str, url: &str) -> NormalizedRecord {
        NormalizedRecord {
            company_name: company.into(),
            job_title: title.into(),
            description: String::new(),
            location: "Austin, TX".into(),
            city: "Austin".into(),
            state: "TX".into(),
            country: "US".into(),
            employment_type: EmploymentType::FullTime,
            experience_level: ExperienceLevel::Unknown,
            posted_date: PostedDate::Unknown,
            source_url: url.into(),
            source: "Indeed".into(),
            company_size: String::new(),
            industry: String::new(),
            search_keyword: "Accounts Payable".into(),
            source_job_id: String::new(),
            acquired_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn fingerprint_folds_case_punctuation_and_suffix() {
        let a = fingerprint("Acme Inc.", "Accounts Payable Clerk").unwrap();
        let b = fingerprint("ACME", "accounts  payable, clerk").unwrap();
        let c = fingerprint("Acme Corp", "Accounts-Payable Clerk").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 64);

        assert_ne!(a, fingerprint("Globex", "Accounts Payable Clerk").unwrap());
    }

    #[test]
    fn fingerprint_keeps_company_made_of_suffix_words() {
        // A lone suffix word is the whole name.
        assert!(fingerprint("Company", "AP Clerk").is_some());
        assert_ne!(
            fingerprint("Company", "AP Clerk"),
            fingerprint("Other", "AP Clerk")
        );
    }

    #[test]
    fn fingerprint_requires_both_parts() {
        assert!(fingerprint("", "AP Clerk").is_none());
        assert!(fingerprint("Acme", "...").is_none());
    }

    #[tokio::test]
    async fn batch_duplicates_first_occurrence_wins() {
        let registry = MemoryRegistry::new();
        let dedup = Deduplicator::new(&registry);

        let records = vec![
            record("Acme", "AP Clerk", "https://a.example/1"),
            record("Globex", "AP Analyst", "https://a.example/1"),
            record("Acme Inc", "ap clerk", ""),
            record("Initech", "AP Specialist", ""),
        ];

        let fresh = dedup.filter_new(records).await.unwrap();
        let companies: Vec<_> = fresh.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(companies, vec!["Acme", "Initech"]);
    }

    #[tokio::test]
    async fn registry_hits_by_url_or_fingerprint() {
        let registry = MemoryRegistry::new();
        let dedup = Deduplicator::new(&registry);

        let seen = vec![record("Acme", "AP Clerk", "https://a.example/1")];
        assert_eq!(dedup.mark_seen(&seen).await.committed, 1);

        // Same URL, unrelated content.
        let by_url = record("Globex", "Controller", "https://a.example/1");
        // New URL, same company/title.
        let by_content = record("ACME LLC", "ap clerk", "https://b.example/9");
        let fresh_one = record("Initech", "AP Clerk", "https://c.example/3");

        let fresh = dedup
            .filter_new(vec![by_url, by_content, fresh_one])
            .await
            .unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].company_name, "Initech");
    }

    #[tokio::test]
    async fn filter_is_idempotent_after_commit() {
        let registry = MemoryRegistry::new();
        let dedup = Deduplicator::new(&registry);
        let batch = vec![
            record("Acme", "AP Clerk", "https://a.example/1"),
            record("Globex", "AP Analyst", ""),
        ];

        let fresh = dedup.filter_new(batch.clone()).await.unwrap();
        assert_eq!(fresh.len(), 2);
        dedup.mark_seen(&fresh).await;

        assert!(dedup.filter_new(batch).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn registry_error_aborts_filter() {
        let registry = MemoryRegistry::new();
        registry.set_unavailable(true);
        let dedup = Deduplicator::new(&registry);

        let err = dedup
            .filter_new(vec![record("Acme", "AP Clerk", "https://a.example/1")])
            .await
            .unwrap_err();
        assert!(matches!(err, jobsweep_shared::JobsweepError::Storage(_)));
    }

    #[tokio::test]
    async fn mark_seen_counts_failures_without_aborting() {
        let registry = MemoryRegistry::new();
        registry.set_reject_inserts(true);
        let dedup = Deduplicator::new(&registry);

        let outcome = dedup
            .mark_seen(&[
                record("Acme", "AP Clerk", "https://a.example/1"),
                record("Globex", "AP Analyst", "https://a.example/2"),
            ])
            .await;
        assert_eq!(outcome, MarkSeenOutcome { committed: 0, failed: 2 });
    }
}
