//! In-process registry for tests and throwaway runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use jobsweep_shared::{JobsweepError, RegistryStats, Result, SeenEntry};

use crate::SeenRegistry;

#[derive(Default)]
struct Inner {
    entries: Vec<SeenEntry>,
    urls: HashSet<String>,
    fingerprints: HashSet<String>,
}

/// Registry held in memory. Forgets everything when dropped.
///
/// Can be switched into failure modes to exercise the pipeline's error paths.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
    reject_inserts: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a storage error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make inserts fail while lookups keep working.
    pub fn set_reject_inserts(&self, reject: bool) {
        self.reject_inserts.store(reject, Ordering::SeqCst);
    }

    /// Snapshot of all committed entries, in insertion order.
    pub fn entries(&self) -> Vec<SeenEntry> {
        self.inner
            .lock()
            .map(|inner| inner.entries.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(JobsweepError::Storage("registry unavailable".into()));
        }
        self.inner
            .lock()
            .map_err(|_| JobsweepError::Storage("registry lock poisoned".into()))
    }
}

#[async_trait]
impl SeenRegistry for MemoryRegistry {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let inner = self.lock()?;
        Ok(!url.trim().is_empty() && inner.urls.contains(url))
    }

    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        let inner = self.lock()?;
        Ok(!fingerprint.trim().is_empty() && inner.fingerprints.contains(fingerprint))
    }

    async fn insert(&self, entry: &SeenEntry) -> Result<()> {
        let mut inner = self.lock()?;
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Err(JobsweepError::Storage("insert rejected".into()));
        }
        if !entry.url.is_empty() {
            inner.urls.insert(entry.url.clone());
        }
        if !entry.fingerprint.is_empty() {
            inner.fingerprints.insert(entry.fingerprint.clone());
        }
        inner.entries.push(entry.clone());
        Ok(())
    }

    async fn stats(&self) -> Result<RegistryStats> {
        let inner = self.lock()?;

        let mut per_source: BTreeMap<&str, u64> = BTreeMap::new();
        for entry in &inner.entries {
            *per_source.entry(entry.source.as_str()).or_default() += 1;
        }
        let mut by_source: Vec<(String, u64)> = per_source
            .into_iter()
            .map(|(source, n)| (source.to_string(), n))
            .collect();
        by_source.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let unique_companies = inner
            .entries
            .iter()
            .filter(|e| !e.company.is_empty())
            .map(|e| e.company.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;

        Ok(RegistryStats {
            total: inner.entries.len() as u64,
            unique_companies,
            unique_sources: by_source.len() as u64,
            by_source,
        })
    }
}
