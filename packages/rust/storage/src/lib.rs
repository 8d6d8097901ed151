//! Dedup registry and delivery sinks.
//!
//! The registry remembers every posting already delivered downstream, keyed
//! by URL and by content fingerprint. [`LibsqlRegistry`] backs it with an
//! embedded libSQL file or a networked libSQL database; [`MemoryRegistry`]
//! keeps it in-process. Sinks live in [`sink`].
//!
//! **Write rules:**
//! - Entries are inserted only after the sink confirmed delivery.
//! - Entries are never updated or deleted by the pipeline.

mod memory;
mod migrations;
pub mod sink;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use jobsweep_shared::{
    JobsweepError, RegistryBackend, RegistryConfig, RegistryStats, Result, SeenEntry,
    resolve_secret,
};
use libsql::{Connection, Database, params};

pub use memory::MemoryRegistry;
pub use sink::{JobSink, MemorySink, SheetFileSink, open_sink};

/// Durable history of delivered postings.
#[async_trait]
pub trait SeenRegistry: Send + Sync {
    /// Whether an entry with this exact URL exists. Empty URLs never match.
    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Whether an entry with this fingerprint exists. Empty fingerprints never match.
    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool>;

    /// Record one delivered posting.
    async fn insert(&self, entry: &SeenEntry) -> Result<()>;

    async fn stats(&self) -> Result<RegistryStats>;
}

/// Build the registry backend selected in config.
pub async fn open_registry(config: &RegistryConfig) -> Result<Arc<dyn SeenRegistry>> {
    match config.backend {
        RegistryBackend::Local => {
            let registry = LibsqlRegistry::open_local(Path::new(&config.path)).await?;
            Ok(Arc::new(registry))
        }
        RegistryBackend::Remote => {
            let url = config.url.as_deref().ok_or_else(|| {
                JobsweepError::config("[registry] backend = \"remote\" requires a url")
            })?;
            let token = resolve_secret(&config.auth_token_env).unwrap_or_default();
            let registry = LibsqlRegistry::open_remote(url, &token).await?;
            Ok(Arc::new(registry))
        }
        RegistryBackend::Memory => Ok(Arc::new(MemoryRegistry::new())),
    }
}

fn storage_err(e: libsql::Error) -> JobsweepError {
    JobsweepError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// libSQL backend
// ---------------------------------------------------------------------------

/// Registry stored in libSQL, either an embedded file or a remote database.
pub struct LibsqlRegistry {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl LibsqlRegistry {
    /// Open or create an embedded database at `path`.
    pub async fn open_local(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| JobsweepError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        Self::from_database(db).await
    }

    /// Connect to a networked libSQL database.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(storage_err)?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db.connect().map_err(storage_err)?;
        let registry = Self { db, conn };
        registry.migrate().await?;
        Ok(registry)
    }

    /// Bring the schema up to date. Refuses a database written by a newer
    /// build.
    async fn migrate(&self) -> Result<()> {
        self.conn
            .execute(migrations::VERSION_TABLE, params![])
            .await
            .map_err(storage_err)?;

        let applied = self.schema_version().await?;
        let latest = migrations::latest_version();
        if applied > latest {
            return Err(JobsweepError::Storage(format!(
                "registry schema v{applied} is newer than supported v{latest}"
            )));
        }

        for step in migrations::MIGRATIONS.iter().filter(|m| m.version > applied) {
            tracing::info!(version = step.version, description = step.description, "migrating registry");
            self.apply(step).await.map_err(|e| {
                JobsweepError::Storage(format!("migration v{} failed: {e}", step.version))
            })?;
        }
        Ok(())
    }

    async fn apply(&self, step: &migrations::Migration) -> std::result::Result<(), libsql::Error> {
        let tx = self.conn.transaction().await?;
        tx.execute_batch(step.sql).await?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            params![i64::from(step.version)],
        )
        .await?;
        tx.commit().await
    }

    /// Highest applied schema version; 0 for a fresh database.
    async fn schema_version(&self) -> Result<u32> {
        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", params![])
            .await
            .map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => row.get::<u32>(0).map_err(storage_err),
            None => Ok(0),
        }
    }

    async fn exists_where(&self, column: &str, value: &str) -> Result<bool> {
        if value.trim().is_empty() {
            return Ok(false);
        }
        let sql = format!("SELECT 1 FROM seen_jobs WHERE {column} = ?1 LIMIT 1");
        let mut rows = self
            .conn
            .query(&sql, params![value])
            .await
            .map_err(storage_err)?;

        Ok(rows.next().await.map_err(storage_err)?.is_some())
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl SeenRegistry for LibsqlRegistry {
    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        self.exists_where("url", url).await
    }

    async fn exists_by_fingerprint(&self, fingerprint: &str) -> Result<bool> {
        self.exists_where("fingerprint", fingerprint).await
    }

    async fn insert(&self, entry: &SeenEntry) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO seen_jobs (url, fingerprint, source, company, title, seen_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.url.as_str(),
                    entry.fingerprint.as_str(),
                    entry.source.as_str(),
                    entry.company.as_str(),
                    entry.title.as_str(),
                    entry.seen_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn stats(&self) -> Result<RegistryStats> {
        let total = self.count("SELECT COUNT(*) FROM seen_jobs").await?;
        let unique_companies = self
            .count("SELECT COUNT(DISTINCT company) FROM seen_jobs WHERE company != ''")
            .await?;

        let mut rows = self
            .conn
            .query(
                "SELECT source, COUNT(*) AS n FROM seen_jobs
                 GROUP BY source ORDER BY n DESC, source ASC",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut by_source = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            by_source.push((
                row.get::<String>(0).map_err(storage_err)?,
                row.get::<i64>(1).map_err(storage_err)?.max(0) as u64,
            ));
        }

        Ok(RegistryStats {
            total,
            unique_companies,
            unique_sources: by_source.len() as u64,
            by_source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    /// Create a temp file registry for testing.
    async fn test_registry() -> LibsqlRegistry {
        let tmp = std::env::temp_dir().join(format!("jobsweep_test_{}.db", Uuid::now_v7()));
        LibsqlRegistry::open_local(&tmp).await.expect("open test db")
    }

    fn entry(url: &str, fingerprint: &str, source: &str, company: &str) -> SeenEntry {
        SeenEntry {
            url: url.into(),
            fingerprint: fingerprint.into(),
            source: source.into(),
            company: company.into(),
            title: "Accounts Payable Clerk".into(),
            seen_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let registry = test_registry().await;
        let version = registry.schema_version().await.expect("version");
        assert_eq!(version, migrations::latest_version());
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("jobsweep_test_{}.db", Uuid::now_v7()));
        let first = LibsqlRegistry::open_local(&tmp).await.expect("first open");
        first
            .insert(&entry("https://a.example/1", "fp1", "LinkedIn", "Acme"))
            .await
            .expect("insert");
        drop(first);

        let second = LibsqlRegistry::open_local(&tmp).await.expect("second open");
        assert_eq!(
            second.schema_version().await.expect("version"),
            migrations::latest_version()
        );
        assert!(second.exists_by_url("https://a.example/1").await.expect("lookup"));
    }

    #[tokio::test]
    async fn unreadable_database_is_a_storage_error() {
        let tmp = std::env::temp_dir().join(format!("jobsweep_test_{}.db", Uuid::now_v7()));
        std::fs::write(&tmp, vec![0x5a_u8; 8192]).expect("write garbage");

        let err = LibsqlRegistry::open_local(&tmp).await.err().expect("must fail");
        assert!(matches!(err, JobsweepError::Storage(_)));
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() {
        let tmp = std::env::temp_dir().join(format!("jobsweep_test_{}.db", Uuid::now_v7()));
        let registry = LibsqlRegistry::open_local(&tmp).await.expect("open");
        registry
            .conn
            .execute("INSERT INTO schema_migrations (version) VALUES (99)", params![])
            .await
            .expect("bump version");
        drop(registry);

        let err = LibsqlRegistry::open_local(&tmp).await.err().expect("must fail");
        assert!(matches!(err, JobsweepError::Storage(msg) if msg.contains("v99")));
    }

    #[tokio::test]
    async fn lookups_by_url_and_fingerprint() {
        let registry = test_registry().await;
        registry
            .insert(&entry("https://a.example/1", "fp1", "LinkedIn", "Acme"))
            .await
            .expect("insert");

        assert!(registry.exists_by_url("https://a.example/1").await.expect("url"));
        assert!(!registry.exists_by_url("https://a.example/2").await.expect("url"));
        assert!(registry.exists_by_fingerprint("fp1").await.expect("fp"));
        assert!(!registry.exists_by_fingerprint("fp2").await.expect("fp"));
    }

    #[tokio::test]
    async fn empty_keys_never_match() {
        let registry = test_registry().await;
        registry
            .insert(&entry("", "", "Indeed", "Acme"))
            .await
            .expect("insert");

        assert!(!registry.exists_by_url("").await.expect("url"));
        assert!(!registry.exists_by_fingerprint("  ").await.expect("fp"));
    }

    #[tokio::test]
    async fn stats_group_by_source() {
        let registry = test_registry().await;
        for (i, (source, company)) in [
            ("LinkedIn", "Acme"),
            ("LinkedIn", "Globex"),
            ("Indeed", "Acme"),
        ]
        .into_iter()
        .enumerate()
        {
            registry
                .insert(&entry(&format!("https://a.example/{i}"), &format!("fp{i}"), source, company))
                .await
                .expect("insert");
        }

        let stats = registry.stats().await.expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.unique_companies, 2);
        assert_eq!(stats.unique_sources, 2);
        assert_eq!(stats.by_source[0], ("LinkedIn".to_string(), 2));
        assert_eq!(stats.by_source[1], ("Indeed".to_string(), 1));
    }

    #[tokio::test]
    async fn open_registry_memory_backend() {
        let config = RegistryConfig {
            backend: RegistryBackend::Memory,
            ..RegistryConfig::default()
        };
        let registry = open_registry(&config).await.expect("open");
        assert_eq!(registry.stats().await.expect("stats").total, 0);
    }

    #[tokio::test]
    async fn open_registry_remote_without_url_is_config_error() {
        let config = RegistryConfig {
            backend: RegistryBackend::Remote,
            url: None,
            ..RegistryConfig::default()
        };
        let err = open_registry(&config).await.err().expect("must fail");
        assert!(matches!(err, JobsweepError::Config { .. }));
    }
}
