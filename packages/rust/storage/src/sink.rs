//! Delivery sinks for new postings.
//!
//! A sink reports how many records it durably wrote as a prefix count: a
//! return value of `n` means the first `n` input records landed. The pipeline
//! commits exactly that prefix to the registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use jobsweep_shared::{JobsweepError, NormalizedRecord, Result, SinkConfig};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Column headers, in row order.
pub const SHEET_HEADERS: [&str; 15] = [
    "Company Name",
    "Job Title",
    "Job Description",
    "Job Location",
    "City",
    "State",
    "Country",
    "Employment Type",
    "Experience Level",
    "Posted Date",
    "Job URL",
    "Source",
    "Company Size",
    "Industry",
    "Scraped At",
];

/// Per-cell cap for descriptions.
const DESCRIPTION_CELL_LIMIT: usize = 2000;

/// Downstream destination for new postings.
#[async_trait]
pub trait JobSink: Send + Sync {
    /// Prepare the destination. Called once per run before any write.
    async fn initialize(&self) -> Result<()>;

    /// Write records in order; returns how many of the leading records landed.
    async fn write(&self, records: &[NormalizedRecord]) -> Result<usize>;
}

/// Build the sheet sink described by config.
pub fn open_sink(config: &SinkConfig) -> Arc<dyn JobSink> {
    Arc::new(SheetFileSink::from_config(config))
}

// ---------------------------------------------------------------------------
// Sheet files
// ---------------------------------------------------------------------------

/// Workbook directory with a master sheet and one tab per day, stored as TSV.
pub struct SheetFileSink {
    dir: PathBuf,
    master_sheet: String,
    daily_prefix: String,
    batch_size: usize,
    retry_cooldown: Duration,
    clock: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
    /// Day of the tab this run writes to, fixed by `initialize`.
    run_date: Mutex<Option<NaiveDate>>,
}

impl SheetFileSink {
    /// Sink in `dir` with default sheet names and batching.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut sink = Self::from_config(&SinkConfig::default());
        sink.dir = dir.into();
        sink
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.output_dir),
            master_sheet: config.master_sheet.clone(),
            daily_prefix: config.daily_prefix.clone(),
            batch_size: config.batch_size.max(1),
            retry_cooldown: Duration::from_millis(config.retry_cooldown_ms),
            clock: Arc::new(|| Local::now().date_naive()),
            run_date: Mutex::new(None),
        }
    }

    /// Pin the daily tab to a fixed date instead of today.
    pub fn with_date(self, date: NaiveDate) -> Self {
        self.with_clock(move || date)
    }

    /// Take the current date from `clock` instead of the local system clock.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry_cooldown = cooldown;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Path of the master sheet.
    pub fn master_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tsv", self.master_sheet))
    }

    /// Path of the run's daily tab, e.g. `DailyJobs-25Feb2026.tsv`. Before
    /// `initialize` this is the tab for the current date.
    pub fn daily_path(&self) -> PathBuf {
        let pinned = self.run_date.lock().ok().and_then(|date| *date);
        let date = pinned.unwrap_or_else(|| (self.clock)());
        self.dir
            .join(format!("{}{}.tsv", self.daily_prefix, date.format("%d%b%Y")))
    }

    async fn ensure_sheet(&self, path: &Path) -> Result<()> {
        let has_content = tokio::fs::metadata(path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if has_content {
            return Ok(());
        }
        let header = format!("{}\n", SHEET_HEADERS.join("\t"));
        tokio::fs::write(path, header)
            .await
            .map_err(|e| JobsweepError::io(path, e))?;
        info!(path = %path.display(), "created sheet");
        Ok(())
    }

    async fn append(&self, path: &Path, rows: &str) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(|e| JobsweepError::io(path, e))?;
        file.write_all(rows.as_bytes())
            .await
            .map_err(|e| JobsweepError::io(path, e))?;
        file.flush().await.map_err(|e| JobsweepError::io(path, e))?;
        Ok(())
    }

    /// Append once, and once more after the cooldown if that fails.
    async fn append_with_retry(&self, path: &Path, rows: &str) -> Result<()> {
        match self.append(path, rows).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "append failed, retrying after cooldown");
                tokio::time::sleep(self.retry_cooldown).await;
                self.append(path, rows).await
            }
        }
    }
}

#[async_trait]
impl JobSink for SheetFileSink {
    async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| JobsweepError::io(&self.dir, e))?;
        self.ensure_sheet(&self.master_path()).await?;

        let today = (self.clock)();
        if let Ok(mut run_date) = self.run_date.lock() {
            *run_date = Some(today);
        }
        self.ensure_sheet(&self.daily_path()).await?;
        Ok(())
    }

    async fn write(&self, records: &[NormalizedRecord]) -> Result<usize> {
        let master = self.master_path();
        let daily = self.daily_path();
        let mut written = 0;

        if let Err(e) = self.ensure_sheet(&daily).await {
            warn!(path = %daily.display(), error = %e, "daily tab unavailable");
        }

        for batch in records.chunks(self.batch_size) {
            let rows: String = batch.iter().map(format_row).collect();

            if let Err(e) = self.append_with_retry(&master, &rows).await {
                error!(error = %e, written, "master sheet append failed, stopping");
                break;
            }
            written += batch.len();

            if let Err(e) = self.append_with_retry(&daily, &rows).await {
                warn!(error = %e, "daily tab append failed");
            }
            debug!(written, "appended batch");
        }

        info!(written, total = records.len(), "sheet write complete");
        Ok(written)
    }
}

/// One TSV row terminated by a newline.
fn format_row(record: &NormalizedRecord) -> String {
    let description: String = record
        .description
        .chars()
        .take(DESCRIPTION_CELL_LIMIT)
        .collect();

    let cells = [
        record.company_name.clone(),
        record.job_title.clone(),
        description,
        record.location.clone(),
        record.city.clone(),
        record.state.clone(),
        record.country.clone(),
        record.employment_type.to_string(),
        record.experience_level.to_string(),
        record.posted_date.to_string(),
        record.source_url.clone(),
        record.source.clone(),
        record.company_size.clone(),
        record.industry.clone(),
        record.acquired_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ];

    let mut row = cells
        .iter()
        .map(|cell| sanitize_cell(cell))
        .collect::<Vec<_>>()
        .join("\t");
    row.push('\n');
    row
}

fn sanitize_cell(cell: &str) -> String {
    cell.replace(['\t', '\n', '\r'], " ")
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Sink that keeps rows in memory, with switches for failure paths.
pub struct MemorySink {
    rows: Mutex<Vec<NormalizedRecord>>,
    fail_initialize: AtomicBool,
    fail_write: AtomicBool,
    write_cap: AtomicUsize,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_initialize: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            write_cap: AtomicUsize::new(usize::MAX),
        }
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }

    /// Accept at most `cap` records per write call.
    pub fn set_write_cap(&self, cap: Option<usize>) {
        self.write_cap
            .store(cap.unwrap_or(usize::MAX), Ordering::SeqCst);
    }

    /// Everything written so far.
    pub fn rows(&self) -> Vec<NormalizedRecord> {
        self.rows
            .lock()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobSink for MemorySink {
    async fn initialize(&self) -> Result<()> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(JobsweepError::Sink("sink credentials rejected".into()));
        }
        Ok(())
    }

    async fn write(&self, records: &[NormalizedRecord]) -> Result<usize> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(JobsweepError::Sink("sink write failed".into()));
        }
        let n = records.len().min(self.write_cap.load(Ordering::SeqCst));
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| JobsweepError::Sink("sink lock poisoned".into()))?;
        rows.extend_from_slice(&records[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use jobsweep_shared::{EmploymentType, ExperienceLevel, PostedDate};
    use uuid::Uuid;

    use super::*;

    fn record(company: &str, description: &str) -> NormalizedRecord {
        NormalizedRecord {
            company_name: company.into(),
            job_title: "AP Clerk".into(),
            description: description.into(),
            location: "Austin, TX".into(),
            city: "Austin".into(),
            state: "TX".into(),
            country: "US".into(),
            employment_type: EmploymentType::FullTime,
            experience_level: ExperienceLevel::Entry,
            posted_date: PostedDate::Unknown,
            source_url: format!("https://jobs.example/{company}"),
            source: "Indeed".into(),
            company_size: String::new(),
            industry: String::new(),
            search_keyword: "Accounts Payable".into(),
            source_job_id: String::new(),
            acquired_at: Utc
                .with_ymd_and_hms(2026, 2, 25, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn test_sink() -> SheetFileSink {
        let dir = std::env::temp_dir().join(format!("jobsweep_sheets_{}", Uuid::now_v7()));
        SheetFileSink::new(dir)
            .with_date(NaiveDate::from_ymd_opt(2026, 2, 25).expect("valid date"))
            .with_retry_cooldown(Duration::from_millis(1))
    }

    #[test]
    fn daily_tab_name_uses_day_month_year() {
        let sink = test_sink();
        let name = sink.daily_path();
        assert!(name.ends_with("DailyJobs-25Feb2026.tsv"));
        assert!(sink.master_path().ends_with("MasterCompanies.tsv"));
    }

    #[tokio::test]
    async fn initialize_writes_headers_once() {
        let sink = test_sink();
        sink.initialize().await.expect("init");
        sink.initialize().await.expect("init again");

        let master = std::fs::read_to_string(sink.master_path()).expect("read master");
        assert_eq!(master.lines().count(), 1);
        assert!(master.starts_with("Company Name\tJob Title\t"));
        assert_eq!(master.trim_end().split('\t').count(), 15);
        assert!(sink.daily_path().exists());
    }

    #[tokio::test]
    async fn write_appends_rows_to_both_sheets() {
        let sink = test_sink().with_batch_size(2);
        sink.initialize().await.expect("init");

        let records = vec![
            record("Acme", "line one\nline\ttwo"),
            record("Globex", ""),
            record("Initech", ""),
        ];
        let written = sink.write(&records).await.expect("write");
        assert_eq!(written, 3);

        let master = std::fs::read_to_string(sink.master_path()).expect("read master");
        let lines: Vec<&str> = master.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Acme\tAP Clerk\tline one line two\tAustin, TX"));
        assert!(lines[1].ends_with("\t2026-02-25 09:30:00"));

        let daily = std::fs::read_to_string(sink.daily_path()).expect("read daily");
        assert_eq!(daily.lines().count(), 4);
    }

    #[tokio::test]
    async fn run_keeps_its_daily_tab_across_midnight() {
        let dir = std::env::temp_dir().join(format!("jobsweep_sheets_{}", Uuid::now_v7()));
        let calls = Arc::new(AtomicUsize::new(0));
        let clock_calls = Arc::clone(&calls);
        let sink = SheetFileSink::new(&dir)
            .with_retry_cooldown(Duration::from_millis(1))
            .with_clock(move || {
                let day = if clock_calls.fetch_add(1, Ordering::SeqCst) == 0 { 25 } else { 26 };
                NaiveDate::from_ymd_opt(2026, 2, day).expect("valid date")
            });

        sink.initialize().await.expect("init");
        let written = sink
            .write(&[record("Acme", ""), record("Globex", "")])
            .await
            .expect("write");
        assert_eq!(written, 2);

        let daily = std::fs::read_to_string(dir.join("DailyJobs-25Feb2026.tsv")).expect("read daily");
        assert_eq!(daily.lines().count(), 3);
        assert!(daily.starts_with("Company Name\t"));
        assert!(!dir.join("DailyJobs-26Feb2026.tsv").exists());
    }

    #[tokio::test]
    async fn missing_daily_tab_is_recreated_on_write() {
        let sink = test_sink();
        sink.initialize().await.expect("init");
        std::fs::remove_file(sink.daily_path()).expect("remove daily");

        sink.write(&[record("Acme", "")]).await.expect("write");

        let daily = std::fs::read_to_string(sink.daily_path()).expect("read daily");
        let lines: Vec<&str> = daily.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Company Name\t"));
        assert!(lines[1].starts_with("Acme\t"));
    }

    #[tokio::test]
    async fn description_cells_are_capped() {
        let sink = test_sink();
        sink.initialize().await.expect("init");
        sink.write(&[record("Acme", &"d".repeat(4000))])
            .await
            .expect("write");

        let master = std::fs::read_to_string(sink.master_path()).expect("read master");
        let row = master.lines().nth(1).expect("data row");
        let description = row.split('\t').nth(2).expect("description cell");
        assert_eq!(description.len(), DESCRIPTION_CELL_LIMIT);
    }

    #[tokio::test]
    async fn missing_master_sheet_writes_nothing() {
        let sink = test_sink();
        // No initialize: the directory does not exist, so every append fails.
        let written = sink.write(&[record("Acme", "")]).await.expect("write");
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn memory_sink_caps_and_fails() {
        let sink = MemorySink::new();
        sink.set_write_cap(Some(1));
        let n = sink
            .write(&[record("Acme", ""), record("Globex", "")])
            .await
            .expect("write");
        assert_eq!(n, 1);
        assert_eq!(sink.rows()[0].company_name, "Acme");

        sink.set_fail_write(true);
        assert!(sink.write(&[record("Initech", "")]).await.is_err());

        sink.set_fail_initialize(true);
        assert!(sink.initialize().await.is_err());
    }
}
