//! Import orchestration
//!
//! Responsibilities:
//! - Open one database connection for the whole run
//! - Stream the source file row by row
//! - Extract -> resolve client -> resolve contract -> record protest ->
//!   record guarantor (only when named)
//! - Confine every row failure to that row and keep going
//! - Report progress and a final summary
//! - Release the connection on every path once it is open
//!
//! Each statement commits on its own. A row that fails after its client or
//! contract was written leaves those records in place without a protest.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DbConfig, ImportOptions};
use crate::error::{ImportError, RowError};
use crate::recorder::{record_guarantor, record_protest};
use crate::resolver::{EntityResolver, ResolutionStats};
use crate::row::{check_header, ProtestRow};
use crate::source::{SourceReader, SourceRow};
use crate::store::Store;

/// How many row failures are kept in the summary
pub const MAX_REPORTED_FAILURES: usize = 20;

/// A row that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// 1-based position among data rows
    pub row: u64,
    /// Line in the source file, when known
    pub line: Option<u64>,
    pub error: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    /// Rows read from the source, failed ones included
    pub processed: u64,
    /// Rows fully recorded (or, in a dry run, fully extracted)
    pub imported: u64,
    pub failed: u64,
    pub guarantors: u64,
    pub resolution: ResolutionStats,
    /// The first `MAX_REPORTED_FAILURES` failures
    pub failures: Vec<RowFailure>,
}

impl ImportSummary {
    fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            processed: 0,
            imported: 0,
            failed: 0,
            guarantors: 0,
            resolution: ResolutionStats::default(),
            failures: Vec::new(),
        }
    }
}

/// Row-by-row driver; owns the counters and the resolver memo for one run
pub struct Importer {
    options: ImportOptions,
    resolver: EntityResolver,
    summary: ImportSummary,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            resolver: EntityResolver::new(),
            summary: ImportSummary::new(options.dry_run),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.summary.run_id
    }

    /// Import every row of `source` through `store`
    pub async fn import_source<R: Read>(
        mut self,
        store: &mut Store,
        source: &mut SourceReader<R>,
    ) -> Result<ImportSummary, ImportError> {
        check_header(source.headers());

        while let Some(next) = source.next_row()? {
            self.summary.processed += 1;
            let line = row_line(&next, source);
            let outcome = match next {
                Ok(row) => self.import_row(store, &row).await,
                Err(e) => Err(e),
            };
            self.finish_row(outcome, line);
        }

        Ok(self.finish())
    }

    /// Extract every row of `source` without writing anything
    pub fn validate_source<R: Read>(
        mut self,
        source: &mut SourceReader<R>,
    ) -> Result<ImportSummary, ImportError> {
        check_header(source.headers());

        while let Some(next) = source.next_row()? {
            self.summary.processed += 1;
            let line = row_line(&next, source);
            let outcome = next.and_then(|row| ProtestRow::extract(&row).map(|_| ()));
            self.finish_row(outcome, line);
        }

        Ok(self.finish())
    }

    async fn import_row(&mut self, store: &mut Store, source_row: &SourceRow) -> Result<(), RowError> {
        let row = ProtestRow::extract(source_row)?;

        let client_id = self
            .resolver
            .resolve_client(
                store,
                &row.debtor_name,
                row.tax_id.as_deref(),
                row.account_type.as_deref(),
                row.city.as_deref(),
            )
            .await?;

        let contract_id = self
            .resolver
            .resolve_contract(
                store,
                client_id,
                row.primary_contract_number.as_deref(),
                row.legacy_contract_number.as_deref(),
                row.kind.as_deref(),
                row.service_point.as_deref(),
            )
            .await?;

        let protest_id = record_protest(store, contract_id, &row).await?;

        if let Some(guarantor) = row.guarantor_name.as_deref() {
            record_guarantor(store, guarantor, row.tax_id.as_deref(), protest_id).await?;
            self.summary.guarantors += 1;
        }

        Ok(())
    }

    fn finish_row(&mut self, outcome: Result<(), RowError>, line: Option<u64>) {
        let ordinal = self.summary.processed;

        match outcome {
            Ok(()) => self.summary.imported += 1,
            Err(e) => {
                warn!(row = ordinal, line = ?line, error = %e, "row skipped");
                self.summary.failed += 1;
                if self.summary.failures.len() < MAX_REPORTED_FAILURES {
                    self.summary.failures.push(RowFailure {
                        row: ordinal,
                        line,
                        error: e.to_string(),
                    });
                }
            }
        }

        if self.options.progress_every > 0 && ordinal % self.options.progress_every == 0 {
            info!(processed = ordinal, imported = self.summary.imported, "progress");
        }
    }

    fn finish(mut self) -> ImportSummary {
        self.summary.resolution = self.resolver.stats();
        self.summary.finished_at = Some(Utc::now());
        self.summary
    }
}

fn row_line<R: Read>(next: &Result<SourceRow, RowError>, source: &SourceReader<R>) -> Option<u64> {
    match next {
        Ok(row) => row.line(),
        Err(_) => source.current_line(),
    }
}

/// Run a whole import: connect, stream `path`, record, release
pub async fn run(
    db: &DbConfig,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    let importer = Importer::new(*options);
    let span = info_span!("import", run_id = %importer.run_id(), source = %path.display());

    run_with(importer, db, path, options).instrument(span).await
}

async fn run_with(
    importer: Importer,
    db: &DbConfig,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    if options.dry_run {
        info!("dry run: rows are validated, nothing is written");
        let mut source = SourceReader::open(path, options)?;
        let summary = importer.validate_source(&mut source)?;
        report(&summary);
        return Ok(summary);
    }

    let mut store = Store::connect(db).await?;

    // From here on the connection is released on every path.
    let result = match SourceReader::open(path, options) {
        Ok(mut source) => importer.import_source(&mut store, &mut source).await,
        Err(e) => Err(e),
    };
    store.close().await;

    let summary = result?;
    report(&summary);
    Ok(summary)
}

fn report(summary: &ImportSummary) {
    info!(
        processed = summary.processed,
        imported = summary.imported,
        failed = summary.failed,
        guarantors = summary.guarantors,
        clients_created = summary.resolution.clients_created,
        contracts_created = summary.resolution.contracts_created,
        "import complete"
    );
}
