//! The document sync service
//!
//! Persists a converted block sequence: one create-document call, then the
//! ordered segments — contiguous plain runs as chunked batch inserts, each
//! table shell through the three-step protocol (insert shell, read back the
//! platform-assigned cell ids, push cell content under a bounded-concurrency
//! scheduler). Segments execute strictly in original document order;
//! concurrency only ever applies within one table's cell population.

use std::sync::Arc;

use larkdown_core::BlockConverter;
use larkdown_domain::{Block, PersistReceipt, SyncPhase, TableStructure};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use super::{ProgressCallback, SyncError};
use crate::api::{block_to_wire, ApiClient};
use crate::config::{Region, SyncSettings};

/// Persists converted documents through the API client.
pub struct DocumentSyncService {
    api: Arc<ApiClient>,
    converter: BlockConverter,
    region: Region,
    batch_size: usize,
    cell_concurrency: usize,
    progress: Option<ProgressCallback>,
}

/// One contiguous stretch of the block sequence.
enum Segment<'a> {
    /// Plain blocks batched into chunked inserts.
    Run(&'a [Block]),
    /// A table shell that triggers the three-step sub-protocol.
    Table { shell: &'a Block, index: usize },
}

impl DocumentSyncService {
    /// Create a service over the given client and settings.
    #[must_use]
    pub fn new(api: Arc<ApiClient>, settings: &SyncSettings) -> Self {
        Self {
            api,
            converter: BlockConverter::new(settings.table_width_budget),
            region: settings.region,
            batch_size: settings.batch_size,
            cell_concurrency: settings.cell_concurrency,
            progress: None,
        }
    }

    /// Convert a markdown document and persist it in one step.
    ///
    /// # Errors
    /// See [`DocumentSyncService::persist`]; conversion itself never fails.
    pub async fn persist_markdown(
        &self,
        title: &str,
        markdown: &str,
    ) -> Result<PersistReceipt, SyncError> {
        let conversion = self.converter.convert_markdown(markdown);
        self.persist(title, &conversion.blocks, &conversion.tables).await
    }

    /// Attach a progress observer.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Persist a converted document and return its id and web URL.
    ///
    /// Runs to completion or failure; there is no mid-persist cancellation
    /// and no rollback of partially persisted state.
    ///
    /// # Errors
    /// The first failing segment aborts the remaining sequence and its
    /// error is returned unchanged.
    #[instrument(skip(self, blocks, tables), fields(blocks = blocks.len(), tables = tables.len()))]
    pub async fn persist(
        &self,
        title: &str,
        blocks: &[Block],
        tables: &[TableStructure],
    ) -> Result<PersistReceipt, SyncError> {
        match self.persist_inner(title, blocks, tables).await {
            Ok(receipt) => {
                self.emit(SyncPhase::Done);
                info!(document_id = %receipt.document_id, "document persisted");
                Ok(receipt)
            }
            Err(error) => {
                self.emit(SyncPhase::Error);
                Err(error)
            }
        }
    }

    async fn persist_inner(
        &self,
        title: &str,
        blocks: &[Block],
        tables: &[TableStructure],
    ) -> Result<PersistReceipt, SyncError> {
        self.emit(SyncPhase::CreatingDocument);
        let document_id = self.api.create_document(title).await?;

        for segment in partition(blocks) {
            match segment {
                Segment::Run(run) => {
                    self.emit(SyncPhase::CreatingBlocks);
                    self.persist_run(&document_id, run, tables).await?;
                }
                Segment::Table { shell, index } => {
                    self.emit(SyncPhase::CreatingTable);
                    let table =
                        tables.get(index).ok_or(SyncError::MissingTable { index })?;
                    self.persist_table(&document_id, shell, table, tables).await?;
                }
            }
        }

        Ok(PersistReceipt {
            document_url: self.region.document_url(&document_id),
            document_id,
        })
    }

    /// Batch-insert a plain run, sub-chunked to the per-call child limit
    /// while preserving order across chunks.
    async fn persist_run(
        &self,
        document_id: &str,
        run: &[Block],
        tables: &[TableStructure],
    ) -> Result<(), SyncError> {
        for chunk in run.chunks(self.batch_size) {
            let children: Vec<Value> =
                chunk.iter().map(|block| block_to_wire(block, tables)).collect();
            debug!(count = children.len(), "appending block batch");
            self.api.append_children(document_id, document_id, children).await?;
        }
        Ok(())
    }

    /// The three-step table protocol: insert the empty shell, read back the
    /// platform-assigned cell ids, then push each cell's content under its
    /// matching cell id in row-major submission order, at most
    /// `cell_concurrency` calls in flight.
    async fn persist_table(
        &self,
        document_id: &str,
        shell: &Block,
        table: &TableStructure,
        tables: &[TableStructure],
    ) -> Result<(), SyncError> {
        // Step 1: the empty shell, learning its assigned id.
        let created = self
            .api
            .append_children(document_id, document_id, vec![block_to_wire(shell, tables)])
            .await?;
        let shell_id = created.first().ok_or(SyncError::ShellNotCreated)?.block_id.clone();

        // Step 2: cell ids are platform-assigned and must be read back.
        let cell_ids = self.api.get_block_children(document_id, &shell_id).await?;
        if cell_ids.len() != table.cell_count() {
            return Err(SyncError::CellCountMismatch {
                expected: table.cell_count(),
                actual: cell_ids.len(),
            });
        }

        debug!(cells = cell_ids.len(), "populating table cells");

        // Step 3: bounded fan-out. Permits are acquired in iteration order,
        // so submission stays row-major; completion may finish out of order,
        // which is harmless because each cell write is independent.
        let semaphore = Arc::new(Semaphore::new(self.cell_concurrency));
        let mut tasks: JoinSet<Result<(), SyncError>> = JoinSet::new();

        for (cell_id, cell_blocks) in cell_ids.into_iter().zip(&table.cells) {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| SyncError::CellTask(e.to_string()))?;

            let api = Arc::clone(&self.api);
            let document_id = document_id.to_string();
            let children: Vec<Value> =
                cell_blocks.iter().map(|block| block_to_wire(block, tables)).collect();

            tasks.spawn(async move {
                let _permit = permit;
                api.append_children(&document_id, &cell_id, children).await?;
                Ok(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            // Dropping the JoinSet on an early return aborts the remaining
            // cell tasks; the operation fails without partial cleanup.
            joined.map_err(|e| SyncError::CellTask(e.to_string()))??;
        }

        Ok(())
    }

    fn emit(&self, phase: SyncPhase) {
        debug!(%phase, "sync phase");
        if let Some(progress) = &self.progress {
            progress(phase);
        }
    }
}

/// Split the block sequence into contiguous plain runs and table shells.
fn partition(blocks: &[Block]) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut run_start = 0;

    for (position, block) in blocks.iter().enumerate() {
        if let Block::TableShell { index } = block {
            if position > run_start {
                segments.push(Segment::Run(&blocks[run_start..position]));
            }
            segments.push(Segment::Table { shell: block, index: *index });
            run_start = position + 1;
        }
    }

    if run_start < blocks.len() {
        segments.push(Segment::Run(&blocks[run_start..]));
    }

    segments
}
