//! Scan operators: SeqScan and IndexScan.

use crate::filter::eval_resolved_expr;
use crate::{ExecutionContext, Executor};
use btree::BTreeIndex;
use catalog::{IndexId, IndexKind};
use hash::HashIndex;
use common::{DbResult, ExecutionStats, PageId, RecordId, Row, TableId};
use planner::IndexPredicate;
use std::time::Instant;
use storage::HeapTable;
use types::Value;

/// Sequential scan operator - iterates all rows in a table.
///
/// Scans pages sequentially from beginning to end, fetching each page
/// via the buffer pool and deserializing rows.
pub struct SeqScanExec {
    table_id: TableId,
    schema: Vec<String>,
    current_page: PageId,
    current_slot: u16,
    num_pages: Option<u64>,
    /// File-pointer position captured by `mark_current_position`, used by
    /// `reset_to_last_mark` to resume the scan without re-reading from the
    /// start (spec.md §4.5's "marking via file pointer" for FileScan).
    marked_position: Option<(PageId, u16)>,
    stats: ExecutionStats,
}

impl SeqScanExec {
    /// Create a new sequential scan operator.
    pub fn new(table_id: TableId, schema: Vec<String>) -> Self {
        Self {
            table_id,
            schema,
            current_page: PageId(0),
            current_slot: 0,
            num_pages: None,
            marked_position: None,
            stats: ExecutionStats::default(),
        }
    }

    /// Try to fetch the next row from storage.
    fn fetch_next_row(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let mut heap_table = ctx.heap_table(self.table_id)?;

        // Check if we've exhausted all pages
        let num_pages = match self.num_pages {
            Some(n) => n,
            None => {
                // Compute number of pages on first call
                let n = compute_num_pages(&mut heap_table)?;
                self.num_pages = Some(n);
                n
            }
        };

        if self.current_page.0 >= num_pages {
            return Ok(None);
        }

        // Try to fetch current slot
        loop {
            let rid = RecordId {
                page_id: self.current_page,
                slot: self.current_slot,
            };

            match heap_table.get(rid) {
                Ok(row) => {
                    // Found a row, advance slot and return
                    self.current_slot += 1;
                    return Ok(Some(row));
                }
                Err(e) => {
                    // Check if this is just an empty/deleted slot
                    let is_empty_slot = matches!(e, common::DbError::Storage(ref msg) if msg.contains("slot") || msg.contains("empty"));

                    if is_empty_slot {
                        // Try next slot in same page
                        self.current_slot += 1;

                        // If we've tried enough slots, move to next page
                        // (heuristic: assume max ~100 slots per page)
                        if self.current_slot > 100 {
                            self.current_page = PageId(self.current_page.0 + 1);
                            self.current_slot = 0;

                            if self.current_page.0 >= num_pages {
                                return Ok(None);
                            }
                        }
                    } else {
                        // Real error, propagate
                        return Err(e);
                    }
                }
            }
        }
    }
}

impl Executor for SeqScanExec {
    fn open(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();

        // Reset state
        self.current_page = PageId(0);
        self.current_slot = 0;
        self.num_pages = None;
        self.stats = ExecutionStats::default();

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = Instant::now();
        let row = self.fetch_next_row(ctx)?;
        self.stats.total_next_time += start.elapsed();

        if row.is_some() {
            self.stats.rows_produced += 1;
        }

        // Track pages scanned (only when we have the num_pages computed)
        if let Some(num_pages) = self.num_pages {
            self.stats.pages_scanned = num_pages;
        }

        Ok(row)
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        // Nothing to clean up for seq scan
        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }

    fn mark_current_position(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.marked_position = Some((self.current_page, self.current_slot));
        Ok(())
    }

    fn reset_to_last_mark(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        let (page, slot) = self.marked_position.ok_or_else(|| {
            common::DbError::Executor("no mark set for sequential scan".into())
        })?;
        self.current_page = page;
        self.current_slot = slot;
        Ok(())
    }
}

/// Index scan operator - uses B+Tree index to find rows efficiently.
///
/// Uses a B+Tree index to find matching RecordIds, then fetches the
/// actual rows from the heap table.
pub struct IndexScanExec {
    table_id: TableId,
    index_name: String,
    predicate: IndexPredicate,
    schema: Vec<String>,
    /// RecordIds matching the predicate (populated on open)
    matching_rids: Vec<RecordId>,
    /// Current position in the matching_rids vector
    cursor: usize,
    /// Cursor position captured by `mark_current_position` (an index file
    /// pointer into `matching_rids`, per spec.md §4.5).
    marked_cursor: Option<usize>,
    /// Execution statistics
    stats: ExecutionStats,
}

#[bon::bon]
impl IndexScanExec {
    /// Create a new index scan operator using a builder pattern.
    ///
    /// # Example
    /// ```ignore
    /// let scan = IndexScanExec::builder()
    ///     .table_id(TableId(1))
    ///     .index_name("idx_users_id".into())
    ///     .predicate(IndexPredicate::Eq { col: 0, value: expr })
    ///     .schema(vec!["id".into(), "name".into()])
    ///     .build();
    /// ```
    #[builder]
    pub fn new(
        table_id: TableId,
        index_name: String,
        predicate: IndexPredicate,
        schema: Vec<String>,
    ) -> Self {
        Self {
            table_id,
            index_name,
            predicate,
            schema,
            matching_rids: Vec::new(),
            cursor: 0,
            marked_cursor: None,
            stats: ExecutionStats::default(),
        }
    }

    /// Find the index ID and storage kind from the catalog.
    fn find_index_id(&self, ctx: &ExecutionContext) -> DbResult<(IndexId, IndexKind)> {
        let table_meta = ctx.catalog.table_by_id(self.table_id)?;
        let index_meta = table_meta.index(&self.index_name)?;
        Ok((index_meta.id, index_meta.kind.clone()))
    }

    /// Evaluate the predicate value to get the search key.
    fn eval_predicate_value(&self, pred: &planner::ResolvedExpr) -> DbResult<Value> {
        // For index lookups, we need a literal value
        // Evaluate against an empty row since we only support literals
        let empty_row = Row::new(Vec::new());
        eval_resolved_expr(pred, &empty_row)
    }

    /// Query the on-disk index for matching RecordIds, dispatching on the
    /// catalog's declared `IndexKind` (B+Tree for ordered/range lookups,
    /// hash for O(1)-average equality lookups per spec.md's "sequential or
    /// hashed" tuple-file distinction).
    fn query_index(&self, ctx: &ExecutionContext) -> DbResult<Vec<RecordId>> {
        let (index_id, kind) = self.find_index_id(ctx)?;
        let index_path = ctx.data_dir.join(format!("index_{}.idx", index_id.0));

        // Check if index file exists
        if !index_path.exists() {
            return Err(common::DbError::Storage(format!(
                "index file not found: {}",
                index_path.display()
            )));
        }

        match kind {
            IndexKind::BTree => {
                let mut btree = BTreeIndex::open(&index_path, index_id)?;
                match &self.predicate {
                    IndexPredicate::Eq { value, .. } => {
                        let key_value = self.eval_predicate_value(value)?;
                        btree.search(&[key_value])
                    }
                    IndexPredicate::CompositeEq { values, .. } => {
                        let key_values = values
                            .iter()
                            .map(|v| self.eval_predicate_value(v))
                            .collect::<DbResult<Vec<_>>>()?;
                        btree.search(&key_values)
                    }
                    IndexPredicate::Range { low, high, .. } => {
                        let low_key = self.eval_predicate_value(low)?;
                        let high_key = self.eval_predicate_value(high)?;
                        btree.range_scan(Some(&[low_key]), Some(&[high_key]))
                    }
                }
            }
            IndexKind::Hash => {
                let mut hash_index = HashIndex::open(&index_path, index_id)?;
                match &self.predicate {
                    IndexPredicate::Eq { value, .. } => {
                        let key_value = self.eval_predicate_value(value)?;
                        hash_index.search(&[key_value])
                    }
                    IndexPredicate::CompositeEq { values, .. } => {
                        let key_values = values
                            .iter()
                            .map(|v| self.eval_predicate_value(v))
                            .collect::<DbResult<Vec<_>>>()?;
                        hash_index.search(&key_values)
                    }
                    IndexPredicate::Range { .. } => Err(common::DbError::Executor(
                        "hash index does not support range lookups".into(),
                    )),
                }
            }
            other => Err(common::DbError::Executor(format!(
                "unsupported index kind for scan: {other:?}"
            ))),
        }
    }
}

impl Executor for IndexScanExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();

        // Reset state
        self.cursor = 0;
        self.stats = ExecutionStats::default();

        // Query the index for matching RecordIds
        self.matching_rids = self.query_index(ctx)?;

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = Instant::now();

        if self.cursor >= self.matching_rids.len() {
            self.stats.total_next_time += start.elapsed();
            return Ok(None);
        }

        let rid = self.matching_rids[self.cursor];
        self.cursor += 1;

        // Fetch the actual row from the heap table
        let mut heap_table = ctx.heap_table(self.table_id)?;
        let row = heap_table.get(rid)?;

        self.stats.rows_produced += 1;
        self.stats.total_next_time += start.elapsed();

        Ok(Some(row))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        self.matching_rids.clear();
        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }

    fn mark_current_position(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.marked_cursor = Some(self.cursor);
        Ok(())
    }

    fn reset_to_last_mark(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.cursor = self
            .marked_cursor
            .ok_or_else(|| common::DbError::Executor("no mark set for index scan".into()))?;
        Ok(())
    }
}

/// Helper: compute number of pages in a heap file.
fn compute_num_pages(heap_table: &mut impl HeapTable) -> DbResult<u64> {
    // Try to probe increasing page IDs until we get an error
    // This is a simple heuristic; ideally HeapTable would expose num_pages()
    let mut page_id = 0;
    loop {
        let rid = RecordId {
            page_id: PageId(page_id),
            slot: 0,
        };

        match heap_table.get(rid) {
            Ok(_) => page_id += 1,
            Err(e) => {
                // Check if this is a "page not found" error
                if matches!(e, common::DbError::Storage(ref msg) if msg.contains("page") || msg.contains("beyond"))
                {
                    return Ok(page_id);
                }
                // For empty slots, the page exists
                if matches!(e, common::DbError::Storage(ref msg) if msg.contains("slot") || msg.contains("empty"))
                {
                    page_id += 1;
                } else {
                    return Err(e);
                }
            }
        }

        // Safety limit
        if page_id > 100_000 {
            return Ok(page_id);
        }
    }
}
