//! Materialize-once replay operator.

use crate::{ExecutionContext, Executor};
use common::{DbError, DbResult, ExecutionStats, Row};

/// Materializes its input once, then replays it from memory on every
/// subsequent `open`/rewind.
///
/// Used anywhere a plan needs repeated passes over a child's rows
/// without re-running that child — most notably the nested loop join's
/// inner side, which `open`s it again for every outer row it could
/// otherwise rescan from storage.
pub struct TupleBagExec {
    input: Option<Box<dyn Executor>>,
    schema: Vec<String>,
    rows: Vec<Row>,
    materialized: bool,
    cursor: usize,
    marked_cursor: Option<usize>,
    stats: ExecutionStats,
}

impl TupleBagExec {
    /// Wrap a child executor; its rows are pulled and cached the first
    /// time this node is opened.
    pub fn new(input: Box<dyn Executor>, schema: Vec<String>) -> Self {
        Self {
            input: Some(input),
            schema,
            rows: Vec::new(),
            materialized: false,
            cursor: 0,
            marked_cursor: None,
            stats: ExecutionStats::default(),
        }
    }

    /// Wrap a fixed, already-materialized set of rows (a literal VALUES
    /// list, or a subquery result captured ahead of time) with no
    /// backing child executor.
    pub fn from_literal(rows: Vec<Row>, schema: Vec<String>) -> Self {
        Self {
            input: None,
            schema,
            rows,
            materialized: true,
            cursor: 0,
            marked_cursor: None,
            stats: ExecutionStats::default(),
        }
    }
}

impl Executor for TupleBagExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = std::time::Instant::now();
        self.stats = ExecutionStats::default();

        if !self.materialized {
            if let Some(input) = self.input.as_mut() {
                input.open(ctx)?;
                self.rows.clear();
                while let Some(row) = input.next(ctx)? {
                    self.rows.push(row);
                }
                input.close(ctx)?;
            }
            self.materialized = true;
        }

        self.cursor = 0;
        self.marked_cursor = None;
        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = std::time::Instant::now();
        let row = if self.cursor < self.rows.len() {
            let row = self.rows[self.cursor].clone();
            self.cursor += 1;
            self.stats.rows_produced += 1;
            Some(row)
        } else {
            None
        };
        self.stats.total_next_time += start.elapsed();
        Ok(row)
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = std::time::Instant::now();
        self.cursor = 0;
        self.marked_cursor = None;
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
            .ok_or_else(|| DbError::Executor("no mark set for tuple bag".into()))?;
        Ok(())
    }
}
