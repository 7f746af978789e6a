//! DML operators: Insert, Update, Delete.

use crate::{filter::eval_resolved_expr, ExecutionContext, Executor};
use common::{ColumnId, DbResult, Row, TableId};
use constraints::PendingChange;
use planner::ResolvedExpr;
use storage::HeapTable;
use types::Value;
use wal::WalRecord;

/// Insert operator - inserts rows into a table with WAL logging.
///
/// Evaluates value expressions and writes to both WAL and storage.
/// Returns a single row containing the number of inserted rows.
pub struct InsertExec {
    table_id: TableId,
    schema: Vec<String>,
    values: Vec<ResolvedExpr>,
    executed: bool,
}

impl InsertExec {
    /// Create a new insert operator.
    pub fn new(table_id: TableId, schema: Vec<String>, values: Vec<ResolvedExpr>) -> Self {
        Self {
            table_id,
            schema,
            values,
            executed: false,
        }
    }
}

impl Executor for InsertExec {
    fn open(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.executed = false;
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        // Evaluate value expressions (no row context for INSERT literals)
        let empty_row = Row::new(vec![]);
        let mut row_values = Vec::with_capacity(self.values.len());

        for expr in &self.values {
            let value = eval_resolved_expr(expr, &empty_row)?;
            row_values.push(value);
        }

        let row = Row::new(row_values.clone());

        // Row-event enforcement fires before the row is actually written:
        // NOT NULL, candidate-key, and foreign-key checks (spec.md §4.7).
        let catalog = ctx.catalog;
        constraints::check_before_insert(catalog, ctx, self.table_id, &row)?;

        // 1. Insert into storage to get RID
        let rid = {
            let mut heap_table = ctx.heap_table(self.table_id)?;
            heap_table.insert(&row)?
        };

        // 2. Log to WAL after successful insert
        let wal_record = WalRecord::Insert {
            table: self.table_id,
            row: row_values,
            rid,
        };
        ctx.log_dml(wal_record)?;

        // Return single row with affected count
        Ok(Some(Row::new(vec![Value::Int(1)])))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

/// Update operator - updates rows matching a predicate with WAL logging.
///
/// Scans for matching rows, applies assignments, and writes to WAL and storage.
/// Returns a single row containing the number of updated rows.
pub struct UpdateExec {
    table_id: TableId,
    schema: Vec<String>,
    input: Box<dyn Executor>,
    assignments: Vec<(ColumnId, ResolvedExpr)>,
    executed: bool,
}

impl UpdateExec {
    /// Create a new update operator.
    pub fn new(
        table_id: TableId,
        schema: Vec<String>,
        input: Box<dyn Executor>,
        assignments: Vec<(ColumnId, ResolvedExpr)>,
    ) -> Self {
        Self {
            table_id,
            schema,
            input,
            assignments,
            executed: false,
        }
    }

    /// Apply assignments to a row to produce the updated row.
    fn apply_assignments(&self, old_row: &Row) -> DbResult<Row> {
        let mut new_values = old_row.values.clone();

        for (col_id, expr) in &self.assignments {
            let idx = *col_id as usize;
            if idx >= new_values.len() {
                return Err(common::DbError::Executor(format!(
                    "column index {} out of bounds (row has {} columns)",
                    idx,
                    new_values.len()
                )));
            }

            let value = eval_resolved_expr(expr, old_row)?;
            new_values[idx] = value;
        }

        Ok(Row::new(new_values))
    }
}

impl Executor for UpdateExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.executed = false;
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }

        let mut count = 0;

        // For each matching row, apply updates and write the new version in place.
        while let Some(old_row) = self.input.next(ctx)? {
            let rid = old_row.rid().ok_or_else(|| {
                common::DbError::Executor("update input row has no record id".into())
            })?;
            let new_row = self.apply_assignments(&old_row)?;

            // Row-event enforcement, before the write: NOT NULL/candidate-key/
            // FK checks on the new values, then RESTRICT/CASCADE/SET_NULL
            // propagation to any table referencing this one (spec.md §4.7).
            let catalog = ctx.catalog;
            constraints::check_before_update(catalog, ctx, self.table_id, &old_row, &new_row)?;
            constraints::enforce_dependents(
                catalog,
                ctx,
                self.table_id,
                &PendingChange::Update {
                    old_row: &old_row,
                    new_row: &new_row,
                },
            )?;

            {
                let mut heap_table = ctx.heap_table(self.table_id)?;
                heap_table.update(rid, &new_row)?;
            }

            ctx.log_dml(WalRecord::Update {
                table: self.table_id,
                rid,
                new_row: new_row.values.clone(),
            })?;

            count += 1;
        }

        self.executed = true;

        // Return count of matched rows
        Ok(Some(Row::new(vec![Value::Int(count)])))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

/// Delete operator - deletes rows matching a predicate with WAL logging.
///
/// Scans for matching rows and removes them from storage.
/// Returns a single row containing the number of deleted rows.
pub struct DeleteExec {
    table_id: TableId,
    schema: Vec<String>,
    input: Box<dyn Executor>,
    executed: bool,
}

impl DeleteExec {
    /// Create a new delete operator.
    pub fn new(table_id: TableId, schema: Vec<String>, input: Box<dyn Executor>) -> Self {
        Self {
            table_id,
            schema,
            input,
            executed: false,
        }
    }
}

impl Executor for DeleteExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.executed = false;
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        if self.executed {
            return Ok(None);
        }

        let mut count = 0;

        // For each matching row, delete it from storage
        while let Some(row) = self.input.next(ctx)? {
            let rid = row.rid().ok_or_else(|| {
                common::DbError::Executor("delete input row has no record id".into())
            })?;

            // RESTRICT/CASCADE/SET_NULL propagation to referencing tables,
            // before the row is actually removed (spec.md §4.7).
            let catalog = ctx.catalog;
            constraints::enforce_dependents(
                catalog,
                ctx,
                self.table_id,
                &PendingChange::Delete { old_row: &row },
            )?;

            {
                let mut heap_table = ctx.heap_table(self.table_id)?;
                heap_table.delete(rid)?;
            }

            ctx.log_dml(WalRecord::Delete {
                table: self.table_id,
                rid,
            })?;

            count += 1;
        }

        self.executed = true;

        // Return count of matched rows
        Ok(Some(Row::new(vec![Value::Int(count)])))
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}
