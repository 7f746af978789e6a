//! Filter operator: applies WHERE predicates.

use crate::{ExecutionContext, Executor};
use common::{DbResult, ExecutionStats, Row};
use planner::ResolvedExpr;
use std::time::Instant;
use types::Value;

/// Filter operator - applies a predicate to rows from a child operator.
///
/// Only passes through rows where the predicate evaluates to true.
/// NULL predicate results are treated as false (SQL semantics).
pub struct FilterExec {
    input: Box<dyn Executor>,
    predicate: ResolvedExpr,
    stats: ExecutionStats,
}

impl FilterExec {
    /// Create a new filter operator.
    pub fn new(input: Box<dyn Executor>, predicate: ResolvedExpr) -> Self {
        Self {
            input,
            predicate,
            stats: ExecutionStats::default(),
        }
    }

    /// Evaluate the predicate against a row.
    fn eval_predicate(&self, row: &Row) -> DbResult<bool> {
        let result = eval_resolved_expr(&self.predicate, row)?;

        // NULL is treated as false in WHERE clauses
        match result {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(common::DbError::Executor(format!(
                "predicate must evaluate to boolean, got {:?}",
                other
            ))),
        }
    }
}

impl Executor for FilterExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();
        let result = self.input.open(ctx)?;
        self.stats.open_time = start.elapsed();
        Ok(result)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = Instant::now();

        loop {
            let row = match self.input.next(ctx)? {
                Some(r) => r,
                None => {
                    self.stats.total_next_time += start.elapsed();
                    return Ok(None);
                }
            };

            if self.eval_predicate(&row)? {
                self.stats.rows_produced += 1;
                self.stats.total_next_time += start.elapsed();
                return Ok(Some(row));
            } else {
                self.stats.rows_filtered += 1;
            }
        }
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        let result = self.input.close(ctx)?;
        self.stats.close_time = start.elapsed();
        Ok(result)
    }

    fn schema(&self) -> &[String] {
        self.input.schema()
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }
}

/// Evaluate a resolved expression against a row.
///
/// This is the core expression evaluator for the executor; it defers
/// type coercion, NULL propagation, and comparison semantics to the
/// expression engine's own evaluators so the executor and the planner's
/// constant-folding paths never disagree about what an operator does.
pub fn eval_resolved_expr(expr: &ResolvedExpr, row: &Row) -> DbResult<Value> {
    match expr {
        ResolvedExpr::Literal(v) => Ok(v.clone()),
        ResolvedExpr::Column(col_id) => {
            let idx = *col_id as usize;
            row.values
                .get(idx)
                .ok_or_else(|| {
                    common::DbError::Executor(format!(
                        "column index {} out of bounds (row has {} columns)",
                        idx,
                        row.values.len()
                    ))
                })
                .cloned()
        }
        ResolvedExpr::Unary { op, expr } => {
            let val = eval_resolved_expr(expr, row)?;
            expr::eval_unary(*op, val)
        }
        ResolvedExpr::Binary { left, op, right } => {
            let left_val = eval_resolved_expr(left, row)?;
            let right_val = eval_resolved_expr(right, row)?;
            expr::eval_binary(&left_val, *op, &right_val)
        }
        ResolvedExpr::Arith { left, op, right } => {
            let left_val = eval_resolved_expr(left, row)?;
            let right_val = eval_resolved_expr(right, row)?;
            expr::eval_arith(&left_val, *op, &right_val)
        }
        ResolvedExpr::IsNull { expr, negated } => {
            let val = eval_resolved_expr(expr, row)?;
            Ok(Value::Bool(val.is_null() != *negated))
        }
        ResolvedExpr::InList {
            expr,
            list,
            negated,
        } => {
            let needle = eval_resolved_expr(expr, row)?;
            let haystack = list
                .iter()
                .map(|item| eval_resolved_expr(item, row))
                .collect::<DbResult<Vec<_>>>()?;
            expr::eval_in_list(&needle, &haystack, *negated)
        }
    }
}
