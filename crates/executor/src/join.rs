//! Join operators: combines rows from multiple tables.

use crate::filter::eval_resolved_expr;
use crate::{ExecutionContext, Executor};
use common::{DbError, DbResult, ExecutionStats, Row};
use planner::{PlanJoinType, ResolvedExpr};
use std::time::Instant;
use types::Value;

/// Which side(s) of a join must be padded with NULLs when no match is
/// found, mirroring `planner::PlanJoinType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OuterSide {
    None,
    Left,
    Right,
    Full,
}

impl From<PlanJoinType> for OuterSide {
    fn from(kind: PlanJoinType) -> Self {
        match kind {
            PlanJoinType::Inner => OuterSide::None,
            PlanJoinType::Left => OuterSide::Left,
            PlanJoinType::Right => OuterSide::Right,
            PlanJoinType::Full => OuterSide::Full,
        }
    }
}

/// Iteration phase of the nested loop: the main left-driven loop, then (for
/// RIGHT/FULL joins) a pass emitting right rows nothing on the left matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Main,
    RightUnmatched,
    Done,
}

/// Saved position for `mark_current_position`/`reset_to_last_mark`
/// (spec.md §9 Open Question: marked state spans both the outer-row
/// cursor and the inner materialization cursor).
#[derive(Clone, Debug)]
struct JoinMark {
    current_left_row: Option<Row>,
    right_cursor: usize,
    left_row_matched: bool,
    phase: Phase,
    right_unmatched_cursor: usize,
}

/// Nested loop join operator supporting inner and left/right/full outer
/// joins (spec.md §4.5).
///
/// # Algorithm
///
/// 1. `open()`: Materialize all right-side rows into memory, fetch first
///    left row.
/// 2. `next()`: For each left row, iterate through all right rows,
///    evaluating the join condition. Every matching pair is emitted. For
///    LEFT/FULL joins, a left row with no match is emitted once, padded
///    with NULLs on the right. For RIGHT/FULL joins, once the left side is
///    exhausted, every right row that never matched is emitted once,
///    padded with NULLs on the left.
/// 3. `close()`: Release materialized rows and close children.
///
/// This is the simplest join algorithm, suitable for small tables or when
/// no better access method is available (the planner never reorders into
/// a hash or merge join at this layer).
pub struct NestedLoopJoinExec {
    left_input: Box<dyn Executor>,
    right_input: Box<dyn Executor>,
    condition: ResolvedExpr,
    schema: Vec<String>,
    outer_side: OuterSide,
    left_width: usize,
    right_width: usize,

    // State
    current_left_row: Option<Row>,
    left_row_matched: bool,
    right_materialized: Vec<Row>,
    right_matched: Vec<bool>,
    right_cursor: usize,
    phase: Phase,
    right_unmatched_cursor: usize,
    marked: Option<JoinMark>,
    stats: ExecutionStats,
}

impl NestedLoopJoinExec {
    /// Create a new inner-join nested loop operator (the common case in
    /// tests and ad hoc plans).
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        condition: ResolvedExpr,
        schema: Vec<String>,
    ) -> Self {
        let left_width = left.schema().len();
        let right_width = right.schema().len();
        Self::with_join_type(
            left,
            right,
            PlanJoinType::Inner,
            condition,
            schema,
            left_width,
            right_width,
        )
    }

    /// Create a new nested loop join operator with an explicit join type
    /// and declared column widths (the planner already knows these from
    /// each side's bound schema, per `PhysicalPlan::NestedLoopJoin`).
    pub fn with_join_type(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        join_type: PlanJoinType,
        condition: ResolvedExpr,
        schema: Vec<String>,
        left_width: usize,
        right_width: usize,
    ) -> Self {
        Self {
            left_input: left,
            right_input: right,
            condition,
            schema,
            outer_side: OuterSide::from(join_type),
            left_width,
            right_width,
            current_left_row: None,
            left_row_matched: false,
            right_materialized: Vec::new(),
            right_matched: Vec::new(),
            right_cursor: 0,
            phase: Phase::Main,
            right_unmatched_cursor: 0,
            marked: None,
            stats: ExecutionStats::default(),
        }
    }

    /// Combine a left and right row into a single row.
    ///
    /// The combined row has all columns from the left row first,
    /// followed by all columns from the right row.
    fn combine_rows(&self, left: &Row, right: &Row) -> Row {
        let mut combined_values = left.values.clone();
        combined_values.extend(right.values.clone());
        Row::new(combined_values)
    }

    /// Left row padded with NULLs for every right-side column.
    fn pad_left(&self, left: &Row) -> Row {
        let mut values = left.values.clone();
        values.extend(std::iter::repeat(Value::Null).take(self.right_width));
        Row::new(values)
    }

    /// Right row padded with NULLs for every left-side column, prepended.
    fn pad_right(&self, right: &Row) -> Row {
        let mut values = vec![Value::Null; self.left_width];
        values.extend(right.values.clone());
        Row::new(values)
    }

    /// Evaluate the join condition against a combined row.
    ///
    /// Returns true if the rows should be joined, false otherwise.
    /// NULL condition results are treated as false (SQL semantics).
    fn eval_condition(&self, row: &Row) -> DbResult<bool> {
        let result = eval_resolved_expr(&self.condition, row)?;
        match result {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(DbError::Executor(format!(
                "join condition must evaluate to boolean, got {:?}",
                other
            ))),
        }
    }

    fn wants_left_outer(&self) -> bool {
        matches!(self.outer_side, OuterSide::Left | OuterSide::Full)
    }

    fn wants_right_outer(&self) -> bool {
        matches!(self.outer_side, OuterSide::Right | OuterSide::Full)
    }

    fn advance_left(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.current_left_row = self.left_input.next(ctx)?;
        self.left_row_matched = false;
        self.right_cursor = 0;
        Ok(())
    }
}

impl Executor for NestedLoopJoinExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();
        self.stats = ExecutionStats::default();

        // Open both children
        self.left_input.open(ctx)?;
        self.right_input.open(ctx)?;

        // Materialize right side for repeated iteration
        self.right_materialized.clear();
        while let Some(row) = self.right_input.next(ctx)? {
            self.right_materialized.push(row);
        }
        self.right_matched = vec![false; self.right_materialized.len()];

        // Get first left row
        self.current_left_row = self.left_input.next(ctx)?;
        self.left_row_matched = false;
        self.right_cursor = 0;
        self.phase = Phase::Main;
        self.right_unmatched_cursor = 0;
        self.marked = None;

        self.stats.open_time = start.elapsed();
        Ok(())
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let start = Instant::now();

        loop {
            match self.phase {
                Phase::Main => {
                    let left_row = match &self.current_left_row {
                        Some(r) => r.clone(),
                        None => {
                            self.phase = if self.wants_right_outer() {
                                Phase::RightUnmatched
                            } else {
                                Phase::Done
                            };
                            self.right_unmatched_cursor = 0;
                            continue;
                        }
                    };

                    let mut found = None;
                    while self.right_cursor < self.right_materialized.len() {
                        let idx = self.right_cursor;
                        self.right_cursor += 1;
                        let right_row = &self.right_materialized[idx];
                        let combined = self.combine_rows(&left_row, right_row);

                        if self.eval_condition(&combined)? {
                            self.left_row_matched = true;
                            self.right_matched[idx] = true;
                            found = Some(combined);
                            break;
                        }
                    }

                    if let Some(row) = found {
                        self.stats.rows_produced += 1;
                        self.stats.total_next_time += start.elapsed();
                        return Ok(Some(row));
                    }

                    // Exhausted right side for this left row.
                    if !self.left_row_matched && self.wants_left_outer() {
                        let padded = self.pad_left(&left_row);
                        self.advance_left(ctx)?;
                        self.stats.rows_produced += 1;
                        self.stats.total_next_time += start.elapsed();
                        return Ok(Some(padded));
                    }

                    self.advance_left(ctx)?;
                }
                Phase::RightUnmatched => {
                    while self.right_unmatched_cursor < self.right_matched.len() {
                        let idx = self.right_unmatched_cursor;
                        self.right_unmatched_cursor += 1;
                        if !self.right_matched[idx] {
                            let padded = self.pad_right(&self.right_materialized[idx]);
                            self.stats.rows_produced += 1;
                            self.stats.total_next_time += start.elapsed();
                            return Ok(Some(padded));
                        }
                    }
                    self.phase = Phase::Done;
                }
                Phase::Done => {
                    self.stats.total_next_time += start.elapsed();
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let start = Instant::now();

        self.right_materialized.clear();
        self.right_matched.clear();
        self.current_left_row = None;
        self.marked = None;
        self.left_input.close(ctx)?;
        self.right_input.close(ctx)?;

        self.stats.close_time = start.elapsed();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        Some(&self.stats)
    }

    fn mark_current_position(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.left_input.mark_current_position(ctx)?;
        self.marked = Some(JoinMark {
            current_left_row: self.current_left_row.clone(),
            right_cursor: self.right_cursor,
            left_row_matched: self.left_row_matched,
            phase: self.phase,
            right_unmatched_cursor: self.right_unmatched_cursor,
        });
        Ok(())
    }

    fn reset_to_last_mark(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let mark = self
            .marked
            .clone()
            .ok_or_else(|| DbError::Executor("no mark set for nested loop join".into()))?;
        self.left_input.reset_to_last_mark(ctx)?;
        self.current_left_row = mark.current_left_row;
        self.right_cursor = mark.right_cursor;
        self.left_row_matched = mark.left_row_matched;
        self.phase = mark.phase;
        self.right_unmatched_cursor = mark.right_unmatched_cursor;
        Ok(())
    }
}
