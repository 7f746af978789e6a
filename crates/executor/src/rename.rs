//! Schema-relabeling operator: passes rows through unchanged.

use crate::{ExecutionContext, Executor};
use common::{DbResult, ExecutionStats, Row};

/// Relabels an input's schema without touching its rows.
///
/// Used to qualify a join side's columns (`"users.id"`) ahead of the
/// join itself, rather than baking the qualification into the join
/// node's own schema-construction logic.
pub struct RenameExec {
    input: Box<dyn Executor>,
    schema: Vec<String>,
}

impl RenameExec {
    pub fn new(input: Box<dyn Executor>, schema: Vec<String>) -> Self {
        Self { input, schema }
    }
}

impl Executor for RenameExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        self.input.next(ctx)
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        self.input.stats()
    }

    fn mark_current_position(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.mark_current_position(ctx)
    }

    fn reset_to_last_mark(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.reset_to_last_mark(ctx)
    }
}
