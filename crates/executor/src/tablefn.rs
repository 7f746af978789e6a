//! Table function invocation operator.
//!
//! Table functions are a Non-goal: they require a registry of external
//! collaborators this engine doesn't own. This executor exists so the
//! plan shape is complete and `build_executor` stays exhaustive over
//! `PhysicalPlan`, but it always fails at `open` time.

use crate::{ExecutionContext, Executor};
use common::{DbError, DbResult, ExecutionStats, Row};
use planner::ResolvedExpr;

pub struct TableFunctionScanExec {
    name: String,
    #[allow(dead_code)]
    args: Vec<ResolvedExpr>,
    schema: Vec<String>,
}

impl TableFunctionScanExec {
    pub fn new(name: String, args: Vec<ResolvedExpr>, schema: Vec<String>) -> Self {
        Self { name, args, schema }
    }
}

impl Executor for TableFunctionScanExec {
    fn open(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Err(DbError::Executor(format!(
            "table function '{}' is not registered",
            self.name
        )))
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Err(DbError::Executor(format!(
            "table function '{}' is not registered",
            self.name
        )))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn stats(&self) -> Option<&ExecutionStats> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_reports_unregistered_function() {
        let mut exec = TableFunctionScanExec::new("generate_series".into(), vec![], vec!["v".into()]);

        let temp_dir = tempfile::tempdir().unwrap();
        let catalog = catalog::Catalog::new();
        let mut pager = buffer::FilePager::new(temp_dir.path(), 10);
        let mut wal = wal::Wal::open(temp_dir.path().join("test.wal")).unwrap();
        let mut ctx =
            ExecutionContext::new(&catalog, &mut pager, &mut wal, temp_dir.path().into());

        let err = exec.open(&mut ctx).unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }
}
