//! Builder: constructs executor trees from physical plans.

use crate::{
    dml::{DeleteExec, InsertExec, UpdateExec},
    filter::FilterExec,
    hash_agg::HashedGroupAggregateExec,
    join::NestedLoopJoinExec,
    limit::LimitExec,
    project::ProjectExec,
    rename::RenameExec,
    scan::{IndexScanExec, SeqScanExec},
    sort::{SortExec, SortKey},
    tablefn::TableFunctionScanExec,
    tuplebag::TupleBagExec,
    Executor,
};
use catalog::Catalog;
use common::{DbResult, TableId};
use planner::PhysicalPlan;

/// Build an executor tree from a physical plan.
///
/// Recursively constructs operator instances, wiring up child inputs.
/// `catalog` resolves table schemas for operators (DML's inner scan, in
/// particular) whose plan node doesn't carry its own column names.
///
/// # Errors
///
/// Returns `DbError::Executor` if the plan contains unsupported operators.
pub fn build_executor(plan: PhysicalPlan, catalog: &Catalog) -> DbResult<Box<dyn Executor>> {
    match plan {
        PhysicalPlan::SeqScan { table_id, schema } => {
            Ok(Box::new(SeqScanExec::new(table_id, schema)))
        }

        PhysicalPlan::IndexScan {
            table_id,
            index_name,
            predicate,
            schema,
        } => Ok(Box::new(
            IndexScanExec::builder()
                .table_id(table_id)
                .index_name(index_name)
                .predicate(predicate)
                .schema(schema)
                .build(),
        )),

        PhysicalPlan::Filter { input, predicate } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(FilterExec::new(child, predicate)))
        }

        PhysicalPlan::Project { input, columns } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(ProjectExec::new(child, columns)))
        }

        PhysicalPlan::HashedGroupAggregate {
            input,
            group_by,
            aggregates,
            schema,
        } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(HashedGroupAggregateExec::new(
                child, group_by, aggregates, schema,
            )))
        }

        PhysicalPlan::Sort { input, order_by } => {
            let child = build_executor(*input, catalog)?;
            let sort_keys = order_by
                .into_iter()
                .map(|o| SortKey {
                    column_id: o.column_id,
                    direction: o.direction,
                })
                .collect();
            Ok(Box::new(SortExec::new(child, sort_keys)))
        }

        PhysicalPlan::Limit {
            input,
            limit,
            offset,
        } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(LimitExec::new(child, limit, offset)))
        }

        PhysicalPlan::Rename { input, schema } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(RenameExec::new(child, schema)))
        }

        PhysicalPlan::TupleBag { input, schema } => {
            let child = build_executor(*input, catalog)?;
            Ok(Box::new(TupleBagExec::new(child, schema)))
        }

        PhysicalPlan::TableFunctionScan { name, args, schema } => {
            Ok(Box::new(TableFunctionScanExec::new(name, args, schema)))
        }

        PhysicalPlan::NestedLoopJoin {
            left,
            right,
            join_type,
            condition,
            schema,
            left_width,
            right_width,
        } => {
            let left_child = build_executor(*left, catalog)?;
            let right_child = build_executor(*right, catalog)?;
            Ok(Box::new(NestedLoopJoinExec::with_join_type(
                left_child,
                right_child,
                join_type,
                condition,
                schema,
                left_width,
                right_width,
            )))
        }

        PhysicalPlan::Insert { table_id, values } => {
            // No input operator for INSERT
            let schema = vec![]; // INSERT doesn't produce a schema
            Ok(Box::new(InsertExec::new(table_id, schema, values)))
        }

        PhysicalPlan::Update {
            table_id,
            assignments,
            predicate,
            schema,
        } => {
            // Build scan + optional filter as input, using the table's
            // real column names so the filter predicate and assignment
            // expressions (both column-ordinal based) line up with a
            // non-empty schema.
            let table_schema = get_table_column_names(catalog, table_id)?;
            let mut input: Box<dyn Executor> = Box::new(SeqScanExec::new(table_id, table_schema));

            if let Some(pred) = predicate {
                input = Box::new(FilterExec::new(input, pred));
            }

            Ok(Box::new(UpdateExec::new(
                table_id,
                schema,
                input,
                assignments,
            )))
        }

        PhysicalPlan::Delete {
            table_id,
            predicate,
            schema,
        } => {
            let table_schema = get_table_column_names(catalog, table_id)?;
            let mut input: Box<dyn Executor> = Box::new(SeqScanExec::new(table_id, table_schema));

            if let Some(pred) = predicate {
                input = Box::new(FilterExec::new(input, pred));
            }

            Ok(Box::new(DeleteExec::new(table_id, schema, input)))
        }
    }
}

/// Looks up a table's column names in declaration order, for building the
/// inner scan of UPDATE/DELETE (whose plan node carries the *output*
/// schema, not the source table's column list).
fn get_table_column_names(catalog: &Catalog, table_id: TableId) -> DbResult<Vec<String>> {
    let table_meta = catalog.table_by_id(table_id)?;
    Ok(table_meta
        .schema
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::create_test_catalog;
    use common::TableId;
    use expr::BinaryOp;
    use planner::{PlanJoinType, ResolvedAggregate, ResolvedExpr, ResolvedOrderByExpr, SortDirection};
    use types::Value;

    #[test]
    fn build_seq_scan() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "name".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());

        let executor = executor.unwrap();
        assert_eq!(executor.schema(), &["id", "name"]);
    }

    #[test]
    fn build_seq_scan_empty_schema() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec![],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
        assert_eq!(executor.unwrap().schema().len(), 0);
    }

    #[test]
    fn build_index_scan() {
        use planner::IndexPredicate;
        let catalog = create_test_catalog();

        let plan = PhysicalPlan::IndexScan {
            table_id: TableId(1),
            index_name: "idx_users_id".into(),
            predicate: IndexPredicate::Eq {
                col: 0,
                value: ResolvedExpr::Literal(Value::Int(42)),
            },
            schema: vec!["id".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_filter() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::Filter {
            input: Box::new(input),
            predicate: ResolvedExpr::Literal(Value::Bool(true)),
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_filter_with_complex_predicate() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "age".into()],
        };

        let predicate = ResolvedExpr::Binary {
            left: Box::new(ResolvedExpr::Column(0)),
            op: BinaryOp::Eq,
            right: Box::new(ResolvedExpr::Literal(Value::Int(42))),
        };

        let plan = PhysicalPlan::Filter {
            input: Box::new(input),
            predicate,
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_project() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "name".into()],
        };

        let plan = PhysicalPlan::Project {
            input: Box::new(input),
            columns: vec![("id".to_string(), 0)],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_project_multiple_columns() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "name".into(), "age".into()],
        };

        let plan = PhysicalPlan::Project {
            input: Box::new(input),
            columns: vec![("name".to_string(), 1), ("id".to_string(), 0)],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_sort() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::Sort {
            input: Box::new(input),
            order_by: vec![ResolvedOrderByExpr {
                column_id: 0,
                direction: SortDirection::Asc,
            }],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_limit() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::Limit {
            input: Box::new(input),
            limit: Some(10),
            offset: Some(5),
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_rename() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::Rename {
            input: Box::new(input),
            schema: vec!["users.id".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
        assert_eq!(executor.unwrap().schema(), &["users.id".to_string()]);
    }

    #[test]
    fn build_tuple_bag() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::TupleBag {
            input: Box::new(input),
            schema: vec!["id".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_table_function_scan() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::TableFunctionScan {
            name: "generate_series".into(),
            args: vec![],
            schema: vec!["v".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_nested_loop_join() {
        let catalog = create_test_catalog();
        let left = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };
        let right = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into()],
        };

        let plan = PhysicalPlan::NestedLoopJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_type: PlanJoinType::Inner,
            condition: ResolvedExpr::Literal(Value::Bool(true)),
            schema: vec!["l.id".into(), "r.id".into()],
            left_width: 1,
            right_width: 1,
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_hashed_group_aggregate() {
        let catalog = create_test_catalog();
        let input = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "value".into()],
        };

        let plan = PhysicalPlan::HashedGroupAggregate {
            input: Box::new(input),
            group_by: vec![ResolvedExpr::Column(0)],
            aggregates: vec![ResolvedAggregate {
                func: expr::AggFunc::Sum,
                arg: Some(ResolvedExpr::Column(1)),
                distinct: false,
            }],
            schema: vec!["id".into(), "sum".into()],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_insert() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::Insert {
            table_id: TableId(1),
            values: vec![
                ResolvedExpr::Literal(Value::Int(1)),
                ResolvedExpr::Literal(Value::Text("alice".into())),
            ],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
        assert_eq!(executor.unwrap().schema().len(), 0);
    }

    #[test]
    fn build_update_without_predicate() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::Update {
            table_id: TableId(1),
            assignments: vec![(0, ResolvedExpr::Literal(Value::Int(100)))],
            predicate: None,
            schema: vec![],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_update_with_predicate() {
        let catalog = create_test_catalog();
        let predicate = ResolvedExpr::Binary {
            left: Box::new(ResolvedExpr::Column(0)),
            op: BinaryOp::Gt,
            right: Box::new(ResolvedExpr::Literal(Value::Int(10))),
        };

        let plan = PhysicalPlan::Update {
            table_id: TableId(1),
            assignments: vec![(1, ResolvedExpr::Literal(Value::Text("updated".into())))],
            predicate: Some(predicate),
            schema: vec![],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_delete_without_predicate() {
        let catalog = create_test_catalog();
        let plan = PhysicalPlan::Delete {
            table_id: TableId(1),
            predicate: None,
            schema: vec![],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_delete_with_predicate() {
        let catalog = create_test_catalog();
        let predicate = ResolvedExpr::Binary {
            left: Box::new(ResolvedExpr::Column(2)),
            op: BinaryOp::Eq,
            right: Box::new(ResolvedExpr::Literal(Value::Bool(false))),
        };

        let plan = PhysicalPlan::Delete {
            table_id: TableId(1),
            predicate: Some(predicate),
            schema: vec![],
        };

        let executor = build_executor(plan, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_nested_filter_over_scan() {
        let catalog = create_test_catalog();
        let scan = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "active".into()],
        };

        let filter = PhysicalPlan::Filter {
            input: Box::new(scan),
            predicate: ResolvedExpr::Column(1),
        };

        let executor = build_executor(filter, &catalog);
        assert!(executor.is_ok());
    }

    #[test]
    fn build_nested_project_over_filter_over_scan() {
        let catalog = create_test_catalog();
        let scan = PhysicalPlan::SeqScan {
            table_id: TableId(1),
            schema: vec!["id".into(), "name".into(), "active".into()],
        };

        let filter = PhysicalPlan::Filter {
            input: Box::new(scan),
            predicate: ResolvedExpr::Column(2),
        };

        let project = PhysicalPlan::Project {
            input: Box::new(filter),
            columns: vec![("name".to_string(), 1)],
        };

        let executor = build_executor(project, &catalog);
        assert!(executor.is_ok());
    }
}
