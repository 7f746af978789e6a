//! Row-event constraint enforcer.
//!
//! Registered conceptually as a before-insert/before-update/before-delete
//! listener on DML execution (spec.md §4.7): NOT NULL, candidate-key, and
//! foreign-key checks are issued as ordinary `SELECT`/`UPDATE`/`DELETE`
//! physical plans so that indexes, if present, are exploited the same way
//! a user query would exploit them.
//!
//! This crate builds those plans but does not run them — running a plan
//! requires the executor's `ExecutionContext`, and `executor` depends on
//! `constraints` (not the other way around) so that enforcement can be
//! wired into `InsertExec`/`UpdateExec`/`DeleteExec` without a dependency
//! cycle. Callers supply a [`PlanRunner`] that knows how to execute a
//! `PhysicalPlan` against their own execution context.

use catalog::{Catalog, FkAction, IndexMeta};
use common::{ColumnId, DbError, DbResult, RecordId, Row, TableId};
use expr::BinaryOp;
use planner::{IndexPredicate, PhysicalPlan, ResolvedExpr};
use types::Value;

/// What the constraint enforcer needs from its caller: a way to run a
/// `SELECT` plan for a row count, and a way to run a DML plan (nested
/// `UPDATE`/`DELETE`) for `CASCADE`/`SET_NULL` propagation.
///
/// `executor::ExecutionContext` implements this trait directly, routing
/// both methods through `execute_query`/`execute_dml`.
pub trait PlanRunner {
    fn run_query(&mut self, plan: PhysicalPlan) -> DbResult<Vec<Row>>;
    fn run_dml(&mut self, plan: PhysicalPlan) -> DbResult<u64>;
}

/// The DML operation a row is about to undergo, for dependent-table
/// propagation (before-update/before-delete per spec.md §4.7).
pub enum PendingChange<'a> {
    Update { old_row: &'a Row, new_row: &'a Row },
    Delete { old_row: &'a Row },
}

/// Runs before-insert checks: NOT NULL, candidate keys, foreign keys.
pub fn check_before_insert(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    row: &Row,
) -> DbResult<()> {
    check_not_null(catalog, table_id, row)?;
    check_candidate_keys(catalog, runner, table_id, row, None)?;
    check_foreign_keys(catalog, runner, table_id, row)?;
    Ok(())
}

/// Runs before-update checks on the row's new values: NOT NULL, candidate
/// keys (excluding the row's own record, so an unchanged key doesn't
/// collide with itself), foreign keys.
pub fn check_before_update(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    old_row: &Row,
    new_row: &Row,
) -> DbResult<()> {
    check_not_null(catalog, table_id, new_row)?;
    check_candidate_keys(catalog, runner, table_id, new_row, old_row.rid())?;
    check_foreign_keys(catalog, runner, table_id, new_row)?;
    Ok(())
}

/// Propagates a pending update/delete to dependent tables per each
/// referencing foreign key's on-update/on-delete policy. Reuses the
/// ordinary DML dispatch for `CASCADE`/`SET_NULL`, so transitively
/// constrained tables are enforced again when their own nested DML runs.
///
/// Recursion depth is bounded by the schema's referencing graph; no
/// cycle detection is performed (a self-referencing or mutually
/// referencing FK graph with `CASCADE` can recurse indefinitely).
pub fn enforce_dependents(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    change: &PendingChange,
) -> DbResult<()> {
    let table = catalog.table_by_id(table_id)?;
    if table.referenced_by.is_empty() {
        return Ok(());
    }

    for dependent_name in table.referenced_by.iter() {
        let dependent = catalog.table(dependent_name)?;
        for fk in &dependent.foreign_keys {
            if fk.ref_table != table.name {
                continue;
            }

            let old_key = gather(old_row_of(change), &fk.ref_columns);

            match change {
                PendingChange::Delete { .. } => {
                    apply_policy(
                        catalog,
                        runner,
                        dependent,
                        fk,
                        fk.on_delete,
                        &old_key,
                        None,
                    )?;
                }
                PendingChange::Update { new_row, .. } => {
                    let new_key = gather(new_row, &fk.ref_columns);
                    if new_key == old_key {
                        continue;
                    }
                    apply_policy(
                        catalog,
                        runner,
                        dependent,
                        fk,
                        fk.on_update,
                        &old_key,
                        Some(&new_key),
                    )?;
                }
            }
        }
    }

    Ok(())
}

fn old_row_of<'a>(change: &'a PendingChange) -> &'a Row {
    match change {
        PendingChange::Update { old_row, .. } => old_row,
        PendingChange::Delete { old_row } => old_row,
    }
}

/// Applies a single foreign key's RESTRICT/CASCADE/SET_NULL policy against
/// the dependent table. `new_key` is `Some` for an update propagation
/// (cascading the new key value) and `None` for a delete (there is no
/// replacement value to cascade, only removal or nulling).
fn apply_policy(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    dependent: &catalog::TableMeta,
    fk: &catalog::ForeignKeyDef,
    action: FkAction,
    old_key: &[Value],
    new_key: Option<&[Value]>,
) -> DbResult<()> {
    match action {
        FkAction::Restrict => {
            let plan = lookup_plan(catalog, dependent.id, &fk.columns, old_key)?;
            let hits = runner.run_query(plan)?;
            if !hits.is_empty() {
                tracing::debug!(
                    dependent = %dependent.name,
                    fk = %fk.name,
                    "RESTRICT blocked: dependent rows still reference this key"
                );
                return Err(DbError::Constraint(format!(
                    "cannot change '{}': referenced by foreign key '{}' on table '{}'",
                    fk.ref_table, fk.name, dependent.name
                )));
            }
        }
        FkAction::Cascade => {
            let dep_schema = column_names(dependent);
            let predicate = equality_predicate(&fk.columns, old_key);
            match new_key {
                Some(new_key) => {
                    tracing::debug!(
                        dependent = %dependent.name,
                        fk = %fk.name,
                        "CASCADE updating dependent foreign key columns"
                    );
                    let assignments: Vec<(ColumnId, ResolvedExpr)> = fk
                        .columns
                        .iter()
                        .zip(new_key.iter())
                        .map(|(&c, v)| (c, ResolvedExpr::Literal(v.clone())))
                        .collect();
                    let plan = PhysicalPlan::Update {
                        table_id: dependent.id,
                        assignments,
                        predicate: Some(predicate),
                        schema: dep_schema,
                    };
                    runner.run_dml(plan)?;
                }
                None => {
                    tracing::debug!(
                        dependent = %dependent.name,
                        fk = %fk.name,
                        "CASCADE deleting dependent rows"
                    );
                    let plan = PhysicalPlan::Delete {
                        table_id: dependent.id,
                        predicate: Some(predicate),
                        schema: dep_schema,
                    };
                    runner.run_dml(plan)?;
                }
            }
        }
        FkAction::SetNull => {
            tracing::debug!(
                dependent = %dependent.name,
                fk = %fk.name,
                "SET NULL nulling dependent foreign key columns"
            );
            let dep_schema = column_names(dependent);
            let predicate = equality_predicate(&fk.columns, old_key);
            let assignments: Vec<(ColumnId, ResolvedExpr)> = fk
                .columns
                .iter()
                .map(|&c| (c, ResolvedExpr::Literal(Value::Null)))
                .collect();
            let plan = PhysicalPlan::Update {
                table_id: dependent.id,
                assignments,
                predicate: Some(predicate),
                schema: dep_schema,
            };
            runner.run_dml(plan)?;
        }
    }
    Ok(())
}

fn gather(row: &Row, columns: &[ColumnId]) -> Vec<Value> {
    columns
        .iter()
        .map(|&c| row.values[c as usize].clone())
        .collect()
}

fn check_not_null(catalog: &Catalog, table_id: TableId, row: &Row) -> DbResult<()> {
    let table = catalog.table_by_id(table_id)?;
    for (col, value) in table.schema.columns.iter().zip(&row.values) {
        if col.not_null && value.is_null() {
            return Err(DbError::Constraint(format!(
                "NULL value in column '{}' violates NOT NULL constraint",
                col.name
            )));
        }
    }
    Ok(())
}

/// Checks every candidate key (PRIMARY plus each UNIQUE) declared on the
/// table. A key whose value contains a NULL is skipped, matching common
/// UNIQUE semantics where NULLs are never considered equal to each other.
/// `exclude_rid` is the record being updated, if any, so updating a row
/// without actually changing its key doesn't collide with itself.
fn check_candidate_keys(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    row: &Row,
    exclude_rid: Option<RecordId>,
) -> DbResult<()> {
    let table = catalog.table_by_id(table_id)?;

    if let Some(pk) = &table.primary_key {
        check_single_key(catalog, runner, table_id, row, exclude_rid, pk, "primary key")?;
    }
    for uk in &table.unique_keys {
        check_single_key(catalog, runner, table_id, row, exclude_rid, uk, "unique key")?;
    }
    Ok(())
}

/// Checks a single candidate key, reporting which kind of key ("primary
/// key" / "unique key") it was so callers can tell the violations apart.
fn check_single_key(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    row: &Row,
    exclude_rid: Option<RecordId>,
    key: &[ColumnId],
    label: &str,
) -> DbResult<()> {
    let values = gather(row, key);
    if values.iter().any(Value::is_null) {
        return Ok(());
    }

    let plan = lookup_plan(catalog, table_id, key, &values)?;
    let hits = runner.run_query(plan)?;
    let collides = hits.iter().any(|hit| hit.rid() != exclude_rid);
    if collides {
        let table = catalog.table_by_id(table_id)?;
        return Err(DbError::Constraint(format!(
            "duplicate {label} value violates constraint on table '{}'",
            table.name
        )));
    }
    Ok(())
}

/// Checks every foreign key declared on the table. A key with any NULL
/// column is skipped per spec.md §4.7.
fn check_foreign_keys(
    catalog: &Catalog,
    runner: &mut dyn PlanRunner,
    table_id: TableId,
    row: &Row,
) -> DbResult<()> {
    let table = catalog.table_by_id(table_id)?;
    for fk in &table.foreign_keys {
        let values = gather(row, &fk.columns);
        if values.iter().any(Value::is_null) {
            continue;
        }

        let ref_table = catalog.table(&fk.ref_table)?;
        let plan = lookup_plan(catalog, ref_table.id, &fk.ref_columns, &values)?;
        let hits = runner.run_query(plan)?;
        if hits.is_empty() {
            return Err(DbError::Constraint(format!(
                "insert or update on table '{}' violates foreign key constraint '{}': \
                 no matching row in '{}'",
                table.name, fk.name, fk.ref_table
            )));
        }
    }
    Ok(())
}

/// Builds a plan locating rows whose `columns` equal `values`, preferring
/// a declared index over `columns` (in the same order) when one exists so
/// constraint checks exploit indexes transparently, as spec.md §4.7
/// requires.
fn lookup_plan(
    catalog: &Catalog,
    table_id: TableId,
    columns: &[ColumnId],
    values: &[Value],
) -> DbResult<PhysicalPlan> {
    let table = catalog.table_by_id(table_id)?;
    let schema = column_names(table);

    let matching_index = table
        .indexes()
        .iter()
        .find(|index: &&IndexMeta| index.columns.as_slice() == columns);

    if let Some(index) = matching_index {
        let predicate = if columns.len() == 1 {
            IndexPredicate::Eq {
                col: columns[0],
                value: ResolvedExpr::Literal(values[0].clone()),
            }
        } else {
            IndexPredicate::CompositeEq {
                columns: columns.to_vec(),
                values: values.iter().cloned().map(ResolvedExpr::Literal).collect(),
            }
        };
        return Ok(PhysicalPlan::IndexScan {
            table_id,
            index_name: index.name.clone(),
            predicate,
            schema,
        });
    }

    Ok(PhysicalPlan::Filter {
        input: Box::new(PhysicalPlan::SeqScan { table_id, schema }),
        predicate: equality_predicate(columns, values),
    })
}

fn equality_predicate(columns: &[ColumnId], values: &[Value]) -> ResolvedExpr {
    columns
        .iter()
        .zip(values)
        .map(|(&col, value)| ResolvedExpr::Binary {
            left: Box::new(ResolvedExpr::Column(col)),
            op: BinaryOp::Eq,
            right: Box::new(ResolvedExpr::Literal(value.clone())),
        })
        .reduce(|acc, next| ResolvedExpr::Binary {
            left: Box::new(acc),
            op: BinaryOp::And,
            right: Box::new(next),
        })
        .expect("lookup_plan is never called with an empty key")
}

fn column_names(table: &catalog::TableMeta) -> Vec<String> {
    table.schema.columns.iter().map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{Column, ForeignKeyDef};
    use types::SqlType;

    fn two_table_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .create_table(
                "users",
                vec![
                    Column::not_null("id", SqlType::Int),
                    Column::new("name", SqlType::Text),
                ],
                Some(vec![0]),
            )
            .unwrap();
        catalog
            .create_table(
                "orders",
                vec![
                    Column::not_null("id", SqlType::Int),
                    Column::new("user_id", SqlType::Int),
                ],
                Some(vec![0]),
            )
            .unwrap();
        catalog
            .add_foreign_key(
                "orders",
                ForeignKeyDef {
                    name: "fk_orders_user".into(),
                    columns: vec![1],
                    ref_table: "users".into(),
                    ref_columns: vec![0],
                    on_delete: FkAction::Restrict,
                    on_update: FkAction::Cascade,
                },
            )
            .unwrap();
        catalog
    }

    /// A `PlanRunner` backed by in-memory tables, for unit-testing the plan
    /// shapes this crate builds without spinning up a real `ExecutionContext`.
    struct FakeRunner {
        tables: hashbrown::HashMap<u64, Vec<Row>>,
    }

    impl PlanRunner for FakeRunner {
        fn run_query(&mut self, plan: PhysicalPlan) -> DbResult<Vec<Row>> {
            match plan {
                PhysicalPlan::SeqScan { table_id, .. } => {
                    Ok(self.tables.get(&table_id.0).cloned().unwrap_or_default())
                }
                PhysicalPlan::Filter { input, predicate } => {
                    let rows = self.run_query(*input)?;
                    Ok(rows
                        .into_iter()
                        .filter(|row| eval_bool(&predicate, row))
                        .collect())
                }
                PhysicalPlan::IndexScan {
                    table_id,
                    predicate,
                    ..
                } => {
                    let rows = self.tables.get(&table_id.0).cloned().unwrap_or_default();
                    Ok(rows
                        .into_iter()
                        .filter(|row| match &predicate {
                            IndexPredicate::Eq { col, value } => {
                                row.values[*col as usize] == literal(value)
                            }
                            IndexPredicate::CompositeEq { columns, values } => columns
                                .iter()
                                .zip(values)
                                .all(|(&c, v)| row.values[c as usize] == literal(v)),
                            IndexPredicate::Range { .. } => true,
                        })
                        .collect())
                }
                other => panic!("FakeRunner does not model {other:?}"),
            }
        }

        fn run_dml(&mut self, plan: PhysicalPlan) -> DbResult<u64> {
            match plan {
                PhysicalPlan::Delete {
                    table_id,
                    predicate,
                    ..
                } => {
                    let rows = self.tables.entry(table_id.0).or_default();
                    let before = rows.len();
                    rows.retain(|row| {
                        predicate.as_ref().is_none_or(|p| !eval_bool(p, row))
                    });
                    Ok((before - rows.len()) as u64)
                }
                PhysicalPlan::Update {
                    table_id,
                    assignments,
                    predicate,
                    ..
                } => {
                    let rows = self.tables.entry(table_id.0).or_default();
                    let mut count = 0;
                    for row in rows.iter_mut() {
                        if predicate.as_ref().is_none_or(|p| eval_bool(p, row)) {
                            for (col, expr) in &assignments {
                                row.values[*col as usize] = literal(expr);
                            }
                            count += 1;
                        }
                    }
                    Ok(count)
                }
                other => panic!("FakeRunner does not model {other:?}"),
            }
        }
    }

    fn literal(expr: &ResolvedExpr) -> Value {
        match expr {
            ResolvedExpr::Literal(v) => v.clone(),
            other => panic!("expected literal, found {other:?}"),
        }
    }

    fn eval_bool(expr: &ResolvedExpr, row: &Row) -> bool {
        match expr {
            ResolvedExpr::Binary { left, op: BinaryOp::Eq, right } => {
                eval_value(left, row) == eval_value(right, row)
            }
            ResolvedExpr::Binary { left, op: BinaryOp::And, right } => {
                eval_bool(left, row) && eval_bool(right, row)
            }
            ResolvedExpr::Column(c) => !matches!(row.values[*c as usize], Value::Bool(false)),
            other => panic!("eval_bool does not model {other:?}"),
        }
    }

    fn eval_value(expr: &ResolvedExpr, row: &Row) -> Value {
        match expr {
            ResolvedExpr::Literal(v) => v.clone(),
            ResolvedExpr::Column(c) => row.values[*c as usize].clone(),
            other => panic!("eval_value does not model {other:?}"),
        }
    }

    #[test]
    fn not_null_violation_is_reported() {
        let catalog = two_table_catalog();
        let row = Row::new(vec![Value::Null, Value::Text("x".into())]);
        let err = check_not_null(&catalog, common::TableId(1), &row).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn duplicate_primary_key_is_rejected_on_insert() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(
                1,
                vec![Row::new(vec![Value::Int(1), Value::Text("alice".into())])],
            )]),
        };

        let new_row = Row::new(vec![Value::Int(1), Value::Text("bob".into())]);
        let err = check_before_insert(&catalog, &mut runner, common::TableId(1), &new_row)
            .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn foreign_key_miss_is_rejected_on_insert() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(1, vec![])]),
        };

        let order = Row::new(vec![Value::Int(100), Value::Int(1)]);
        let err =
            check_before_insert(&catalog, &mut runner, common::TableId(2), &order).unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn foreign_key_hit_allows_insert() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(
                1,
                vec![Row::new(vec![Value::Int(1), Value::Text("alice".into())])],
            )]),
        };

        let order = Row::new(vec![Value::Int(100), Value::Int(1)]);
        check_before_insert(&catalog, &mut runner, common::TableId(2), &order).unwrap();
    }

    #[test]
    fn null_foreign_key_column_is_skipped() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(1, vec![])]),
        };

        // orders.user_id is nullable (not also NOT NULL), and there is no
        // row 1 in `users` — if the FK check ran on this NULL value it
        // would fail to find a match. It must be skipped instead.
        let order = Row::new(vec![Value::Int(100), Value::Null]);
        check_before_insert(&catalog, &mut runner, common::TableId(2), &order).unwrap();
    }

    #[test]
    fn restrict_blocks_delete_with_dependents() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(
                2,
                vec![Row::new(vec![Value::Int(100), Value::Int(1)])],
            )]),
        };

        let old_user = Row::new(vec![Value::Int(1), Value::Text("alice".into())]);
        let err = enforce_dependents(
            &catalog,
            &mut runner,
            common::TableId(1),
            &PendingChange::Delete { old_row: &old_user },
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
    }

    #[test]
    fn cascade_propagates_updated_key_to_dependents() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::from_iter([(
                2,
                vec![Row::new(vec![Value::Int(100), Value::Int(1)])],
            )]),
        };

        let old_user = Row::new(vec![Value::Int(1), Value::Text("alice".into())]);
        let new_user = Row::new(vec![Value::Int(2), Value::Text("alice".into())]);
        enforce_dependents(
            &catalog,
            &mut runner,
            common::TableId(1),
            &PendingChange::Update {
                old_row: &old_user,
                new_row: &new_user,
            },
        )
        .unwrap();

        assert_eq!(runner.tables[&2][0].values[1], Value::Int(2));
    }

    #[test]
    fn unrelated_table_with_no_dependents_is_a_no_op() {
        let catalog = two_table_catalog();
        let mut runner = FakeRunner {
            tables: hashbrown::HashMap::new(),
        };
        let old_order = Row::new(vec![Value::Int(1), Value::Int(1)]);
        enforce_dependents(
            &catalog,
            &mut runner,
            common::TableId(2),
            &PendingChange::Delete { old_row: &old_order },
        )
        .unwrap();
    }
}
