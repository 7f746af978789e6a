use super::*;
use expr::{AggFunc, ArithOp, BinaryOp};

#[test]
fn parse_basic_statements() {
    let sql = r#"
        CREATE TABLE users (id INT, name TEXT, age INT);
        INSERT INTO users VALUES (1, 'Will', 27);
        SELECT id, name FROM users WHERE age > 20;
    "#;

    let stmts = parse_sql(sql).expect("parser should succeed");
    assert_eq!(stmts.len(), 3);

    match &stmts[0] {
        Statement::CreateTable { name, columns, .. } => {
            assert_eq!(name, "users");
            assert_eq!(columns.len(), 3);
            assert_eq!(columns[1].name, "name");
            assert_eq!(columns[1].ty, "TEXT");
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }

    match &stmts[1] {
        Statement::Insert { table, values } => {
            assert_eq!(table, "users");
            assert_eq!(values.len(), 3);
        }
        other => panic!("expected Insert, got {other:?}"),
    }

    match &stmts[2] {
        Statement::Select {
            from,
            selection,
            columns,
            ..
        } => {
            assert_eq!(from.name, "users");
            assert_eq!(columns.len(), 2);
            let selection = selection.as_ref().expect("WHERE clause required");
            let display = format!("{selection:?}");
            assert!(display.contains("age"));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_primary_key_inline() {
    let sql = "CREATE TABLE t (id INT PRIMARY KEY, name TEXT);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable { primary_key, .. } => {
            assert_eq!(primary_key.as_deref(), Some(&["id".to_string()][..]));
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_arithmetic_expression() {
    let sql = "SELECT price * quantity FROM orders WHERE price + 1 > 10;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { columns, selection, .. } => {
            match &columns[0] {
                SelectItem::Expr { expr: Expr::Arith { op, .. }, .. } => {
                    assert_eq!(*op, ArithOp::Multiply);
                }
                other => panic!("expected arithmetic select item, got {other:?}"),
            }
            let selection = selection.as_ref().unwrap();
            match selection {
                Expr::Binary { left, op, .. } => {
                    assert_eq!(*op, BinaryOp::Gt);
                    assert!(matches!(**left, Expr::Arith { op: ArithOp::Add, .. }));
                }
                other => panic!("expected binary predicate, got {other:?}"),
            }
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_inner_join() {
    let sql = "SELECT u.id, o.total FROM users u JOIN orders o ON u.id = o.user_id;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { from, joins, .. } => {
            assert_eq!(from.name, "users");
            assert_eq!(from.alias.as_deref(), Some("u"));
            assert_eq!(joins.len(), 1);
            assert_eq!(joins[0].kind, JoinType::Inner);
            assert_eq!(joins[0].right.name, "orders");
            assert_eq!(joins[0].right.alias.as_deref(), Some("o"));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_left_join() {
    let sql = "SELECT * FROM a LEFT JOIN b ON a.id = b.a_id;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { joins, .. } => {
            assert_eq!(joins[0].kind, JoinType::Left);
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_group_by_having_and_aggregate() {
    let sql = "SELECT department, COUNT(*) FROM employees GROUP BY department HAVING COUNT(*) > 1;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select {
            columns,
            group_by,
            having,
            ..
        } => {
            assert_eq!(group_by.len(), 1);
            assert!(having.is_some());
            match &columns[1] {
                SelectItem::Expr {
                    expr: Expr::Aggregate { func, arg, .. },
                    ..
                } => {
                    assert_eq!(*func, AggFunc::CountStar);
                    assert!(arg.is_none());
                }
                other => panic!("expected aggregate select item, got {other:?}"),
            }
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_select_alias() {
    let sql = "SELECT age AS the_age FROM users;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { columns, .. } => match &columns[0] {
            SelectItem::Expr { alias, .. } => {
                assert_eq!(alias.as_deref(), Some("the_age"));
            }
            other => panic!("expected aliased expr, got {other:?}"),
        },
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_order_by_limit_offset() {
    let sql = "SELECT id FROM users ORDER BY id DESC LIMIT 10 OFFSET 5;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select {
            order_by,
            limit,
            offset,
            ..
        } => {
            assert_eq!(order_by.len(), 1);
            assert_eq!(order_by[0].direction, SortDirection::Desc);
            assert_eq!(*limit, Some(10));
            assert_eq!(*offset, Some(5));
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_in_list_and_is_null() {
    let sql = "SELECT id FROM users WHERE status IN ('a', 'b') AND deleted_at IS NULL;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { selection, .. } => {
            let selection = selection.as_ref().unwrap();
            match selection {
                Expr::Binary { left, right, op } => {
                    assert_eq!(*op, BinaryOp::And);
                    assert!(matches!(**left, Expr::InList { .. }));
                    assert!(matches!(**right, Expr::IsNull { negated: false, .. }));
                }
                other => panic!("expected AND predicate, got {other:?}"),
            }
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_exists_subquery() {
    let sql = "SELECT id FROM users WHERE EXISTS (SELECT 1 FROM orders WHERE orders.user_id = users.id);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Select { selection, .. } => {
            let selection = selection.as_ref().unwrap();
            match selection {
                Expr::Exists { query, negated } => {
                    assert!(!negated);
                    assert!(query.0.to_uppercase().contains("SELECT"));
                }
                other => panic!("expected EXISTS, got {other:?}"),
            }
        }
        other => panic!("expected Select, got {other:?}"),
    }
}

#[test]
fn parse_explain() {
    let sql = "EXPLAIN SELECT id FROM users;";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::Explain { analyze, .. } => assert!(!analyze),
        other => panic!("expected Explain, got {other:?}"),
    }
}

#[test]
fn parse_not_null_and_unique_columns() {
    let sql = "CREATE TABLE users (id INT PRIMARY KEY, email TEXT NOT NULL UNIQUE);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable {
            columns,
            unique_keys,
            ..
        } => {
            assert!(columns[1].not_null);
            assert!(columns[1].unique);
            assert_eq!(unique_keys, &vec![vec!["email".to_string()]]);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_inline_foreign_key() {
    let sql = "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users(id) ON DELETE CASCADE);";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable { foreign_keys, .. } => {
            assert_eq!(foreign_keys.len(), 1);
            assert_eq!(foreign_keys[0].columns, vec!["user_id".to_string()]);
            assert_eq!(foreign_keys[0].ref_table, "users");
            assert_eq!(foreign_keys[0].on_delete, FkAction::Cascade);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_table_level_foreign_key() {
    let sql = "CREATE TABLE orders (id INT PRIMARY KEY, user_id INT, FOREIGN KEY (user_id) REFERENCES users (id));";
    let stmts = parse_sql(sql).unwrap();
    match &stmts[0] {
        Statement::CreateTable { foreign_keys, .. } => {
            assert_eq!(foreign_keys.len(), 1);
            assert_eq!(foreign_keys[0].on_delete, FkAction::Restrict);
        }
        other => panic!("expected CreateTable, got {other:?}"),
    }
}

#[test]
fn parse_analyze_verify_set() {
    assert!(matches!(
        parse_sql("ANALYZE users;").unwrap()[0],
        Statement::Analyze { table: Some(ref t) } if t == "users"
    ));
    assert!(matches!(
        parse_sql("ANALYZE;").unwrap()[0],
        Statement::Analyze { table: None }
    ));
    assert!(matches!(
        parse_sql("VERIFY TABLE users;").unwrap()[0],
        Statement::Verify { table: Some(ref t) } if t == "users"
    ));
    match &parse_sql("SET page_size = 8192;").unwrap()[0] {
        Statement::Set { property, value } => {
            assert_eq!(property, "page_size");
            assert_eq!(value, "8192");
        }
        other => panic!("expected Set, got {other:?}"),
    }
}

#[test]
fn parse_dump_table() {
    let stmts = parse_sql("DUMP TABLE users;").unwrap();
    match &stmts[0] {
        Statement::Dump { kind, name } => {
            assert_eq!(*kind, DumpKind::Table);
            assert_eq!(name, "users");
        }
        other => panic!("expected Dump, got {other:?}"),
    }
}
