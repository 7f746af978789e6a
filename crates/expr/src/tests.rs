use super::*;
use types::Value::*;

fn schema(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|s| s.to_string()).collect()
}

fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        name: name.to_string(),
    }
}

#[test]
fn eval_literals_and_columns() {
    let row = Row::new(vec![Int(1), Text("Will".into()), Bool(true)]);
    let schema = schema(&["id", "name", "active"]);
    let ctx = EvalContext::new(&schema, &row);

    assert_eq!(ctx.eval(&Expr::Literal(Int(42))).unwrap(), Int(42));
    assert_eq!(ctx.eval(&col("name")).unwrap(), Text("Will".into()));
}

#[test]
fn eval_qualified_column() {
    let row = Row::new(vec![Int(7)]);
    let schema = schema(&["users.id"]);
    let ctx = EvalContext::new(&schema, &row);

    let qualified = Expr::Column {
        table: Some("users".into()),
        name: "id".into(),
    };
    assert_eq!(ctx.eval(&qualified).unwrap(), Int(7));
    // Unqualified lookup still finds it via the suffix match.
    assert_eq!(ctx.eval(&col("id")).unwrap(), Int(7));
}

#[test]
fn eval_comparisons() {
    let row = Row::new(vec![Int(10), Int(20)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let lt = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Lt,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&lt).unwrap(), Bool(true));
}

#[test]
fn eval_cross_numeric_family_comparison() {
    let row = Row::new(vec![Int(10), BigInt(10)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let eq = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Eq,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&eq).unwrap(), Bool(true));
}

#[test]
fn eval_logical_ops() {
    let row = Row::new(vec![Bool(true), Bool(false)]);
    let schema = schema(&["x", "y"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Binary {
        left: Box::new(col("x")),
        op: BinaryOp::And,
        right: Box::new(col("y")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Bool(false));
}

#[test]
fn three_valued_and_or() {
    let row = Row::new(vec![Null, Bool(false), Bool(true)]);
    let schema = schema(&["n", "f", "t"]);
    let ctx = EvalContext::new(&schema, &row);

    // NULL AND false == false
    let and_false = Expr::Binary {
        left: Box::new(col("n")),
        op: BinaryOp::And,
        right: Box::new(col("f")),
    };
    assert_eq!(ctx.eval(&and_false).unwrap(), Bool(false));

    // NULL OR true == true
    let or_true = Expr::Binary {
        left: Box::new(col("n")),
        op: BinaryOp::Or,
        right: Box::new(col("t")),
    };
    assert_eq!(ctx.eval(&or_true).unwrap(), Bool(true));

    // NULL AND true == NULL
    let and_true = Expr::Binary {
        left: Box::new(col("n")),
        op: BinaryOp::And,
        right: Box::new(col("t")),
    };
    assert_eq!(ctx.eval(&and_true).unwrap(), Null);
}

#[test]
fn not_operator() {
    let row = Row::new(vec![Bool(false)]);
    let schema = schema(&["f"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Unary {
        op: UnaryOp::Not,
        expr: Box::new(col("f")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Bool(true));
}

#[test]
fn negate_operator() {
    let row = Row::new(vec![Int(5)]);
    let schema = schema(&["n"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Unary {
        op: UnaryOp::Negate,
        expr: Box::new(col("n")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Int(-5));
}

#[test]
fn mismatched_types_fail() {
    let row = Row::new(vec![Int(1), Text("hi".into())]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Binary {
        left: Box::new(col("a")),
        op: BinaryOp::Eq,
        right: Box::new(col("b")),
    };

    let err = ctx.eval(&expr).unwrap_err();
    assert!(format!("{err:?}").contains("incompatible types"));
}

#[test]
fn arithmetic_add_with_promotion() {
    let row = Row::new(vec![Int(2), BigInt(3)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Arith {
        left: Box::new(col("a")),
        op: ArithOp::Add,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), BigInt(5));
}

#[test]
fn arithmetic_on_null_is_null() {
    let row = Row::new(vec![Null, Int(3)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Arith {
        left: Box::new(col("a")),
        op: ArithOp::Add,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Null);
}

#[test]
fn divide_by_zero_errors() {
    let row = Row::new(vec![Int(10), Int(0)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Arith {
        left: Box::new(col("a")),
        op: ArithOp::Divide,
        right: Box::new(col("b")),
    };
    let err = ctx.eval(&expr).unwrap_err();
    assert!(format!("{err:?}").contains("division by zero"));
}

#[test]
fn power_operator() {
    let row = Row::new(vec![Int(2), Int(10)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Arith {
        left: Box::new(col("a")),
        op: ArithOp::Power,
        right: Box::new(col("b")),
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Double(1024.0));
}

#[test]
fn zero_to_the_zero_errors() {
    let row = Row::new(vec![Int(0), Int(0)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Arith {
        left: Box::new(col("a")),
        op: ArithOp::Power,
        right: Box::new(col("b")),
    };
    assert!(ctx.eval(&expr).is_err());
}

#[test]
fn is_null_predicate() {
    let row = Row::new(vec![Null, Int(1)]);
    let schema = schema(&["a", "b"]);
    let ctx = EvalContext::new(&schema, &row);

    let is_null = Expr::IsNull {
        expr: Box::new(col("a")),
        negated: false,
    };
    assert_eq!(ctx.eval(&is_null).unwrap(), Bool(true));

    let is_not_null = Expr::IsNull {
        expr: Box::new(col("b")),
        negated: true,
    };
    assert_eq!(ctx.eval(&is_not_null).unwrap(), Bool(true));
}

#[test]
fn in_list_matches() {
    let row = Row::new(vec![Int(2)]);
    let schema = schema(&["a"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::InList {
        expr: Box::new(col("a")),
        list: vec![Expr::Literal(Int(1)), Expr::Literal(Int(2)), Expr::Literal(Int(3))],
        negated: false,
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Bool(true));
}

#[test]
fn in_list_with_null_and_no_match_is_null() {
    let row = Row::new(vec![Int(5)]);
    let schema = schema(&["a"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::InList {
        expr: Box::new(col("a")),
        list: vec![Expr::Literal(Int(1)), Expr::Literal(Null)],
        negated: false,
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Null);
}

#[test]
fn in_list_null_needle_is_null() {
    let row = Row::new(vec![Null]);
    let schema = schema(&["a"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::InList {
        expr: Box::new(col("a")),
        list: vec![Expr::Literal(Int(1))],
        negated: false,
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Null);
}

#[test]
fn not_in_list() {
    let row = Row::new(vec![Int(9)]);
    let schema = schema(&["a"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::InList {
        expr: Box::new(col("a")),
        list: vec![Expr::Literal(Int(1)), Expr::Literal(Int(2))],
        negated: true,
    };
    assert_eq!(ctx.eval(&expr).unwrap(), Bool(true));
}

#[test]
fn correlated_lookup_falls_back_to_parent_environment() {
    let outer_row = Row::new(vec![Int(42)]);
    let outer_schema = schema(&["outer_id"]);
    let outer_ctx = EvalContext::new(&outer_schema, &outer_row);

    let inner_row = Row::new(vec![Text("x".into())]);
    let inner_schema = schema(&["name"]);
    let inner_ctx = EvalContext::with_parent(&inner_schema, &inner_row, &outer_ctx);

    assert_eq!(inner_ctx.eval(&col("outer_id")).unwrap(), Int(42));
    assert_eq!(inner_ctx.eval(&col("name")).unwrap(), Text("x".into()));
}

#[test]
fn aggregate_cannot_be_evaluated_directly() {
    let row = Row::new(vec![Int(1)]);
    let schema = schema(&["a"]);
    let ctx = EvalContext::new(&schema, &row);

    let expr = Expr::Aggregate {
        func: AggFunc::CountStar,
        arg: None,
        distinct: false,
    };
    assert!(ctx.eval(&expr).is_err());
}

#[test]
fn extract_aggregates_rewrites_to_column_reference() {
    let expr = Expr::Binary {
        left: Box::new(Expr::Aggregate {
            func: AggFunc::Sum,
            arg: Some(Box::new(col("amount"))),
            distinct: false,
        }),
        op: BinaryOp::Gt,
        right: Box::new(Expr::Literal(Int(100))),
    };

    let (rewritten, extracted) = extract_aggregates(expr).unwrap();
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].0, "SUM(amount)");
    match rewritten {
        Expr::Binary { left, .. } => {
            assert_eq!(*left, col("SUM(amount)"));
        }
        other => panic!("unexpected rewrite: {other:?}"),
    }
}

#[test]
fn extract_aggregates_rejects_nesting() {
    let nested = Expr::Aggregate {
        func: AggFunc::Sum,
        arg: Some(Box::new(Expr::Aggregate {
            func: AggFunc::Count,
            arg: Some(Box::new(col("x"))),
            distinct: false,
        })),
        distinct: false,
    };
    assert!(extract_aggregates(nested).is_err());
}

#[test]
fn validate_no_aggregates_rejects_in_where_clause() {
    let expr = Expr::Aggregate {
        func: AggFunc::CountStar,
        arg: None,
        distinct: false,
    };
    assert!(validate_no_aggregates(&expr, "WHERE").is_err());
    assert!(validate_no_aggregates(&col("a"), "WHERE").is_ok());
}

#[test]
fn validate_no_subqueries_rejects_in_group_by() {
    let expr = Expr::Exists {
        query: RawQuery("SELECT 1".into()),
        negated: false,
    };
    assert!(validate_no_subqueries(&expr, "GROUP BY").is_err());
}

#[test]
fn printed_form_for_aggregate() {
    let expr = Expr::Aggregate {
        func: AggFunc::CountStar,
        arg: None,
        distinct: false,
    };
    assert_eq!(expr.printed_form(), "COUNT(*)");
}
