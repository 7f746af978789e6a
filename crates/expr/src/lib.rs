//! Expression engine: typed expression trees, evaluation, traversal/rewrite,
//! and the type-coercion rules predicates and arithmetic share.
//!
//! Column references here are still name-based (`Column { table, name }`);
//! the planner resolves them to ordinals (`planner::ResolvedExpr`) once a
//! schema is bound. Keeping name resolution out of this crate lets the same
//! `Expr` tree serve both the parser's output and the planner's rewrite
//! passes (aggregation extraction, subquery planning) before binding.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult, Row};
use std::cmp::Ordering;
use types::{Numeric, SqlType, Value};

/// Arithmetic binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
}

/// Comparison and logical binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Scalar/aggregate function identity. Table functions are an external
/// collaborator (spec.md §1 Non-goals) and are not represented here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AggFunc {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Count | AggFunc::CountStar => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

/// A subquery carried as re-parseable SQL text rather than a parsed
/// `Statement`, so this crate need not depend on `parser` (which itself
/// depends on `expr` for its `Expr` type — a dependency cycle otherwise).
/// `sqlparser`'s AST implements `Display` as valid SQL, so the parser
/// builds this by rendering the nested query back to text; the planner
/// re-parses it via `parser::parse_sql` when it reaches the subquery
/// planning traversal (§4.4).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawQuery(pub String);

/// Expression abstract syntax tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Column reference with optional table/alias qualifier.
    Column {
        table: Option<String>,
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Arith {
        left: Box<Expr>,
        op: ArithOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (list...)`.
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (subquery)`.
    InSubquery {
        expr: Box<Expr>,
        query: RawQuery,
        negated: bool,
    },
    /// `[NOT] EXISTS (subquery)`.
    Exists {
        query: RawQuery,
        negated: bool,
    },
    /// Scalar or aggregate function call. Aggregate extraction (§4.4)
    /// recognizes `func` values in `AggFunc` and rewrites them away before
    /// planning reaches a node that can't evaluate them directly.
    Aggregate {
        func: AggFunc,
        arg: Option<Box<Expr>>,
        distinct: bool,
    },
}

impl Expr {
    /// The printed form used as the synthetic column name aggregation
    /// extraction assigns to an extracted aggregate (e.g. `COUNT(*)`,
    /// `SUM(amount)`).
    pub fn printed_form(&self) -> String {
        match self {
            Expr::Literal(v) => format!("{:?}", v),
            Expr::Column { table: Some(t), name } => format!("{t}.{name}"),
            Expr::Column { table: None, name } => name.clone(),
            Expr::Unary { op, expr } => format!("{}({})", unary_name(*op), expr.printed_form()),
            Expr::Binary { left, op, right } => format!(
                "({} {} {})",
                left.printed_form(),
                binary_symbol(*op),
                right.printed_form()
            ),
            Expr::Arith { left, op, right } => format!(
                "({} {} {})",
                left.printed_form(),
                arith_symbol(*op),
                right.printed_form()
            ),
            Expr::IsNull { expr, negated } => format!(
                "{} IS {}NULL",
                expr.printed_form(),
                if *negated { "NOT " } else { "" }
            ),
            Expr::InList { expr, negated, .. } => {
                format!("{} {}IN (...)", expr.printed_form(), if *negated { "NOT " } else { "" })
            }
            Expr::InSubquery { expr, negated, .. } => {
                format!("{} {}IN (...)", expr.printed_form(), if *negated { "NOT " } else { "" })
            }
            Expr::Exists { negated, .. } => format!("{}EXISTS (...)", if *negated { "NOT " } else { "" }),
            Expr::Aggregate { func, arg: Some(a), distinct } => format!(
                "{}({}{})",
                func.name(),
                if *distinct { "DISTINCT " } else { "" },
                a.printed_form()
            ),
            Expr::Aggregate { func, arg: None, .. } => format!("{}(*)", func.name()),
        }
    }

    /// Enter/leave traversal: visits every node bottom-up, calling `f` on
    /// each and substituting its return value into the parent. Drives both
    /// standard processors (aggregation extraction, subquery planning).
    pub fn traverse<F>(self, f: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        let rewritten = match self {
            Expr::Literal(_) | Expr::Column { .. } => self,
            Expr::Unary { op, expr } => Expr::Unary {
                op,
                expr: Box::new(expr.traverse(f)),
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(left.traverse(f)),
                op,
                right: Box::new(right.traverse(f)),
            },
            Expr::Arith { left, op, right } => Expr::Arith {
                left: Box::new(left.traverse(f)),
                op,
                right: Box::new(right.traverse(f)),
            },
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: Box::new(expr.traverse(f)),
                negated,
            },
            Expr::InList { expr, list, negated } => Expr::InList {
                expr: Box::new(expr.traverse(f)),
                list: list.into_iter().map(|e| e.traverse(f)).collect(),
                negated,
            },
            Expr::InSubquery { expr, query, negated } => Expr::InSubquery {
                expr: Box::new(expr.traverse(f)),
                query,
                negated,
            },
            Expr::Exists { .. } => self,
            Expr::Aggregate { func, arg, distinct } => Expr::Aggregate {
                func,
                arg: arg.map(|a| Box::new(a.traverse(f))),
                distinct,
            },
        };
        f(rewritten)
    }

    /// True if this node or a descendant is an aggregate function call.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => expr.contains_aggregate(),
            Expr::Binary { left, right, .. } | Expr::Arith { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::InList { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate)
            }
            Expr::InSubquery { expr, .. } => expr.contains_aggregate(),
            Expr::Literal(_) | Expr::Column { .. } | Expr::Exists { .. } => false,
        }
    }

    /// True if this node or a descendant is a subquery operator
    /// (`IN (subquery)` or `EXISTS`).
    pub fn contains_subquery(&self) -> bool {
        match self {
            Expr::InSubquery { .. } | Expr::Exists { .. } => true,
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => expr.contains_subquery(),
            Expr::Binary { left, right, .. } | Expr::Arith { left, right, .. } => {
                left.contains_subquery() || right.contains_subquery()
            }
            Expr::InList { expr, list, .. } => {
                expr.contains_subquery() || list.iter().any(Expr::contains_subquery)
            }
            Expr::Aggregate { arg, .. } => arg.as_deref().map(Expr::contains_subquery).unwrap_or(false),
            Expr::Literal(_) | Expr::Column { .. } => false,
        }
    }
}

fn unary_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "NOT ",
        UnaryOp::Negate => "-",
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
    }
}

fn arith_symbol(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Subtract => "-",
        ArithOp::Multiply => "*",
        ArithOp::Divide => "/",
        ArithOp::Remainder => "%",
        ArithOp::Power => "^",
    }
}

/// Validates that an expression tree satisfies the placement rules §4.4
/// lists: `WHERE`/`ON`/`GROUP BY`/`ORDER BY` must contain no aggregates;
/// `GROUP BY`/`ORDER BY` must contain no subqueries. Called by the planner
/// before it builds the corresponding plan node.
pub fn validate_no_aggregates(expr: &Expr, clause: &str) -> DbResult<()> {
    if expr.contains_aggregate() {
        Err(DbError::InvalidSql(format!(
            "aggregate function not allowed in {clause}"
        )))
    } else {
        Ok(())
    }
}

pub fn validate_no_subqueries(expr: &Expr, clause: &str) -> DbResult<()> {
    if expr.contains_subquery() {
        Err(DbError::InvalidSql(format!(
            "subquery not allowed in {clause}"
        )))
    } else {
        Ok(())
    }
}

/// Aggregation extraction (§4.4): walks `expr`, replacing every aggregate
/// function call with a column reference to its printed form, and
/// collecting the extracted calls in the order encountered. Fails with
/// `InvalidSql` on a nested aggregate (an aggregate call appearing inside
/// another aggregate's argument).
pub fn extract_aggregates(expr: Expr) -> DbResult<(Expr, Vec<(String, Expr)>)> {
    fn walk(expr: Expr, out: &mut Vec<(String, Expr)>, depth: u32) -> DbResult<Expr> {
        match expr {
            Expr::Aggregate { func, arg, distinct } => {
                if depth > 0 {
                    return Err(DbError::InvalidSql(
                        "nested aggregate functions are not allowed".into(),
                    ));
                }
                let arg = arg
                    .map(|a| walk(*a, out, depth + 1).map(Box::new))
                    .transpose()?;
                let call = Expr::Aggregate { func, arg, distinct };
                let name = call.printed_form();
                out.push((name.clone(), call));
                Ok(Expr::Column { table: None, name })
            }
            Expr::Unary { op, expr } => Ok(Expr::Unary {
                op,
                expr: Box::new(walk(*expr, out, depth)?),
            }),
            Expr::Binary { left, op, right } => Ok(Expr::Binary {
                left: Box::new(walk(*left, out, depth)?),
                op,
                right: Box::new(walk(*right, out, depth)?),
            }),
            Expr::Arith { left, op, right } => Ok(Expr::Arith {
                left: Box::new(walk(*left, out, depth)?),
                op,
                right: Box::new(walk(*right, out, depth)?),
            }),
            Expr::IsNull { expr, negated } => Ok(Expr::IsNull {
                expr: Box::new(walk(*expr, out, depth)?),
                negated,
            }),
            Expr::InList { expr, list, negated } => Ok(Expr::InList {
                expr: Box::new(walk(*expr, out, depth)?),
                list: list
                    .into_iter()
                    .map(|e| walk(e, out, depth))
                    .collect::<DbResult<Vec<_>>>()?,
                negated,
            }),
            other => Ok(other),
        }
    }

    let mut out = Vec::new();
    let rewritten = walk(expr, &mut out, 0)?;
    Ok((rewritten, out))
}

/// Evaluation context consisting of the row schema (column names in order,
/// possibly `"table.column"` qualified) and an optional parent frame.
/// Environments chain: a child environment first consults its own
/// `(schema, row)` binding and delegates to its parent on a lookup miss —
/// this is the mechanism correlated subqueries use to reach outer columns.
pub struct EvalContext<'a> {
    pub schema: &'a [String],
    pub row: &'a Row,
    pub parent: Option<&'a EvalContext<'a>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(schema: &'a [String], row: &'a Row) -> Self {
        Self {
            schema,
            row,
            parent: None,
        }
    }

    pub fn with_parent(schema: &'a [String], row: &'a Row, parent: &'a EvalContext<'a>) -> Self {
        Self {
            schema,
            row,
            parent: Some(parent),
        }
    }

    /// Evaluate an expression over this environment.
    pub fn eval(&self, expr: &Expr) -> DbResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column { table, name } => self.lookup(table.as_deref(), name),
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                eval_unary(*op, v)
            }
            Expr::Binary { left, op, right } => {
                let lv = self.eval(left)?;
                let rv = self.eval(right)?;
                eval_binary(&lv, *op, &rv)
            }
            Expr::Arith { left, op, right } => {
                let lv = self.eval(left)?;
                let rv = self.eval(right)?;
                eval_arith(&lv, *op, &rv)
            }
            Expr::IsNull { expr, negated } => {
                let v = self.eval(expr)?;
                Ok(Value::Bool(v.is_null() != *negated))
            }
            Expr::InList { expr, list, negated } => {
                let v = self.eval(expr)?;
                let mut values = Vec::with_capacity(list.len());
                for item in list {
                    values.push(self.eval(item)?);
                }
                eval_in_list(&v, &values, *negated)
            }
            Expr::InSubquery { .. } | Expr::Exists { .. } => Err(DbError::Expression(
                "subquery operators must be planned before evaluation".into(),
            )),
            Expr::Aggregate { .. } => Err(DbError::Expression(
                "aggregate function must be extracted before evaluation".into(),
            )),
        }
    }

    fn lookup(&self, table: Option<&str>, name: &str) -> DbResult<Value> {
        if let Some(idx) = find_column(self.schema, table, name) {
            return Ok(self.row.values[idx].clone());
        }
        if let Some(parent) = self.parent {
            return parent.lookup(table, name);
        }
        match table {
            Some(t) => Err(DbError::Expression(format!("unknown column '{t}.{name}'"))),
            None => Err(DbError::Expression(format!("unknown column '{name}'"))),
        }
    }
}

/// Find column index in schema, supporting qualified and unqualified
/// references. Schema entries may be simple (`"id"`) or qualified
/// (`"users.id"`).
pub fn find_column(schema: &[String], table: Option<&str>, name: &str) -> Option<usize> {
    if let Some(qualifier) = table {
        let full_name = format!("{qualifier}.{name}");
        schema.iter().position(|c| c.eq_ignore_ascii_case(&full_name))
    } else {
        schema.iter().position(|c| {
            c.eq_ignore_ascii_case(name)
                || c.to_lowercase().ends_with(&format!(".{}", name.to_lowercase()))
        })
    }
}

pub fn eval_unary(op: UnaryOp, v: Value) -> DbResult<Value> {
    match (op, &v) {
        (UnaryOp::Not, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, _) => {
            let b = v
                .as_bool()
                .ok_or_else(|| DbError::Expression(format!("NOT expects bool, got {:?}", v)))?;
            Ok(Value::Bool(!b))
        }
        (UnaryOp::Negate, Value::Null) => Ok(Value::Null),
        (UnaryOp::Negate, _) => {
            let n = v
                .as_numeric()
                .ok_or_else(|| DbError::Expression(format!("unary - expects a number, got {:?}", v)))?;
            Ok(numeric_to_value(n.mul(Numeric::from_i64(-1)), v.sql_type()))
        }
    }
}

pub fn eval_binary(l: &Value, op: BinaryOp, r: &Value) -> DbResult<Value> {
    use BinaryOp::*;

    if matches!(op, And | Or) {
        return eval_logical(l, op, r);
    }

    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    let ord = same_family_cmp(l, r)?;

    let result = match op {
        Eq => ord == Ordering::Equal,
        Ne => ord != Ordering::Equal,
        Lt => ord == Ordering::Less,
        Le => ord != Ordering::Greater,
        Gt => ord == Ordering::Greater,
        Ge => ord != Ordering::Less,
        And | Or => unreachable!("handled above"),
    };
    Ok(Value::Bool(result))
}

/// SQL three-valued logic: `NULL AND false == false`, `NULL OR true ==
/// true`, otherwise unknown operands propagate NULL.
fn eval_logical(l: &Value, op: BinaryOp, r: &Value) -> DbResult<Value> {
    let lb = truthy(l)?;
    let rb = truthy(r)?;
    Ok(match op {
        BinaryOp::And => match (lb, rb) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        BinaryOp::Or => match (lb, rb) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        },
        _ => unreachable!(),
    })
}

fn truthy(v: &Value) -> DbResult<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(DbError::Expression(format!(
            "AND/OR expects bools, got {:?}",
            other
        ))),
    }
}

/// Same-family comparison used by comparison operators: numeric-vs-numeric
/// widens per the promotion rule; string-vs-string and boolean-vs-boolean
/// compare directly; anything else (including cross-family pairs) is a
/// cast error.
pub fn same_family_cmp(l: &Value, r: &Value) -> DbResult<Ordering> {
    l.cmp_same_type(r).ok_or_else(|| {
        DbError::Expression(format!(
            "cannot compare incompatible types: {:?} and {:?}",
            l, r
        ))
    })
}

/// `IN` semantics (§4.4): NULL propagates unless a non-null match proves
/// true first; returns false only when every comparand is non-null and
/// none matched.
pub fn eval_in_list(needle: &Value, haystack: &[Value], negated: bool) -> DbResult<Value> {
    if needle.is_null() {
        return Ok(Value::Null);
    }
    let mut saw_null = false;
    for candidate in haystack {
        if candidate.is_null() {
            saw_null = true;
            continue;
        }
        match same_family_cmp(needle, candidate) {
            Ok(Ordering::Equal) => return Ok(Value::Bool(!negated)),
            Ok(_) => continue,
            Err(e) => return Err(e),
        }
    }
    if saw_null {
        Ok(Value::Null)
    } else {
        Ok(Value::Bool(negated))
    }
}

/// Arithmetic type promotion (§4.4): widen both operands to the wider
/// numeric type per `NUMERIC > DOUBLE > FLOAT > BIGINT > INTEGER >
/// SMALLINT > TINYINT`, or dispatch to temporal arithmetic when either
/// side is a date/time/interval value.
pub fn eval_arith(l: &Value, op: ArithOp, r: &Value) -> DbResult<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    if let Some(result) = try_temporal_arith(l, op, r)? {
        return Ok(result);
    }

    let (ln, rn) = (
        l.as_numeric()
            .ok_or_else(|| DbError::Expression(format!("not a number: {:?}", l)))?,
        r.as_numeric()
            .ok_or_else(|| DbError::Expression(format!("not a number: {:?}", r)))?,
    );
    let result_type = l
        .sql_type()
        .widen(r.sql_type())
        .ok_or_else(|| DbError::Expression("arithmetic requires numeric operands".into()))?;

    let value = match op {
        ArithOp::Add => ln.add(rn),
        ArithOp::Subtract => ln.sub(rn),
        ArithOp::Multiply => ln.mul(rn),
        ArithOp::Divide => ln
            .div(rn)
            .ok_or_else(|| DbError::Expression("division by zero".into()))?,
        ArithOp::Remainder => ln
            .rem(rn)
            .ok_or_else(|| DbError::Expression("division by zero".into()))?,
        ArithOp::Power => {
            if ln.to_f64() == 0.0 && rn.to_f64() == 0.0 {
                return Err(DbError::Expression("0 ^ 0 is undefined".into()));
            }
            Numeric::from_f64_lossy(ln.to_f64().powf(rn.to_f64()))
        }
    };

    // DIVIDE/REMAINDER/POWER always widen through DOUBLE-equivalent
    // arithmetic internally; report the result under the promoted type
    // except when that would misrepresent an exact integer division.
    let reported_type = match op {
        ArithOp::Divide | ArithOp::Power => {
            if result_type.is_numeric() && result_type != SqlType::Float && result_type != SqlType::Double {
                SqlType::Double
            } else {
                result_type
            }
        }
        _ => result_type,
    };

    Ok(numeric_to_value(value, reported_type))
}

fn numeric_to_value(n: Numeric, ty: SqlType) -> Value {
    match ty {
        SqlType::TinyInt => Value::TinyInt(n.to_f64() as i8),
        SqlType::SmallInt => Value::SmallInt(n.to_f64() as i16),
        SqlType::Int => Value::Int(n.to_f64() as i64),
        SqlType::BigInt => Value::BigInt(n.to_f64() as i64),
        SqlType::Float => Value::Float(n.to_f64() as f32),
        SqlType::Double => Value::Double(n.to_f64()),
        _ => Value::Numeric(n),
    }
}

/// Temporal arithmetic: `date - date -> period` (represented as a day-count
/// `Interval`), `time - time` / `datetime - datetime -> duration`,
/// `temporal +/- interval -> temporal` (commutative only for ADD).
fn try_temporal_arith(l: &Value, op: ArithOp, r: &Value) -> DbResult<Option<Value>> {
    use types::{add_interval_to_date, add_interval_to_datetime, Interval};

    let result = match (l, op, r) {
        (Value::Date(a), ArithOp::Subtract, Value::Date(b)) => {
            Some(Value::Interval(Interval::micros((*a - *b).num_microseconds().unwrap_or(0))))
        }
        (Value::Time(a), ArithOp::Subtract, Value::Time(b)) => Some(Value::Interval(Interval::micros(
            (*a - *b).num_microseconds().unwrap_or(0),
        ))),
        (Value::DateTime(a), ArithOp::Subtract, Value::DateTime(b))
        | (Value::Timestamp(a), ArithOp::Subtract, Value::Timestamp(b)) => Some(Value::Interval(
            Interval::micros((*a - *b).num_microseconds().unwrap_or(0)),
        )),
        (Value::Date(d), ArithOp::Add, Value::Interval(iv))
        | (Value::Interval(iv), ArithOp::Add, Value::Date(d)) => {
            Some(Value::Date(add_interval_to_date(*d, *iv).ok_or_else(|| {
                DbError::Expression("date arithmetic out of range".into())
            })?))
        }
        (Value::Date(d), ArithOp::Subtract, Value::Interval(iv)) => Some(Value::Date(
            add_interval_to_date(*d, iv.negate())
                .ok_or_else(|| DbError::Expression("date arithmetic out of range".into()))?,
        )),
        (Value::DateTime(d), ArithOp::Add, Value::Interval(iv))
        | (Value::Interval(iv), ArithOp::Add, Value::DateTime(d)) => Some(Value::DateTime(
            add_interval_to_datetime(*d, *iv)
                .ok_or_else(|| DbError::Expression("datetime arithmetic out of range".into()))?,
        )),
        (Value::DateTime(d), ArithOp::Subtract, Value::Interval(iv)) => Some(Value::DateTime(
            add_interval_to_datetime(*d, iv.negate())
                .ok_or_else(|| DbError::Expression("datetime arithmetic out of range".into()))?,
        )),
        _ => None,
    };
    Ok(result)
}
