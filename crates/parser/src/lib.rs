mod ast;
#[cfg(test)]
mod tests;

pub use ast::*;

use common::{DbError, DbResult};
use expr::{AggFunc, ArithOp, BinaryOp, Expr, RawQuery, UnaryOp};
use sqlparser::ast as sqlast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;
use types::Value;

/// Parse SQL text into the internal AST statements.
///
/// `ANALYZE`/`VERIFY`/`DUMP`/`SET` (spec.md §6's UTILITY commands) aren't
/// part of `sqlparser`'s grammar, so a single-statement input matching one
/// of those keywords is recognized here before falling through to
/// `sqlparser` for the standard DDL/DML/SELECT fragment.
pub fn parse_sql(sql: &str) -> DbResult<Vec<Statement>> {
    if let Some(stmt) = try_parse_utility(sql)? {
        return Ok(vec![stmt]);
    }

    let dialect = GenericDialect {};
    let stmts = SqlParser::parse_sql(&dialect, sql)
        .map_err(|e| DbError::Parser(format!("SQL parse error: {e}")))?;

    stmts.into_iter().map(map_statement).collect()
}

/// Recognizes the non-standard UTILITY command grammar by keyword prefix.
/// Returns `Ok(None)` for anything else, letting the caller fall back to
/// `sqlparser`.
fn try_parse_utility(sql: &str) -> DbResult<Option<Statement>> {
    let trimmed = sql.trim().trim_end_matches(';').trim();

    if let Some(rest) = strip_keyword(trimmed, "ANALYZE") {
        let table = optional_ident(rest)?;
        return Ok(Some(Statement::Analyze { table }));
    }
    if let Some(rest) = strip_keyword(trimmed, "VERIFY") {
        let rest = strip_keyword(rest, "TABLE").unwrap_or(rest);
        let table = optional_ident(rest)?;
        return Ok(Some(Statement::Verify { table }));
    }
    if let Some(rest) = strip_keyword(trimmed, "DUMP") {
        if let Some(name_part) = strip_keyword(rest, "TABLE") {
            let name = required_ident(name_part, "DUMP TABLE")?;
            return Ok(Some(Statement::Dump {
                kind: DumpKind::Table,
                name,
            }));
        }
        if let Some(name_part) = strip_keyword(rest, "INDEX") {
            let name = required_ident(name_part, "DUMP INDEX")?;
            return Ok(Some(Statement::Dump {
                kind: DumpKind::Index,
                name,
            }));
        }
        return Err(DbError::Parser(
            "DUMP requires TABLE or INDEX".to_string(),
        ));
    }
    if let Some(rest) = strip_keyword(trimmed, "SET") {
        let (property, value) = rest
            .split_once('=')
            .ok_or_else(|| DbError::Parser("SET requires 'property = value'".to_string()))?;
        let property = property.trim().to_string();
        if property.is_empty() {
            return Err(DbError::Parser("SET requires a property name".to_string()));
        }
        let value = value.trim().trim_matches('\'').trim_matches('"').to_string();
        return Ok(Some(Statement::Set { property, value }));
    }

    Ok(None)
}

/// Strips a case-insensitive leading keyword, requiring it end at a word
/// boundary so `ANALYZETABLE` doesn't match `ANALYZE`.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let input_trimmed = input.trim_start();
    if input_trimmed.len() < keyword.len() {
        return None;
    }
    let (head, tail) = input_trimmed.split_at(keyword.len());
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    if tail.chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(tail.trim())
}

fn optional_ident(rest: &str) -> DbResult<Option<String>> {
    let rest = rest.trim();
    if rest.is_empty() {
        Ok(None)
    } else {
        Ok(Some(validate_plain_ident(rest)?))
    }
}

fn required_ident(rest: &str, context: &str) -> DbResult<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(DbError::Parser(format!("{context} requires a name")));
    }
    validate_plain_ident(rest)
}

fn validate_plain_ident(rest: &str) -> DbResult<String> {
    if rest
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_')
    {
        Ok(rest.to_lowercase())
    } else {
        Err(DbError::Parser(format!("invalid identifier '{rest}'")))
    }
}

fn map_statement(stmt: sqlast::Statement) -> DbResult<Statement> {
    use sqlast::Statement as SqlStatement;

    match stmt {
        SqlStatement::CreateTable {
            name,
            columns,
            constraints,
            ..
        } => {
            let table = normalize_object_name(&name)?;
            let primary_key = resolve_primary_key(&columns, &constraints)?;
            let mut unique_keys = extract_table_unique_keys(&constraints)?;
            let mut foreign_keys = extract_table_foreign_keys(&constraints)?;

            let mapped_columns = columns
                .into_iter()
                .map(map_column_def)
                .collect::<DbResult<Vec<_>>>()?;

            // Inline single-column UNIQUE constraints fold into the same
            // table-level list the DDL layer consumes, so `add_unique_key`
            // doesn't need to special-case column-level syntax.
            for col in &mapped_columns {
                if col.unique {
                    unique_keys.push(vec![col.name.clone()]);
                }
            }
            // Inline `REFERENCES` similarly folds into the table-level FK list.
            for col in &mapped_columns {
                if let Some(fk) = &col.references {
                    foreign_keys.push(TableForeignKey {
                        columns: vec![col.name.clone()],
                        ref_table: fk.table.clone(),
                        ref_columns: fk.columns.clone(),
                        on_delete: fk.on_delete,
                        on_update: fk.on_update,
                    });
                }
            }

            Ok(Statement::CreateTable {
                name: table,
                columns: mapped_columns,
                primary_key,
                unique_keys,
                foreign_keys,
            })
        }
        SqlStatement::Drop {
            object_type, names, ..
        } => match object_type {
            sqlast::ObjectType::Table => Ok(Statement::DropTable {
                name: first_name(names)?,
            }),
            sqlast::ObjectType::Index => Ok(Statement::DropIndex {
                name: first_name(names)?,
            }),
            _ => Err(DbError::Parser(format!(
                "unsupported DROP type: {object_type:?}"
            ))),
        },
        SqlStatement::CreateIndex {
            name,
            table_name,
            columns,
            ..
        } => {
            let index_name = name
                .ok_or_else(|| DbError::Parser("index name required".into()))
                .map(|n| normalize_object_name(&n))??;
            let table = normalize_object_name(&table_name)?;
            let column = map_index_column(columns.first())?;
            Ok(Statement::CreateIndex {
                name: index_name,
                table,
                column,
            })
        }
        SqlStatement::Insert {
            table_name, source, ..
        } => {
            let table = normalize_object_name(&table_name)?;
            let source = source.ok_or_else(|| DbError::Parser("INSERT source missing".into()))?;
            let values = extract_values(*source)?;
            Ok(Statement::Insert { table, values })
        }
        SqlStatement::Query(query) => map_select(*query),
        SqlStatement::Update {
            table,
            assignments,
            selection,
            ..
        } => {
            let table = table_name_from_with_joins(&table)?;
            let assignments = assignments
                .into_iter()
                .map(|assign| {
                    let ident = assign
                        .id
                        .last()
                        .ok_or_else(|| DbError::Parser("invalid assignment target".into()))?;
                    Ok((normalize_ident(ident), map_expr(assign.value)?))
                })
                .collect::<DbResult<Vec<_>>>()?;
            let selection = selection.map(map_expr).transpose()?;
            Ok(Statement::Update {
                table,
                assignments,
                selection,
            })
        }
        SqlStatement::Delete {
            from, selection, ..
        } => {
            if from.is_empty() {
                return Err(DbError::Parser("DELETE requires FROM source".into()));
            }
            let table = table_name_from_with_joins(&from[0])?;
            if from.len() > 1 {
                return Err(DbError::Parser("multi-table DELETE not supported".into()));
            }
            let selection = selection.map(map_expr).transpose()?;
            Ok(Statement::Delete { table, selection })
        }
        SqlStatement::Explain {
            statement, analyze, ..
        } => {
            let query = Box::new(map_statement(*statement)?);
            Ok(Statement::Explain { query, analyze })
        }
        _ => Err(DbError::Parser("unsupported statement".into())),
    }
}

fn map_select(query: sqlast::Query) -> DbResult<Statement> {
    use sqlast::SetExpr;

    let select = match *query.body {
        SetExpr::Select(select) => select,
        SetExpr::Values(_) => {
            return Err(DbError::Parser("standalone VALUES not supported".into()))
        }
        _ => return Err(DbError::Parser("SET operations not supported".into())),
    };

    let sqlast::Select {
        projection,
        from,
        selection,
        group_by,
        having,
        ..
    } = *select;

    if from.is_empty() {
        return Err(DbError::Parser("SELECT requires FROM clause".into()));
    }
    if from.len() > 1 {
        return Err(DbError::Parser(
            "comma-separated FROM list not supported; use JOIN".into(),
        ));
    }
    let (base, joins) = map_table_with_joins(&from[0])?;

    let columns = projection
        .into_iter()
        .map(map_select_item)
        .collect::<DbResult<Vec<_>>>()?;
    let selection = selection.map(map_expr).transpose()?;

    let group_by = match group_by {
        sqlast::GroupByExpr::Expressions(exprs, ..) => {
            exprs.into_iter().map(map_expr).collect::<DbResult<Vec<_>>>()?
        }
        _ => Vec::new(),
    };
    let having = having.map(map_expr).transpose()?;

    let order_by = query
        .order_by
        .into_iter()
        .map(map_order_by_expr)
        .collect::<DbResult<Vec<_>>>()?;

    let limit = query
        .limit
        .map(|expr| match expr {
            sqlast::Expr::Value(sqlast::Value::Number(n, _)) => n
                .parse::<u64>()
                .map_err(|_| DbError::Parser(format!("invalid LIMIT value: {}", n))),
            _ => Err(DbError::Parser(
                "LIMIT must be a non-negative integer".into(),
            )),
        })
        .transpose()?;

    let offset = query
        .offset
        .map(|offset_expr| match offset_expr.value {
            sqlast::Expr::Value(sqlast::Value::Number(n, _)) => n
                .parse::<u64>()
                .map_err(|_| DbError::Parser(format!("invalid OFFSET value: {}", n))),
            _ => Err(DbError::Parser(
                "OFFSET must be a non-negative integer".into(),
            )),
        })
        .transpose()?;

    Ok(Statement::Select {
        columns,
        from: base,
        joins,
        selection,
        group_by,
        having,
        order_by,
        limit,
        offset,
    })
}

fn map_order_by_expr(expr: sqlast::OrderByExpr) -> DbResult<ast::OrderByExpr> {
    let column = match expr.expr {
        sqlast::Expr::Identifier(ident) => normalize_ident(&ident),
        sqlast::Expr::CompoundIdentifier(parts) => {
            if parts.len() == 1 {
                normalize_ident(&parts[0])
            } else {
                return Err(DbError::Parser(
                    "qualified column names not supported in ORDER BY".into(),
                ));
            }
        }
        _ => {
            return Err(DbError::Parser(
                "ORDER BY supports column names only".into(),
            ))
        }
    };

    let direction = if let Some(asc) = expr.asc {
        if asc {
            ast::SortDirection::Asc
        } else {
            ast::SortDirection::Desc
        }
    } else {
        ast::SortDirection::Asc
    };

    Ok(ast::OrderByExpr { column, direction })
}

fn extract_values(query: sqlast::Query) -> DbResult<Vec<Expr>> {
    match *query.body {
        sqlast::SetExpr::Values(values) => {
            let mut rows = values.rows.into_iter();
            let row = rows
                .next()
                .ok_or_else(|| DbError::Parser("INSERT requires at least one row".into()))?;
            if rows.next().is_some() {
                return Err(DbError::Parser("multi-row INSERT not supported".into()));
            }
            row.into_iter().map(map_expr).collect()
        }
        _ => Err(DbError::Parser("INSERT expects VALUES list".into())),
    }
}

fn map_select_item(item: sqlast::SelectItem) -> DbResult<SelectItem> {
    match item {
        sqlast::SelectItem::Wildcard(options) => {
            ensure_plain_wildcard(&options)?;
            Ok(SelectItem::Wildcard)
        }
        sqlast::SelectItem::QualifiedWildcard(_, _) => {
            Err(DbError::Parser("qualified wildcard not supported".into()))
        }
        sqlast::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
            expr: map_expr(expr)?,
            alias: None,
        }),
        sqlast::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
            expr: map_expr(expr)?,
            alias: Some(normalize_ident_owned(alias)),
        }),
    }
}

fn map_table_with_joins(table: &sqlast::TableWithJoins) -> DbResult<(TableFactor, Vec<Join>)> {
    let base = map_table_factor(&table.relation)?;
    let mut joins = Vec::with_capacity(table.joins.len());
    for join in &table.joins {
        let right = map_table_factor(&join.relation)?;
        let (kind, constraint) = match &join.join_operator {
            sqlast::JoinOperator::Inner(c) => (JoinType::Inner, c),
            sqlast::JoinOperator::LeftOuter(c) => (JoinType::Left, c),
            sqlast::JoinOperator::RightOuter(c) => (JoinType::Right, c),
            sqlast::JoinOperator::FullOuter(c) => (JoinType::Full, c),
            other => {
                return Err(DbError::Parser(format!(
                    "unsupported join type: {other:?}"
                )))
            }
        };
        let on = match constraint {
            sqlast::JoinConstraint::On(expr) => map_expr(expr.clone())?,
            other => {
                return Err(DbError::Parser(format!(
                    "unsupported join constraint: {other:?}; use ON"
                )))
            }
        };
        joins.push(Join { kind, right, on });
    }
    Ok((base, joins))
}

fn map_table_factor(factor: &sqlast::TableFactor) -> DbResult<TableFactor> {
    match factor {
        sqlast::TableFactor::Table { name, alias, .. } => Ok(TableFactor {
            name: normalize_object_name(name)?,
            alias: alias.as_ref().map(|a| normalize_ident(&a.name)),
        }),
        other => Err(DbError::Parser(format!(
            "unsupported table factor: {other:?}"
        ))),
    }
}

fn map_expr(expr: sqlast::Expr) -> DbResult<Expr> {
    use sqlast::Expr as SqlExpr;

    match expr {
        SqlExpr::Identifier(ident) => Ok(Expr::Column {
            table: None,
            name: normalize_ident_owned(ident),
        }),
        SqlExpr::CompoundIdentifier(idents) => {
            if idents.len() < 2 {
                let ident = idents
                    .last()
                    .ok_or_else(|| DbError::Parser("invalid identifier".into()))?;
                return Ok(Expr::Column {
                    table: None,
                    name: normalize_ident(ident),
                });
            }
            let name = normalize_ident(&idents[idents.len() - 1]);
            let table = normalize_ident(&idents[idents.len() - 2]);
            Ok(Expr::Column {
                table: Some(table),
                name,
            })
        }
        SqlExpr::Value(value) => Ok(Expr::Literal(map_value(value)?)),
        SqlExpr::BinaryOp { left, op, right } => {
            let left = Box::new(map_expr(*left)?);
            let right = Box::new(map_expr(*right)?);
            if let Some(arith) = map_arith_op(&op) {
                Ok(Expr::Arith {
                    left,
                    op: arith,
                    right,
                })
            } else {
                Ok(Expr::Binary {
                    left,
                    op: map_binary_op(op)?,
                    right,
                })
            }
        }
        SqlExpr::UnaryOp { op, expr } => match op {
            sqlast::UnaryOperator::Plus => map_expr(*expr),
            sqlast::UnaryOperator::Minus => Ok(Expr::Unary {
                op: UnaryOp::Negate,
                expr: Box::new(map_expr(*expr)?),
            }),
            sqlast::UnaryOperator::Not => Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(map_expr(*expr)?),
            }),
            other => Err(DbError::Parser(format!(
                "unsupported unary operator: {other:?}"
            ))),
        },
        SqlExpr::Nested(inner) => map_expr(*inner),
        SqlExpr::IsNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(map_expr(*inner)?),
            negated: false,
        }),
        SqlExpr::IsNotNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(map_expr(*inner)?),
            negated: true,
        }),
        SqlExpr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::InList {
            expr: Box::new(map_expr(*expr)?),
            list: list.into_iter().map(map_expr).collect::<DbResult<Vec<_>>>()?,
            negated,
        }),
        SqlExpr::InSubquery {
            expr,
            subquery,
            negated,
        } => Ok(Expr::InSubquery {
            expr: Box::new(map_expr(*expr)?),
            query: RawQuery(subquery.to_string()),
            negated,
        }),
        SqlExpr::Exists { subquery, negated } => Ok(Expr::Exists {
            query: RawQuery(subquery.to_string()),
            negated,
        }),
        SqlExpr::Function(func) => map_function(func),
        other => Err(DbError::Parser(format!("unsupported expr: {other:?}"))),
    }
}

fn map_function(func: sqlast::Function) -> DbResult<Expr> {
    let name = normalize_object_name(&func.name)?.to_uppercase();
    let agg_func = match name.as_str() {
        "COUNT" => AggFunc::Count,
        "SUM" => AggFunc::Sum,
        "AVG" => AggFunc::Avg,
        "MIN" => AggFunc::Min,
        "MAX" => AggFunc::Max,
        other => return Err(DbError::Parser(format!("unsupported function: {other}"))),
    };
    let distinct = func.distinct;

    if func.args.len() == 1 {
        if let sqlast::FunctionArg::Unnamed(sqlast::FunctionArgExpr::Wildcard) = &func.args[0] {
            if agg_func != AggFunc::Count {
                return Err(DbError::Parser(format!("{name}(*) is not supported")));
            }
            return Ok(Expr::Aggregate {
                func: AggFunc::CountStar,
                arg: None,
                distinct,
            });
        }
    }

    if func.args.len() != 1 {
        return Err(DbError::Parser(format!(
            "{name} takes exactly one argument"
        )));
    }
    let arg = match &func.args[0] {
        sqlast::FunctionArg::Unnamed(sqlast::FunctionArgExpr::Expr(e)) => map_expr(e.clone())?,
        other => {
            return Err(DbError::Parser(format!(
                "unsupported argument to {name}: {other:?}"
            )))
        }
    };
    Ok(Expr::Aggregate {
        func: agg_func,
        arg: Some(Box::new(arg)),
        distinct,
    })
}

fn map_value(value: sqlast::Value) -> DbResult<Value> {
    use sqlast::Value as SqlValue;

    match value {
        SqlValue::Number(num, _) => {
            if num.contains('.') || num.contains('e') || num.contains('E') {
                let parsed = num
                    .parse::<f64>()
                    .map_err(|_| DbError::Parser(format!("invalid numeric literal: {num}")))?;
                Ok(Value::Double(parsed))
            } else {
                let parsed = num
                    .parse::<i64>()
                    .map_err(|_| DbError::Parser(format!("invalid int literal: {num}")))?;
                Ok(Value::Int(parsed))
            }
        }
        SqlValue::SingleQuotedString(s) => Ok(Value::Text(s)),
        SqlValue::Boolean(b) => Ok(Value::Bool(b)),
        SqlValue::Null => Ok(Value::Null),
        other => Err(DbError::Parser(format!("unsupported literal: {other:?}"))),
    }
}

/// `+ - * / %` and (Postgres-dialect) `^` map to `expr::ArithOp`; every
/// other binary operator is handled by `map_binary_op` instead.
fn map_arith_op(op: &sqlast::BinaryOperator) -> Option<ArithOp> {
    use sqlast::BinaryOperator as SqlBinary;

    Some(match op {
        SqlBinary::Plus => ArithOp::Add,
        SqlBinary::Minus => ArithOp::Subtract,
        SqlBinary::Multiply => ArithOp::Multiply,
        SqlBinary::Divide => ArithOp::Divide,
        SqlBinary::Modulo => ArithOp::Remainder,
        SqlBinary::PGExp => ArithOp::Power,
        _ => return None,
    })
}

fn map_binary_op(op: sqlast::BinaryOperator) -> DbResult<BinaryOp> {
    use sqlast::BinaryOperator as SqlBinary;

    Ok(match op {
        SqlBinary::Eq => BinaryOp::Eq,
        SqlBinary::NotEq => BinaryOp::Ne,
        SqlBinary::Lt => BinaryOp::Lt,
        SqlBinary::LtEq => BinaryOp::Le,
        SqlBinary::Gt => BinaryOp::Gt,
        SqlBinary::GtEq => BinaryOp::Ge,
        SqlBinary::And => BinaryOp::And,
        SqlBinary::Or => BinaryOp::Or,
        other => return Err(DbError::Parser(format!("unsupported operator: {other:?}"))),
    })
}

fn normalize_ident(ident: &sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_ident_owned(ident: sqlast::Ident) -> String {
    ident.value.to_lowercase()
}

fn normalize_object_name(name: &sqlast::ObjectName) -> DbResult<String> {
    name.0
        .first()
        .map(|ident| ident.value.to_lowercase())
        .ok_or_else(|| DbError::Parser("invalid object name".into()))
}

fn first_name(mut names: Vec<sqlast::ObjectName>) -> DbResult<String> {
    if names.is_empty() {
        return Err(DbError::Parser("DROP requires a target".into()));
    }
    normalize_object_name(&names.remove(0))
}

fn table_name_from_with_joins(table: &sqlast::TableWithJoins) -> DbResult<String> {
    if !table.joins.is_empty() {
        return Err(DbError::Parser(
            "UPDATE/DELETE against a join is not supported".into(),
        ));
    }
    match &table.relation {
        sqlast::TableFactor::Table { name, .. } => normalize_object_name(name),
        _ => Err(DbError::Parser("unsupported table factor".into())),
    }
}

fn map_index_column(column: Option<&sqlast::OrderByExpr>) -> DbResult<String> {
    let column = column.ok_or_else(|| DbError::Parser("index column required".into()))?;
    match &column.expr {
        sqlast::Expr::Identifier(ident) => Ok(normalize_ident(ident)),
        sqlast::Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(normalize_ident)
            .ok_or_else(|| DbError::Parser("invalid identifier".into())),
        other => Err(DbError::Parser(format!(
            "unsupported index column: {other:?}"
        ))),
    }
}

fn ensure_plain_wildcard(options: &sqlast::WildcardAdditionalOptions) -> DbResult<()> {
    let has_options = options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_rename.is_some()
        || options.opt_replace.is_some();
    if has_options {
        Err(DbError::Parser("wildcard options not supported".into()))
    } else {
        Ok(())
    }
}

/// Map one `sqlparser` column definition to the internal `ColumnDef`,
/// reading `NOT NULL`, non-primary `UNIQUE`, and inline `REFERENCES` out of
/// its per-column options.
fn map_column_def(col: sqlast::ColumnDef) -> DbResult<ColumnDef> {
    use sqlast::ColumnOption;

    let name = normalize_ident_owned(col.name);
    let ty = col.data_type.to_string().to_uppercase();
    let mut not_null = false;
    let mut unique = false;
    let mut references = None;

    for opt in &col.options {
        match &opt.option {
            ColumnOption::NotNull => not_null = true,
            ColumnOption::Unique { is_primary, .. } if !*is_primary => unique = true,
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                on_delete,
                on_update,
            } => {
                references = Some(ColumnForeignKey {
                    table: normalize_object_name(foreign_table)?,
                    columns: referred_columns.iter().map(normalize_ident).collect(),
                    on_delete: map_referential_action(*on_delete),
                    on_update: map_referential_action(*on_update),
                });
            }
            _ => {}
        }
    }

    Ok(ColumnDef {
        name,
        ty,
        not_null,
        unique,
        references,
    })
}

/// Table-level `UNIQUE (col, ...)` constraints, excluding the primary key
/// (which `resolve_primary_key` already extracted separately).
fn extract_table_unique_keys(constraints: &[sqlast::TableConstraint]) -> DbResult<Vec<Vec<String>>> {
    use sqlast::TableConstraint;

    let mut keys = Vec::new();
    for constraint in constraints {
        if let TableConstraint::Unique {
            columns,
            is_primary: false,
            ..
        } = constraint
        {
            keys.push(columns.iter().map(normalize_ident).collect());
        }
    }
    Ok(keys)
}

/// Table-level `FOREIGN KEY (cols) REFERENCES table(cols) [ON ...]` constraints.
fn extract_table_foreign_keys(
    constraints: &[sqlast::TableConstraint],
) -> DbResult<Vec<TableForeignKey>> {
    use sqlast::TableConstraint;

    let mut fks = Vec::new();
    for constraint in constraints {
        if let TableConstraint::ForeignKey {
            columns,
            foreign_table,
            referred_columns,
            on_delete,
            on_update,
            ..
        } = constraint
        {
            fks.push(TableForeignKey {
                columns: columns.iter().map(normalize_ident).collect(),
                ref_table: normalize_object_name(foreign_table)?,
                ref_columns: referred_columns.iter().map(normalize_ident).collect(),
                on_delete: map_referential_action(*on_delete),
                on_update: map_referential_action(*on_update),
            });
        }
    }
    Ok(fks)
}

/// `NO ACTION`/`SET DEFAULT`/an absent clause all fold into `Restrict`,
/// since the constraints engine (spec.md §4.7) only implements the three
/// `FkAction` variants.
fn map_referential_action(action: Option<sqlast::ReferentialAction>) -> FkAction {
    use sqlast::ReferentialAction;

    match action {
        Some(ReferentialAction::Cascade) => FkAction::Cascade,
        Some(ReferentialAction::SetNull) => FkAction::SetNull,
        Some(ReferentialAction::Restrict)
        | Some(ReferentialAction::NoAction)
        | Some(ReferentialAction::SetDefault)
        | None => FkAction::Restrict,
    }
}

/// Resolve primary key from inline column constraints and table-level constraints.
/// Returns error if PK defined in both places.
fn resolve_primary_key(
    columns: &[sqlast::ColumnDef],
    constraints: &[sqlast::TableConstraint],
) -> DbResult<Option<Vec<String>>> {
    let inline_pk = extract_inline_primary_key(columns)?;
    let table_pk = extract_primary_key(constraints)?;

    match (table_pk, inline_pk) {
        (Some(_), Some(_)) => Err(DbError::Parser(
            "PRIMARY KEY defined both inline and at table level".into(),
        )),
        (Some(pk), None) | (None, Some(pk)) => Ok(Some(pk)),
        (None, None) => Ok(None),
    }
}

/// Extract PRIMARY KEY constraint from table constraints.
/// Returns Some(Vec<String>) if PRIMARY KEY is found, None otherwise.
fn extract_primary_key(constraints: &[sqlast::TableConstraint]) -> DbResult<Option<Vec<String>>> {
    use sqlast::TableConstraint;

    for constraint in constraints {
        match constraint {
            TableConstraint::Unique {
                columns,
                is_primary,
                ..
            } if *is_primary => {
                let pk_columns: Vec<String> = columns.iter().map(normalize_ident).collect();

                if pk_columns.is_empty() {
                    return Err(DbError::Parser(
                        "PRIMARY KEY must include at least one column".into(),
                    ));
                }

                return Ok(Some(pk_columns));
            }
            _ => continue,
        }
    }
    Ok(None)
}

/// Extract PRIMARY KEY defined inline on column definitions.
fn extract_inline_primary_key(columns: &[sqlast::ColumnDef]) -> DbResult<Option<Vec<String>>> {
    use sqlast::ColumnOption;

    let mut pk_columns = Vec::new();
    for column in columns {
        let has_primary_key = column.options.iter().any(|opt| {
            matches!(
                opt.option,
                ColumnOption::Unique {
                    is_primary: true,
                    ..
                }
            )
        });
        if has_primary_key {
            pk_columns.push(normalize_ident(&column.name));
        }
    }

    match pk_columns.len() {
        0 => Ok(None),
        1 => Ok(Some(pk_columns)),
        _ => Err(DbError::Parser(
            "multiple PRIMARY KEY column constraints; use PRIMARY KEY (col1, col2)".into(),
        )),
    }
}
