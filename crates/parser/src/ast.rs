use expr::Expr;

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: Option<Vec<String>>,
        /// Table-level `UNIQUE (col, ...)` constraints, beyond the primary key.
        unique_keys: Vec<Vec<String>>,
        /// Table-level `FOREIGN KEY (...) REFERENCES ...` constraints, merged
        /// with any inline column-level `REFERENCES` from `ColumnDef`.
        foreign_keys: Vec<TableForeignKey>,
    },
    DropTable {
        name: String,
    },
    CreateIndex {
        name: String,
        table: String,
        column: String,
    },
    DropIndex {
        name: String,
    },
    Insert {
        table: String,
        values: Vec<Expr>,
    },
    Select {
        columns: Vec<SelectItem>,
        from: TableFactor,
        joins: Vec<Join>,
        selection: Option<Expr>,
        group_by: Vec<Expr>,
        having: Option<Expr>,
        order_by: Vec<OrderByExpr>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        selection: Option<Expr>,
    },
    Delete {
        table: String,
        selection: Option<Expr>,
    },
    Explain {
        query: Box<Statement>,
        analyze: bool,
    },
    /// `ANALYZE [table]` — recompute cardinality (and, eventually,
    /// per-column) statistics. Omitted table means "all tables."
    Analyze { table: Option<String> },
    /// `VERIFY [table]` — check structural invariants without mutating data.
    Verify { table: Option<String> },
    /// `DUMP TABLE name` / `DUMP INDEX name` — print contents in spec.md
    /// §6's dump format.
    Dump { kind: DumpKind, name: String },
    /// `SET property = value` — adjust a runtime `common::Config` knob.
    Set { property: String, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpKind {
    Table,
    Index,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: String,
    pub not_null: bool,
    /// Inline single-column `UNIQUE` (not `PRIMARY KEY`, which stays in
    /// `Statement::CreateTable::primary_key`).
    pub unique: bool,
    /// Inline single-column `REFERENCES other(col) [ON DELETE ...] [ON UPDATE ...]`.
    pub references: Option<ColumnForeignKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnForeignKey {
    pub table: String,
    /// Empty means "the referenced table's primary key" — resolved against
    /// the catalog at DDL time, since the parser has no schema access.
    pub columns: Vec<String>,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

/// A table-level `FOREIGN KEY (cols) REFERENCES table(cols) [ON ...]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

/// Mirrors `catalog::FkAction`; kept separate so `parser` doesn't need a
/// dependency on `catalog` just to spell three referential-action names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FkAction {
    Restrict,
    Cascade,
    SetNull,
}

/// A base table reference in a FROM clause, with its optional alias.
#[derive(Clone, Debug, PartialEq)]
pub struct TableFactor {
    pub name: String,
    pub alias: Option<String>,
}

impl TableFactor {
    /// The name a column qualifier against this table should use: the
    /// alias when present, otherwise the table's own name.
    pub fn binding_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

/// One link of a FROM-clause join chain: `<kind> JOIN <right> ON <on>`.
/// The planner's cost-based join enumeration (spec.md §4.6 step 3) treats
/// the base table plus each `Join::right` as the leaves of the join graph
/// and each `on` expression as a pushdown-eligible conjunct.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub kind: JoinType,
    pub right: TableFactor,
    pub on: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub direction: SortDirection,
}
