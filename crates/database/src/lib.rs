use anyhow::{Context, Result};
use buffer::FilePager;
use catalog::{Catalog, Column, ColumnStats, ForeignKeyDef, IndexKind};
use common::{ExecutionStats, Row};
use executor::{execute_dml, execute_query, execute_query_with_stats, ExecutionContext};
use parser::{parse_sql, ColumnDef, Statement};
use planner::cost::CostBasedPlanner;
use planner::{explain_physical, PhysicalPlan, Planner, PlanningContext};
use std::{fs, path::Path, path::PathBuf};
use types::{SqlType, Value};
use wal::{Wal, WalRecord};

/// Result of executing a single statement.
#[derive(Debug)]
pub enum QueryResult {
    /// Query returned rows
    Rows { schema: Vec<String>, rows: Vec<Row> },
    /// DML operation affected N rows
    Count { affected: u64 },
    /// DDL or utility command with no tabular result
    Empty,
    /// A human-readable message, for UTILITY commands like ANALYZE/VERIFY.
    Message(String),
}

/// A teaching-scale single-node database: catalog + buffer pool + WAL,
/// bound together by the planner and executor.
///
/// Unlike a server-backed engine, `Database` owns its storage directly and
/// runs every statement synchronously on the calling thread — there is no
/// connection pool, no transaction manager, and no cluster membership to
/// coordinate. Concurrency and durability beyond a single WAL are explicit
/// Non-goals (spec.md §10).
pub struct Database {
    data_dir: PathBuf,
    catalog_path: PathBuf,
    wal_path: PathBuf,
    config: common::Config,
    catalog: Catalog,
    pager: FilePager,
    wal: Wal,
}

impl Database {
    /// Open (or create) a database rooted at `config.data_dir`.
    ///
    /// Creates the data directory if missing, loads (or initializes) the
    /// catalog, and opens the buffer pool and WAL.
    pub fn open(config: common::Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "failed to create data directory {}",
                config.data_dir.display()
            )
        })?;

        let catalog_path = config.data_dir.join("catalog.json");
        let wal_path = config.data_dir.join("write_ahead.log");
        let catalog = Catalog::load(&catalog_path).map_err(anyhow::Error::from)?;
        let pager = FilePager::new(&config.data_dir, config.buffer_pool_pages);
        let wal = Wal::open(&wal_path).map_err(anyhow::Error::from)?;

        tracing::info!(data_dir = %config.data_dir.display(), "database opened");

        Ok(Self {
            data_dir: config.data_dir.clone(),
            catalog_path,
            wal_path,
            config,
            catalog,
            pager,
            wal,
        })
    }

    /// Open a database using an explicit directory and buffer pool size,
    /// leaving every other `common::Config` knob at its default.
    pub fn new(data_dir: &Path, buffer_pages: usize) -> Result<Self> {
        let config = common::Config::builder()
            .data_dir(data_dir.to_path_buf())
            .base_directory(data_dir.to_path_buf())
            .buffer_pool_pages(buffer_pages)
            .build();
        Self::open(config)
    }

    /// Parse and execute one or more semicolon-separated SQL statements,
    /// returning the result of the last one.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        let statements = parse_sql(sql).map_err(anyhow::Error::from)?;

        if statements.is_empty() {
            return Ok(QueryResult::Empty);
        }

        let mut result = QueryResult::Empty;
        for stmt in statements {
            result = self.execute_statement(stmt)?;
        }
        Ok(result)
    }

    /// Execute a single parsed statement.
    fn execute_statement(&mut self, stmt: Statement) -> Result<QueryResult> {
        match stmt {
            Statement::CreateTable {
                name,
                columns,
                primary_key,
                unique_keys,
                foreign_keys,
            } => self.execute_create_table(name, columns, primary_key, unique_keys, foreign_keys),

            Statement::DropTable { name } => self.execute_drop_table(name),

            Statement::CreateIndex {
                name,
                table,
                column,
            } => self.execute_create_index(name, table, column),

            Statement::DropIndex { name } => self.execute_drop_index(name),

            Statement::Explain { query, analyze } => self.execute_explain(*query, analyze),

            Statement::Analyze { table } => self.execute_analyze(table),
            Statement::Verify { table } => self.execute_verify(table),
            Statement::Dump { kind, name } => self.execute_dump(kind, name),
            Statement::Set { property, value } => self.execute_set(property, value),

            other => self.execute_query_or_dml(other),
        }
    }

    /// Execute CREATE TABLE, including NOT NULL / UNIQUE / FOREIGN KEY
    /// constraint declarations and (per `create_indexes_on_keys`) the
    /// implicit candidate-key indexes the engine backs every key with.
    fn execute_create_table(
        &mut self,
        name: String,
        columns: Vec<ColumnDef>,
        primary_key: Option<Vec<String>>,
        unique_keys: Vec<Vec<String>>,
        foreign_keys: Vec<parser::TableForeignKey>,
    ) -> Result<QueryResult> {
        let catalog_columns: Vec<Column> = columns
            .iter()
            .map(|col| {
                let ty = map_sql_type(&col.ty)?;
                Ok(if col.not_null {
                    Column::not_null(col.name.clone(), ty)
                } else {
                    Column::new(col.name.clone(), ty)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let column_ordinal = |col_name: &str| -> Result<u16> {
            columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(col_name))
                .map(|idx| idx as u16)
                .ok_or_else(|| anyhow::anyhow!("column '{col_name}' not found in table columns"))
        };

        let primary_key_ordinals = primary_key
            .as_ref()
            .map(|names| {
                names
                    .iter()
                    .map(|n| column_ordinal(n))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let table_id = self
            .catalog
            .create_table(&name, catalog_columns, primary_key_ordinals.clone())
            .map_err(anyhow::Error::from)?;

        let mut all_unique_keys = unique_keys.clone();
        for col in &columns {
            if col.unique {
                all_unique_keys.push(vec![col.name.clone()]);
            }
        }
        for key in &all_unique_keys {
            let ordinals = key
                .iter()
                .map(|n| column_ordinal(n))
                .collect::<Result<Vec<_>>>()?;
            self.catalog
                .add_unique_key(&name, ordinals)
                .map_err(anyhow::Error::from)?;
        }

        let mut all_foreign_keys = foreign_keys.clone();
        for (idx, col) in columns.iter().enumerate() {
            if let Some(fk) = &col.references {
                let ref_columns = if fk.columns.is_empty() {
                    let ref_table = self.catalog.table(&fk.table).map_err(anyhow::Error::from)?;
                    ref_table
                        .primary_key
                        .clone()
                        .ok_or_else(|| {
                            anyhow::anyhow!(
                                "REFERENCES {} has no explicit column and '{}' has no primary key",
                                fk.table,
                                fk.table
                            )
                        })?
                        .iter()
                        .map(|ord| ref_table.schema.columns()[*ord as usize].name.clone())
                        .collect()
                } else {
                    fk.columns.clone()
                };
                all_foreign_keys.push(parser::TableForeignKey {
                    columns: vec![columns[idx].name.clone()],
                    ref_table: fk.table.clone(),
                    ref_columns,
                    on_delete: fk.on_delete,
                    on_update: fk.on_update,
                });
            }
        }
        for fk in &all_foreign_keys {
            let fk_columns = fk
                .columns
                .iter()
                .map(|n| column_ordinal(n))
                .collect::<Result<Vec<_>>>()?;
            let ref_table_meta = self
                .catalog
                .table(&fk.ref_table)
                .map_err(anyhow::Error::from)?;
            let ref_columns = fk
                .ref_columns
                .iter()
                .map(|n| {
                    ref_table_meta
                        .schema
                        .column_index(n)
                        .ok_or_else(|| anyhow::anyhow!("unknown referenced column '{n}'"))
                })
                .collect::<Result<Vec<_>>>()?;
            self.catalog
                .add_foreign_key(
                    &name,
                    ForeignKeyDef {
                        name: format!("fk_{}_{}", name, fk.ref_table),
                        columns: fk_columns,
                        ref_table: fk.ref_table.clone(),
                        ref_columns,
                        on_delete: map_fk_action(fk.on_delete),
                        on_update: map_fk_action(fk.on_update),
                    },
                )
                .map_err(anyhow::Error::from)?;
        }

        if self.config.create_indexes_on_keys {
            let column_name = |ord: u16| columns[ord as usize].name.clone();
            if let Some(pk) = &primary_key_ordinals {
                let names: Vec<String> = pk.iter().copied().map(column_name).collect();
                let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
                self.catalog
                    .create_index(&name, &format!("{name}_pkey"), &name_refs, IndexKind::BTree)
                    .map_err(anyhow::Error::from)?;
            }
            for (i, key) in all_unique_keys.iter().enumerate() {
                let name_refs: Vec<&str> = key.iter().map(String::as_str).collect();
                self.catalog
                    .create_index(
                        &name,
                        &format!("{name}_unique_{i}"),
                        &name_refs,
                        IndexKind::BTree,
                    )
                    .map_err(anyhow::Error::from)?;
            }
        }

        self.catalog
            .save(&self.catalog_path)
            .map_err(anyhow::Error::from)?;

        self.wal
            .append(&WalRecord::CreateTable {
                name: name.clone(),
                table: table_id,
            })
            .and_then(|_| self.wal.sync())
            .map_err(anyhow::Error::from)?;

        tracing::debug!(table = %name, "created table");
        Ok(QueryResult::Empty)
    }

    fn execute_drop_table(&mut self, name: String) -> Result<QueryResult> {
        let table_id = self.catalog.table(&name).map_err(anyhow::Error::from)?.id;
        self.catalog.drop_table(&name).map_err(anyhow::Error::from)?;
        self.catalog
            .save(&self.catalog_path)
            .map_err(anyhow::Error::from)?;

        let path = self.data_dir.join(format!("{name}.heap"));
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove heap file {}", path.display()))?;
        }

        self.wal
            .append(&WalRecord::DropTable { table: table_id })
            .and_then(|_| self.wal.sync())
            .map_err(anyhow::Error::from)?;

        tracing::debug!(table = %name, "dropped table");
        Ok(QueryResult::Empty)
    }

    fn execute_create_index(
        &mut self,
        name: String,
        table: String,
        column: String,
    ) -> Result<QueryResult> {
        self.catalog
            .create_index(&table, &name, &[column.as_str()], IndexKind::BTree)
            .map_err(anyhow::Error::from)?;
        self.catalog
            .save(&self.catalog_path)
            .map_err(anyhow::Error::from)?;
        tracing::debug!(index = %name, table = %table, "created index");
        Ok(QueryResult::Empty)
    }

    fn execute_drop_index(&mut self, name: String) -> Result<QueryResult> {
        let table_name = self
            .catalog
            .tables()
            .find(|table| table.index(&name).is_ok())
            .map(|table| table.name.clone())
            .ok_or_else(|| anyhow::anyhow!("index '{}' not found", name))?;

        self.catalog
            .drop_index(&table_name, &name)
            .map_err(anyhow::Error::from)?;
        self.catalog
            .save(&self.catalog_path)
            .map_err(anyhow::Error::from)?;
        Ok(QueryResult::Empty)
    }

    /// Plan (and, for `ANALYZE`, execute) a query and report its plan shape
    /// and, when requested, its runtime statistics.
    fn execute_explain(&mut self, query: Statement, analyze: bool) -> Result<QueryResult> {
        let plan = self.plan(query)?;
        let description = explain_physical(&plan);

        if !analyze {
            return Ok(QueryResult::Rows {
                schema: vec!["Explain".to_string()],
                rows: vec![Row::new(vec![Value::Text(description)])],
            });
        }

        let mut ctx = ExecutionContext::new(
            &self.catalog,
            &mut self.pager,
            &mut self.wal,
            self.data_dir.clone(),
        );
        let (rows, stats) =
            execute_query_with_stats(plan, &mut ctx).map_err(anyhow::Error::from)?;

        let output = format_explain_analyze(&description, rows.len(), &stats);
        Ok(QueryResult::Rows {
            schema: vec!["Explain".to_string()],
            rows: vec![Row::new(vec![Value::Text(output)])],
        })
    }

    /// Plan a statement with the configured planner (simple or cost-based).
    fn plan(&self, stmt: Statement) -> Result<PhysicalPlan> {
        let mut planning_ctx = PlanningContext::new(&self.catalog);
        let plan = if self.config.use_cost_based_planner {
            CostBasedPlanner::plan(stmt, &mut planning_ctx)
        } else {
            Planner::plan(stmt, &mut planning_ctx)
        };
        plan.map_err(anyhow::Error::from)
    }

    /// Execute a query or DML statement (SELECT, INSERT, UPDATE, DELETE).
    fn execute_query_or_dml(&mut self, stmt: Statement) -> Result<QueryResult> {
        let plan = self.plan(stmt)?;

        let mut ctx = ExecutionContext::new(
            &self.catalog,
            &mut self.pager,
            &mut self.wal,
            self.data_dir.clone(),
        );

        match plan {
            PhysicalPlan::Insert { .. } | PhysicalPlan::Update { .. } | PhysicalPlan::Delete { .. } => {
                let count = execute_dml(plan, &mut ctx).map_err(anyhow::Error::from)?;
                Ok(QueryResult::Count { affected: count })
            }
            ref query_plan => {
                let schema = infer_schema(query_plan);
                let rows = execute_query(plan, &mut ctx).map_err(anyhow::Error::from)?;
                Ok(QueryResult::Rows { schema, rows })
            }
        }
    }

    /// `ANALYZE [table]` — recompute row-count and per-column distinct-value
    /// estimates by scanning each named table (or every table, if none was
    /// named) and persist them. The planner's selectivity estimates
    /// (SPEC_FULL.md §9 resolution #2) read `column_stats` back out of the
    /// catalog at planning time.
    fn execute_analyze(&mut self, table: Option<String>) -> Result<QueryResult> {
        let targets: Vec<String> = match table {
            Some(t) => vec![t],
            None => self.catalog.tables().map(|t| t.name.clone()).collect(),
        };

        let mut analyzed = Vec::new();
        for name in &targets {
            let rows = self.scan_table(name)?;
            let count = rows.len() as u64;

            let num_columns = rows.first().map(|r| r.values.len()).unwrap_or(0);
            let mut column_stats = Vec::with_capacity(num_columns);
            for col in 0..num_columns {
                let distinct: std::collections::HashSet<&Value> =
                    rows.iter().map(|r| &r.values[col]).collect();
                column_stats.push(ColumnStats {
                    distinct_count: distinct.len() as u64,
                });
            }

            let meta = self.catalog.table_mut(name).map_err(anyhow::Error::from)?;
            meta.set_row_count_estimate(count);
            meta.set_column_stats(column_stats);
            analyzed.push(format!("{name}: {count} rows"));
        }

        self.catalog
            .save(&self.catalog_path)
            .map_err(anyhow::Error::from)?;

        tracing::debug!(tables = ?targets, "analyzed");
        Ok(QueryResult::Message(format!(
            "ANALYZE complete\n{}",
            analyzed.join("\n")
        )))
    }

    /// `VERIFY [table]` — check candidate-key uniqueness and foreign-key
    /// referential integrity without mutating anything.
    fn execute_verify(&mut self, table: Option<String>) -> Result<QueryResult> {
        let targets: Vec<String> = match table {
            Some(t) => vec![t],
            None => self.catalog.tables().map(|t| t.name.clone()).collect(),
        };

        let mut problems = Vec::new();
        for name in &targets {
            let rows = self.scan_table(name)?;
            let meta = self.catalog.table(name).map_err(anyhow::Error::from)?;
            let candidate_keys: Vec<Vec<common::ColumnId>> =
                meta.candidate_keys().map(|k| k.to_vec()).collect();
            let foreign_keys: Vec<catalog::ForeignKeyDef> = meta.foreign_keys.clone();

            for key in &candidate_keys {
                let mut seen = std::collections::HashSet::new();
                for row in &rows {
                    let tuple: Vec<String> = key
                        .iter()
                        .map(|ord| format!("{:?}", row.values[*ord as usize]))
                        .collect();
                    if !seen.insert(tuple.join(",")) {
                        problems.push(format!(
                            "{name}: duplicate value for candidate key {key:?}"
                        ));
                    }
                }
            }

            for fk in &foreign_keys {
                let parent_rows = self.scan_table(&fk.ref_table)?;
                let parent_keys: std::collections::HashSet<String> = parent_rows
                    .iter()
                    .map(|row| {
                        fk.ref_columns
                            .iter()
                            .map(|ord| format!("{:?}", row.values[*ord as usize]))
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                for row in &rows {
                    let has_null = fk
                        .columns
                        .iter()
                        .any(|ord| matches!(row.values[*ord as usize], Value::Null));
                    if has_null {
                        continue;
                    }
                    let key = fk
                        .columns
                        .iter()
                        .map(|ord| format!("{:?}", row.values[*ord as usize]))
                        .collect::<Vec<_>>()
                        .join(",");
                    if !parent_keys.contains(&key) {
                        problems.push(format!(
                            "{name}: foreign key {:?} references missing row in {}",
                            fk.columns, fk.ref_table
                        ));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(QueryResult::Message(format!(
                "VERIFY ok ({} table(s) checked)",
                targets.len()
            )))
        } else {
            Ok(QueryResult::Message(format!(
                "VERIFY found {} problem(s):\n{}",
                problems.len(),
                problems.join("\n")
            )))
        }
    }

    /// `DUMP TABLE name` / `DUMP INDEX name` — print contents in a plain
    /// delimiter-separated text form.
    fn execute_dump(&mut self, kind: parser::DumpKind, name: String) -> Result<QueryResult> {
        match kind {
            parser::DumpKind::Table => {
                let meta = self.catalog.table(&name).map_err(anyhow::Error::from)?;
                let header: Vec<String> =
                    meta.schema.columns().iter().map(|c| c.name.clone()).collect();
                let rows = self.scan_table(&name)?;

                let mut out = String::new();
                out.push_str(&header.join("\t"));
                out.push('\n');
                for row in &rows {
                    let line: Vec<String> = row.values.iter().map(format_value).collect();
                    out.push_str(&line.join("\t"));
                    out.push('\n');
                }
                Ok(QueryResult::Message(out))
            }
            parser::DumpKind::Index => {
                let table = self
                    .catalog
                    .tables()
                    .find(|t| t.has_index(&name))
                    .ok_or_else(|| anyhow::anyhow!("index '{}' not found", name))?;
                let index = table.index(&name).map_err(anyhow::Error::from)?;
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .map(|ord| table.schema.columns()[*ord as usize].name.clone())
                    .collect();
                Ok(QueryResult::Message(format!(
                    "index {} on {}({}) kind={:?}",
                    index.name,
                    table.name,
                    columns.join(", "),
                    index.kind
                )))
            }
        }
    }

    /// `SET property = value` — adjust a runtime `common::Config` knob.
    fn execute_set(&mut self, property: String, value: String) -> Result<QueryResult> {
        match property.to_ascii_lowercase().as_str() {
            "page_size" => {
                self.config.page_size = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid page_size '{value}'"))?;
            }
            "buffer_pool_pages" => {
                self.config.buffer_pool_pages = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid buffer_pool_pages '{value}'"))?;
            }
            "enforce_key_constraints" => {
                self.config.enforce_key_constraints = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid boolean '{value}'"))?;
            }
            "cost_based_planner" | "use_cost_based_planner" => {
                self.config.use_cost_based_planner = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid boolean '{value}'"))?;
            }
            "enable_indexes" => {
                self.config.enable_indexes = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid boolean '{value}'"))?;
            }
            other => return Err(anyhow::anyhow!("unknown configuration property '{other}'")),
        }
        tracing::debug!(property = %property, value = %value, "config updated");
        Ok(QueryResult::Empty)
    }

    /// Scan every row of a table via a plain `SELECT *`, reusing the normal
    /// planner/executor path rather than touching storage directly.
    fn scan_table(&mut self, name: &str) -> Result<Vec<Row>> {
        let stmt = parse_sql(&format!("SELECT * FROM {name}"))
            .map_err(anyhow::Error::from)?
            .remove(0);
        let plan = self.plan(stmt)?;
        let mut ctx = ExecutionContext::new(
            &self.catalog,
            &mut self.pager,
            &mut self.wal,
            self.data_dir.clone(),
        );
        execute_query(plan, &mut ctx).map_err(anyhow::Error::from)
    }

    /// Remove all table and catalog data and reinitialize empty storage.
    pub fn reset(&mut self) -> Result<()> {
        let entries = fs::read_dir(&self.data_dir)
            .with_context(|| format!("failed to read data directory {}", self.data_dir.display()))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(ext) = path.extension() {
                if ext == "heap" || ext == "tbl" {
                    fs::remove_file(&path)
                        .with_context(|| format!("failed to remove file {}", path.display()))?;
                }
            }
        }

        if self.catalog_path.exists() {
            fs::remove_file(&self.catalog_path)
                .with_context(|| format!("failed to remove catalog {}", self.catalog_path.display()))?;
        }

        self.wal = Wal::open(&self.wal_path).map_err(anyhow::Error::from)?;
        if self.wal_path.exists() {
            fs::remove_file(&self.wal_path)
                .with_context(|| format!("failed to remove WAL {}", self.wal_path.display()))?;
        }

        self.catalog = Catalog::load(&self.catalog_path).map_err(anyhow::Error::from)?;
        self.pager = FilePager::new(&self.data_dir, self.config.buffer_pool_pages);
        self.wal = Wal::open(&self.wal_path).map_err(anyhow::Error::from)?;

        tracing::info!("database reset");
        Ok(())
    }

    /// Read-only access to the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The directory this database's files live under.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The live runtime configuration, including anything changed at
    /// runtime via `SET`.
    pub fn config(&self) -> &common::Config {
        &self.config
    }
}

/// Map a parser column-type string to the internal `SqlType` vocabulary.
fn map_sql_type(raw: &str) -> Result<SqlType> {
    match raw.trim().to_uppercase().as_str() {
        "TINYINT" => Ok(SqlType::TinyInt),
        "SMALLINT" => Ok(SqlType::SmallInt),
        "INT" | "INTEGER" => Ok(SqlType::Int),
        "BIGINT" => Ok(SqlType::BigInt),
        "FLOAT" | "REAL" => Ok(SqlType::Float),
        "DOUBLE" | "DOUBLE PRECISION" => Ok(SqlType::Double),
        "NUMERIC" | "DECIMAL" => Ok(SqlType::Numeric),
        "TEXT" | "STRING" | "VARCHAR" | "CHAR" => Ok(SqlType::Text),
        "BOOL" | "BOOLEAN" => Ok(SqlType::Bool),
        "DATE" => Ok(SqlType::Date),
        "TIME" => Ok(SqlType::Time),
        "DATETIME" => Ok(SqlType::DateTime),
        "TIMESTAMP" => Ok(SqlType::Timestamp),
        "INTERVAL" => Ok(SqlType::Interval),
        other => Err(anyhow::anyhow!("unsupported SQL type '{}'", other)),
    }
}

fn map_fk_action(action: parser::FkAction) -> catalog::FkAction {
    match action {
        parser::FkAction::Restrict => catalog::FkAction::Restrict,
        parser::FkAction::Cascade => catalog::FkAction::Cascade,
        parser::FkAction::SetNull => catalog::FkAction::SetNull,
    }
}

fn format_value(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        other => format!("{other:?}"),
    }
}

/// Infer the output schema from a physical plan.
fn infer_schema(plan: &PhysicalPlan) -> Vec<String> {
    match plan {
        PhysicalPlan::SeqScan { schema, .. } => schema.clone(),
        PhysicalPlan::IndexScan { schema, .. } => schema.clone(),
        PhysicalPlan::Filter { input, .. } => infer_schema(input),
        PhysicalPlan::Project { columns, .. } => {
            columns.iter().map(|(name, _)| name.clone()).collect()
        }
        PhysicalPlan::HashedGroupAggregate { schema, .. } => schema.clone(),
        PhysicalPlan::Sort { input, .. } => infer_schema(input),
        PhysicalPlan::Limit { input, .. } => infer_schema(input),
        PhysicalPlan::Rename { schema, .. } => schema.clone(),
        PhysicalPlan::TupleBag { schema, .. } => schema.clone(),
        PhysicalPlan::TableFunctionScan { schema, .. } => schema.clone(),
        PhysicalPlan::NestedLoopJoin { schema, .. } => schema.clone(),
        PhysicalPlan::Insert { .. } | PhysicalPlan::Update { .. } | PhysicalPlan::Delete { .. } => {
            vec![]
        }
    }
}

/// Render an `EXPLAIN ANALYZE` report combining the plan shape with the
/// root operator's collected `ExecutionStats`.
fn format_explain_analyze(plan_description: &str, row_count: usize, stats: &ExecutionStats) -> String {
    let mut out = String::new();
    out.push_str("EXPLAIN ANALYZE:\n");
    out.push_str(plan_description);
    out.push_str("\n\nExecution Statistics:\n");
    out.push_str(&format!(
        "  open: {}\n",
        ExecutionStats::format_duration(stats.open_time)
    ));
    out.push_str(&format!(
        "  next: {}\n",
        ExecutionStats::format_duration(stats.total_next_time)
    ));
    out.push_str(&format!(
        "  close: {}\n",
        ExecutionStats::format_duration(stats.close_time)
    ));
    out.push_str(&format!(
        "  total: {}\n",
        ExecutionStats::format_duration(stats.total_time())
    ));
    out.push_str(&format!("\nTotal rows: {}", row_count));
    out
}
