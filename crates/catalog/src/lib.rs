use std::{fs, path::Path};

use ahash::RandomState;
use common::{ColumnId, DbError, DbResult, TableId};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use types::SqlType;
use uuid::Uuid;

type Map<K, V> = HashMap<K, V, RandomState>;
type Set<K> = HashSet<K, RandomState>;

/// Unique identifier for an index definition stored in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

/// Persistent catalog that stores table schemas and index metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    tables: Vec<TableMeta>,
    next_table_id: u64,
    next_index_id: u64,
    #[serde(skip)]
    #[serde(default)]
    table_name_index: Map<String, usize>,
    #[serde(skip)]
    #[serde(default)]
    table_id_index: Map<TableId, usize>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        let mut catalog = Self {
            tables: Vec::new(),
            next_table_id: 1,
            next_index_id: 1,
            table_name_index: Map::default(),
            table_id_index: Map::default(),
        };
        catalog.rebuild_indexes();
        catalog
    }

    /// Load a catalog from disk, returning an empty catalog if the file does not exist.
    pub fn load(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path)?;
        let mut catalog: Catalog = serde_json::from_str(&data)
            .map_err(|err| DbError::Catalog(format!("invalid catalog file: {err}")))?;
        catalog.rebuild_indexes();
        Ok(catalog)
    }

    /// Persist the catalog contents as pretty JSON.
    pub fn save(&self, path: &Path) -> DbResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| DbError::Catalog(format!("serialize failed: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Returns an immutable reference to a table by name.
    pub fn table(&self, name: &str) -> DbResult<&TableMeta> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    /// Returns an immutable reference to a table by identifier.
    pub fn table_by_id(&self, id: TableId) -> DbResult<&TableMeta> {
        let idx = self
            .table_id_index
            .get(&id)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))?;
        self.tables
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))
    }

    /// Create a new table with the provided columns and an optional
    /// PRIMARY KEY (one candidate key per table; additional candidate keys
    /// are registered afterward via `add_unique_key`). Returns the new
    /// table's identifier.
    pub fn create_table(
        &mut self,
        name: &str,
        columns: Vec<Column>,
        primary_key: Option<Vec<ColumnId>>,
    ) -> DbResult<TableId> {
        if self.table_name_index.contains_key(name) {
            return Err(DbError::Catalog(format!("table '{name}' already exists")));
        }
        let schema = TableSchema::try_new(columns)?;
        if let Some(pk) = &primary_key {
            validate_column_set(&schema, pk, "PRIMARY KEY")?;
        }
        let table_id = TableId(self.next_table_id);
        self.next_table_id += 1;
        let table = TableMeta::new(table_id, name.to_string(), schema, primary_key);
        self.tables.push(table);
        self.rebuild_indexes();
        Ok(table_id)
    }

    /// Remove a table and its associated indexes.
    ///
    /// Fails if another table still holds a foreign key referencing this
    /// one, since dropping it would leave a dangling reference.
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let idx = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;

        if let Some(dependents) = self.tables[idx].referenced_by.iter().next() {
            return Err(DbError::Catalog(format!(
                "cannot drop table '{name}': referenced by foreign key on '{dependents}'"
            )));
        }

        self.tables.remove(idx);
        self.rebuild_indexes();
        Ok(())
    }

    /// Register a UNIQUE candidate key over the given columns.
    pub fn add_unique_key(&mut self, table_name: &str, columns: Vec<ColumnId>) -> DbResult<()> {
        {
            let table = self.table(table_name)?;
            validate_column_set(&table.schema, &columns, "UNIQUE")?;
        }
        let table = self.table_mut(table_name)?;
        if table.unique_keys.contains(&columns) {
            return Err(DbError::Catalog(format!(
                "duplicate UNIQUE constraint on '{table_name}'"
            )));
        }
        table.unique_keys.push(columns);
        Ok(())
    }

    /// Register a foreign key on `table_name` referencing `ref_table`.
    /// Both the referencing and referenced column lists must exist and be
    /// equal in length; the referenced columns must form a declared
    /// candidate key (PRIMARY or UNIQUE) of the target table.
    pub fn add_foreign_key(&mut self, table_name: &str, fk: ForeignKeyDef) -> DbResult<()> {
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(DbError::Catalog(
                "foreign key column count must match referenced column count".into(),
            ));
        }
        {
            let table = self.table(table_name)?;
            validate_column_set(&table.schema, &fk.columns, "FOREIGN KEY")?;
        }
        let ref_table_name = {
            let ref_table = self.table(&fk.ref_table)?;
            validate_column_set(&ref_table.schema, &fk.ref_columns, "FOREIGN KEY references")?;
            if !ref_table.is_candidate_key(&fk.ref_columns) {
                return Err(DbError::Catalog(format!(
                    "foreign key must reference a candidate key of '{}'",
                    fk.ref_table
                )));
            }
            ref_table.name.clone()
        };

        let table = self.table_mut(table_name)?;
        if table.foreign_keys.iter().any(|existing| existing.name == fk.name) {
            return Err(DbError::Catalog(format!(
                "foreign key '{}' already exists on '{table_name}'",
                fk.name
            )));
        }
        table.foreign_keys.push(fk);
        let owner = table.name.clone();

        let ref_table = self.table_mut(&ref_table_name)?;
        ref_table.referenced_by.insert(owner);
        Ok(())
    }

    /// Create an index over the given table columns, returning its identifier.
    pub fn create_index(
        &mut self,
        table_name: &str,
        index_name: &str,
        columns: &[&str],
        kind: IndexKind,
    ) -> DbResult<IndexId> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "index must reference at least one column".into(),
            ));
        }
        let resolved = {
            let table = self.table(table_name)?;
            let mut resolved = Vec::with_capacity(columns.len());
            for name in columns {
                let ordinal = table.schema.column_index(name).ok_or_else(|| {
                    DbError::Catalog(format!("unknown column '{name}' on table '{table_name}'"))
                })?;
                resolved.push(ordinal);
            }
            resolved
        };
        let index_id = IndexId(self.next_index_id);
        self.next_index_id += 1;
        let table = self.table_mut(table_name)?;
        table.add_index(IndexMeta {
            id: index_id,
            name: index_name.to_string(),
            columns: resolved,
            kind,
            storage: StorageDescriptor::new(),
        })?;
        Ok(index_id)
    }

    /// Drop an index attached to a table.
    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> DbResult<()> {
        let table = self.table_mut(table_name)?;
        table.remove_index(index_name)
    }

    /// Immutable iterator over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.iter()
    }

    pub fn table_mut(&mut self, name: &str) -> DbResult<&mut TableMeta> {
        let id = self
            .table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        self.tables
            .get_mut(id)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    fn rebuild_indexes(&mut self) {
        self.table_name_index.clear();
        self.table_id_index.clear();
        for (idx, table) in self.tables.iter_mut().enumerate() {
            self.table_name_index.insert(table.name.clone(), idx);
            self.table_id_index.insert(table.id, idx);
            table.rebuild_index_lookup();
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_column_set(schema: &TableSchema, columns: &[ColumnId], clause: &str) -> DbResult<()> {
    if columns.is_empty() {
        return Err(DbError::Catalog(format!("{clause} must name at least one column")));
    }
    for &ordinal in columns {
        if schema.columns.get(ordinal as usize).is_none() {
            return Err(DbError::Catalog(format!(
                "{clause} references out-of-range column ordinal {ordinal}"
            )));
        }
    }
    Ok(())
}

/// On-delete / on-update policy for a foreign key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    Restrict,
    Cascade,
    SetNull,
}

/// A foreign key constraint definition, as supplied to `add_foreign_key`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub ref_table: String,
    pub ref_columns: Vec<ColumnId>,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

/// Cardinality used for tables that haven't been `ANALYZE`d yet; picked
/// to keep the cost-based planner's join ordering from collapsing to a
/// tie when every table looks equally (un)informed.
fn default_row_count_estimate() -> u64 {
    1000
}

/// Per-column distinct-value estimate, refreshed by `ANALYZE` (spec.md
/// §4.3's `TableStats{..., histogram-or-summary per column}`, scoped here
/// to a single scalar since this engine keeps no full histogram).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ColumnStats {
    pub distinct_count: u64,
}

/// Fallback distinct-count used by equality selectivity when a column
/// hasn't been `ANALYZE`d yet (SPEC_FULL.md §9 resolution #2's
/// "distinct_or_10").
pub const DEFAULT_DISTINCT_COUNT: u64 = 10;

/// Metadata describing a registered table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableMeta {
    pub id: TableId,
    pub name: String,
    pub schema: TableSchema,
    pub storage: StorageDescriptor,
    pub indexes: Vec<IndexMeta>,
    /// Ordinals forming the table's single PRIMARY KEY, if declared.
    pub primary_key: Option<Vec<ColumnId>>,
    /// Additional UNIQUE candidate keys beyond the primary key.
    pub unique_keys: Vec<Vec<ColumnId>>,
    /// Foreign keys this table declares against other tables.
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Non-owning set of table names whose foreign keys reference this
    /// table, kept so RESTRICT/CASCADE/SET_NULL enforcement and DROP TABLE
    /// don't need a full catalog scan to find dependents.
    #[serde(default)]
    pub referenced_by: Set<String>,
    /// Row-count estimate used by the cost-based planner's join
    /// enumeration; refreshed by `ANALYZE`, defaulted otherwise.
    #[serde(default = "default_row_count_estimate")]
    pub row_count_estimate: u64,
    /// Per-column distinct-value estimate, indexed by `ColumnId`, used for
    /// `=`/`!=` selectivity (SPEC_FULL.md §9 resolution #2). Empty until
    /// `ANALYZE` runs; missing entries fall back to `DEFAULT_DISTINCT_COUNT`.
    #[serde(default)]
    pub column_stats: Vec<ColumnStats>,
    #[serde(skip)]
    #[serde(default)]
    index_name_lookup: Map<String, usize>,
    #[serde(skip)]
    #[serde(default)]
    index_id_lookup: Map<IndexId, usize>,
}

impl TableMeta {
    fn new(
        id: TableId,
        name: String,
        schema: TableSchema,
        primary_key: Option<Vec<ColumnId>>,
    ) -> Self {
        let mut table = Self {
            id,
            name,
            schema,
            storage: StorageDescriptor::new(),
            indexes: Vec::new(),
            primary_key,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
            referenced_by: Set::default(),
            row_count_estimate: default_row_count_estimate(),
            column_stats: Vec::new(),
            index_name_lookup: Map::default(),
            index_id_lookup: Map::default(),
        };
        table.rebuild_index_lookup();
        table
    }

    fn add_index(&mut self, index: IndexMeta) -> DbResult<()> {
        if self.index_name_lookup.contains_key(&index.name) {
            return Err(DbError::Catalog(format!(
                "index '{}' already exists on table '{}'",
                index.name, self.name
            )));
        }
        self.indexes.push(index);
        self.rebuild_index_lookup();
        Ok(())
    }

    fn remove_index(&mut self, index_name: &str) -> DbResult<()> {
        let idx = self
            .index_name_lookup
            .get(index_name)
            .copied()
            .ok_or_else(|| {
                DbError::Catalog(format!(
                    "index '{index_name}' does not exist on table '{}'",
                    self.name
                ))
            })?;
        self.indexes.remove(idx);
        self.rebuild_index_lookup();
        Ok(())
    }

    /// Lookup an index by name.
    pub fn index(&self, name: &str) -> DbResult<&IndexMeta> {
        let idx = self.index_name_lookup.get(name).copied().ok_or_else(|| {
            DbError::Catalog(format!(
                "index '{name}' does not exist on table '{}'",
                self.name
            ))
        })?;
        self.indexes
            .get(idx)
            .ok_or_else(|| DbError::Catalog(format!("index '{name}' missing on '{}'", self.name)))
    }

    /// Lookup an index by identifier.
    pub fn index_by_id(&self, id: IndexId) -> DbResult<&IndexMeta> {
        let idx = self.index_id_lookup.get(&id).copied().ok_or_else(|| {
            DbError::Catalog(format!("unknown index id {} on '{}'", id.0, self.name))
        })?;
        self.indexes.get(idx).ok_or_else(|| {
            DbError::Catalog(format!(
                "index id {} missing in table '{}'",
                id.0, self.name
            ))
        })
    }

    /// Returns true if an index with the provided name exists.
    pub fn has_index(&self, index_name: &str) -> bool {
        self.index_name_lookup.contains_key(index_name)
    }

    /// Returns all indexes defined on this table.
    pub fn indexes(&self) -> &[IndexMeta] {
        &self.indexes
    }

    /// Whether `columns` (in this order) exactly matches the primary key or
    /// one of the declared UNIQUE candidate keys.
    pub fn is_candidate_key(&self, columns: &[ColumnId]) -> bool {
        if self.primary_key.as_deref() == Some(columns) {
            return true;
        }
        self.unique_keys.iter().any(|uk| uk.as_slice() == columns)
    }

    /// All candidate keys declared on this table (primary key first).
    pub fn candidate_keys(&self) -> impl Iterator<Item = &[ColumnId]> {
        self.primary_key
            .iter()
            .map(|v| v.as_slice())
            .chain(self.unique_keys.iter().map(|v| v.as_slice()))
    }

    /// Records a fresh cardinality estimate, as taken by `ANALYZE`.
    pub fn set_row_count_estimate(&mut self, n: u64) {
        self.row_count_estimate = n;
    }

    /// Records fresh per-column distinct-value estimates, as taken by
    /// `ANALYZE`. `stats[i]` describes column ordinal `i`.
    pub fn set_column_stats(&mut self, stats: Vec<ColumnStats>) {
        self.column_stats = stats;
    }

    /// Distinct-value estimate for `col`, falling back to
    /// `DEFAULT_DISTINCT_COUNT` when the column hasn't been `ANALYZE`d.
    pub fn distinct_count(&self, col: ColumnId) -> u64 {
        self.column_stats
            .get(col as usize)
            .map(|s| s.distinct_count.max(1))
            .unwrap_or(DEFAULT_DISTINCT_COUNT)
    }

    fn rebuild_index_lookup(&mut self) {
        self.index_name_lookup.clear();
        self.index_id_lookup.clear();
        for (idx, index) in self.indexes.iter().enumerate() {
            self.index_name_lookup.insert(index.name.clone(), idx);
            self.index_id_lookup.insert(index.id, idx);
        }
    }
}

/// Column layout for a table, along with helpful lookup structures.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub name_to_ordinal: Map<String, ColumnId>,
}

impl TableSchema {
    pub fn try_new(columns: Vec<Column>) -> DbResult<Self> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "table must contain at least one column".into(),
            ));
        }
        if columns.len() > u16::MAX as usize {
            return Err(DbError::Catalog(
                "too many columns for a single table".into(),
            ));
        }
        let mut name_to_ordinal = Map::default();
        for (idx, column) in columns.iter().enumerate() {
            let ordinal = idx as ColumnId;
            if name_to_ordinal
                .insert(column.name.clone(), ordinal)
                .is_some()
            {
                return Err(DbError::Catalog(format!(
                    "duplicate column '{}' found while building schema",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            name_to_ordinal,
        })
    }

    /// Returns the ordinal for a column name.
    pub fn column_index(&self, name: &str) -> Option<ColumnId> {
        self.name_to_ordinal.get(name).copied()
    }

    /// Returns the columns of this schema in ordinal order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the SQL type for the provided ordinal.
    pub fn column_type(&self, ordinal: ColumnId) -> Option<&SqlType> {
        self.columns.get(ordinal as usize).map(|c| &c.ty)
    }

    /// Returns whether the column at `ordinal` rejects NULL values.
    pub fn is_not_null(&self, ordinal: ColumnId) -> bool {
        self.columns
            .get(ordinal as usize)
            .map(|c| c.not_null)
            .unwrap_or(false)
    }
}

/// Describes a logical column within a table schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
    /// Whether this column rejects NULL values on insert/update.
    #[serde(default)]
    pub not_null: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            not_null: false,
        }
    }

    pub fn not_null(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            not_null: true,
        }
    }
}

/// Metadata describing a table index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub id: IndexId,
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub kind: IndexKind,
    pub storage: StorageDescriptor,
}

/// Supported index implementations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Hash,
    Bitmap,
    Trie,
}

/// Links catalog entries to physical storage artifacts, such as heap files.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageDescriptor {
    pub file_id: Uuid,
}

impl StorageDescriptor {
    pub fn new() -> Self {
        Self {
            file_id: Uuid::new_v4(),
        }
    }
}

impl Default for StorageDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
