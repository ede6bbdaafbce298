use crate::models::{Column, Page, PageRequest, PAGE_SIZE, Record, RecordType, display_value};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

/// StoreError
///
/// Failures of the persistent store. The admin surface does not recover from them;
/// they are logged and surfaced as a 500.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// RecordStore Trait
///
/// The generic pass-through contract behind every admin screen. Records are opaque
/// JSON rows; the store only knows a record type's table and primary key.
///
/// **Send + Sync + async_trait** let the trait object (`Arc<dyn RecordStore>`) live in
/// the shared application state.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Column metadata in ordinal order.
    async fn columns(&self, record_type: &RecordType) -> Result<Vec<Column>, StoreError>;
    /// One page of records ordered by primary key, with the table's total row count.
    async fn list(&self, record_type: &RecordType, page: PageRequest) -> Result<Page, StoreError>;
    async fn get(&self, record_type: &RecordType, id: &str) -> Result<Option<Record>, StoreError>;
    async fn create(&self, record_type: &RecordType, fields: Record) -> Result<Record, StoreError>;
    /// Returns `None` when no record has the given id.
    async fn update(
        &self,
        record_type: &RecordType,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError>;
    /// Returns true only if a row was actually deleted.
    async fn delete(&self, record_type: &RecordType, id: &str) -> Result<bool, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the store across the application state.
pub type RepositoryState = Arc<dyn RecordStore>;

// --- Field Preparation ---

/// WriteMode
///
/// Selects how submitted form values are mapped onto columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Empty values are dropped so column defaults (serial keys, timestamps) apply.
    Create,
    /// The primary key is never rewritten; empty values clear nullable columns.
    Update,
}

/// prepare_fields
///
/// Filters submitted fields down to the table's known columns and normalises empty
/// values. Column names in the result always come from `columns`, never from the
/// request, which is what makes them safe to splice into SQL as quoted identifiers.
pub fn prepare_fields(
    columns: &[Column],
    primary_key: &str,
    fields: &Record,
    mode: WriteMode,
) -> Record {
    let mut prepared = Record::new();

    for column in columns {
        if mode == WriteMode::Update && column.name == primary_key {
            continue;
        }
        let Some(value) = fields.get(&column.name) else {
            continue;
        };

        let is_empty = matches!(value, Value::Null) || value.as_str() == Some("");
        match (is_empty, mode) {
            (false, _) => {
                prepared.insert(column.name.clone(), coerce_value(column, value));
            }
            (true, WriteMode::Create) => {}
            (true, WriteMode::Update) if column.nullable => {
                prepared.insert(column.name.clone(), Value::Null);
            }
            (true, WriteMode::Update) => {
                prepared.insert(column.name.clone(), Value::String(String::new()));
            }
        }
    }

    prepared
}

/// coerce_value
///
/// Turns submitted form text back into the JSON shape `jsonb_populate_record`
/// expects for the column. `json`/`jsonb` and array columns are rendered as JSON
/// text on the forms, so their text is parsed back; text that does not parse is
/// passed through unchanged and left for Postgres to interpret (`{a,b}` array
/// literals, plain strings in a json column).
fn coerce_value(column: &Column, value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };

    let parsed = match column.data_type.as_str() {
        "json" | "jsonb" => serde_json::from_str::<Value>(text).ok(),
        "ARRAY" => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_array),
        _ => None,
    };

    parsed.unwrap_or_else(|| value.clone())
}

/// quote_ident
///
/// Quotes a SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// --- Postgres Implementation ---

/// PostgresRecordStore
///
/// `RecordStore` backed by the Lawly PostgreSQL database. Rows are fetched as
/// `to_jsonb(row)` and written through `jsonb_populate_record`, so Postgres performs
/// every text-to-column-type conversion.
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new store over the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn columns(&self, record_type: &RecordType) -> Result<Vec<Column>, StoreError> {
        let columns = sqlx::query_as::<_, Column>(
            r#"
            SELECT
                column_name::text AS name,
                data_type::text AS data_type,
                (is_nullable = 'YES') AS nullable
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
            "#,
        )
        .bind(record_type.table)
        .fetch_all(&self.pool)
        .await?;

        Ok(columns)
    }

    async fn list(&self, record_type: &RecordType, page: PageRequest) -> Result<Page, StoreError> {
        let table = quote_ident(record_type.table);
        let primary_key = quote_ident(record_type.primary_key);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT to_jsonb(r) FROM {table} AS r ORDER BY r.{primary_key}"));
        builder.push(" LIMIT ");
        builder.push_bind(PAGE_SIZE);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let rows: Vec<Value> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(Page {
            records: rows.into_iter().filter_map(into_record).collect(),
            total,
            page: page.page,
        })
    }

    async fn get(&self, record_type: &RecordType, id: &str) -> Result<Option<Record>, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(r) FROM {} AS r WHERE r.{}::text = $1",
            quote_ident(record_type.table),
            quote_ident(record_type.primary_key),
        );

        let row: Option<Value> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(into_record))
    }

    async fn create(&self, record_type: &RecordType, fields: Record) -> Result<Record, StoreError> {
        let columns = self.columns(record_type).await?;
        let prepared = prepare_fields(&columns, record_type.primary_key, &fields, WriteMode::Create);
        let table = quote_ident(record_type.table);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} AS r "));
        if prepared.is_empty() {
            builder.push("DEFAULT VALUES");
        } else {
            let column_list = prepared
                .keys()
                .map(|name| quote_ident(name))
                .collect::<Vec<_>>()
                .join(", ");
            builder.push(format!("({column_list}) SELECT {column_list} FROM jsonb_populate_record(NULL::{table}, "));
            builder.push_bind(Value::Object(prepared));
            builder.push(")");
        }
        builder.push(" RETURNING to_jsonb(r)");

        let row: Value = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(into_record(row).unwrap_or_default())
    }

    async fn update(
        &self,
        record_type: &RecordType,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError> {
        let columns = self.columns(record_type).await?;
        let prepared = prepare_fields(&columns, record_type.primary_key, &fields, WriteMode::Update);
        if prepared.is_empty() {
            return self.get(record_type, id).await;
        }

        let table = quote_ident(record_type.table);
        let assignments = prepared
            .keys()
            .map(|name| {
                let column = quote_ident(name);
                format!("{column} = p.{column}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "UPDATE {table} AS r SET {assignments} FROM jsonb_populate_record(NULL::{table}, "
        ));
        builder.push_bind(Value::Object(prepared));
        builder.push(format!(") AS p WHERE r.{}::text = ", quote_ident(record_type.primary_key)));
        builder.push_bind(id.to_string());
        builder.push(" RETURNING to_jsonb(r)");

        let row: Option<Value> = builder
            .build_query_scalar()
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(into_record))
    }

    async fn delete(&self, record_type: &RecordType, id: &str) -> Result<bool, StoreError> {
        let sql = format!(
            "DELETE FROM {} WHERE {}::text = $1",
            quote_ident(record_type.table),
            quote_ident(record_type.primary_key),
        );

        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

fn into_record(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

// --- In-Memory Implementation ---

/// MemoryRecordStore
///
/// In-process `RecordStore` used by the test suites in place of Postgres. It counts
/// every operation so tests can prove that a request never reached the store.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<HashMap<String, MemoryTable>>,
    operations: AtomicUsize,
}

#[derive(Default)]
struct MemoryTable {
    columns: Vec<Column>,
    rows: Vec<Record>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table and its columns.
    pub fn with_table(self, table: &str, columns: Vec<Column>) -> Self {
        self.lock().insert(
            table.to_string(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
        self
    }

    /// Seeds a row directly, bypassing the operation counter.
    pub fn seed(&self, table: &str, record: Record) {
        self.lock().entry(table.to_string()).or_default().rows.push(record);
    }

    /// Number of `RecordStore` calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

fn row_matches(row: &Record, primary_key: &str, id: &str) -> bool {
    display_value(row.get(primary_key)) == id
}

/// Orders primary keys the way Postgres would: integers numerically, anything
/// else by its text form.
fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a.and_then(Value::as_i64), b.and_then(Value::as_i64)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => display_value(a).cmp(&display_value(b)),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn columns(&self, record_type: &RecordType) -> Result<Vec<Column>, StoreError> {
        self.record_operation();
        Ok(self
            .lock()
            .get(record_type.table)
            .map(|table| table.columns.clone())
            .unwrap_or_default())
    }

    async fn list(&self, record_type: &RecordType, page: PageRequest) -> Result<Page, StoreError> {
        self.record_operation();
        let tables = self.lock();
        let Some(table) = tables.get(record_type.table) else {
            return Ok(Page {
                page: page.page,
                ..Page::default()
            });
        };

        let mut rows: Vec<&Record> = table.rows.iter().collect();
        rows.sort_by(|a, b| {
            compare_keys(a.get(record_type.primary_key), b.get(record_type.primary_key))
        });

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let records = rows
            .into_iter()
            .skip(offset)
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect();

        Ok(Page {
            records,
            total: table.rows.len() as i64,
            page: page.page,
        })
    }

    async fn get(&self, record_type: &RecordType, id: &str) -> Result<Option<Record>, StoreError> {
        self.record_operation();
        Ok(self.lock().get(record_type.table).and_then(|table| {
            table
                .rows
                .iter()
                .find(|row| row_matches(row, record_type.primary_key, id))
                .cloned()
        }))
    }

    async fn create(&self, record_type: &RecordType, fields: Record) -> Result<Record, StoreError> {
        self.record_operation();
        let mut tables = self.lock();
        let table = tables.entry(record_type.table.to_string()).or_default();

        let mut record =
            prepare_fields(&table.columns, record_type.primary_key, &fields, WriteMode::Create);
        // Mimics a serial key: one past the largest integer id present.
        if !record.contains_key(record_type.primary_key) {
            let next_id = table
                .rows
                .iter()
                .filter_map(|row| row.get(record_type.primary_key).and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            record.insert(record_type.primary_key.to_string(), Value::from(next_id));
        }

        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        record_type: &RecordType,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError> {
        self.record_operation();
        let mut tables = self.lock();
        let Some(table) = tables.get_mut(record_type.table) else {
            return Ok(None);
        };

        let prepared =
            prepare_fields(&table.columns, record_type.primary_key, &fields, WriteMode::Update);
        let Some(row) = table
            .rows
            .iter_mut()
            .find(|row| row_matches(row, record_type.primary_key, id))
        else {
            return Ok(None);
        };

        row.extend(prepared);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, record_type: &RecordType, id: &str) -> Result<bool, StoreError> {
        self.record_operation();
        let mut tables = self.lock();
        let Some(table) = tables.get_mut(record_type.table) else {
            return Ok(false);
        };

        let before = table.rows.len();
        table
            .rows
            .retain(|row| !row_matches(row, record_type.primary_key, id));
        Ok(table.rows.len() < before)
    }
}
