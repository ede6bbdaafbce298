use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record
///
/// One opaque row of a managed table, keyed by column name. The console never
/// interprets the values; it only renders and passes them through.
pub type Record = Map<String, Value>;

/// Number of rows shown per grid page.
pub const PAGE_SIZE: i64 = 20;

// --- Record Type Registry ---

/// Capabilities
///
/// What the admin surface may do with a record type. Disabled actions are hidden
/// from the screens and refused by the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_view_details: bool,
}

impl Capabilities {
    pub const FULL: Self = Self {
        can_create: true,
        can_edit: true,
        can_delete: true,
        can_view_details: true,
    };

    pub const READ_ONLY: Self = Self {
        can_create: false,
        can_edit: false,
        can_delete: false,
        can_view_details: true,
    };
}

/// RecordType
///
/// Binds one external table to the admin surface. `slug` is the URL segment
/// (`/admin/{slug}/`), `table` and `primary_key` are the SQL identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordType {
    pub slug: &'static str,
    pub name: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    pub capabilities: Capabilities,
}

impl RecordType {
    pub const fn new(slug: &'static str, name: &'static str, table: &'static str) -> Self {
        Self {
            slug,
            name,
            table,
            primary_key: "id",
            capabilities: Capabilities::FULL,
        }
    }

    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// The thirteen Lawly tables exposed by the console, in menu order.
pub const LAWLY_RECORD_TYPES: [RecordType; 13] = [
    RecordType::new("document", "Document", "documents"),
    RecordType::new("documentcreation", "Document Creation", "document_creations"),
    RecordType::new("documentreview", "Document Review", "document_reviews"),
    RecordType::new("field", "Field", "fields"),
    RecordType::new("lawyer", "Lawyer", "lawyers"),
    RecordType::new("lawyerrequest", "Lawyer Request", "lawyer_requests"),
    RecordType::new("message", "Message", "messages"),
    RecordType::new("payment", "Payment", "payments"),
    RecordType::new("refreshsession", "Refresh Session", "refresh_sessions"),
    RecordType::new("subscribe", "Subscribe", "subscribes"),
    RecordType::new("tariff", "Tariff", "tariffs"),
    RecordType::new("template", "Template", "templates"),
    RecordType::new("user", "User", "users"),
];

/// Registry
///
/// The explicit list of record types bound to the admin surface. Held in the
/// application state so the binding can be inspected, and replaced in tests,
/// independently of process start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    types: Vec<RecordType>,
}

impl Registry {
    pub fn new(types: Vec<RecordType>) -> Self {
        Self { types }
    }

    pub fn lawly() -> Self {
        Self::new(LAWLY_RECORD_TYPES.to_vec())
    }

    /// Resolves a URL slug to its record type.
    pub fn lookup(&self, slug: &str) -> Option<&RecordType> {
        self.types.iter().find(|record_type| record_type.slug == slug)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::lawly()
    }
}

// --- Store Schemas ---

/// Column
///
/// Column metadata used to build the grid header and the edit forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: &str, data_type: &str, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
        }
    }
}

/// PageRequest
///
/// Zero-based page index into a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * PAGE_SIZE
    }
}

/// Page
///
/// One page of records plus the total row count of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total: i64,
    pub page: u32,
}

impl Page {
    pub fn page_count(&self) -> u32 {
        let pages = (self.total + PAGE_SIZE - 1) / PAGE_SIZE;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.page_count()
    }
}

/// display_value
///
/// Renders a JSON cell for HTML output: NULL becomes empty, strings are shown
/// without quotes, everything else uses its JSON form.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
