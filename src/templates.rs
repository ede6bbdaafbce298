//! Askama templates for the login page and the admin screens.

use askama::Template;

use crate::models::{Capabilities, Column, Page, Record, RecordType, Registry, display_value};

/// Menu entry for one record type
pub struct NavItem {
    pub slug: String,
    pub name: String,
}

/// Builds the navigation menu shared by every admin screen.
pub fn nav_items(registry: &Registry) -> Vec<NavItem> {
    registry
        .iter()
        .map(|record_type| NavItem {
            slug: record_type.slug.to_string(),
            name: record_type.name.to_string(),
        })
        .collect()
}

/// Login page template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Admin index template
#[derive(Template)]
#[template(path = "admin/index.html")]
pub struct IndexTemplate {
    pub nav: Vec<NavItem>,
}

/// One grid row: the percent-encoded record id plus its cells in column order
pub struct GridRow {
    pub path_id: String,
    pub cells: Vec<String>,
}

/// Encodes a record id as a single URL path segment.
pub fn path_segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Record grid template
#[derive(Template)]
#[template(path = "admin/list.html")]
pub struct ListTemplate {
    pub nav: Vec<NavItem>,
    pub slug: String,
    pub name: String,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_view_details: bool,
    pub columns: Vec<String>,
    pub rows: Vec<GridRow>,
    pub total: i64,
    pub page_number: u32,
    pub page_count: u32,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl ListTemplate {
    pub fn new(nav: Vec<NavItem>, record_type: &RecordType, columns: &[Column], page: &Page) -> Self {
        let Capabilities {
            can_create,
            can_edit,
            can_delete,
            can_view_details,
        } = record_type.capabilities;

        let rows = page
            .records
            .iter()
            .map(|record| GridRow {
                path_id: path_segment(&display_value(record.get(record_type.primary_key))),
                cells: columns
                    .iter()
                    .map(|column| display_value(record.get(&column.name)))
                    .collect(),
            })
            .collect();

        Self {
            nav,
            slug: record_type.slug.to_string(),
            name: record_type.name.to_string(),
            can_create,
            can_edit,
            can_delete,
            can_view_details,
            columns: columns.iter().map(|column| column.name.clone()).collect(),
            rows,
            total: page.total,
            page_number: page.page.saturating_add(1),
            page_count: page.page_count(),
            previous_page: page.has_previous().then(|| page.page - 1),
            next_page: page.has_next().then(|| page.page + 1),
        }
    }
}

/// Name/value pair on the details screen
pub struct FieldView {
    pub name: String,
    pub value: String,
}

/// Record details template
#[derive(Template)]
#[template(path = "admin/details.html")]
pub struct DetailsTemplate {
    pub nav: Vec<NavItem>,
    pub slug: String,
    pub name: String,
    pub id: String,
    pub path_id: String,
    pub can_edit: bool,
    pub can_delete: bool,
    pub fields: Vec<FieldView>,
}

impl DetailsTemplate {
    pub fn new(nav: Vec<NavItem>, record_type: &RecordType, id: &str, columns: &[Column], record: &Record) -> Self {
        Self {
            nav,
            slug: record_type.slug.to_string(),
            name: record_type.name.to_string(),
            id: id.to_string(),
            path_id: path_segment(id),
            can_edit: record_type.capabilities.can_edit,
            can_delete: record_type.capabilities.can_delete,
            fields: columns
                .iter()
                .map(|column| FieldView {
                    name: column.name.clone(),
                    value: display_value(record.get(&column.name)),
                })
                .collect(),
        }
    }
}

/// Editable input on the create/edit screens
pub struct FormField {
    pub name: String,
    pub data_type: String,
    pub value: String,
}

/// Create/edit form template
#[derive(Template)]
#[template(path = "admin/form.html")]
pub struct FormTemplate {
    pub nav: Vec<NavItem>,
    pub slug: String,
    pub heading: String,
    pub action: String,
    pub fields: Vec<FormField>,
}

impl FormTemplate {
    /// Empty form for a new record. The primary key is offered so tables without a
    /// generated key can still be filled in; left blank, the column default applies.
    pub fn create(nav: Vec<NavItem>, record_type: &RecordType, columns: &[Column]) -> Self {
        Self {
            nav,
            slug: record_type.slug.to_string(),
            heading: format!("Create {}", record_type.name),
            action: format!("/admin/{}/new", record_type.slug),
            fields: columns
                .iter()
                .map(|column| FormField {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                    value: String::new(),
                })
                .collect(),
        }
    }

    /// Form prefilled with an existing record. The primary key is not editable.
    pub fn edit(
        nav: Vec<NavItem>,
        record_type: &RecordType,
        id: &str,
        columns: &[Column],
        record: &Record,
    ) -> Self {
        Self {
            nav,
            slug: record_type.slug.to_string(),
            heading: format!("Edit {} {}", record_type.name, id),
            action: format!("/admin/{}/{}/edit", record_type.slug, path_segment(id)),
            fields: columns
                .iter()
                .filter(|column| column.name != record_type.primary_key)
                .map(|column| FormField {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                    value: display_value(record.get(&column.name)),
                })
                .collect(),
        }
    }
}
