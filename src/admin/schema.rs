//! Registry of tables the admin panel can operate on.
//!
//! Every registered table gets a descriptor: its ordered columns with a type
//! tag each, plus the dependent rows to remove before deleting one of its own.
//! The CRUD engine dispatches on these descriptors only; adding a table to the
//! panel means adding a descriptor here, not writing new endpoint code.

/// Basic value shape of a column, drives string coercion of form input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

/// Child rows that must go before a parent row: `DELETE FROM table WHERE
/// column = <parent id>`.
#[derive(Debug)]
pub struct Cascade {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub cascades: &'static [Cascade],
}

const TABLES: &[TableDescriptor] = &[
    TableDescriptor {
        name: "users",
        columns: &[
            Column {
                name: "id",
                ty: ColumnType::Integer,
            },
            Column {
                name: "email",
                ty: ColumnType::Text,
            },
            Column {
                name: "hashed_password",
                ty: ColumnType::Text,
            },
        ],
        cascades: &[Cascade {
            table: "items",
            column: "user_id",
        }],
    },
    TableDescriptor {
        name: "items",
        columns: &[
            Column {
                name: "id",
                ty: ColumnType::Integer,
            },
            Column {
                name: "name",
                ty: ColumnType::Text,
            },
            Column {
                name: "user_id",
                ty: ColumnType::Integer,
            },
        ],
        cascades: &[],
    },
];

pub fn tables() -> &'static [TableDescriptor] {
    TABLES
}

pub fn lookup(name: &str) -> Option<&'static TableDescriptor> {
    TABLES.iter().find(|t| t.name == name)
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}
