//! Column definitions

use serde::Serialize;

/// Target of a foreign key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKey {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ForeignKey {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

/// A table column.
///
/// Base-table columns come from the catalog. Columns of derived tables (the
/// output of a SELECT) also record which referenced table they came from and
/// whether their value is constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name (normalized)
    pub name: String,
    /// SQL type text, e.g. `integer` or `character varying`
    pub data_type: String,
    /// Numeric precision
    pub precision: Option<u32>,
    /// Numeric scale
    pub scale: Option<u32>,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Foreign key target
    pub foreign_key: Option<ForeignKey>,
    /// Index into the owning SELECT's referenced tables, for derived columns
    pub table_idx: Option<usize>,
    /// Whether the value is the same on every row, for derived columns
    pub constant: bool,
}

impl Column {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            precision: None,
            scale: None,
            nullable: true,
            foreign_key: None,
            table_idx: None,
            constant: false,
        }
    }

    /// Set numeric precision and scale
    pub fn with_precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    /// Set nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark the column NOT NULL
    pub fn not_null(self) -> Self {
        self.with_nullable(false)
    }

    /// Set the foreign key target
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_key = Some(foreign_key);
        self
    }

    /// Set the originating table index
    pub fn with_table_idx(mut self, table_idx: Option<usize>) -> Self {
        self.table_idx = table_idx;
        self
    }

    /// Set constancy
    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    /// Returns true if the column references another table
    pub fn is_foreign_key(&self) -> bool {
        self.foreign_key.is_some()
    }
}
