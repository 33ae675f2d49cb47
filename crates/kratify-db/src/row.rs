//! Row mapping traits and utilities

use crate::error::{DbError, DbResult};
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// Trait for converting a database row into a Rust struct.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> DbResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning DbError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> DbResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> DbResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| DbError::decode(column, e.to_string()))
    }
}

/// Implement [`FromRow`] by reading each listed field from the column of the
/// same name.
///
/// ```ignore
/// kratify_db::impl_from_row!(Account { id, email, created_at });
/// ```
#[macro_export]
macro_rules! impl_from_row {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $crate::FromRow for $ty {
            fn from_row(row: &$crate::tokio_postgres::Row) -> $crate::DbResult<Self> {
                use $crate::RowExt as _;
                Ok(Self {
                    $($field: row.try_get_column(stringify!($field))?,)+
                })
            }
        }
    };
}

/// Read a generated key from the first column of a `RETURNING` row as text.
///
/// Supports the key types a single-column primary key is usually declared
/// with: `uuid`, `int8`, `int4` and text.
pub(crate) fn returned_key(row: &Row) -> DbResult<String> {
    let column = row
        .columns()
        .first()
        .ok_or_else(|| DbError::decode("<returning>", "statement returned no columns"))?;
    let name = column.name();
    let ty = column.type_();

    key_to_string(row, name, ty)
}

fn key_to_string(row: &Row, name: &str, ty: &Type) -> DbResult<String> {
    let decode = |e: tokio_postgres::Error| DbError::decode(name, e.to_string());
    if *ty == Type::UUID {
        row.try_get::<_, uuid::Uuid>(0).map(|v| v.to_string()).map_err(decode)
    } else if *ty == Type::INT8 {
        row.try_get::<_, i64>(0).map(|v| v.to_string()).map_err(decode)
    } else if *ty == Type::INT4 {
        row.try_get::<_, i32>(0).map(|v| v.to_string()).map_err(decode)
    } else if *ty == Type::INT2 {
        row.try_get::<_, i16>(0).map(|v| v.to_string()).map_err(decode)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        row.try_get::<_, String>(0).map_err(decode)
    } else {
        Err(DbError::decode(name, format!("unsupported key type {ty}")))
    }
}
