//! Statement builders.
//!
//! Each builder accumulates clauses through chained calls and is consumed by
//! a single terminal call: `build()` returns the SQL text with `$1, $2, ...`
//! placeholders and the argument list in the same order; `execute()` /
//! `fetch_*()` build and run it through a [`crate::GenericClient`].
//!
//! # Usage
//!
//! ```ignore
//! use kratify_db::{params, qb, MutationQb, SqlQb};
//!
//! // SELECT
//! let users = qb::select("users")
//!     .where_("email = ?", params![email])
//!     .where_raw("deleted_at IS NULL")
//!     .limit(1)
//!     .fetch_opt::<User>(&client)
//!     .await?;
//!
//! // INSERT, returning the generated id
//! let id = qb::insert("users")
//!     .set("email", email)
//!     .set_created_by(actor)
//!     .execute(&client)
//!     .await?;
//!
//! // UPDATE
//! qb::update("users")
//!     .set("name", name)
//!     .set_updated_by(actor)
//!     .where_("id = ?", params![id])
//!     .execute(&client)
//!     .await?;
//!
//! // Soft DELETE (UPDATE ... SET deleted_at)
//! qb::delete("users")
//!     .where_("id = ?", params![id])
//!     .set_deleted_by(actor)
//!     .execute(&client)
//!     .await?;
//! ```

mod bulk;
mod delete;
mod expr;
mod insert;
mod page;
mod param;
mod select;
mod traits;
mod update;

pub use bulk::BulkInsertQb;
pub use delete::{DeleteMode, DeleteQb};
pub use expr::{Expr, ExprGroup};
pub use insert::InsertQb;
pub use page::Page;
pub use param::{Param, ParamList};
pub use select::SelectQb;
pub use traits::{BuiltQuery, MutationQb, SqlQb};
pub use update::UpdateQb;

/// Create a SELECT builder for the given table (or `table alias`).
///
/// # Example
/// ```ignore
/// let qb = kratify_db::qb::select("users u").left_join("addresses a", "a.user_id = u.id");
/// ```
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create an INSERT builder for the given table.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create a multi-row INSERT builder.
pub fn bulk_insert(table: &str, columns: &[&str]) -> BulkInsertQb {
    BulkInsertQb::new(table, columns)
}

/// Create an UPDATE builder for the given table.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE builder for the given table.
///
/// Deletes are **soft** unless [`DeleteQb::hard_delete`] is called.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}
