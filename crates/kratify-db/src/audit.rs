//! Column names of the audit envelope.
//!
//! Tables that use soft delete or actor auditing are expected to declare:
//!
//! | column       | type                    |
//! |--------------|-------------------------|
//! | `id`         | single-column primary key |
//! | `created_at` | `timestamptz`           |
//! | `updated_at` | `timestamptz`           |
//! | `deleted_at` | `timestamptz NULL`      |
//! | `created_by` | actor id, nullable      |
//! | `updated_by` | actor id, nullable      |
//! | `deleted_by` | actor id, nullable      |

pub const PRIMARY_KEY: &str = "id";

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const DELETED_AT: &str = "deleted_at";

pub const CREATED_BY: &str = "created_by";
pub const UPDATED_BY: &str = "updated_by";
pub const DELETED_BY: &str = "deleted_by";

/// Predicate selecting rows that are not soft-deleted.
pub const NOT_DELETED: &str = "deleted_at IS NULL";
