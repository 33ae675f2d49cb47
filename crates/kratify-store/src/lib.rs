//! # kratify-store
//!
//! Repositories for the `users` and `addresses` tables built on the
//! kratify-db statement builders. Every write stamps the audit columns,
//! deletes are soft unless [`UserRepository::purge`] is used, and lookups
//! never return soft-deleted rows.
//!
//! ```ignore
//! use kratify_store::{NewUser, UserRepository};
//!
//! let client = pool.get().await?;
//! let users = UserRepository::new(&client);
//! let id = users.create(new_user, Some(admin_id)).await?;
//! let user = users.find_by_id(id).await?;
//! ```

mod address_repository;
pub mod error;
pub mod models;
mod user_repository;

pub use address_repository::AddressRepository;
pub use error::{StoreError, StoreResult};
pub use models::{Address, AddressChanges, NewAddress, NewUser, User, UserChanges};
pub use user_repository::UserRepository;

#[cfg(test)]
mod tests;
