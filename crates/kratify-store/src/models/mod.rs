mod address;
mod user;

pub use address::{ADDRESS_COLUMNS, ADDRESSES, Address, AddressChanges, NewAddress};
pub use user::{NewUser, USER_COLUMNS, USERS, User, UserChanges};
