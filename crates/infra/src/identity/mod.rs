//! `IdentityStore` backends.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryIdentityStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresIdentityStore;
