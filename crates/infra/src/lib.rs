//! Infrastructure layer: identity store backends and the bootstrap seed.

pub mod identity;
pub mod seed;

pub use identity::InMemoryIdentityStore;
#[cfg(feature = "postgres")]
pub use identity::PostgresIdentityStore;
pub use seed::{SeedApp, SeedConfig, SeedError, SeedReport, SeedTarget, seed, seed_in_memory};
