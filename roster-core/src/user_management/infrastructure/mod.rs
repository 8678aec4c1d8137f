//! User store adapters.

mod memory;
#[cfg(feature = "database")]
mod postgres;

pub use memory::InMemoryUserRepository;
#[cfg(feature = "database")]
pub use postgres::PostgresUserRepository;
