pub mod aggregates;
pub mod errors;
pub mod repositories;
pub mod value_objects;

pub use aggregates::*;
pub use errors::ValidationError;
pub use repositories::*;
pub use value_objects::*;
