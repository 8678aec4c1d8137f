// User management domain value objects
// These types are immutable and validated upon creation.

mod email;
mod user_role;
mod username;

pub use email::{Email, EmailError};
pub use user_role::{UnknownRole, UserRole};
pub use username::{Username, UsernameError};
