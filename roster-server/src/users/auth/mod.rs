pub mod handlers;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, TokenError, TokenPair, TokenService, TokenType};
pub use middleware::auth_middleware;
