//! Authentication core: password hashing and stateless session tokens

pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod secret;

pub use cookie::SessionCookie;
pub use jwt::{Claims, ExpiryPolicy, IssuedToken, JwtService, PrincipalId, TokenError};
pub use middleware::{extract_token, jwt_auth_middleware, AuthContext};
pub use password::PasswordHasher;
pub use secret::{EnvSecretProvider, SecretProvider};
