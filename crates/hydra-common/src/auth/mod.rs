//! Authentication primitives

mod jwt;
mod password;

pub use jwt::{Claims, TokenIssuer, TokenType};
pub use password::{validate_password_strength, Argon2Hasher, PasswordHasher, PasswordService};
