//! Authentication module
//!
//! - Password login backed by bcrypt hashes
//! - JWT access and refresh token generation and validation

mod jwt;
mod password;
mod service;

pub use jwt::{
    generate_access_token, generate_refresh_token, verify_token, verify_token_of_type, Claims,
    JwtError, TokenType,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::AuthService;
