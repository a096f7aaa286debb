//! Authentication and authorization for Watchpost
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Explicit session context
//! - The row-level authorization policy

pub mod jwt;
pub mod password;
pub mod policy;
pub mod session;

pub use jwt::{
    extract_token_from_header, extract_token_from_query, Claims, JwtValidator,
    TokenValidationResult,
};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use policy::{filter_readable, is_allowed, read_scope, Caller, Operation, ReadScope, Table};
pub use session::Session;
