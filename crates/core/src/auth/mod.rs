//! Password hashing for account credentials.
//!
//! Roles and their permissions live in [`crate::access`]; this module only
//! deals with turning plaintext passwords into stored hashes and back.

mod password;

pub use password::{MIN_PASSWORD_LEN, PasswordError, hash_password, verify_password};
