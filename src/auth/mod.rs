//! # Authentication Module
//!
//! Token issuance and validation, password handling, and the middleware that
//! guards authenticated routes.

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
