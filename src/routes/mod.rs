// # Routes Module
//
// HTTP route handlers, one submodule per API area. Routers are assembled in
// `server.rs`.

/// Health check and monitoring endpoints
pub mod health;

/// Registration, login and current-user endpoints
pub mod auth;
