//! Dar Sellami admin library.
//!
//! Admin sign-in over a session guard, plus the order dashboard. Exposed as a
//! library so the integration tests can drive the guard and the routes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
