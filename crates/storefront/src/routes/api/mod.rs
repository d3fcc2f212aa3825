//! JSON API endpoints.

pub mod email;
