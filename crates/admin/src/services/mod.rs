//! Business logic services for admin.
//!
//! - `auth` - Admin Session Guard and password hashing
//! - `dashboard` - Order listing and statistics for the dashboard

pub mod auth;
pub mod dashboard;
