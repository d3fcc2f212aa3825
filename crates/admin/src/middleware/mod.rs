//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Sign-in rate limit on `POST /auth/login`
//! 5. [`RequireAdmin`] on guarded handlers

pub mod auth;
pub mod rate_limit;
pub mod session;

pub use auth::{AdminAuthRejection, RequireAdmin};
pub use rate_limit::login_rate_limiter;
pub use session::{SessionStorage, create_session_layer};
