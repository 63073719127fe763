//! Credential and session lifecycle core.
//!
//! The pieces compose as follows: the login path goes through the
//! [`limiter::LoginRateLimiter`] gate, then [`service::AuthService`], which
//! reads and writes the credential store and, on success, the
//! [`tokens::TokenService`] and the session store. Refresh and logout go
//! straight to the service. The [`sweeper`] runs on its own schedule against
//! the session store.
//!
//! All state lives behind the [`store`] traits; handlers receive explicit
//! service structs built once at process start, never module globals.

pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod tokens;

pub use clock::{Clock, SystemClock};
pub use config::AuthConfig;
pub use error::AuthError;
pub use limiter::LoginRateLimiter;
pub use service::AuthService;
pub use tokens::TokenService;
