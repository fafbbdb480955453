//! HTTP middleware stack for the restaurant API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (configured frontend origins, with credentials)
//!
//! Session checks are not a layer: protected handlers take the
//! [`RequireSession`] extractor.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{PurchaseAccess, RequireSession, authorize_purchase_query};
pub use request_id::request_id_middleware;
pub use session::{TOKEN_COOKIE_NAME, cleared_session_cookie, session_cookie, token_from_headers};
