//! Thin HTTP/ops surface binding the platform's operations to an axum router. Everything here
//! is glue: no business logic lives below this module, only in `application`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod init;
pub mod router;
pub mod state;

pub use auth::AuthContext;
pub use init::run_server;
pub use router::build_router;
pub use state::AppState;
