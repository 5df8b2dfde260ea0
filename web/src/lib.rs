//! Axum HTTP surface for the ticketing engine.
//!
//! Handlers are thin: extract the caller and the request, call one engine
//! operation, map the result. Identity comes from gateway-verified headers
//! (see [`extractors`]); domain errors become HTTP responses through
//! [`AppError`].
//!
//! # Example
//!
//! ```ignore
//! use ticketing_web::{AppState, router};
//!
//! let app = router(AppState::new(Arc::new(engine)));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{
    ApiJson, ApiPath, ApiQuery, AuthenticatedUser, USER_ID_HEADER, USER_ROLE_HEADER,
};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use router::router;
pub use state::AppState;
