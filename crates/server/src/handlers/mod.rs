//! # API Route Handlers
//!
//! The Axum route handlers for `callboard-server`, split into sub-modules by
//! resource. Each handler delegates to one `callboard` operation.

pub mod admin_handlers;
pub mod appointment_handlers;
pub mod auth_handlers;
pub mod caller_handlers;
pub mod general;
pub mod lead_handlers;
pub mod script_handlers;

pub use admin_handlers::*;
pub use appointment_handlers::*;
pub use auth_handlers::*;
pub use caller_handlers::*;
pub use general::*;
pub use lead_handlers::*;
pub use script_handlers::*;
