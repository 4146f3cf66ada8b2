//! # callboard
//!
//! Lead management for a cold-calling operation. Admins import prospect lists
//! and hand them to callers; callers log call outcomes and book appointments;
//! admins read aggregate performance metrics.
//!
//! Every operation is a free function over a [`Repository`], so the same
//! rules apply whichever database (local file or managed) serves it.

pub mod appointments;
pub mod callers;
pub mod calls;
pub mod errors;
pub mod leads;
pub mod metrics;
pub mod providers;
pub mod scripts;
pub mod specialty;
pub mod types;
pub mod users;

pub use errors::{CrmError, RepoError};
pub use providers::db::repository::Repository;
