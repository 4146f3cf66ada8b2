pub mod middleware;

pub use middleware::{AdminUser, AuthenticatedUser};
