pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, CurrentActor};
