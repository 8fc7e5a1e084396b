pub mod auth;
pub mod authz;
pub mod org;
pub mod user;
