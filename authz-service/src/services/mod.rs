pub mod audit;
pub mod authz;
pub mod error;
pub mod lockout;
pub mod session;
pub mod token;

pub use audit::AuditService;
pub use authz::{authorize, Authorizer, Decision, DenyReason, ResourceRef, TenantVisibility};
pub use error::ServiceError;
pub use lockout::LockoutService;
pub use session::{ActorContext, SessionService};
pub use token::{SessionClaims, TokenService};
