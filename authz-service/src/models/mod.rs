pub mod audit_event;
pub mod login_attempt;
pub mod organization;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;

pub use audit_event::{AuditEvent, AuditEventType, AuditOutcome};
pub use login_attempt::{LockState, LockoutPolicy, LoginAttempt};
pub use organization::{Organization, OrganizationResponse, OrganizationState};
pub use permission::{grants_for, Grant, Permission, PermissionScope};
pub use role::Role;
pub use session::{Session, SessionInfo};
pub use user::{User, UserResponse};
