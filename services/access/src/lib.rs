//! Granular access control (spec §4.K): JWT authentication layered with
//! company/facility-scoped role checks.

pub mod jwt;
pub mod rbac;
pub mod token;

pub use jwt::{AuthContext, Claims};
pub use rbac::AccessControl;
pub use token::generate_invite_token;
