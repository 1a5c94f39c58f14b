//! Member accounts and declared interests
//!
//! - **User**: a community account with a role and soft-deletion marker
//! - **Interest**: a keyword tag, unique across the community; the
//!   user/interest edges drive notification matching
//!
//! Deactivated accounts stay in the store forever; whether they appear in a
//! listing is an explicit `include_deactivated` choice at every call site,
//! never a hidden default filter.

pub mod interest;
pub mod manager;
pub mod user;

pub use interest::Interest;
pub use manager::{MemberError, MemberManager, MemberManagerImpl};
pub use user::User;
