//! Content versioning for marketing content: decide whether an edit warrants
//! a new immutable version, and append it with optimistic concurrency.
//!
//! Stores, identity resolution and membership are injected as trait objects.
//! The in-memory implementations here back development and tests.

pub mod authoring;
pub mod identity;
pub mod membership;
pub mod policy;
pub mod store;

pub use authoring::{AuthoringService, EditOutcome};
pub use identity::{IdentityResolver, SessionIdentityResolver};
pub use membership::{InMemoryMembershipDirectory, MembershipDirectory};
pub use policy::VersioningPolicy;
pub use store::{ContentStore, InMemoryContentStore};
