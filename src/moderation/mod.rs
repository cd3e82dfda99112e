/// Moderation core
///
/// Status transitions for listings and user accounts, bulk application of
/// admin actions, and the append-only audit trail.

pub mod action;
pub mod audit;
pub mod bulk;
pub mod engine;
pub mod entity;
pub mod owners;

pub use action::{parse_suspension_duration, ActionPayload, ActionRequest, AdminAction};
pub use bulk::{BulkActionCoordinator, BulkFailure, BulkResult, PayloadResolver};
pub use engine::{AuditPolicy, StatusTransitionEngine};
pub use entity::{
    AccountStatus, AuditEntry, AuditLog, EntityKind, EntityState, ListingStatus,
    ModeratableEntity,
};
pub use owners::{
    distinct_owners, owner_comment_sheet, InMemoryOwnerDirectory, OwnerCommentRow,
    OwnerDirectory, OwnerProfile,
};
