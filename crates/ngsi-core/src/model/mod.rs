//! Dialect-neutral data model
//!
//! Everything here lives for a single request/response exchange; nothing is
//! cached or mutated after construction.

pub mod attribute;
pub mod flags;
pub mod pagination;
pub mod subscription;
pub mod version;

pub use attribute::{Attribute, AttributePayload, MetadataAttribute, TemporalKind};
pub use flags::TransformFlags;
pub use pagination::PageWindow;
pub use subscription::{
    EntityFilter, LdEndpoint, LdNotificationParams, LdSubscription, V2Condition, V2Expression,
    V2HttpCustom, V2Notification, V2Subject, V2Subscription,
};
pub use version::{SpecVersion, VersionContext};
