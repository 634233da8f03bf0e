//! Shared domain types for the Syllabus publication core.
//!
//! Everything that more than one crate needs lives here: entity ids and
//! records, the publication status enum, the injectable clock, the
//! request-scoped actor, configuration and structured trace events.

pub mod actor;
pub mod clock;
pub mod config;
pub mod ids;
pub mod model;
pub mod status;
pub mod trace;

pub use actor::{Actor, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{AssetId, LessonId, ProgramId, TermId};
pub use model::{
    Asset, AssetOwner, AssetType, AssetVariant, ContentType, Lesson, Program, PublishTarget, Term,
};
pub use status::{EntityKind, Status};
