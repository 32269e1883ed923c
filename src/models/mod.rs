pub mod lead;
pub mod snapshot;

pub use lead::{
    Activity, ActivityNote, ActivityType, Lead, NewActivity, ParseActivityTypeError,
    ParsePriorityError, ParseStageError, Priority, Stage,
};
pub use snapshot::{LeadSnapshot, SnapshotError};
