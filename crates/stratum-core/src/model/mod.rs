pub mod change;
pub mod document;
pub mod patch;
pub mod value;

pub use change::{ChangeEntry, ChangeKind};
pub use document::{Document, SubjectNode, SystemMetadata};
pub use patch::{PredicatePatch, SubjectPatch, SubjectUpdates};
pub use value::Value;
