#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod assembly;
pub mod determinacy;
pub mod errors;
pub mod geometry;
pub mod influence;
pub mod records;
pub mod recovery;
pub mod solver;
pub mod truss;

pub use analysis::{analyze, AnalysisOptions, AnalysisReport, AnalysisStatus, Solution};
pub use assembly::{assemble, member_frames, GlobalStiffness, MemberDetail, MemberFrame};
pub use determinacy::{check_determinacy, Determinacy};
pub use errors::{AnalysisError, PropertyError, RecordError, TrussEditError};
pub use geometry::{point, Displacement, Force, Point};
pub use influence::{load_path, InfluenceLineTable, InfluenceOrdinate, PathPosition, UNIT_LOAD};
pub use records::{Import, ProjectRecords, RecordTable, SkippedRecord};
pub use recovery::{ForceKind, MemberResult, NodeDisplacement, Reaction};
pub use solver::{ReducedSystem, RestrainedDofs};
pub use truss::{Axis, Load, MemberId, MemberView, NodeId, Property, PropertyId, SupportKind, Truss};
