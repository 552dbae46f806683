//! Medscribe Domain Layer
//!
//! Value objects and trait interfaces shared by every other Medscribe crate.
//! Nothing in here performs I/O; infrastructure lives in the other crates.
//!
//! ## Key Concepts
//!
//! - **Task type**: which kind of medical report a request extracts from
//!   (free text or an image reference)
//! - **Schema descriptor**: the top-level fields a structured record must
//!   contain for a task type, with advisory nested shapes
//! - **Structured record**: the validated mapping produced by extraction
//! - **Generation provider**: the boundary to the generative text model

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod record;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use record::StructuredRecord;
pub use schema::{FieldShape, FieldSpec, SchemaDescriptor, TaskType};
pub use traits::GenerationProvider;
