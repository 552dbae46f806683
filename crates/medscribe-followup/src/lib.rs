//! Medscribe Follow-Up
//!
//! Contextual question answering over a previously extracted record.
//!
//! A question is routed to one fragment of the record by keyword, in a
//! fixed priority order (diagnosis, medications, summary; summary is also
//! the fallback). The fragment and the question are then handed to the
//! generation provider.
//!
//! ```
//! use medscribe_domain::StructuredRecord;
//! use medscribe_followup::route;
//! use serde_json::json;
//!
//! let record: StructuredRecord = serde_json::from_value(json!({
//!     "report_content": { "treatment_plan": { "medications": ["A", "B"] } }
//! })).unwrap();
//! assert_eq!(route(&record, "What medications were prescribed?").as_str(), "A, B");
//! ```

#![warn(missing_docs)]

mod error;
mod responder;
mod router;

pub use error::FollowUpError;
pub use responder::{grounded_prompt, FollowUpAnswer, FollowUpResponder};
pub use router::{route, FollowUpContext, Topic};
