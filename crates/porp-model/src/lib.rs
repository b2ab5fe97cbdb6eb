//! Porpoise Domain Model
//!
//! Plain values produced and consumed by the Porpoise container codec.
//!
//! # Core Concepts
//!
//! - [`ContainerHeader`]: the 25-character identification header
//!   (`PORPOISE_{BIN|TXT}/EXPORTFILE={T|F}`)
//! - [`RawFile`]: a container with its header removed but its payload still
//!   encoded
//! - [`SurveyDocument`] / [`ProjectDocument`]: object-graph artifacts
//! - [`TabularMatrix`]: row-major respondent data with a header row
//!
//! Nothing in this crate performs I/O; every value is built fresh by a
//! decode call and owned by the caller afterwards.
//!
//! # Example
//!
//! ```rust
//! use porp_model::{ContainerHeader, Variant};
//!
//! let header = ContainerHeader::new(Variant::Binary, false);
//! assert_eq!(header.render(), "PORPOISE_BIN/EXPORTFILE=F");
//! ```

mod header;
mod matrix;
mod project;
mod raw;
mod survey;

pub use header::{ContainerHeader, Variant, HEADER_LEN};
pub use matrix::{ShapeError, TabularMatrix};
pub use project::ProjectDocument;
pub use raw::RawFile;
pub use survey::{QuestionRecord, ResponseRecord, SurveyDocument};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
