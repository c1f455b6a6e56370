//! Core types, parsing, and collaborator traits for the backblast miner.

pub mod checkpoint;
pub mod directory;
pub mod error;
pub mod ids;
pub mod label;
pub mod limits;
pub mod mention;
pub mod message;
pub mod parser;
pub mod record;
pub mod region;
pub mod report;
pub mod traits;

pub use checkpoint::*;
pub use directory::*;
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use ids::*;
pub use label::{FieldLabel, REQUIRED_LABELS};
pub use message::*;
pub use parser::{BackblastParser, ParseInput, ParserConfig};
pub use record::BackblastRecord;
pub use region::*;
pub use report::*;
pub use traits::*;
