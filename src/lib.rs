//! Solfa: reads a music score laid out in spreadsheet cells, checks it
//! against the partition grammar and renders the bass and treble staves to
//! audio.

pub mod audio;
pub mod config;
pub mod notation;
pub mod recognition;
pub mod sheet;

pub use config::Config;
pub use notation::{Notation, ParseError, ParsedScore};
pub use sheet::Sheet;
