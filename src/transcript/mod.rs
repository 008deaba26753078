//! Transcript handling: XML extraction and row types.

mod parser;
mod types;

pub use parser::{decode_xml_entities, parse};
pub use types::{
    Conversation, SHEET_CELL_LIMIT, TRANSCRIPT_HEADERS, TRUNCATION_MARKER, Transcript, Turn,
    TurnRow, truncate_cell,
};
