//! Parsed transcript structure and its flat row form.

use crate::sheets::Cell;

/// Header row of a transcript spreadsheet. `TurnRow::to_cells` must produce
/// cells in exactly this order.
pub const TRANSCRIPT_HEADERS: [&str; 10] = [
    "User",
    "Conversation ID",
    "Conversation Topic",
    "Turn No.",
    "Request ID",
    "Model Version",
    "Timestamp",
    "Prompt",
    "Response ID",
    "Response",
];

/// Hard per-cell character budget of the sheet backend.
pub const SHEET_CELL_LIMIT: usize = 49_000;

/// Suffix appended to any text cell cut at the limit.
pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]";

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub user_email: String,
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub topic: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// 1-based ordinal of the turn's segment in the raw document, which can
    /// skip numbers when malformed segments are dropped.
    pub number: u64,
    pub request_id: String,
    pub model_version: String,
    pub timestamp: String,
    pub prompt_text: String,
    pub response_id: String,
    pub response_text: String,
}

/// One spreadsheet row per kept turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRow {
    pub user: String,
    pub conversation_id: String,
    pub conversation_topic: String,
    pub turn_number: u64,
    pub request_id: String,
    pub model_version: String,
    pub timestamp: String,
    pub prompt: String,
    pub response_id: String,
    pub response: String,
}

impl Transcript {
    pub fn rows(&self) -> Vec<TurnRow> {
        let mut rows = Vec::new();
        for conversation in &self.conversations {
            for turn in &conversation.turns {
                rows.push(TurnRow {
                    user: self.user_email.clone(),
                    conversation_id: conversation.id.clone(),
                    conversation_topic: conversation.topic.clone(),
                    turn_number: turn.number,
                    request_id: turn.request_id.clone(),
                    model_version: turn.model_version.clone(),
                    timestamp: turn.timestamp.clone(),
                    prompt: turn.prompt_text.clone(),
                    response_id: turn.response_id.clone(),
                    response: turn.response_text.clone(),
                });
            }
        }
        rows
    }
}

impl TurnRow {
    pub fn to_cells(&self) -> Vec<Cell> {
        vec![
            text_cell(&self.user),
            text_cell(&self.conversation_id),
            text_cell(&self.conversation_topic),
            Cell::Int(self.turn_number),
            text_cell(&self.request_id),
            text_cell(&self.model_version),
            text_cell(&self.timestamp),
            text_cell(&self.prompt),
            text_cell(&self.response_id),
            text_cell(&self.response),
        ]
    }
}

fn text_cell(value: &str) -> Cell {
    Cell::Text(truncate_cell(value))
}

/// Cap a text value at the sheet cell limit, marking the cut. Values at or
/// under the limit pass through unchanged.
pub fn truncate_cell(value: &str) -> String {
    if value.chars().count() <= SHEET_CELL_LIMIT {
        return value.to_string();
    }
    let mut out: String = value.chars().take(SHEET_CELL_LIMIT).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_only_past_the_limit() {
        let at_limit = "x".repeat(SHEET_CELL_LIMIT);
        assert_eq!(truncate_cell(&at_limit), at_limit);

        let over = "x".repeat(SHEET_CELL_LIMIT + 1);
        let truncated = truncate_cell(&over);
        assert_eq!(
            truncated.chars().count(),
            SHEET_CELL_LIMIT + TRUNCATION_MARKER.chars().count()
        );
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert!(truncated.starts_with(&"x".repeat(100)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let over: String = "é".repeat(SHEET_CELL_LIMIT + 5);
        let truncated = truncate_cell(&over);
        assert_eq!(
            truncated.chars().count(),
            SHEET_CELL_LIMIT + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn turn_number_cell_is_numeric_and_untruncated() {
        let row = TurnRow {
            user: "a@example.com".to_string(),
            conversation_id: "c1".to_string(),
            conversation_topic: "t".to_string(),
            turn_number: 7,
            request_id: String::new(),
            model_version: String::new(),
            timestamp: String::new(),
            prompt: "p".repeat(SHEET_CELL_LIMIT + 1),
            response_id: String::new(),
            response: String::new(),
        };
        let cells = row.to_cells();
        assert_eq!(cells.len(), TRANSCRIPT_HEADERS.len());
        assert_eq!(cells[3], Cell::Int(7));
        match &cells[7] {
            Cell::Text(prompt) => assert!(prompt.ends_with(TRUNCATION_MARKER)),
            other => panic!("expected text prompt cell, got {other:?}"),
        }
    }

    #[test]
    fn rows_flatten_conversations_in_order() {
        let transcript = Transcript {
            user_email: "a@example.com".to_string(),
            conversations: vec![
                Conversation {
                    id: "c1".to_string(),
                    topic: "first".to_string(),
                    turns: vec![
                        Turn {
                            number: 1,
                            request_id: "r1".to_string(),
                            model_version: String::new(),
                            timestamp: String::new(),
                            prompt_text: String::new(),
                            response_id: String::new(),
                            response_text: String::new(),
                        },
                        Turn {
                            number: 2,
                            request_id: "r2".to_string(),
                            model_version: String::new(),
                            timestamp: String::new(),
                            prompt_text: String::new(),
                            response_id: String::new(),
                            response_text: String::new(),
                        },
                    ],
                },
                Conversation {
                    id: "c2".to_string(),
                    topic: "second".to_string(),
                    turns: vec![Turn {
                        number: 1,
                        request_id: "r3".to_string(),
                        model_version: String::new(),
                        timestamp: String::new(),
                        prompt_text: String::new(),
                        response_id: String::new(),
                        response_text: String::new(),
                    }],
                },
            ],
        };
        let rows = transcript.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].conversation_id, "c1");
        assert_eq!(rows[2].conversation_id, "c2");
        assert_eq!(rows[2].request_id, "r3");
        assert!(rows.iter().all(|r| r.user == "a@example.com"));
    }
}
