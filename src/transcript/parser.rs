//! Tolerant extraction of conversations from Vault's XML transcript format.
//!
//! This is deliberately not a conforming XML parser. Vault archives can end in
//! truncated or otherwise malformed trailing content, so the document is
//! walked by splitting on literal opening tags and keeping only blocks whose
//! closing tag is present. Missing tags yield empty strings, never errors.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{Conversation, Transcript, Turn};

static RE_USER_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<User>\s*<Email>(.*?)</Email>\s*</User>").unwrap());
static RE_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<Prompt>(.*?)</Prompt>").unwrap());
static RE_PRIMARY_RESPONSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<PrimaryResponse>(.*?)</PrimaryResponse>").unwrap());

static RE_CONVERSATION_ID: LazyLock<Regex> = LazyLock::new(|| tag_regex("ConversationId"));
static RE_CONVERSATION_TOPIC: LazyLock<Regex> = LazyLock::new(|| tag_regex("ConversationTopic"));
static RE_REQUEST_ID: LazyLock<Regex> = LazyLock::new(|| tag_regex("RequestId"));
static RE_MODEL_VERSION: LazyLock<Regex> = LazyLock::new(|| tag_regex("ModelVersion"));
static RE_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| tag_regex("Timestamp"));
static RE_TEXT: LazyLock<Regex> = LazyLock::new(|| tag_regex("Text"));
static RE_RESPONSE_ID: LazyLock<Regex> = LazyLock::new(|| tag_regex("ResponseId"));

fn tag_regex(tag: &str) -> Regex {
    Regex::new(&format!("(?is)<{tag}[^>]*>(.*?)</{tag}>")).unwrap()
}

/// First-occurrence single-capture extraction; missing tag yields "".
fn extract_tag(text: &str, pattern: &Regex) -> String {
    pattern
        .captures(text)
        .map(|caps| decode_xml_entities(&caps[1]))
        .unwrap_or_default()
}

/// Decode the five standard XML entities (plus the numeric apostrophe).
pub fn decode_xml_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
}

/// Extract every complete conversation from the raw XML text.
pub fn parse(xml: &str) -> Transcript {
    let user_email = RE_USER_EMAIL
        .captures(xml)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut conversations = Vec::new();
    for block in xml.split("<Conversation>").skip(1) {
        if !block.contains("</Conversation>") {
            continue;
        }
        let id = extract_tag(block, &RE_CONVERSATION_ID);
        let topic = extract_tag(block, &RE_CONVERSATION_TOPIC).trim().to_string();

        let mut turns = Vec::new();
        // Turn numbers follow the split ordinal, so a dropped segment leaves
        // a gap rather than renumbering the survivors.
        for (ordinal, turn_block) in block.split("<ConversationTurn>").enumerate().skip(1) {
            if !turn_block.contains("</ConversationTurn>") {
                continue;
            }
            turns.push(parse_turn(turn_block, ordinal as u64));
        }
        conversations.push(Conversation { id, topic, turns });
    }

    Transcript {
        user_email,
        conversations,
    }
}

fn parse_turn(turn_block: &str, number: u64) -> Turn {
    let prompt_text = RE_PROMPT
        .captures(turn_block)
        .map(|caps| extract_tag(&caps[0], &RE_TEXT))
        .unwrap_or_default();

    let (response_id, response_text) = RE_PRIMARY_RESPONSE
        .captures(turn_block)
        .map(|caps| {
            let envelope = &caps[0];
            (
                extract_tag(envelope, &RE_RESPONSE_ID),
                extract_tag(envelope, &RE_TEXT),
            )
        })
        .unwrap_or_default();

    Turn {
        number,
        request_id: extract_tag(turn_block, &RE_REQUEST_ID),
        model_version: extract_tag(turn_block, &RE_MODEL_VERSION),
        timestamp: extract_tag(turn_block, &RE_TIMESTAMP),
        prompt_text,
        response_id,
        response_text,
    }
}
