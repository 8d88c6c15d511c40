//! Free-text reply parsing.
//!
//! Players answer with a single word, optionally followed by the session id
//! printed in the notification:
//!
//! ```text
//! sim
//! NÃO
//! confirmar 3f0c6a52-8d0e-4b8e-9a57-6d2b1f0e8c11
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::confirmation::ReplyIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub intent: ReplyIntent,
    pub session_id: Option<Uuid>,
}

/// Returns `None` for anything that is not an attendance answer, so regular
/// chat traffic is ignored.
pub fn parse_reply(text: &str) -> Option<ParsedReply> {
    let lowered = text.trim().to_lowercase();
    let mut words = lowered.split_whitespace();

    let command = words
        .next()?
        .trim_matches(|c: char| !c.is_alphanumeric());
    let intent = match command {
        "sim" | "confirmar" | "confirmo" => ReplyIntent::Confirm,
        "não" | "nao" | "recusar" | "recuso" => ReplyIntent::Decline,
        _ => return None,
    };

    let session_id = words.find_map(|word| {
        Uuid::parse_str(word.trim_matches(|c: char| !c.is_ascii_hexdigit() && c != '-')).ok()
    });

    Some(ParsedReply { intent, session_id })
}
