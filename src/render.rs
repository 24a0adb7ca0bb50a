//! HTML fragment builders for the web UI.
//!
//! Model output is inserted unescaped, mirroring the upstream behavior this
//! service reproduces. The integration tests pin that pass-through.

use crate::session::{ChatRole, ChatTurn};

pub fn analysis_block(text: &str) -> String {
    format!("<div class=\"response-box\">{}</div>", text)
}

pub fn suggestion_block(text: &str) -> String {
    format!("<div class=\"meal-suggestion-box\">{}</div>", text)
}

pub fn chat_bubble(turn: &ChatTurn) -> String {
    let class = match turn.role {
        ChatRole::User => "chat-message user-message",
        ChatRole::Assistant => "chat-message bot-message",
    };
    format!("<div class=\"{}\">{}</div>", class, turn.content)
}
