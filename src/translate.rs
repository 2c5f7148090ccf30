//! Translation from wire messages to provider messages
//!
//! Providers only know two sides of a conversation. `user` messages become
//! provider user messages; every other role (assistant, system, tool) is sent
//! as an assistant message. System prompts therefore reach the model as prior
//! assistant turns.

use crate::chat::{ChatMessage, Role};
use crate::provider::ProviderMessage;

/// Translate one wire message, normalizing its content
pub fn translate_message(message: &ChatMessage) -> ProviderMessage {
    let content = message.content.normalize();
    match message.role {
        Role::User => ProviderMessage::user(content),
        Role::Assistant | Role::System | Role::Tool => ProviderMessage::assistant(content),
    }
}

/// Translate a conversation, preserving order 1:1
pub fn translate_messages(messages: &[ChatMessage]) -> Vec<ProviderMessage> {
    messages.iter().map(translate_message).collect()
}
