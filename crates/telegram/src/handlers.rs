//! Mapping of Telegram updates to channel events.

use {
    mediaferry_channels::{ChannelEventSink, ChatEvent, InboundEvent},
    teloxide::{
        prelude::*,
        types::{CallbackQuery, Message},
    },
    tracing::{debug, warn},
};

/// Convert a message into an event. Non-text messages yield `None`.
pub fn message_event(msg: &Message) -> Option<InboundEvent> {
    let text = msg.text()?;
    let event = if is_start_command(text) {
        ChatEvent::Start
    } else {
        ChatEvent::Text(text.to_string())
    };
    Some(InboundEvent {
        chat_id: msg.chat.id.0.to_string(),
        username: msg.from.as_ref().and_then(|u| u.username.clone()),
        event,
    })
}

/// `/start`, `/start@SomeBot` and `/start <payload>` all restart the dialogue.
fn is_start_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    let name = command.split('@').next().unwrap_or(command);
    name == "/start"
}

/// Convert an inline-button press into an event.
pub fn callback_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.as_deref()?;
    let chat_id = query.message.as_ref().map(|m| m.chat().id)?;
    Some(InboundEvent {
        chat_id: chat_id.0.to_string(),
        username: query.from.username.clone(),
        event: ChatEvent::Selection(data.to_string()),
    })
}

pub async fn handle_message(msg: &Message, sink: &dyn ChannelEventSink) {
    match message_event(msg) {
        Some(event) => sink.dispatch(event).await,
        None => debug!(chat_id = msg.chat.id.0, "ignoring non-text telegram message"),
    }
}

pub async fn handle_callback_query(query: &CallbackQuery, bot: &Bot, sink: &dyn ChannelEventSink) {
    // Answer first to dismiss the loading spinner, even for stale buttons.
    if let Err(e) = bot.answer_callback_query(&query.id).await {
        warn!(error = %e, "failed to answer telegram callback query");
    }
    match callback_event(query) {
        Some(event) => sink.dispatch(event).await,
        None => debug!(callback_data = ?query.data, "ignoring callback query without chat"),
    }
}
