//! Telegram channel for mediaferry.
//!
//! Long-polls the Bot API with teloxide, feeds messages and inline-button
//! presses to a `ChannelEventSink`, and implements `ChannelOutbound` for
//! prompts, status edits and file uploads.

pub mod bot;
pub mod handlers;
pub mod outbound;

pub use {
    bot::{build_bot, connect, start_polling},
    outbound::TelegramOutbound,
};
