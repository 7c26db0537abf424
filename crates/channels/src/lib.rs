//! Messaging channel abstraction.
//!
//! A channel (Telegram today) turns platform updates into [`InboundEvent`]s
//! for a [`ChannelEventSink`] and implements [`ChannelOutbound`] so the
//! conversation layer can reply without knowing the platform.

pub mod error;
pub mod plugin;

pub use {
    error::{Error, Result},
    plugin::{
        ChannelEventSink, ChannelOutbound, ChatEvent, Choice, InboundEvent, MediaKind, MessageRef,
    },
};
