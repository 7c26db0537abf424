//! Conversation sessions: a small per-chat state machine and the store that
//! applies inbound events to it.

pub mod state;
pub mod store;

pub use {
    state::{
        AUDIO_TIERS, Selection, Session, SessionState, Transition, VIDEO_TIERS,
        format_choice_data, quality_choice_data, quality_tiers,
    },
    store::SessionStore,
};
