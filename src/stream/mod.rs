//! Live-update ingestion: event decoding and the reconciliation dispatcher.

pub mod dispatch;
pub mod event;

pub use dispatch::{
    ANNOUNCEMENTS_LIST, Dispatcher, NOTIFICATIONS_LIST, NoEffects, StreamEffects,
};
pub use event::{StreamError, StreamEvent, decode_stream_event};
