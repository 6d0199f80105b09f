//! Hand-gesture recognition and input dispatch
//!
//! Per-frame hand landmarks go in; debounced keyboard and mouse commands
//! come out through an [`input::InputSink`].

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod gesture;
pub mod input;
pub mod landmarks;
pub mod mapping;
pub mod source;
pub mod status;
pub mod voice;
