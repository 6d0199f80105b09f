//! Voice commands triggered by a gesture
//!
//! The engine only sees the [`VoicePipeline`] contract: `start`, `is_busy`,
//! `is_ready`, and a non-blocking `try_outcome`. The record → transcribe →
//! match cycle runs on a background thread ([`VoiceWorker`]) and reports back
//! over a channel, so a multi-second recording never stalls frame processing.

pub mod commands;
pub mod fuzzy;
mod worker;

#[cfg(feature = "voice")]
pub mod capture;
#[cfg(feature = "voice")]
pub mod transcriber;

use std::fmt;
use std::time::Duration;

use crate::input::OutputCommand;

pub use commands::{CommandMatch, CommandMatcher, VoiceCommand};
pub use worker::VoiceWorker;

/// Error type for the voice pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceError {
    /// Model or microphone still loading, or failed to load
    NotReady,
    /// A recording is already in progress
    Busy,
    Recording(String),
    Transcription(String),
    Model(String),
    /// The worker thread is gone
    Disconnected,
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceError::NotReady => write!(f, "voice pipeline not ready"),
            VoiceError::Busy => write!(f, "voice pipeline busy"),
            VoiceError::Recording(msg) => write!(f, "Recording error: {}", msg),
            VoiceError::Transcription(msg) => write!(f, "Transcription error: {}", msg),
            VoiceError::Model(msg) => write!(f, "Model error: {}", msg),
            VoiceError::Disconnected => write!(f, "voice worker disconnected"),
        }
    }
}

impl std::error::Error for VoiceError {}

/// Result of one record/transcribe/match cycle
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    Matched {
        transcript: String,
        phrase: String,
        confidence: f32,
        commands: Vec<OutputCommand>,
    },
    NoMatch {
        transcript: String,
    },
    Failed(VoiceError),
}

/// What the gesture engine needs from a voice pipeline
pub trait VoicePipeline {
    /// Begin one recording cycle; returns immediately
    fn start(&mut self) -> Result<(), VoiceError>;

    fn is_busy(&self) -> bool;

    fn is_ready(&self) -> bool;

    /// Next finished cycle, if any
    fn try_outcome(&mut self) -> Option<VoiceOutcome>;
}

/// Microphone audio source
pub trait Recorder {
    /// Record mono 16 kHz samples for `duration`
    fn record(&mut self, duration: Duration) -> Result<Vec<f32>, VoiceError>;
}

/// Speech-to-text engine
pub trait SpeechToText {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String, VoiceError>;
}

/// Pipeline used when voice control is off: never ready
#[derive(Debug, Default)]
pub struct DisabledVoice;

impl VoicePipeline for DisabledVoice {
    fn start(&mut self) -> Result<(), VoiceError> {
        Err(VoiceError::NotReady)
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn try_outcome(&mut self) -> Option<VoiceOutcome> {
        None
    }
}
