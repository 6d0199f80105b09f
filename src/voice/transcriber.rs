use std::path::Path;
use tracing::info;
use transcribe_rs::{
    TranscriptionEngine,
    engines::parakeet::{ParakeetEngine, ParakeetModelParams},
};

use super::{SpeechToText, VoiceError};

/// Parakeet speech-to-text over 16 kHz mono samples
pub struct ParakeetTranscriber {
    engine: ParakeetEngine,
}

impl ParakeetTranscriber {
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, VoiceError> {
        let mut engine = ParakeetEngine::new();
        info!(path = %model_path.as_ref().display(), "Loading speech model...");
        engine
            .load_model_with_params(model_path.as_ref(), ParakeetModelParams::int8())
            .map_err(|e| VoiceError::Model(e.to_string()))?;
        info!("Speech model loaded.");
        Ok(Self { engine })
    }

    #[hotpath::measure]
    fn run(&mut self, samples: &[f32]) -> Result<String, VoiceError> {
        let result = self
            .engine
            .transcribe_samples(samples.to_vec(), None)
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        Ok(result.text.trim().to_string())
    }
}

impl SpeechToText for ParakeetTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String, VoiceError> {
        self.run(samples)
    }
}
