use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{Recorder, VoiceError};

pub const TARGET_RATE: usize = 16000;

/// Interleaved device samples to mono at [`TARGET_RATE`]
///
/// Channels are averaged per frame, then frames are linearly interpolated
/// onto the target clock.
pub fn to_mono_16k(data: &[f32], channels: usize, from_rate: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let frame = |i: usize| -> Option<f32> {
        let chunk = data.get(i * channels..(i + 1) * channels)?;
        Some(chunk.iter().sum::<f32>() / channels as f32)
    };
    let frames = data.len() / channels;
    if from_rate == TARGET_RATE || from_rate == 0 {
        return (0..frames).filter_map(frame).collect();
    }

    let step = from_rate as f64 / TARGET_RATE as f64;
    let out_len = (frames as f64 / step) as usize;
    (0..out_len)
        .filter_map(|n| {
            let pos = n as f64 * step;
            let i = pos as usize;
            let t = (pos - i as f64) as f32;
            let a = frame(i)?;
            Some(frame(i + 1).map_or(a, |b| a + (b - a) * t))
        })
        .collect()
}

/// Default input device, recorded on demand as mono 16 kHz
pub struct MicRecorder {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl MicRecorder {
    pub fn open() -> Result<Self, VoiceError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| VoiceError::Recording("No input device".to_string()))?;
        let config = device
            .default_input_config()
            .map_err(|e| VoiceError::Recording(e.to_string()))?;
        info!(
            "Mic: {}Hz {}ch",
            u32::from(config.sample_rate()),
            config.channels()
        );
        Ok(Self { device, config })
    }
}

impl Recorder for MicRecorder {
    fn record(&mut self, duration: Duration) -> Result<Vec<f32>, VoiceError> {
        let sample_rate = u32::from(self.config.sample_rate()) as usize;
        let channels = self.config.channels() as usize;
        let (tx, rx) = flume::unbounded::<Vec<f32>>();

        let stream = self
            .device
            .build_input_stream(
                &self.config.config(),
                move |data: &[f32], _| {
                    let _ = tx.send(to_mono_16k(data, channels, sample_rate));
                },
                |e| warn!("Mic error: {}", e),
                None,
            )
            .map_err(|e| VoiceError::Recording(e.to_string()))?;
        stream
            .play()
            .map_err(|e| VoiceError::Recording(e.to_string()))?;

        let wanted = (duration.as_secs_f32() * TARGET_RATE as f32) as usize;
        let deadline = Instant::now() + duration + Duration::from_millis(500);
        let mut samples = Vec::with_capacity(wanted);
        while samples.len() < wanted {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            match rx.recv_timeout(left) {
                Ok(chunk) => samples.extend(chunk),
                Err(_) => break,
            }
        }
        drop(stream);
        samples.truncate(wanted);
        Ok(samples)
    }
}
