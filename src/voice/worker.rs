use flume::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    CommandMatcher, Recorder, SpeechToText, VoiceError, VoiceOutcome, VoicePipeline,
};

/// Background record/transcribe/match worker
///
/// The recorder and speech model are created on the worker thread by the
/// loader, so neither has to be `Send`. `ready` flips once loading succeeds;
/// `busy` is set by [`VoicePipeline::start`] and cleared by the worker after
/// the outcome has been queued.
pub struct VoiceWorker {
    requests: Sender<()>,
    outcomes: Receiver<VoiceOutcome>,
    busy: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
}

impl VoiceWorker {
    pub fn spawn<F>(
        loader: F,
        matcher: CommandMatcher,
        record_for: Duration,
    ) -> Result<Self, VoiceError>
    where
        F: FnOnce() -> Result<(Box<dyn Recorder>, Box<dyn SpeechToText>), VoiceError>
            + Send
            + 'static,
    {
        let (request_tx, request_rx) = flume::unbounded::<()>();
        let (outcome_tx, outcome_rx) = flume::unbounded::<VoiceOutcome>();
        let busy = Arc::new(AtomicBool::new(false));
        let ready = Arc::new(AtomicBool::new(false));

        let worker_busy = Arc::clone(&busy);
        let worker_ready = Arc::clone(&ready);
        thread::Builder::new()
            .name("voice".to_string())
            .spawn(move || {
                let (mut recorder, mut stt) = match loader() {
                    Ok(parts) => parts,
                    Err(e) => {
                        warn!("voice pipeline failed to load: {}", e);
                        let _ = outcome_tx.send(VoiceOutcome::Failed(e));
                        return;
                    }
                };
                worker_ready.store(true, Ordering::SeqCst);
                info!(commands = matcher.len(), "voice pipeline ready");

                while request_rx.recv().is_ok() {
                    let outcome = run_cycle(recorder.as_mut(), stt.as_mut(), &matcher, record_for);
                    let sent = outcome_tx.send(outcome);
                    worker_busy.store(false, Ordering::SeqCst);
                    if sent.is_err() {
                        break;
                    }
                }
                worker_ready.store(false, Ordering::SeqCst);
                debug!("voice worker stopped");
            })
            .map_err(|e| VoiceError::Model(format!("Failed to spawn voice worker: {}", e)))?;

        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
            busy,
            ready,
        })
    }
}

fn run_cycle(
    recorder: &mut dyn Recorder,
    stt: &mut dyn SpeechToText,
    matcher: &CommandMatcher,
    record_for: Duration,
) -> VoiceOutcome {
    info!(secs = record_for.as_secs_f32(), "voice: recording");
    let samples = match recorder.record(record_for) {
        Ok(samples) => samples,
        Err(e) => return VoiceOutcome::Failed(e),
    };
    if samples.is_empty() {
        return VoiceOutcome::Failed(VoiceError::Recording("no audio captured".to_string()));
    }

    let transcript = match stt.transcribe(&samples) {
        Ok(text) => text,
        Err(e) => return VoiceOutcome::Failed(e),
    };
    debug!(%transcript, "voice: transcribed");

    match matcher.best(&transcript) {
        Some(m) => VoiceOutcome::Matched {
            transcript,
            phrase: m.name,
            confidence: m.confidence,
            commands: m.commands,
        },
        None => VoiceOutcome::NoMatch { transcript },
    }
}

impl VoicePipeline for VoiceWorker {
    fn start(&mut self) -> Result<(), VoiceError> {
        if !self.is_ready() {
            return Err(VoiceError::NotReady);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VoiceError::Busy);
        }
        if self.requests.send(()).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(VoiceError::Disconnected);
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn try_outcome(&mut self) -> Option<VoiceOutcome> {
        self.outcomes.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Silence;

    impl Recorder for Silence {
        fn record(&mut self, _duration: Duration) -> Result<Vec<f32>, VoiceError> {
            Ok(Vec::new())
        }
    }

    struct Fixed(&'static str);

    impl SpeechToText for Fixed {
        fn transcribe(&mut self, _samples: &[f32]) -> Result<String, VoiceError> {
            Ok(self.0.to_string())
        }
    }

    fn wait_ready(worker: &VoiceWorker) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !worker.is_ready() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_empty_recording_is_failure() {
        let mut worker = VoiceWorker::spawn(
            || Ok((Box::new(Silence) as Box<dyn Recorder>, Box::new(Fixed("close tab")) as Box<dyn SpeechToText>)),
            CommandMatcher::new(0.6).with_builtins(),
            Duration::from_millis(10),
        )
        .unwrap();
        wait_ready(&worker);
        worker.start().unwrap();

        let outcome = worker.outcomes.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(outcome, VoiceOutcome::Failed(VoiceError::Recording(_))), "{:?}", outcome);
    }

    #[test]
    fn test_loader_failure_never_ready() {
        let mut worker = VoiceWorker::spawn(
            || Err(VoiceError::Model("missing model".to_string())),
            CommandMatcher::new(0.6),
            Duration::from_millis(10),
        )
        .unwrap();
        let outcome = worker.outcomes.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome, VoiceOutcome::Failed(VoiceError::Model("missing model".to_string())));
        assert!(!worker.is_ready());
        assert_eq!(worker.start(), Err(VoiceError::NotReady));
    }
}
