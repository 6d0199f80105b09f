use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use handpilot::config::Config;
use handpilot::dispatch::Dispatcher;
use handpilot::input::{InputSink, LogSink};
use handpilot::source::{FrameSource, JsonLinesSource, SourceError, SourceEvent, TickClock};
use handpilot::status::StatusLine;
use handpilot::voice::{DisabledVoice, VoicePipeline};

#[derive(Parser)]
#[command(name = "handpilot", about = "Drive the desktop with hand gestures")]
struct Cli {
    /// Config file (defaults to ./handpilot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log commands instead of injecting them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Don't draw the status line
    #[arg(long, global = true)]
    no_status: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read landmark frames from stdin (default)
    Run,
    /// Play back a recorded frame file
    Replay {
        path: PathBuf,
        /// Sleep between frames to keep the recorded pacing
        #[arg(long)]
        realtime: bool,
    },
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[hotpath::main]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_ctrlc.store(false, Ordering::SeqCst);
    })?;

    let (reader, realtime): (Box<dyn BufRead + Send>, bool) = match &cli.command {
        None | Some(Command::Run) => (Box::new(BufReader::new(std::io::stdin())), false),
        Some(Command::Replay { path, realtime }) => {
            let file = File::open(path)
                .map_err(|e| anyhow::anyhow!("cannot open {}: {}", path.display(), e))?;
            (Box::new(BufReader::new(file)), *realtime)
        }
    };

    let mut sink = build_sink(cli.dry_run);
    let pipeline = build_voice(&config);
    let mut dispatcher = Dispatcher::new(&config, pipeline);
    let mut clock = TickClock::new(&config.timing);
    let mut status_line = (config.ui.status_line && !cli.no_status).then(StatusLine::new);

    let frames = spawn_reader(reader);
    info!("handpilot ready");

    let mut last_size = (0, 0);
    while running.load(Ordering::SeqCst) {
        let event = match frames.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => {
                error!("{}", e);
                break;
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        };

        let fps = match &event {
            SourceEvent::Frame(frame) => frame.fps,
            SourceEvent::Dropped { fps } => *fps,
        };
        let frame = event.into_frame(last_size);
        last_size = (frame.width, frame.height);

        let dt = clock.tick(fps);
        let status = dispatcher.tick(&frame, dt, sink.as_mut());

        if let Some(line) = status_line.as_mut() {
            if let Err(e) = line.draw(&status) {
                warn!("status line: {}", e);
            }
        }
        if realtime {
            thread::sleep(clock.frame_interval(fps));
        }
    }

    dispatcher.shutdown(sink.as_mut());
    if let Some(line) = status_line.as_mut() {
        line.finish()?;
    }
    info!("handpilot stopped");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "handpilot=debug" } else { "handpilot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Frames are read on their own thread so Ctrl-C is seen while stdin is idle
fn spawn_reader(
    reader: Box<dyn BufRead + Send>,
) -> flume::Receiver<Result<SourceEvent, SourceError>> {
    let (tx, rx) = flume::bounded(64);
    if let Err(e) = thread::Builder::new()
        .name("frames".to_string())
        .spawn(move || {
            let mut source = JsonLinesSource::new(reader);
            loop {
                let item = match source.next_event() {
                    Ok(Some(event)) => Ok(event),
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.send(item).is_err() || failed {
                    break;
                }
            }
        })
    {
        error!("cannot start frame reader: {}", e);
    }
    rx
}

fn build_sink(dry_run: bool) -> Box<dyn InputSink> {
    #[cfg(feature = "inject")]
    if !dry_run {
        match handpilot::input::EnigoSink::new() {
            Ok(sink) => return Box::new(sink),
            Err(e) => warn!("{}; falling back to dry run", e),
        }
    }
    #[cfg(not(feature = "inject"))]
    if !dry_run {
        warn!("built without input injection; commands are only logged");
    }
    Box::new(LogSink::new())
}

fn build_voice(config: &Config) -> Box<dyn VoicePipeline> {
    if !config.voice.enabled {
        return Box::new(DisabledVoice);
    }

    #[cfg(feature = "voice")]
    {
        use handpilot::voice::{CommandMatcher, Recorder, SpeechToText, VoiceError, VoiceWorker};
        use handpilot::voice::capture::MicRecorder;
        use handpilot::voice::transcriber::ParakeetTranscriber;

        let model_path = config.voice.model_path.clone();
        let loader = move || -> Result<(Box<dyn Recorder>, Box<dyn SpeechToText>), VoiceError> {
            let recorder: Box<dyn Recorder> = Box::new(MicRecorder::open()?);
            let model: Box<dyn SpeechToText> = Box::new(ParakeetTranscriber::load(&model_path)?);
            Ok((recorder, model))
        };
        let matcher = CommandMatcher::from_config(&config.voice);
        info!(commands = matcher.len(), "voice commands loaded");
        match VoiceWorker::spawn(loader, matcher, config.voice.record_duration()) {
            Ok(worker) => return Box::new(worker),
            Err(e) => error!("voice disabled: {}", e),
        }
    }

    #[cfg(not(feature = "voice"))]
    warn!("voice.enabled is set but handpilot was built without the voice feature");

    Box::new(DisabledVoice)
}
