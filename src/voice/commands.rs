//! Spoken command table
//!
//! Maps transcripts to output command sequences. Built-in browser commands
//! can be combined with custom `[[voice.commands]]` entries from config.

use tracing::warn;

use super::fuzzy::{clean_for_matching, similarity};
use crate::config::VoiceConfig;
use crate::input::{Key, OutputCommand, parse_combo};

/// One spoken command with all the phrases that trigger it
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceCommand {
    pub name: String,
    pub phrases: Vec<String>,
    pub commands: Vec<OutputCommand>,
    /// Minimum score for this command, on top of the global one
    pub threshold: f32,
}

impl VoiceCommand {
    pub fn new(name: &str, phrases: &[&str], commands: Vec<OutputCommand>) -> Self {
        Self {
            name: name.to_string(),
            phrases: phrases.iter().map(|p| clean_for_matching(p)).collect(),
            commands,
            threshold: 0.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    fn score(&self, cleaned: &str) -> f32 {
        self.phrases
            .iter()
            .map(|p| similarity(p, cleaned))
            .fold(0.0, f32::max)
    }
}

/// A transcript resolved to a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMatch {
    pub name: String,
    pub confidence: f32,
    pub commands: Vec<OutputCommand>,
}

/// Picks the best-scoring command for a transcript
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    commands: Vec<VoiceCommand>,
    min_confidence: f32,
}

impl CommandMatcher {
    pub fn new(min_confidence: f32) -> Self {
        Self {
            commands: Vec::new(),
            min_confidence,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        let mut matcher = Self::new(config.min_confidence);
        if config.builtin_commands {
            matcher = matcher.with_builtins();
        }
        for custom in &config.commands {
            let mut commands = Vec::new();
            if let Some(keys) = &custom.keys {
                match parse_combo(keys) {
                    Ok((modifiers, key)) => commands.extend(OutputCommand::combo(&modifiers, key)),
                    Err(e) => {
                        warn!(phrase = %custom.phrase, "skipping voice command: {}", e);
                        continue;
                    }
                }
            }
            if let Some(text) = &custom.text {
                commands.extend(OutputCommand::text(text));
            }
            if custom.enter {
                commands.push(OutputCommand::KeyTap(Key::Enter));
            }
            if commands.is_empty() {
                warn!(phrase = %custom.phrase, "skipping voice command with no keys or text");
                continue;
            }
            let command = VoiceCommand::new(&custom.phrase, &[custom.phrase.as_str()], commands)
                .with_threshold(custom.threshold.unwrap_or(0.0));
            matcher.add(command);
        }
        matcher
    }

    /// Browser commands: close tab, new tab, open YouTube
    pub fn with_builtins(mut self) -> Self {
        let modifier = primary_modifier();
        self.add(VoiceCommand::new(
            "close tab",
            &["close tab", "close the tab", "タブを閉じて", "タブ閉じて"],
            OutputCommand::combo(&[modifier], Key::Char('w')),
        ));
        self.add(VoiceCommand::new(
            "new tab",
            &["new tab", "open new tab", "新しいタブ"],
            OutputCommand::combo(&[modifier], Key::Char('t')),
        ));
        let mut youtube = OutputCommand::combo(&[modifier], Key::Char('t'));
        youtube.extend(OutputCommand::text("youtube.com"));
        youtube.push(OutputCommand::KeyTap(Key::Enter));
        self.add(
            VoiceCommand::new(
                "open youtube",
                &["open youtube", "youtube", "youtube開いて", "ユーチューブを開いて"],
                youtube,
            )
            .with_threshold(0.7),
        );
        self
    }

    pub fn add(&mut self, command: VoiceCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Best command whose score clears both the global and its own threshold
    pub fn best(&self, transcript: &str) -> Option<CommandMatch> {
        let cleaned = clean_for_matching(transcript);
        if cleaned.is_empty() {
            return None;
        }
        self.commands
            .iter()
            .map(|c| (c, c.score(&cleaned)))
            .filter(|(c, score)| *score >= self.min_confidence.max(c.threshold))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, score)| CommandMatch {
                name: c.name.clone(),
                confidence: score,
                commands: c.commands.clone(),
            })
    }
}

/// Cmd on macOS, Ctrl elsewhere
pub fn primary_modifier() -> Key {
    #[cfg(target_os = "macos")]
    {
        Key::Meta
    }
    #[cfg(not(target_os = "macos"))]
    {
        Key::Control
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomVoiceCommand;

    fn matcher() -> CommandMatcher {
        CommandMatcher::new(0.6).with_builtins()
    }

    #[test]
    fn test_exact_builtin() {
        let m = matcher().best("Close tab.").unwrap();
        assert_eq!(m.name, "close tab");
        assert_eq!(m.confidence, 1.0);
        assert_eq!(
            m.commands,
            OutputCommand::combo(&[primary_modifier()], Key::Char('w'))
        );
    }

    #[test]
    fn test_phrase_inside_sentence() {
        let m = matcher().best("could you please close the tab").unwrap();
        assert_eq!(m.name, "close tab");
    }

    #[test]
    fn test_japanese_alias() {
        let m = matcher().best("タブを閉じて").unwrap();
        assert_eq!(m.name, "close tab");
    }

    #[test]
    fn test_youtube_types_address() {
        let m = matcher().best("open you tube").unwrap();
        assert_eq!(m.name, "open youtube");
        assert!(m.commands.contains(&OutputCommand::KeyTap(Key::Char('.'))));
        assert_eq!(m.commands.last(), Some(&OutputCommand::KeyTap(Key::Enter)));
    }

    #[test]
    fn test_no_match() {
        assert!(matcher().best("what is the weather").is_none());
        assert!(matcher().best("...").is_none());
    }

    #[test]
    fn test_custom_commands_from_config() {
        let config = VoiceConfig {
            builtin_commands: false,
            commands: vec![
                CustomVoiceCommand {
                    phrase: "reopen tab".to_string(),
                    keys: Some("ctrl+shift+t".to_string()),
                    text: None,
                    enter: false,
                    threshold: None,
                },
                CustomVoiceCommand {
                    phrase: "broken".to_string(),
                    keys: Some("ctrl+hyper".to_string()),
                    text: None,
                    enter: false,
                    threshold: None,
                },
            ],
            ..VoiceConfig::default()
        };
        let matcher = CommandMatcher::from_config(&config);
        assert_eq!(matcher.len(), 1);
        let m = matcher.best("reopen tab").unwrap();
        assert_eq!(m.commands.len(), 5);
    }
}
