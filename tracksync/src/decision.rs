//! Operator decision port
//!
//! The engine never reads from a terminal itself. Every question it needs
//! answered (conflicting tracks, insufficient space) goes through a
//! [`DecisionPort`], so production code can prompt interactively while tests
//! answer with plain functions.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::format::{bitrate, human_bytes, minutes};
use crate::index::TrackKey;

/// Answer to a conflict prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictChoice {
    Replace,
    Skip,
    CopyAlongside,
}

impl ConflictChoice {
    fn key(self) -> char {
        match self {
            Self::Replace => 'r',
            Self::Skip => 'i',
            Self::CopyAlongside => 'c',
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Replace => "Replace",
            Self::Skip => "Ignore",
            Self::CopyAlongside => "Copy alongside",
        }
    }
}

/// Technical facts shown for one side of a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFacts {
    pub path: PathBuf,
    pub bitrate: Option<u32>,
    pub duration: Option<Duration>,
}

impl TrackFacts {
    fn describe(&self) -> String {
        let length = self.duration.map(minutes).unwrap_or_else(|| "? min".to_string());
        format!("{} ({}, {})", self.path.display(), bitrate(self.bitrate), length)
    }
}

/// A source track matching a track already present at the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictPrompt {
    pub key: TrackKey,
    pub source: TrackFacts,
    pub existing: TrackFacts,
    /// Where the source track would be written
    pub destination: PathBuf,
    /// Choices the port may answer with
    pub choices: Vec<ConflictChoice>,
}

impl ConflictPrompt {
    pub fn offers(&self, choice: ConflictChoice) -> bool {
        self.choices.contains(&choice)
    }
}

/// Answer to a capacity prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityChoice {
    Abort,
    ContinueUntilFull,
}

/// The playlist does not fit in the destination's free space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityPrompt {
    pub transfer_bytes: u64,
    pub free_bytes: u64,
}

/// Supplies operator decisions to the engine
pub trait DecisionPort {
    fn resolve_conflict(&mut self, prompt: &ConflictPrompt) -> Result<ConflictChoice>;

    fn confirm_capacity(&mut self, prompt: &CapacityPrompt) -> Result<CapacityChoice>;
}

/// Port backed by two plain functions
pub struct FnDecisionPort<C, K> {
    conflict: C,
    capacity: K,
}

impl<C, K> FnDecisionPort<C, K>
where
    C: FnMut(&ConflictPrompt) -> ConflictChoice,
    K: FnMut(&CapacityPrompt) -> CapacityChoice,
{
    pub fn new(conflict: C, capacity: K) -> Self {
        Self { conflict, capacity }
    }
}

impl<C, K> DecisionPort for FnDecisionPort<C, K>
where
    C: FnMut(&ConflictPrompt) -> ConflictChoice,
    K: FnMut(&CapacityPrompt) -> CapacityChoice,
{
    fn resolve_conflict(&mut self, prompt: &ConflictPrompt) -> Result<ConflictChoice> {
        Ok((self.conflict)(prompt))
    }

    fn confirm_capacity(&mut self, prompt: &CapacityPrompt) -> Result<CapacityChoice> {
        Ok((self.capacity)(prompt))
    }
}

/// Interactive port asking on a line-oriented terminal
///
/// Reads block the calling thread; async callers should wrap it so the wait
/// happens outside the runtime's worker threads.
pub struct TerminalPort<R, W> {
    input: R,
    output: W,
}

impl TerminalPort<io::StdinLock<'static>, io::Stderr> {
    /// Read answers from stdin, write questions to stderr
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPort<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Repeat `question` until the answer is one of `keys`
    fn ask(&mut self, question: &str, keys: &[char]) -> Result<char> {
        loop {
            write!(self.output, "{question}")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(SyncError::decision_error("input closed before an answer was given"));
            }

            let answer = line.trim().to_lowercase();
            let mut chars = answer.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                if keys.contains(&c) {
                    return Ok(c);
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> DecisionPort for TerminalPort<R, W> {
    fn resolve_conflict(&mut self, prompt: &ConflictPrompt) -> Result<ConflictChoice> {
        writeln!(self.output, "Warning: Song {}", prompt.key)?;
        writeln!(self.output, "already exists in destination.")?;
        writeln!(self.output, "Replace {}", prompt.existing.describe())?;
        writeln!(self.output, "by {} ?", prompt.source.describe())?;

        let question = prompt
            .choices
            .iter()
            .map(|c| format!("{} ({})", c.label(), c.key()))
            .collect::<Vec<_>>()
            .join(" / ")
            + ": ";
        let keys: Vec<char> = prompt.choices.iter().map(|c| c.key()).collect();

        let answer = self.ask(&question, &keys)?;
        prompt
            .choices
            .iter()
            .copied()
            .find(|c| c.key() == answer)
            .ok_or_else(|| SyncError::decision_error(format!("unexpected answer '{answer}'")))
    }

    fn confirm_capacity(&mut self, prompt: &CapacityPrompt) -> Result<CapacityChoice> {
        writeln!(
            self.output,
            "Warning: {} to transfer VS free space: {}",
            human_bytes(prompt.transfer_bytes),
            human_bytes(prompt.free_bytes)
        )?;
        match self.ask("What to do? Abort (a) or copy until full (c): ", &['a', 'c'])? {
            'a' => Ok(CapacityChoice::Abort),
            _ => Ok(CapacityChoice::ContinueUntilFull),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompt(choices: Vec<ConflictChoice>) -> ConflictPrompt {
        ConflictPrompt {
            key: TrackKey {
                artist: Some("Muse".into()),
                album: Some("Origin of Symmetry".into()),
                title: Some("Bliss".into()),
            },
            source: TrackFacts {
                path: "/music/bliss.mp3".into(),
                bitrate: Some(320_000),
                duration: Some(Duration::from_secs(252)),
            },
            existing: TrackFacts {
                path: "/dest/Muse/Origin of Symmetry/03-Bliss.mp3".into(),
                bitrate: Some(128_000),
                duration: Some(Duration::from_secs(252)),
            },
            destination: "/dest/Muse/Origin of Symmetry/03-Bliss.mp3".into(),
            choices,
        }
    }

    #[test]
    fn test_terminal_reprompts_until_offered_answer() {
        let input = Cursor::new("x\nc\n r \n");
        let mut output = Vec::new();
        let mut port = TerminalPort::new(input, &mut output);

        let choice = port
            .resolve_conflict(&prompt(vec![ConflictChoice::Replace, ConflictChoice::Skip]))
            .unwrap();
        assert_eq!(choice, ConflictChoice::Replace);

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Muse - Bliss (Origin of Symmetry)"));
        assert!(text.contains("128 kbps"));
        assert!(text.contains("320 kbps"));
        assert!(text.contains("4 min 12 s"));
        assert!(text.contains("Replace (r) / Ignore (i): "));
        assert!(!text.contains("Copy alongside"));
        // "x" and "c" are rejected, so the question is asked three times
        assert_eq!(text.matches("Ignore (i): ").count(), 3);
    }

    #[test]
    fn test_terminal_offers_copy_alongside_when_listed() {
        let mut output = Vec::new();
        let mut port = TerminalPort::new(Cursor::new("C\n"), &mut output);

        let choice = port
            .resolve_conflict(&prompt(vec![
                ConflictChoice::Replace,
                ConflictChoice::Skip,
                ConflictChoice::CopyAlongside,
            ]))
            .unwrap();
        assert_eq!(choice, ConflictChoice::CopyAlongside);
        assert!(String::from_utf8(output).unwrap().contains("Copy alongside (c)"));
    }

    #[test]
    fn test_terminal_capacity_prompt() {
        let mut output = Vec::new();
        let mut port = TerminalPort::new(Cursor::new("a\n"), &mut output);
        let choice = port
            .confirm_capacity(&CapacityPrompt {
                transfer_bytes: 2 << 30,
                free_bytes: 1 << 30,
            })
            .unwrap();
        assert_eq!(choice, CapacityChoice::Abort);
        assert!(String::from_utf8(output).unwrap().contains("2.0 GiB to transfer VS free space: 1.0 GiB"));
    }

    #[test]
    fn test_terminal_eof_is_an_error() {
        let mut port = TerminalPort::new(Cursor::new(""), Vec::new());
        let result = port.confirm_capacity(&CapacityPrompt {
            transfer_bytes: 2,
            free_bytes: 1,
        });
        assert!(matches!(result, Err(SyncError::Decision(_))));
    }

    #[test]
    fn test_fn_port_delegates() {
        let mut seen = Vec::new();
        let mut port = FnDecisionPort::new(
            |p: &ConflictPrompt| {
                seen.push(p.choices.len());
                ConflictChoice::Skip
            },
            |_: &CapacityPrompt| CapacityChoice::ContinueUntilFull,
        );

        assert_eq!(
            port.resolve_conflict(&prompt(vec![ConflictChoice::Replace, ConflictChoice::Skip])).unwrap(),
            ConflictChoice::Skip
        );
        assert_eq!(
            port.confirm_capacity(&CapacityPrompt { transfer_bytes: 2, free_bytes: 1 }).unwrap(),
            CapacityChoice::ContinueUntilFull
        );
        drop(port);
        assert_eq!(seen, vec![2]);
    }
}
