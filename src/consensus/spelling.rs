use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::errors::SpellError;

/// Ranked candidates for every word position of one line
pub type RankedLine = Vec<Vec<String>>;

/// Spelling collaborator used by the consensus arbiter
///
/// Input is a batch of lines, each a list of word positions, each a list of
/// ranked candidates. Output mirrors that shape with one validity flag per
/// candidate.
#[async_trait]
pub trait SpellValidator: Send + Sync + Debug {
    async fn validate(&self, lines: &[RankedLine]) -> Result<Vec<Vec<Vec<bool>>>, SpellError>;
}

/// Validator backed by `hunspell -a`
#[derive(Debug, Clone)]
pub struct HunspellValidator {
    binary: String,
    dictionary: Option<String>,
}

impl HunspellValidator {
    pub fn new(binary: impl Into<String>, dictionary: Option<String>) -> Self {
        HunspellValidator {
            binary: binary.into(),
            dictionary,
        }
    }

    /// Returns a validator only if the executable answers `-v`
    pub async fn probe(binary: &str, dictionary: Option<String>) -> Option<Self> {
        let available = Command::new(binary)
            .arg("-v")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false);

        if available {
            debug!("Spelling validator '{}' available", binary);
            Some(Self::new(binary, dictionary))
        } else {
            None
        }
    }

    async fn check_words(&self, words: &[&str]) -> Result<Vec<bool>, SpellError> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut command = Command::new(&self.binary);
        command.arg("-a");
        if let Some(dictionary) = &self.dictionary {
            command.args(["-d", dictionary]);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpellError::Spawn(format!("{}: {}", self.binary, e)))?;

        let mut input = String::new();
        for word in words {
            // `^` keeps a leading special character from being read as a command
            input.push('^');
            input.push_str(word);
            input.push('\n');
        }

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpellError::Spawn("stdin not captured".to_string()))?;
        let feed = async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        fed.map_err(|e| SpellError::Spawn(e.to_string()))?;
        let output = output.map_err(|e| SpellError::Spawn(e.to_string()))?;
        if !output.status.success() {
            return Err(SpellError::Spawn(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_pipe_output(&String::from_utf8_lossy(&output.stdout), words.len())
    }
}

/// Reads the ispell pipe response for `expected` input lines
pub fn parse_pipe_output(output: &str, expected: usize) -> Result<Vec<bool>, SpellError> {
    let mut lines = output.lines().peekable();
    if lines.peek().is_some_and(|line| line.starts_with("@(#)")) {
        lines.next();
    }

    let mut results = Vec::with_capacity(expected);
    let mut valid = true;
    for line in lines {
        if line.trim().is_empty() {
            results.push(valid);
            valid = true;
        } else if !matches!(line.chars().next(), Some('*' | '+' | '-')) {
            valid = false;
        }
    }

    if results.len() != expected {
        return Err(SpellError::Protocol(format!(
            "expected {} results, got {}",
            expected,
            results.len()
        )));
    }
    Ok(results)
}

/// Every candidate of every position of every line, in batch order
pub fn flatten_candidates(lines: &[RankedLine]) -> Vec<&str> {
    lines
        .iter()
        .flat_map(|line| line.iter().flat_map(|position| position.iter().map(String::as_str)))
        .collect()
}

/// Splits flat per-candidate flags back into the line/position/candidate shape
pub fn regroup_flags(lines: &[RankedLine], flags: Vec<bool>) -> Result<Vec<Vec<Vec<bool>>>, SpellError> {
    let expected: usize = lines.iter().map(|line| line.iter().map(Vec::len).sum::<usize>()).sum();
    if flags.len() != expected {
        return Err(SpellError::Protocol(format!(
            "result count mismatch: expected {}, got {}",
            expected,
            flags.len()
        )));
    }

    let mut flags = flags.into_iter();
    Ok(lines
        .iter()
        .map(|line| {
            line.iter()
                .map(|position| flags.by_ref().take(position.len()).collect())
                .collect()
        })
        .collect())
}

#[async_trait]
impl SpellValidator for HunspellValidator {
    async fn validate(&self, lines: &[RankedLine]) -> Result<Vec<Vec<Vec<bool>>>, SpellError> {
        let flags = self.check_words(&flatten_candidates(lines)).await?;
        regroup_flags(lines, flags)
    }
}
