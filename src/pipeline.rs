use crate::transform::{CorrectionDictionary, DiscardedFuzzy, FuzzyMatchMap, Transformer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;
use thiserror::Error;

/// Grammar prompt used when the caller has none
pub const DEFAULT_PROMPT: &str = "Correct the grammar and spelling in the following text.";

/// Errors from the grammar-correction stage
#[derive(Debug, Error)]
pub enum GrammarError {
    /// External grammar command failed
    #[error("grammar command {program} failed: {source}")]
    Command {
        /// Program that was run
        program: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// Correction came back blank
    #[error("grammar correction returned no text")]
    Empty,
}

/// Grammar-correction stage preceding the word transformations
#[cfg_attr(test, mockall::automock)]
pub trait GrammarCorrector: Send + Sync {
    /// Returns the corrected text
    ///
    /// # Errors
    /// Returns error if the correction service fails
    fn correct(&self, text: &str, prompt: &str) -> Result<String, GrammarError>;
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl GrammarCorrector for Passthrough {
    fn correct(&self, text: &str, _prompt: &str) -> Result<String, GrammarError> {
        Ok(text.to_owned())
    }
}

/// Runs an external program: prompt as last argument, text on stdin,
/// corrected text on stdout
#[derive(Debug, Clone)]
pub struct CommandCorrector {
    program: String,
    args: Vec<String>,
}

impl CommandCorrector {
    /// Builds from an argv list; `None` when the list is empty
    #[must_use]
    pub fn new(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn failure(&self, source: anyhow::Error) -> GrammarError {
        GrammarError::Command {
            program: self.program.clone(),
            source,
        }
    }
}

impl GrammarCorrector for CommandCorrector {
    fn correct(&self, text: &str, prompt: &str) -> Result<String, GrammarError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(e.into()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure(anyhow::anyhow!("stdin not captured")))?;
        let input = text.to_owned();
        // Separate writer so a chatty program cannot block on a full stdout pipe
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| self.failure(e.into()))?;
        if let Ok(Err(e)) = writer.join() {
            tracing::debug!(error = %e, "grammar command did not consume all input");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(anyhow::anyhow!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let corrected = String::from_utf8(output.stdout).map_err(|e| self.failure(e.into()))?;
        Ok(corrected.trim().to_owned())
    }
}

/// Pipeline behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Still apply word transformations when grammar correction failed
    pub transform_on_grammar_failure: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            transform_on_grammar_failure: true,
        }
    }
}

/// Result of [`Pipeline::process`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// Final text shown to the user
    pub corrected_text: String,
    /// Whether the grammar stage contributed
    pub grammar_applied: bool,
    /// Fuzzy substitutions made by the word transformations
    pub fuzzy_matches: FuzzyMatchMap,
    /// Wall-clock time spent, in milliseconds
    pub duration_ms: u64,
}

/// Grammar correction followed by the user's word transformations
///
/// A failing grammar stage never blocks output: it falls back to the input
/// text, and the transformation stage cannot fail.
pub struct Pipeline {
    corrector: Box<dyn GrammarCorrector>,
    transformer: Transformer,
    options: PipelineOptions,
}

impl Pipeline {
    /// Assembles a pipeline
    #[must_use]
    pub fn new(
        corrector: Box<dyn GrammarCorrector>,
        transformer: Transformer,
        options: PipelineOptions,
    ) -> Self {
        Self {
            corrector,
            transformer,
            options,
        }
    }

    /// Runs both stages over `text`
    #[must_use]
    pub fn process(
        &self,
        text: &str,
        prompt: Option<&str>,
        transformations: Option<&CorrectionDictionary>,
        discarded: Option<&DiscardedFuzzy>,
    ) -> PipelineOutput {
        let _span = tracing::debug_span!("process_text", chars = text.len()).entered();
        let start = Instant::now();
        let prompt = prompt.filter(|p| !p.trim().is_empty()).unwrap_or(DEFAULT_PROMPT);

        let grammar = self
            .corrector
            .correct(text, prompt)
            .and_then(|corrected| {
                if corrected.trim().is_empty() {
                    Err(GrammarError::Empty)
                } else {
                    Ok(corrected)
                }
            });

        let (grammar_text, grammar_applied) = match grammar {
            Ok(corrected) => (corrected, true),
            Err(e) => {
                tracing::warn!(error = %e, "grammar correction failed, using original text");
                (text.to_owned(), false)
            }
        };

        let (corrected_text, fuzzy_matches) =
            if grammar_applied || self.options.transform_on_grammar_failure {
                let result = self
                    .transformer
                    .transform(&grammar_text, transformations, discarded);
                (result.transformed_text, result.fuzzy_matches)
            } else {
                (grammar_text, FuzzyMatchMap::new())
            };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            duration_ms = duration_ms,
            grammar_applied = grammar_applied,
            fuzzy_matches = fuzzy_matches.len(),
            "text processing completed"
        );

        PipelineOutput {
            corrected_text,
            grammar_applied,
            fuzzy_matches,
            duration_ms,
        }
    }
}
