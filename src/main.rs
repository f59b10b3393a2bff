use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use whisper_vocab::config::Config;
use whisper_vocab::feedback;
use whisper_vocab::pipeline::{CommandCorrector, GrammarCorrector, Passthrough, Pipeline};
use whisper_vocab::store::VocabularyStore;
use whisper_vocab::suggest::SuggestionIndex;
use whisper_vocab::{telemetry, DiscardedFuzzy, Transformation};

#[derive(Parser)]
#[command(name = "whisper-vocab")]
#[command(about = "Personal vocabulary corrections for transcribed text")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.whisper-vocab.toml)
    #[arg(long, env = "WHISPER_VOCAB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a user's corrections to text
    Transform {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Text to transform (default: stdin)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Grammar-correct text, then apply the user's corrections
    Process {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Text to process (default: stdin)
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Undo a fuzzy correction and stop suggesting it
    Revert {
        /// User id
        #[arg(short, long)]
        user: String,
        /// JSON report written by `transform`
        #[arg(short, long)]
        report: PathBuf,
        /// Corrected word to undo
        word: String,
    },
    /// Manage word corrections
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Suggest vocabulary words close to a word
    Suggest {
        /// Word to look up
        word: String,
        /// Maximum suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Manage the grammar prompt
    Prompt {
        #[command(subcommand)]
        action: PromptAction,
    },
}

#[derive(Subcommand)]
enum RuleAction {
    /// Add or replace a correction
    Add {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Word as transcribed
        word: String,
        /// Replacement
        replacement: String,
    },
    /// Remove a correction
    Remove {
        /// User id
        #[arg(short, long)]
        user: String,
        /// Word as transcribed
        word: String,
    },
    /// List corrections and discarded fuzzy matches
    List {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum PromptAction {
    /// Replace the grammar prompt
    Set {
        /// User id
        #[arg(short, long)]
        user: String,
        /// New prompt
        prompt: String,
    },
    /// Show the grammar prompt
    Show {
        /// User id
        #[arg(short, long)]
        user: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;

    let store = VocabularyStore::new(Config::expand_path(&config.store.path)?);
    let transformer = config.matching.transformer();

    match cli.command {
        Commands::Transform { user, text } => {
            let text = read_text(text)?;
            let vocabulary = store.load(&user)?;
            let result = transformer.transform(
                &text,
                Some(&vocabulary.transformations),
                Some(&vocabulary.discarded_fuzzy),
            );
            print_json(&result)?;
        }
        Commands::Process { user, text } => {
            let text = read_text(text)?;
            let vocabulary = store.load(&user)?;
            let corrector: Box<dyn GrammarCorrector> =
                match CommandCorrector::new(&config.grammar.command) {
                    Some(command) => Box::new(command),
                    None => Box::new(Passthrough),
                };
            let pipeline = Pipeline::new(corrector, transformer, config.pipeline);
            let output = pipeline.process(
                &text,
                Some(&vocabulary.prompt),
                Some(&vocabulary.transformations),
                Some(&vocabulary.discarded_fuzzy),
            );
            print_json(&output)?;
        }
        Commands::Revert { user, report, word } => {
            let contents = std::fs::read_to_string(&report)
                .with_context(|| format!("failed to read report {}", report.display()))?;
            let transformation: Transformation =
                serde_json::from_str(&contents).context("failed to parse report JSON")?;
            let mut remaining = transformation.fuzzy_matches;
            let Some(fuzzy) = remaining.remove(&word) else {
                bail!("no fuzzy correction to {word:?} in {}", report.display());
            };

            let mut rejected = DiscardedFuzzy::new();
            feedback::discard(&mut rejected, &fuzzy);
            store.add_discarded_fuzzy(&user, &rejected)?;

            let text = transformation.transformed_text;
            let reverted = feedback::revert_fuzzy_match(&text, &fuzzy).unwrap_or_else(|| {
                tracing::warn!(word = word.as_str(), "corrected word not found, text left as is");
                text.clone()
            });
            print_json(&Transformation {
                transformed_text: reverted,
                fuzzy_matches: remaining,
            })?;
        }
        Commands::Rule { action } => match action {
            RuleAction::Add {
                user,
                word,
                replacement,
            } => {
                let previous = store.set_transformation(&user, &word, &replacement)?;
                tracing::info!(
                    user = user.as_str(),
                    word = word.as_str(),
                    replacement = replacement.as_str(),
                    previous = ?previous,
                    "correction saved"
                );
            }
            RuleAction::Remove { user, word } => {
                if store.remove_transformation(&user, &word)?.is_none() {
                    tracing::warn!(user = user.as_str(), word = word.as_str(), "no such correction");
                }
            }
            RuleAction::List { user } => print_json(&store.load(&user)?)?,
        },
        Commands::Suggest { word, limit } => {
            let vocab_path = Config::expand_path(&config.suggest.vocab_path)?;
            let index = SuggestionIndex::from_file(
                &vocab_path,
                config.matching.algorithm,
                config.suggest.threshold,
            )?;
            let limit = limit.unwrap_or(config.suggest.limit);
            print_json(&index.suggest(&word, limit))?;
        }
        Commands::Prompt { action } => match action {
            PromptAction::Set { user, prompt } => store.set_prompt(&user, &prompt)?,
            PromptAction::Show { user } => print_json(&store.load(&user)?.prompt)?,
        },
    }

    Ok(())
}

fn read_text(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => io::read_to_string(io::stdin()).context("failed to read text from stdin"),
    }
}

#[allow(clippy::print_stdout)] // Reports are the program's output
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
