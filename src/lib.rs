//! Whisper Vocab - personal vocabulary corrections for transcribed text
//!
//! Rewrites transcripts with a user's word corrections, catching near-miss
//! spellings through approximate matching and learning from rejected fixes.

/// Configuration management
pub mod config;
/// Undo of fuzzy corrections and the discard list
pub mod feedback;
/// Approximate string matching
pub mod matcher;
/// Grammar correction followed by word transformations
pub mod pipeline;
/// Per-user vocabulary storage
pub mod store;
/// Vocabulary suggestions
pub mod suggest;
/// Logging setup
pub mod telemetry;
/// Word tokens and case matching
pub mod tokenize;
/// Word-transformation engine
pub mod transform;

pub use transform::{
    transform, CorrectionDictionary, DiscardedFuzzy, FuzzyMatch, FuzzyMatchMap, Transformation,
    Transformer,
};
