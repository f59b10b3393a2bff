use crate::pipeline::DEFAULT_PROMPT;
use crate::transform::{validate_correction, CorrectionDictionary, DiscardedFuzzy, TransformError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by [`VocabularyStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// User id is empty or could escape the store directory
    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    /// Reading or writing a user document failed
    #[error("failed to access {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A correction would never apply
    #[error("invalid correction: {0}")]
    InvalidCorrection(#[from] TransformError),

    /// A user document is not valid JSON
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// Document path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Everything stored for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserVocabulary {
    /// Word corrections
    pub transformations: CorrectionDictionary,
    /// Rejected fuzzy corrections
    pub discarded_fuzzy: DiscardedFuzzy,
    /// Grammar-correction prompt
    pub prompt: String,
}

impl Default for UserVocabulary {
    fn default() -> Self {
        Self {
            transformations: CorrectionDictionary::new(),
            discarded_fuzzy: DiscardedFuzzy::new(),
            prompt: DEFAULT_PROMPT.to_owned(),
        }
    }
}

/// One JSON document per user under a root directory
#[derive(Debug, Clone)]
pub struct VocabularyStore {
    root: PathBuf,
}

impl VocabularyStore {
    /// Store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the user documents
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads a user's vocabulary; unknown users get an empty one
    ///
    /// # Errors
    /// Returns error if the user id is invalid or the document is unreadable
    pub fn load(&self, uid: &str) -> Result<UserVocabulary, StoreError> {
        let path = self.document_path(uid)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(uid = uid, "no vocabulary stored yet");
                return Ok(UserVocabulary::default());
            }
            Err(e) => return Err(io_error(&path)(e)),
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Json { path, source })
    }

    /// Replaces a user's vocabulary
    ///
    /// # Errors
    /// Returns error if the user id is invalid or the write fails
    pub fn save(&self, uid: &str, vocabulary: &UserVocabulary) -> Result<(), StoreError> {
        let path = self.document_path(uid)?;
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let json = serde_json::to_string_pretty(vocabulary).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        // Readers must never see a partially written document
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(io_error(&temp_path))?;
        fs::rename(&temp_path, &path).map_err(io_error(&path))?;

        tracing::debug!(uid = uid, path = %path.display(), "vocabulary saved");
        Ok(())
    }

    /// Adds or replaces a correction; returns the replaced value
    ///
    /// # Errors
    /// Returns error if the word or replacement is blank, or if loading or
    /// saving fails
    pub fn set_transformation(
        &self,
        uid: &str,
        word: &str,
        replacement: &str,
    ) -> Result<Option<String>, StoreError> {
        validate_correction(word, replacement)?;
        self.update(uid, |v| {
            v.transformations
                .insert(word.to_owned(), replacement.to_owned())
        })
    }

    /// Removes a correction; returns the removed value
    ///
    /// # Errors
    /// Returns error if loading or saving fails
    pub fn remove_transformation(&self, uid: &str, word: &str) -> Result<Option<String>, StoreError> {
        self.update(uid, |v| v.transformations.remove(word))
    }

    /// Merges rejected fuzzy corrections into the user's discard list
    ///
    /// # Errors
    /// Returns error if loading or saving fails
    pub fn add_discarded_fuzzy(&self, uid: &str, entries: &DiscardedFuzzy) -> Result<(), StoreError> {
        self.update(uid, |v| {
            for (word, key) in entries {
                v.discarded_fuzzy.insert(word.to_lowercase(), key.clone());
            }
        })
    }

    /// Replaces the user's grammar prompt
    ///
    /// # Errors
    /// Returns error if loading or saving fails
    pub fn set_prompt(&self, uid: &str, prompt: &str) -> Result<(), StoreError> {
        self.update(uid, |v| prompt.clone_into(&mut v.prompt))
    }

    /// Load, change and save under an exclusive per-user lock file, so
    /// concurrent writers (threads or processes) never lose an update
    fn update<T>(
        &self,
        uid: &str,
        change: impl FnOnce(&mut UserVocabulary) -> T,
    ) -> Result<T, StoreError> {
        let _lock = self.lock(uid)?;
        let mut vocabulary = self.load(uid)?;
        let result = change(&mut vocabulary);
        self.save(uid, &vocabulary)?;
        Ok(result)
    }

    fn lock(&self, uid: &str) -> Result<File, StoreError> {
        let path = self.document_path(uid)?.with_extension("lock");
        fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(io_error(&path))?;
        // Released when the file is dropped
        file.lock().map_err(io_error(&path))?;
        Ok(file)
    }

    fn document_path(&self, uid: &str) -> Result<PathBuf, StoreError> {
        let valid = !uid.is_empty()
            && uid != "."
            && uid != ".."
            && uid
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
        if !valid {
            return Err(StoreError::InvalidUserId(uid.to_owned()));
        }
        Ok(self.root.join(format!("{uid}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}
