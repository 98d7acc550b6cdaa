use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

static LANG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/lang");

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("language file {0} not found")]
    NotFound(String),

    #[error("language file {0} is not utf-8")]
    NotUtf8(String),

    #[error("language file {file} is malformed: {source}")]
    Malformed {
        file: String,
        source: serde_json::Error,
    },

    #[error("language {0} has no words")]
    Empty(String),
}

#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Language {
    pub fn new(name: &str) -> Result<Self, LanguageError> {
        read_language_from_file(&format!("{name}.json"))
    }

    pub fn english() -> Result<Self, LanguageError> {
        Self::new("english")
    }

    pub fn random_word<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.words.choose(rng).map_or("", String::as_str)
    }
}

fn read_language_from_file(file_name: &str) -> Result<Language, LanguageError> {
    let file = LANG_DIR
        .get_file(file_name)
        .ok_or_else(|| LanguageError::NotFound(file_name.to_string()))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or_else(|| LanguageError::NotUtf8(file_name.to_string()))?;

    let lang: Language =
        serde_json::from_str(file_as_str).map_err(|source| LanguageError::Malformed {
            file: file_name.to_string(),
            source,
        })?;

    if lang.words.is_empty() {
        return Err(LanguageError::Empty(lang.name));
    }

    Ok(lang)
}
