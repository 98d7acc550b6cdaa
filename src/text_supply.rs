use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::lang::Language;

/// Words generated when a session starts
pub const INITIAL_WORD_COUNT: usize = 150;
/// Refill when fewer untyped words than this remain
pub const LOW_WATER_WORDS: usize = 10;
/// Words appended per refill
pub const REFILL_WORDS: usize = 20;

const PUNCTUATION: [char; 6] = [',', '.', '?', '!', ';', ':'];
const NUMBERS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
const NUMBER_CHANCE: f64 = 0.15;
const PUNCTUATION_CHANCE: f64 = 0.2;

/// Supplies target text to a session.
///
/// Returning an empty vec means the source is exhausted.
pub trait TextSource {
    fn generate(&mut self, count: usize) -> Vec<String>;
}

/// Configuration for word generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordGenConfig {
    pub punctuation: bool,
    pub numbers: bool,
}

/// Random words drawn from a language list
pub struct WordGenerator {
    language: Language,
    config: WordGenConfig,
    rng: StdRng,
}

impl WordGenerator {
    pub fn new(language: Language, config: WordGenConfig) -> Self {
        Self {
            language,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(language: Language, config: WordGenConfig, seed: u64) -> Self {
        Self {
            language,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn random_word(&mut self) -> String {
        let mut word = self.language.random_word(&mut self.rng).to_string();

        if self.config.numbers && self.rng.gen_bool(NUMBER_CHANCE) {
            if let Some(digit) = NUMBERS.choose(&mut self.rng) {
                word = digit.to_string();
            }
        }

        if self.config.punctuation && self.rng.gen_bool(PUNCTUATION_CHANCE) {
            if let Some(mark) = PUNCTUATION.choose(&mut self.rng) {
                word.push(*mark);
            }
        }

        word
    }
}

impl TextSource for WordGenerator {
    fn generate(&mut self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.random_word()).collect()
    }
}

/// A custom prompt, handed out once
#[derive(Debug, Clone)]
pub struct FixedText {
    text: Option<String>,
}

impl FixedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

impl TextSource for FixedText {
    fn generate(&mut self, _count: usize) -> Vec<String> {
        self.text
            .take()
            .map(|t| t.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
