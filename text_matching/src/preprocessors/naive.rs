use std::collections::HashMap;

use log::debug;

use super::{Context, Preprocessor};
use crate::{ModelErr, Result};

pub const PAD: usize = 0;
pub const OOV: usize = 1;

const DEFAULT_LENGTH: usize = 30;

/// Lowercases, splits on anything that isn't alphanumeric, maps terms to ids and fixes the length
/// by truncating or padding with `PAD` at the end.
///
/// Ids are assigned in first seen order after the two reserved ones, `PAD` and `OOV`.
#[derive(Debug, Clone)]
pub struct NaivePreprocessor {
    fixed_length: usize,
    terms: Vec<String>,
    ids: HashMap<String, usize>,
    fitted: bool,
}

impl NaivePreprocessor {
    pub fn new(fixed_length: usize) -> Self {
        Self {
            fixed_length,
            terms: vec!["<PAD>".to_string(), "<OOV>".to_string()],
            ids: HashMap::new(),
            fitted: false,
        }
    }

    pub fn fixed_length(&self) -> usize {
        self.fixed_length
    }

    /// The amount of ids in use, reserved ones included.
    pub fn vocab_size(&self) -> usize {
        self.terms.len()
    }

    /// Looks up the id of a term, `None` if it wasn't seen while fitting.
    pub fn term_id(&self, term: &str) -> Option<usize> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

impl Default for NaivePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH)
    }
}

impl Preprocessor for NaivePreprocessor {
    fn fit(&mut self, texts: &[&str]) {
        for token in texts.iter().flat_map(|text| tokenize(text)) {
            if !self.ids.contains_key(&token) {
                self.ids.insert(token.clone(), self.terms.len());
                self.terms.push(token);
            }
        }

        self.fitted = true;
        debug!(texts = texts.len(), vocab_size = self.vocab_size(); "fitted vocabulary");
    }

    fn transform(&self, text: &str) -> Result<Vec<usize>> {
        if !self.fitted {
            return Err(ModelErr::NotFitted);
        }

        let mut ids: Vec<usize> = tokenize(text)
            .take(self.fixed_length)
            .map(|token| self.term_id(&token).unwrap_or(OOV))
            .collect();
        ids.resize(self.fixed_length, PAD);

        Ok(ids)
    }

    fn context(&self) -> Context {
        Context {
            vocab_size: self.fitted.then(|| self.vocab_size()),
            input_length: Some(self.fixed_length),
        }
    }
}
