//! Beam search decoding for sequence-to-sequence generators
//!
//! Lengths here count generated content tokens: the decoder start token and
//! the end-of-sequence token are not included.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Extra tokens allowed on top of the caller's maximum summary length
pub const LENGTH_BUFFER: usize = 10;

/// Decoding constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub num_beams: usize,
    /// Exponent applied to the sequence length when scoring finished beams
    pub length_penalty: f64,
    pub max_length: usize,
    pub min_length: usize,
    /// Forbid repeating any n-gram of this size; 0 disables the check
    pub no_repeat_ngram_size: usize,
    /// Stop as soon as `num_beams` finished hypotheses exist
    pub early_stopping: bool,
}

impl GenerationConfig {
    /// Settings for a summary of `min_length..=max_length` words
    pub fn for_summary(max_length: usize, min_length: usize) -> Self {
        Self {
            num_beams: 4,
            length_penalty: 2.0,
            max_length: max_length.saturating_add(LENGTH_BUFFER),
            min_length,
            no_repeat_ngram_size: 2,
            early_stopping: true,
        }
    }
}

/// Token ids the search needs to know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub decoder_start: u32,
    pub eos: u32,
    /// Never generated
    pub pad: u32,
}

/// One decoder forward pass
pub trait DecoderStep {
    /// Logits over the vocabulary for the token following `prefix`.
    ///
    /// `prefix` always starts with the decoder start token.
    fn next_logits(&mut self, prefix: &[u32]) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    log_prob: f64,
}

/// Finished hypotheses, best `capacity` kept
struct Hypotheses {
    capacity: usize,
    length_penalty: f64,
    early_stopping: bool,
    items: Vec<(f64, Vec<u32>)>,
}

impl Hypotheses {
    fn new(config: &GenerationConfig) -> Self {
        Self {
            capacity: config.num_beams,
            length_penalty: config.length_penalty,
            early_stopping: config.early_stopping,
            items: Vec::with_capacity(config.num_beams + 1),
        }
    }

    /// Length-normalized score; the start token counts toward the length
    fn score(&self, log_prob: f64, content_len: usize) -> f64 {
        log_prob / ((content_len + 1) as f64).powf(self.length_penalty)
    }

    fn worst(&self) -> f64 {
        self.items
            .iter()
            .map(|(s, _)| *s)
            .fold(f64::INFINITY, f64::min)
    }

    fn add(&mut self, tokens: Vec<u32>, log_prob: f64) {
        let score = self.score(log_prob, tokens.len());
        if self.items.len() < self.capacity || score > self.worst() {
            self.items.push((score, tokens));
            if self.items.len() > self.capacity {
                if let Some(pos) = self
                    .items
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                    .map(|(i, _)| i)
                {
                    self.items.remove(pos);
                }
            }
        }
    }

    /// Whether no open beam can still beat the finished ones
    fn is_done(&self, best_open_log_prob: f64, content_len: usize) -> bool {
        if self.items.len() < self.capacity {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        self.worst() >= self.score(best_open_log_prob, content_len)
    }

    fn best(self) -> Option<Vec<u32>> {
        self.items
            .into_iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tokens)| tokens)
    }
}

/// Run beam search and return the best hypothesis without special tokens
pub fn beam_search<D: DecoderStep + ?Sized>(
    decoder: &mut D,
    special: SpecialTokens,
    config: &GenerationConfig,
) -> Result<Vec<u32>> {
    let num_beams = config.num_beams.max(1);
    let mut hypotheses = Hypotheses::new(config);
    hypotheses.capacity = num_beams;
    let mut beams = vec![Beam {
        tokens: Vec::new(),
        log_prob: 0.0,
    }];
    let mut done = false;

    for _ in 0..config.max_length {
        let mut candidates: Vec<(f64, usize, u32)> = Vec::new();

        for (beam_idx, beam) in beams.iter().enumerate() {
            let mut prefix = Vec::with_capacity(beam.tokens.len() + 1);
            prefix.push(special.decoder_start);
            prefix.extend_from_slice(&beam.tokens);

            let mut log_probs = log_softmax(&decoder.next_logits(&prefix)?);
            if special.pad != special.eos {
                if let Some(lp) = log_probs.get_mut(special.pad as usize) {
                    *lp = f64::NEG_INFINITY;
                }
            }
            if beam.tokens.len() < config.min_length {
                if let Some(lp) = log_probs.get_mut(special.eos as usize) {
                    *lp = f64::NEG_INFINITY;
                }
            }
            for token in banned_tokens(&beam.tokens, config.no_repeat_ngram_size) {
                if let Some(lp) = log_probs.get_mut(token as usize) {
                    *lp = f64::NEG_INFINITY;
                }
            }

            candidates.extend(
                log_probs
                    .iter()
                    .enumerate()
                    .filter(|(_, lp)| lp.is_finite())
                    .map(|(token, lp)| (beam.log_prob + lp, beam_idx, token as u32)),
            );
        }

        candidates.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });
        candidates.truncate(2 * num_beams);

        let mut next = Vec::with_capacity(num_beams);
        for (rank, &(log_prob, beam_idx, token)) in candidates.iter().enumerate() {
            if token == special.eos {
                // Only top-ranked endings may finish a hypothesis.
                if rank < num_beams {
                    hypotheses.add(beams[beam_idx].tokens.clone(), log_prob);
                }
                continue;
            }
            let mut tokens = beams[beam_idx].tokens.clone();
            tokens.push(token);
            next.push(Beam { tokens, log_prob });
            if next.len() == num_beams {
                break;
            }
        }

        let Some(best_open) = next.first().map(|b| b.log_prob) else {
            done = true;
            break;
        };
        let content_len = next[0].tokens.len();
        beams = next;
        if hypotheses.is_done(best_open, content_len) {
            done = true;
            break;
        }
    }

    if !done {
        for beam in beams {
            hypotheses.add(beam.tokens, beam.log_prob);
        }
    }

    Ok(hypotheses.best().unwrap_or_default())
}

fn log_softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&l| l as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![f64::NEG_INFINITY; logits.len()];
    }
    let sum: f64 = logits.iter().map(|&l| (l as f64 - max).exp()).sum();
    let log_sum = sum.ln() + max;
    logits.iter().map(|&l| l as f64 - log_sum).collect()
}

/// Tokens that would complete an n-gram already present in `tokens`
fn banned_tokens(tokens: &[u32], n: usize) -> HashSet<u32> {
    let mut banned = HashSet::new();
    if n == 0 || tokens.len() + 1 < n {
        return banned;
    }
    let tail = &tokens[tokens.len() + 1 - n..];
    for window in tokens.windows(n) {
        if window[..n - 1] == *tail {
            banned.insert(window[n - 1]);
        }
    }
    banned
}
