//! Pretrained T5 backend on candle
//!
//! Config, tokenizer and safetensors weights are fetched from the Hugging
//! Face hub by checkpoint id. Decoding runs [`beam_search`] with the full
//! decoder prefix on every step, so a shared model can serve concurrent
//! calls from per-call clones.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{self, T5ForConditionalGeneration};
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::generation::{beam_search, DecoderStep, GenerationConfig, SpecialTokens};
use super::TextGenerator;
use crate::config::SummarizerConfig;
use crate::error::{MlError, Result as MlResult};

/// T5 checkpoint behind the [`TextGenerator`] interface
pub struct T5Generator {
    model: T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    special: SpecialTokens,
    max_input_tokens: usize,
    model_name: String,
}

impl T5Generator {
    /// Download (or reuse the cached copy of) the configured checkpoint
    pub fn load(config: &SummarizerConfig) -> MlResult<Self> {
        info!("Loading {} model...", config.checkpoint);
        let generator = Self::load_checkpoint(&config.checkpoint, config.max_input_tokens)
            .map_err(|e| MlError::ModelLoad(format!("{}: {:#}", config.checkpoint, e)))?;
        check_special_tokens(generator.special, |id| {
            generator.tokenizer.id_to_token(id).is_some()
        })?;
        info!("Model {} loaded on {:?}", config.checkpoint, generator.device);
        Ok(generator)
    }

    fn load_checkpoint(checkpoint: &str, max_input_tokens: usize) -> Result<Self> {
        let device = Device::cuda_if_available(0)?;

        let api = Api::new()?;
        let repo = api.model(checkpoint.to_string());
        let config_file = repo.get("config.json").context("fetching config.json")?;
        let tokenizer_file = repo.get("tokenizer.json").context("fetching tokenizer.json")?;
        let weights_file = repo
            .get("model.safetensors")
            .context("fetching model.safetensors")?;

        let mut model_config: t5::Config =
            serde_json::from_str(&std::fs::read_to_string(config_file)?)?;
        // Every step re-runs the decoder over the whole prefix.
        model_config.use_cache = false;

        let tokenizer = Tokenizer::from_file(tokenizer_file).map_err(|e| anyhow!(e))?;

        // SAFETY: the cached weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_file], DType::F32, &device)? };
        let model = T5ForConditionalGeneration::load(vb, &model_config)?;

        let pad = model_config.pad_token_id as u32;
        let special = SpecialTokens {
            decoder_start: model_config
                .decoder_start_token_id
                .map(|id| id as u32)
                .unwrap_or(pad),
            eos: model_config.eos_token_id as u32,
            pad,
        };

        Ok(Self {
            model,
            tokenizer,
            device,
            special,
            max_input_tokens,
            model_name: checkpoint.to_string(),
        })
    }

    /// Token ids for `prompt`, truncated but still terminated by EOS
    fn encode_prompt(&self, prompt: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer.encode(prompt, true).map_err(|e| anyhow!(e))?;
        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > self.max_input_tokens {
            ids.truncate(self.max_input_tokens - 1);
            ids.push(self.special.eos);
        }
        Ok(ids)
    }
}

/// Fail unless every special token id is known to the tokenizer
fn check_special_tokens(special: SpecialTokens, known: impl Fn(u32) -> bool) -> MlResult<()> {
    let ids = [
        ("decoder start", special.decoder_start),
        ("end-of-sequence", special.eos),
        ("padding", special.pad),
    ];
    for (name, id) in ids {
        if !known(id) {
            return Err(MlError::Generation(format!(
                "{} token id {} is not in the tokenizer vocabulary",
                name, id
            )));
        }
    }
    Ok(())
}

struct T5Step<'a> {
    model: T5ForConditionalGeneration,
    encoder_output: Tensor,
    device: &'a Device,
}

impl DecoderStep for T5Step<'_> {
    fn next_logits(&mut self, prefix: &[u32]) -> Result<Vec<f32>> {
        let decoder_ids = Tensor::new(prefix, self.device)?.unsqueeze(0)?;
        let logits = self
            .model
            .decode(&decoder_ids, &self.encoder_output)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        Ok(logits.to_vec1::<f32>()?)
    }
}

impl TextGenerator for T5Generator {
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let input_ids = self.encode_prompt(prompt)?;
        debug!("Encoding {} input tokens", input_ids.len());

        let mut model = self.model.clone();
        let input = Tensor::new(input_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        let mut step = T5Step {
            model,
            encoder_output,
            device: &self.device,
        };
        let output_ids = beam_search(&mut step, self.special, config)?;
        debug!("Generated {} tokens", output_ids.len());

        self.tokenizer
            .decode(&output_ids, true)
            .map_err(|e| anyhow!(e))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T5_SPECIAL: SpecialTokens = SpecialTokens {
        decoder_start: 0,
        eos: 1,
        pad: 0,
    };

    #[test]
    fn test_special_tokens_in_vocabulary() {
        assert!(check_special_tokens(T5_SPECIAL, |id| id < 32_100).is_ok());
    }

    #[test]
    fn test_special_token_outside_vocabulary() {
        let result = check_special_tokens(T5_SPECIAL, |id| id != 1);
        match result {
            Err(MlError::Generation(message)) => assert!(message.contains("end-of-sequence")),
            other => panic!("expected a generation error, got {other:?}"),
        }
    }
}
