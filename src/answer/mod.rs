//! Answer generation from retrieved context.

mod gemini;

pub use gemini::GeminiGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::secret_from_env;
use crate::error::Result;

/// A generative model: prompt in, answer text out.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

pub fn create_generator(config: &GeneratorConfig) -> Result<Box<dyn AnswerGenerator>> {
    let api_key = secret_from_env(&config.api_key_env)?;
    Ok(Box::new(GeminiGenerator::new(
        &api_key,
        &config.endpoint,
        &config.model,
        Duration::from_secs(config.timeout_secs),
    )?))
}

/// Prompt restricting the model to the supplied passages.
pub fn build_prompt<S: AsRef<str>>(question: &str, passages: &[S]) -> String {
    let context = passages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Answer the following question using only the context below:\n\nContext:\n{context}\n\nQuestion: {question}\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_build_prompt_joins_passages() {
        let prompt = build_prompt("Who sat?", &["The cat sat.", "The dog ran."]);
        assert_eq!(
            prompt,
            "Answer the following question using only the context below:\n\n\
             Context:\nThe cat sat.\n\nThe dog ran.\n\n\
             Question: Who sat?\nAnswer:"
        );
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = GeneratorConfig {
            api_key_env: "DOCQA_TEST_UNSET_GENAI_KEY".into(),
            ..Default::default()
        };
        let err = create_generator(&config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    }
}
