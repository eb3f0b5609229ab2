pub mod gemini;
pub mod image_host;
pub mod media;
pub mod openai;

use crate::config::CONFIG;
use crate::error::{ComicError, ComicResult};
use crate::utils::text::non_blank;

/// Provider credentials supplied by the caller for a single request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub google_key: Option<String>,
}

impl Credentials {
    /// Blank keys count as absent; base URL and model fall back to the
    /// configured defaults.
    pub fn new(
        openai_key: Option<String>,
        openai_base_url: Option<String>,
        openai_model: Option<String>,
        google_key: Option<String>,
    ) -> Self {
        Credentials {
            openai_key: non_blank(openai_key),
            openai_base_url: non_blank(openai_base_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| CONFIG.openai_base_url.clone()),
            openai_model: non_blank(openai_model).unwrap_or_else(|| CONFIG.openai_model.clone()),
            google_key: non_blank(google_key),
        }
    }

    pub fn has_any(&self) -> bool {
        self.openai_key.is_some() || self.google_key.is_some()
    }
}

/// Sampling knobs for one completion. Token limits are per variant because
/// Gemini counts thinking tokens against its output budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub openai_max_tokens: Option<u32>,
    pub gemini_max_output_tokens: Option<u32>,
}

/// The text-completion backend chosen for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Gemini {
        api_key: String,
        model: String,
    },
    OpenAi {
        api_key: String,
        base_url: String,
        model: String,
    },
}

impl Provider {
    /// Gemini when a Google key is present, otherwise the OpenAI-compatible
    /// backend. The choice is final for the call; there is no fallback.
    pub fn select(credentials: &Credentials) -> ComicResult<Self> {
        if let Some(api_key) = &credentials.google_key {
            return Ok(Provider::Gemini {
                api_key: api_key.clone(),
                model: CONFIG.gemini_text_model.clone(),
            });
        }
        Self::openai_only(credentials)
    }

    /// The OpenAI-compatible backend, ignoring any Google key.
    pub fn openai_only(credentials: &Credentials) -> ComicResult<Self> {
        match &credentials.openai_key {
            Some(api_key) => Ok(Provider::OpenAi {
                api_key: api_key.clone(),
                base_url: credentials.openai_base_url.clone(),
                model: credentials.openai_model.clone(),
            }),
            None => Err(ComicError::Config("no credential".to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "gemini",
            Provider::OpenAi { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } | Provider::OpenAi { model, .. } => model,
        }
    }

    /// Sends one system + user prompt pair and returns the raw model text.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: CompletionParams,
        operation: &str,
    ) -> ComicResult<String> {
        match self {
            Provider::Gemini { api_key, model } => {
                gemini::generate_text(api_key, model, system_prompt, user_prompt, params, operation)
                    .await
            }
            Provider::OpenAi {
                api_key,
                base_url,
                model,
            } => {
                openai::generate_text(
                    api_key,
                    base_url,
                    model,
                    system_prompt,
                    user_prompt,
                    params,
                    operation,
                )
                .await
            }
        }
    }
}
