use tracing::info;

use crate::comic::catalog::describe_style;
use crate::error::{ComicError, ComicResult};
use crate::llm::{CompletionParams, Provider};

const OPTIMIZER_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.7,
    openai_max_tokens: Some(500),
    gemini_max_output_tokens: None,
};

fn language_instruction(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "en" => "Please optimize the prompt in English.",
        "ja" => "日本語でプロンプトを最適化してください。",
        _ => "请用中文优化提示词。",
    }
}

/// System prompt for expanding a short idea into a storyboard description.
/// The user prompt is the idea itself.
pub fn build_prompt(style: &str, language: &str) -> String {
    let style_desc = describe_style(style);
    let language_instruction = language_instruction(language);
    format!(
        "You are a professional comic storyboard prompt optimizer. Your task is to take a user's simple idea and expand it into a detailed, vivid description suitable for comic storyboard generation.

**Comic Style Context**: {style_desc}

**Language Requirement**: {language_instruction}

**Your Task**:
1. Understand the user's core idea and intent
2. Expand it with rich visual details suitable for comic panels:
   - Character descriptions (appearance, expressions, clothing)
   - Scene settings (location, atmosphere, time of day)
   - Key actions and interactions
   - Emotional tones and story beats
3. Structure the description to support multi-panel storytelling
4. Make it vivid and specific enough for visual generation
5. Keep it concise but comprehensive (2-4 sentences)

**Output Format**:
- Single paragraph with clear, visual descriptions
- Include specific details about characters, settings, and actions
- Maintain story flow and coherence
- Emphasize visual elements over abstract concepts

**Important**:
- Focus on what CAN BE SEEN in comic panels
- Use concrete visual language
- Consider the specified comic style in your descriptions
- Output ONLY the optimized prompt, no explanations or meta-commentary"
    )
}

pub async fn optimize_prompt(
    provider: &Provider,
    prompt: &str,
    style: &str,
    language: &str,
) -> ComicResult<String> {
    let system_prompt = build_prompt(style, language);
    let raw_text = provider
        .complete(&system_prompt, prompt, OPTIMIZER_PARAMS, "optimize_prompt")
        .await
        .map_err(|err| err.context("Prompt optimization failed"))?;

    let optimized = raw_text.trim();
    if optimized.is_empty() {
        return Err(ComicError::EmptyResult(
            "Prompt optimization failed: optimized prompt is empty".to_string(),
        ));
    }
    info!(
        "Prompt optimized successfully with {}: {} chars",
        provider.name(),
        optimized.chars().count()
    );
    Ok(optimized.to_string())
}
