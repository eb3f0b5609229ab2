use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::comic::catalog::{display_name, style_label};
use crate::comic::Page;
use crate::error::{ComicError, ComicResult};
use crate::llm::{gemini, image_host};

const NEGATIVE_PROMPT: &str = "overly complex panels, complex panel content, inconsistent characters, distorted proportions, dull colors, panel indices visible, panel numbers shown, cluttered dialogue, verbose dialogue, illegible text, misspelled words, duplicated titles, multiple title locations, uneven margins, mismatched fonts, text corruption, mojibake, garbled characters, blurry text, character appearance changes, incorrect clothing, clothing changes without script requirement, layout deviation from sketch, costume changes";

/// Structured bundle handed to the image model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInstruction {
    pub prompt: String,
    pub requirements: String,
    pub negative_prompt: String,
}

#[derive(Serialize)]
struct InstructionEnvelope<'a> {
    image_generation_data: &'a ImageInstruction,
}

impl ImageInstruction {
    /// JSON text sent as the image prompt, with non-ASCII kept as-is.
    pub fn to_prompt_text(&self) -> ComicResult<String> {
        Ok(serde_json::to_string(&InstructionEnvelope {
            image_generation_data: self,
        })?)
    }
}

/// A rendered image and the prompt text that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub image_url: String,
    pub prompt: String,
}

/// Collects `Panel {row}-{col}: {text}` lines, skipping blank panels.
/// With `rows_limit` only the leading rows are read.
fn panel_lines(page: &Page, rows_limit: Option<usize>) -> Vec<String> {
    let rows_limit = rows_limit.unwrap_or(usize::MAX);
    let mut lines = Vec::new();
    for (row_index, row) in page.rows.iter().take(rows_limit).enumerate() {
        for (panel_index, panel) in row.panels.iter().enumerate() {
            let text = panel.text().trim();
            if text.is_empty() {
                continue;
            }
            lines.push(format!("Panel {}-{}: {}", row_index + 1, panel_index + 1, text));
        }
    }
    lines
}

pub fn page_to_instruction(
    page: &Page,
    style: &str,
    language: &str,
    rows_limit: Option<usize>,
) -> ImageInstruction {
    let comic_style = style_label(style);
    let target_lang = display_name(language);
    let title = &page.title;
    let panels = panel_lines(page, rows_limit).join("\n");

    let prompt = format!(
        "Using the style of {comic_style}, convert the storyline in each panel of the reference image into corresponding comic content. All text in the comic, including titles and speech bubbles, MUST be in {target_lang}.

# Content:

## Title
{title}

## Panels
{panels}"
    );

    let requirements = format!(
        "- Maintain consistency in characters and scenes.
- The image should be colorful and vibrant.
- Include speech bubbles with short, clear dialogue to help tell the story.
- Ensure text is legible and spelled correctly.
- All dialogue and titles MUST be in {target_lang}.
- Display the title only once, typically at the top center of the comic page.
- Maintain consistent and uniform margins around the entire comic page.
- Ensure equal spacing on all sides (top, bottom, left, right) for a professional appearance.
- The comic title should use a {comic_style}-style font that matches the overall comic aesthetic.
- Use fonts that properly support {target_lang} characters.
- Ensure all text is correctly encoded and displayed clearly.
- Text should be clear, sharp, and properly rendered in both speech bubbles and titles.
- Character Consistency: Use the first provided images (previous pages) as the definitive source for character appearances. These may also include user-provided reference images for maintaining character, prop, or item consistency. Carry over the exact facial features, hair styles, and identical clothing/outfits."
    );

    ImageInstruction {
        prompt: prompt.trim().to_string(),
        requirements,
        negative_prompt: NEGATIVE_PROMPT.to_string(),
    }
}

/// Single flat prompt for a vertical one-panel cover. A non-blank
/// `custom_requirements` is appended as an override block.
pub fn cover_instruction(
    style: &str,
    language: &str,
    reference_count: usize,
    custom_requirements: Option<&str>,
) -> String {
    let comic_style = style_label(style);
    let target_lang = display_name(language);
    let reference_note = match reference_count {
        0 => String::new(),
        1 => "\n- 1 story page is attached as a reference image.".to_string(),
        n => format!("\n- {n} story pages are attached as reference images, in reading order."),
    };

    let mut prompt = format!(
        "Create a high-quality comic book cover in the style of {comic_style}.

# Important Context:
- The reference images provided show the story pages of this comic.
- You MUST base the cover on the characters, scenes, and storyline shown in these reference images.
- The cover should capture the essence and key moments from the story pages.
- Use the same characters, props, and items with consistent appearances as shown in the reference images.{reference_note}

# Requirements:
- The image must be a vertical comic book cover composition.
- The art style must strictly follow {comic_style}.
- Make it eye-catching and dramatic while staying true to the story.
- Feature the main characters and key scenes from the reference story pages.
- High resolution, detailed, and professional quality.
- No other text except the title.
- The title text must be in {target_lang}.
- Clear and sharp text for the title, do not repeat all the titles in reference images.
- Vibrant colors and \"Cover Art\" aesthetic.
- Only present one row one panel in the cover.
- Ensure all characters in the title are correctly rendered and legible.
- The cover should feel like a natural introduction to the story shown in the reference pages."
    );

    if let Some(custom) = custom_requirements.map(str::trim).filter(|text| !text.is_empty()) {
        prompt.push_str(&format!(
            "

# IMPORTANT - User's Custom Requirements (MUST FOLLOW STRICTLY):
The user has provided specific requirements below. These are CRITICAL and take HIGHEST PRIORITY.
You MUST strictly follow these custom requirements while maintaining the basic comic cover style.

User Requirements:
{custom}

** You MUST implement ALL of the above user requirements. They are mandatory. **"
        ));
    }

    prompt
}

/// Reads a reference list: one URL string, or a list mixing URL strings and
/// `{imageUrl}` records. Anything else is ignored.
pub fn reference_urls(value: Option<&Value>) -> Vec<String> {
    fn push_entry(entry: &Value, urls: &mut Vec<String>) {
        let url = match entry {
            Value::String(url) => Some(url.as_str()),
            Value::Object(record) => record.get("imageUrl").and_then(Value::as_str),
            _ => None,
        };
        if let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) {
            urls.push(url.to_string());
        }
    }

    let mut urls = Vec::new();
    match value {
        Some(Value::Array(entries)) => entries.iter().for_each(|entry| push_entry(entry, &mut urls)),
        Some(entry @ Value::String(_)) => push_entry(entry, &mut urls),
        _ => {}
    }
    urls
}

/// Prior pages lead, then user sketches.
pub fn ordered_references(prior_pages: Vec<String>, sketches: Vec<String>) -> Vec<String> {
    let mut references = prior_pages;
    references.extend(sketches);
    references
}

async fn render(google_api_key: &str, prompt: String, references: &[String]) -> ComicResult<RenderedImage> {
    let image = gemini::generate_image(google_api_key, &prompt, references)
        .await?
        .ok_or_else(|| ComicError::EmptyResult("Image generation failed".to_string()))?;
    let image_url = image_host::publish_image(&image, &prompt).await;
    Ok(RenderedImage { image_url, prompt })
}

pub async fn generate_page_image(
    google_api_key: &str,
    page: &Page,
    style: &str,
    language: &str,
    rows_limit: Option<usize>,
    references: &[String],
) -> ComicResult<RenderedImage> {
    let prompt = page_to_instruction(page, style, language, rows_limit).to_prompt_text()?;
    info!(
        "Generating page image '{}' with {} reference(s)",
        page.title,
        references.len()
    );
    render(google_api_key, prompt, references).await
}

pub async fn generate_cover(
    google_api_key: &str,
    style: &str,
    language: &str,
    references: &[String],
    custom_requirements: Option<&str>,
) -> ComicResult<RenderedImage> {
    let prompt = cover_instruction(style, language, references.len(), custom_requirements);
    info!("Generating cover with {} reference(s)", references.len());
    render(google_api_key, prompt, references).await
}
