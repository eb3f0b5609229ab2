use tracing::info;

use crate::comic::Page;
use crate::error::{ComicError, ComicResult};
use crate::llm::{CompletionParams, Provider};
use crate::utils::text::preview_chars;

const TITLE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.6,
    openai_max_tokens: Some(30),
    gemini_max_output_tokens: Some(1024),
};

const PANEL_PREVIEW_CHARS: usize = 100;

const QUOTE_PAIRS: &[(char, char)] = &[
    ('"', '"'),
    ('\'', '\''),
    ('“', '”'),
    ('‘', '’'),
    ('「', '」'),
    ('『', '』'),
    ('《', '》'),
];

fn language_instruction(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "en" => "Generate the title in English. The title should be concise (3-8 words), catchy, and capture the core theme or highlight of the story.",
        "ja" => "日本語でタイトルを生成してください。タイトルは簡潔（5-15文字）で、魅力的で、ストーリーの核心テーマまたはハイライトを捉えたものにしてください。",
        _ => "请用中文生成标题。标题应该简洁（5-15个汉字），有吸引力，能概括故事的核心主题或亮点。",
    }
}

fn context_block(first_page: Option<&Page>) -> String {
    let Some(page) = first_page else {
        return String::new();
    };
    let mut context = String::new();
    if !page.title.is_empty() {
        context.push_str(&format!("\n\n生成的第一页标题: {}", page.title));
    }
    if let Some(text) = page.first_panel_text() {
        context.push_str(&format!(
            "\n第一个分镜内容: {}",
            preview_chars(text, PANEL_PREVIEW_CHARS)
        ));
    }
    context
}

pub fn build_prompt(original_prompt: &str, language: &str, first_page: Option<&Page>) -> (String, String) {
    let language_instruction = language_instruction(language);
    let system_prompt = format!(
        r#"你是一个专业的漫画标题生成器。你的任务是为漫画创作会话生成一个简短、准确、吸引人的标题。

**语言要求**: {language_instruction}

**核心原则**（按优先级排序）：
1. **准确性第一**：标题必须准确反映故事的核心主题，不要过度发挥创意而偏离主题
2. **简洁明了**：控制在推荐长度内，去除冗余修饰
3. **抓住重点**：聚焦故事的主角、关键情节或核心冲突
4. **便于识别**：让用户一眼就能认出这个故事

**标题生成步骤**：
1. 仔细阅读用户的故事描述和漫画内容
2. 识别核心要素：主角是谁？主要做什么？核心冲突或主题是什么？
3. 提炼最关键的1-2个要素
4. 用最简洁的语言表达出来

**优秀示例**：
- 用户描述: "讲述小明从零开始学习Python编程，遇到困难但最终做出了第一个网站的故事"
  → 标题: "小明学编程" （抓住主角+核心行为）

- 用户描述: "一只流浪猫在城市里寻找家的温暖，最终被一个小女孩收养"
  → 标题: "流浪猫找家记" （抓住主角+核心情节）

- 用户描述: "A brave knight fights a dragon to save the kingdom"
  → 标题: "Dragon Slayer" （抓住核心行为+对手）

**避免的错误**：
❌ 太长："小明在现代社会中艰难学习编程技术的励志成长故事"
❌ 太虚："成长的足迹"、"梦想启航" （太空泛，缺乏具体性）
❌ 过度修饰："勇敢无畏的小明踏上编程征途"

**输出要求**：
- 只输出标题本身，不要任何解释
- 不要引号、书名号等标点符号
- 严格控制长度"#
    );

    let user_prompt = format!(
        "用户的故事描述：{original_prompt}{}",
        context_block(first_page)
    );
    (system_prompt, user_prompt)
}

fn is_quote(ch: char) -> bool {
    QUOTE_PAIRS
        .iter()
        .any(|(open, close)| ch == *open || ch == *close)
}

/// Trims, removes one matching pair of surrounding quotes, trims again.
/// A result that is empty or nothing but quote marks is an error.
pub fn clean_title(raw_text: &str) -> ComicResult<String> {
    let mut title = raw_text.trim();
    for (open, close) in QUOTE_PAIRS {
        if title.chars().count() >= 2 && title.starts_with(*open) && title.ends_with(*close) {
            title = &title[open.len_utf8()..title.len() - close.len_utf8()];
            break;
        }
    }
    let title = title.trim();

    if title.is_empty() || title.chars().all(is_quote) {
        return Err(ComicError::EmptyResult("Generated title is empty".to_string()));
    }
    Ok(title.to_string())
}

pub async fn generate_title(
    provider: &Provider,
    original_prompt: &str,
    language: &str,
    first_page: Option<&Page>,
) -> ComicResult<String> {
    let (system_prompt, user_prompt) = build_prompt(original_prompt, language, first_page);
    let raw_text = provider
        .complete(&system_prompt, &user_prompt, TITLE_PARAMS, "generate_session_title")
        .await
        .map_err(|err| err.context("Title generation failed"))?;

    let title = clean_title(&raw_text).map_err(|err| err.context("Title generation failed"))?;
    info!("Title generated successfully with {}: {}", provider.name(), title);
    Ok(title)
}
