use tracing::{debug, info};

use crate::comic::catalog::{describe_language, describe_style, is_known_language, is_known_style};
use crate::comic::extract::parse_json_response;
use crate::comic::{pages_from_value, ComicScript};
use crate::error::ComicResult;
use crate::llm::{CompletionParams, Provider};

pub const MIN_PAGE_COUNT: u32 = 1;
pub const MAX_PAGE_COUNT: u32 = 10;
pub const MIN_ROWS_PER_PAGE: u32 = 1;
pub const MAX_ROWS_PER_PAGE: u32 = 5;
pub const DEFAULT_PAGE_COUNT: u32 = 3;
pub const DEFAULT_ROWS_PER_PAGE: u32 = 4;

const SCRIPT_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.7,
    openai_max_tokens: Some(3000),
    gemini_max_output_tokens: Some(8192),
};

/// Inputs for one script generation, already range-checked by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub prompt: String,
    pub style: String,
    pub language: String,
    pub page_count: u32,
    pub rows_per_page: u32,
}

/// Builds the `(system, user)` prompt pair for storyboard generation.
///
/// Pure template substitution: identical requests give identical text.
pub fn build_prompt(request: &ScriptRequest) -> (String, String) {
    let page_count = request.page_count;
    let rows_per_page = request.rows_per_page;
    let style_desc = describe_style(&request.style);
    let language_instruction = describe_language(&request.language);

    let system_prompt = format!(
        r#"你是一个专业的漫画分镜脚本编写助手。请根据用户的描述，生成{page_count}页漫画的分镜脚本。

**重要：请使用{style_desc}来设计分镜内容。**

**语言要求：{language_instruction}**

返回格式为JSON数组，每个元素代表一页：

[
  {{
    "title": "第1页标题",
    "rows": [
      {{
        "height": "180px",
        "panels": [
          {{ "text": "分镜描述文字" }}
        ]
      }}
    ]
  }},
  {{
    "title": "第2页标题",
    "rows": [...]
  }}
]

要求：
1. 生成{page_count}页完整的故事
2. 每页有独立的title
3. 每页漫画3-5行，合理安排剧情节奏，本次每页优先安排{rows_per_page}行
4. 每行可以有1-2个面板（尽量不要每行都是1个面板）
5. 分镜描述要简洁生动，推动故事发展，并体现所选风格的特点
6. 只返回JSON数组，不要有其他解释文字
7. 所有文本内容必须使用指定的语言"#
    );

    (system_prompt, request.prompt.clone())
}

/// Turns raw model text into validated pages.
pub fn parse_script(raw_text: &str) -> ComicResult<ComicScript> {
    let value = parse_json_response(raw_text)?;
    pages_from_value(value)
}

pub async fn generate_script(provider: &Provider, request: &ScriptRequest) -> ComicResult<ComicScript> {
    if !is_known_style(&request.style) || !is_known_language(&request.language) {
        debug!(
            "Unrecognized style '{}' or language '{}'; catalog defaults apply",
            request.style, request.language
        );
    }
    let (system_prompt, user_prompt) = build_prompt(request);
    info!(
        "Generating {} page script via {}/{} (style={}, language={}, rows_per_page={})",
        request.page_count,
        provider.name(),
        provider.model(),
        request.style,
        request.language,
        request.rows_per_page
    );

    let raw_text = provider
        .complete(&system_prompt, &user_prompt, SCRIPT_PARAMS, "generate_script")
        .await
        .map_err(|err| err.context("AI generation failed"))?;

    parse_script(&raw_text).map_err(|err| err.context("AI generation failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComicError;

    fn request(page_count: u32, rows_per_page: u32) -> ScriptRequest {
        ScriptRequest {
            prompt: "A robot learns to paint".to_string(),
            style: "ghibli".to_string(),
            language: "en".to_string(),
            page_count,
            rows_per_page,
        }
    }

    #[test]
    fn system_prompt_covers_every_valid_range() {
        for page_count in MIN_PAGE_COUNT..=MAX_PAGE_COUNT {
            for rows_per_page in MIN_ROWS_PER_PAGE..=MAX_ROWS_PER_PAGE {
                let (system, user) = build_prompt(&request(page_count, rows_per_page));
                assert!(system.contains(&format!("生成{page_count}页漫画")));
                assert!(system.contains("3-5行"));
                assert!(system.contains("1-2个面板"));
                assert_eq!(user, "A robot learns to paint");
            }
        }
    }

    #[test]
    fn style_and_language_are_embedded_verbatim() {
        let (system, _) = build_prompt(&request(2, 4));
        assert!(system.contains(describe_style("ghibli")));
        assert!(system.contains(describe_language("en")));
        assert!(system.contains("只返回JSON数组"));
        assert!(system.contains("\"height\": \"180px\""));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt(&request(3, 4)), build_prompt(&request(3, 4)));
    }

    #[test]
    fn fenced_script_is_parsed_into_pages() {
        let raw = "Here you go:\n```json\n[{\"title\": \"Start\", \"rows\": [{\"height\": \"180px\", \"panels\": [{\"text\": \"A robot wakes\"}, {\"text\": \"It sees paint\"}]}]}]\n```";
        let pages = parse_script(raw).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].panel_texts(), vec!["A robot wakes", "It sees paint"]);
    }

    #[test]
    fn lone_page_object_is_wrapped() {
        let pages = parse_script("{\"title\": \"Only\", \"rows\": []}").unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Only");
    }

    #[test]
    fn loosely_typed_fields_from_the_model_are_accepted() {
        for raw in [
            r#"[{"title": "T", "rows": [{"height": 180, "panels": [{"text": "a"}]}]}]"#,
            r#"[{"title": null, "rows": [{"panels": [{"text": "a"}]}]}]"#,
            r#"[{"title": "T", "rows": [{"panels": [{"text": 42}]}]}]"#,
        ] {
            let pages = parse_script(raw).unwrap_or_else(|err| panic!("{raw}: {err}"));
            assert_eq!(pages.len(), 1, "{raw}");
        }
        let pages = parse_script(r#"[{"rows": [{"panels": [{"text": 42}]}]}]"#).unwrap();
        assert_eq!(pages[0].panel_texts(), vec!["42"]);
    }

    #[test]
    fn prose_reply_is_malformed() {
        assert!(matches!(
            parse_script("Sorry, I cannot help with that."),
            Err(ComicError::MalformedResponse(_))
        ));
    }

    #[test]
    fn wrong_shape_is_a_validation_error() {
        assert!(matches!(
            parse_script("[{\"title\": \"x\", \"rows\": [{\"panels\": \"none\"}]}]"),
            Err(ComicError::Validation(_))
        ));
    }
}
