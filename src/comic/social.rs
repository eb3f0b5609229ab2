use serde::{Deserialize, Serialize};
use tracing::info;

use crate::comic::extract::parse_json_response;
use crate::comic::Page;
use crate::error::{ComicError, ComicResult};
use crate::llm::{CompletionParams, Provider};

const FALLBACK_SUMMARY: &str = "一个有趣的漫画故事";
const MAX_MOMENTS: usize = 6;

const SOCIAL_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.8,
    openai_max_tokens: Some(1000),
    gemini_max_output_tokens: None,
};

const XIAOHONGSHU_SYSTEM_PROMPT: &str = r#"你是小红书爆款文案专家。创作有共鸣、有态度的帖子。

⚠️ 核心原则：
- 不要逐格复述剧情
- 重点提炼情绪共鸣点和个人感悟
- 加入你的态度和观点

格式要求：
1. 标题：12-20字
   - 制造悬念或情绪冲击
   - 例："成年人的崩溃就在一瞬间💔"、"看完这个漫画我沉默了..."

2. 正文：100-150字
   - 开头：1-2句情绪金句/共鸣点
   - 中间：3-4句个人感悟、吐槽或延伸思考
   - 可以联系生活经历、社会现象
   - 结尾：1-2句引发互动（提问/征集/共鸣）
   - 多用emoji、短句、换行营造节奏感
   - 语气要有态度：可以感慨、吐槽、煽情

3. 标签：10个，混合热门+精准

返回JSON：
{
  "title": "标题",
  "content": "正文",
  "tags": ["标签1", "标签2"]
}"#;

const TWITTER_SYSTEM_PROMPT: &str = r#"You are a viral Twitter/X content creator. Create an engaging, relatable post.

⚠️ KEY PRINCIPLES:
- Focus on the EMOTION and THEME, not panel-by-panel plot
- Make it relatable and shareable
- Add your own spin/commentary

Format:
1. Title (Main Tweet): 80-150 characters
   - A catchy hook that captures the vibe
   - Examples: "POV: when life gives you exactly what you didn't ask for 😅", "the duality of wanting peace but choosing chaos every time"

2. Content: 3-5 sentences (250-400 characters)
   - Opening: A punchy line that grabs attention
   - Middle: Your reaction, commentary, or relatable take on the theme
   - End: A question or call-to-action to drive engagement
   - Use 2-3 emojis strategically
   - Use line breaks for rhythm

3. Tags: 4-5 relevant hashtags

Return JSON:
{
  "title": "catchy main tweet",
  "content": "engaging thread content",
  "tags": ["tag1", "tag2"]
}"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Xiaohongshu,
    Twitter,
}

impl Platform {
    /// Unknown or missing platform names mean Xiaohongshu.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("twitter") | Some("x") => Platform::Twitter,
            _ => Platform::Xiaohongshu,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::Twitter => "twitter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub platform: Platform,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SocialPayload {
    title: String,
    content: String,
    tags: Vec<String>,
}

/// Thematic digest of a script: page titles as a story line plus up to six
/// setup / development / payoff moments.
pub fn summarize(pages: &[Page]) -> String {
    let titles: Vec<&str> = pages
        .iter()
        .map(|page| page.title.as_str())
        .filter(|title| !title.is_empty())
        .collect();

    let mut moments: Vec<&str> = Vec::new();
    for page in pages {
        let panels = page.panel_texts();
        let Some(first) = panels.first() else {
            continue;
        };
        let mut picks = vec![*first];
        if panels.len() > 2 {
            picks.push(panels[panels.len() / 2]);
        }
        if panels.len() > 1 {
            picks.push(panels[panels.len() - 1]);
        }
        for pick in picks {
            if !moments.contains(&pick) {
                moments.push(pick);
            }
        }
    }
    moments.truncate(MAX_MOMENTS);

    let mut summary = String::new();
    if !titles.is_empty() {
        summary.push_str(&format!("故事线：{}\n", titles.join("→")));
    }
    if !moments.is_empty() {
        summary.push_str(&format!("关键场景：{}", moments.join("；")));
    }

    if summary.is_empty() {
        FALLBACK_SUMMARY.to_string()
    } else {
        summary
    }
}

pub fn build_prompt(summary: &str, platform: Platform) -> (String, String) {
    match platform {
        Platform::Twitter => (
            TWITTER_SYSTEM_PROMPT.to_string(),
            format!(
                "Comic theme: {summary}\n\nCreate a viral tweet that captures the FEELING and makes people say \"this is so me\". Add your own commentary!"
            ),
        ),
        Platform::Xiaohongshu => (
            XIAOHONGSHU_SYSTEM_PROMPT.to_string(),
            format!("漫画主题：{summary}\n\n写出让人\"太懂了！\"的文案，要有你的态度和感悟！"),
        ),
    }
}

/// Missing fields default to empty; a non-object reply is malformed.
pub fn parse_post(raw_text: &str, platform: Platform) -> ComicResult<SocialPost> {
    let value = parse_json_response(raw_text)?;
    if !value.is_object() {
        return Err(ComicError::MalformedResponse(
            "expected a JSON object with title, content and tags".to_string(),
        ));
    }
    let payload: SocialPayload = serde_json::from_value(value)?;
    Ok(SocialPost {
        title: payload.title,
        content: payload.content,
        tags: payload.tags,
        platform,
    })
}

pub async fn generate_social_content(
    provider: &Provider,
    pages: &[Page],
    platform: Platform,
) -> ComicResult<SocialPost> {
    let summary = summarize(pages);
    let (system_prompt, user_prompt) = build_prompt(&summary, platform);
    info!(
        "Generating {} copy from {} page(s) via {}",
        platform.as_str(),
        pages.len(),
        provider.name()
    );

    let raw_text = provider
        .complete(&system_prompt, &user_prompt, SOCIAL_PARAMS, "generate_social_content")
        .await
        .map_err(|err| err.context("Social content generation failed"))?;
    parse_post(&raw_text, platform).map_err(|err| err.context("Social content generation failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comic::{Panel, Row};
    use serde_json::json;

    fn page(title: &str, texts: &[&str]) -> Page {
        Page {
            title: title.to_string(),
            rows: vec![Row {
                panels: texts
                    .iter()
                    .map(|text| Panel {
                        text: Some(text.to_string()),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn summary_picks_setup_and_payoff_per_page() {
        let summary = summarize(&[page("A", &["p1", "p2", "p3"]), page("B", &["p4"])]);
        assert_eq!(summary, "故事线：A→B\n关键场景：p1；p2；p3；p4");
    }

    #[test]
    fn repeated_moments_are_kept_once_and_capped() {
        let pages = vec![
            page("1", &["same", "x", "y", "z"]),
            page("2", &["same", "m", "n"]),
            page("3", &["q", "r", "s"]),
        ];
        let summary = summarize(&pages);
        let moments = summary.split("关键场景：").nth(1).unwrap();
        let items: Vec<&str> = moments.split('；').collect();
        assert_eq!(items, vec!["same", "y", "z", "m", "n", "q"]);
    }

    #[test]
    fn empty_script_uses_fallback_phrase() {
        assert_eq!(summarize(&[]), FALLBACK_SUMMARY);
        assert_eq!(summarize(&[page("", &["  "])]), FALLBACK_SUMMARY);
    }

    #[test]
    fn platforms_select_different_templates() {
        let (xhs_system, xhs_user) = build_prompt("s", Platform::Xiaohongshu);
        let (tw_system, tw_user) = build_prompt("s", Platform::Twitter);
        assert_ne!(xhs_system, tw_system);
        assert!(xhs_system.contains("标签：10个"));
        assert!(tw_system.contains("4-5 relevant hashtags"));
        assert!(xhs_user.starts_with("漫画主题：s"));
        assert!(tw_user.starts_with("Comic theme: s"));
    }

    #[test]
    fn platform_names_default_to_xiaohongshu() {
        assert_eq!(Platform::parse(None), Platform::Xiaohongshu);
        assert_eq!(Platform::parse(Some("weibo")), Platform::Xiaohongshu);
        assert_eq!(Platform::parse(Some("Twitter")), Platform::Twitter);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let post = parse_post("```json\n{\"title\": \"Hi\"}\n```", Platform::Twitter).unwrap();
        assert_eq!(post.title, "Hi");
        assert_eq!(post.content, "");
        assert!(post.tags.is_empty());
        assert_eq!(post.platform, Platform::Twitter);
    }

    #[test]
    fn non_object_reply_is_malformed() {
        assert!(matches!(
            parse_post("[1, 2]", Platform::Xiaohongshu),
            Err(ComicError::MalformedResponse(_))
        ));
    }

    #[test]
    fn post_serializes_platform_in_lowercase() {
        let post = SocialPost {
            title: "t".into(),
            content: "c".into(),
            tags: vec!["a".into()],
            platform: Platform::Xiaohongshu,
        };
        assert_eq!(serde_json::to_value(&post).unwrap()["platform"], json!("xiaohongshu"));
    }
}
