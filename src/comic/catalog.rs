//! Static style and language tables used by every prompt builder.
//!
//! Unknown identifiers never fail: styles fall back to `doraemon`, generation
//! languages to `zh`, and image-prompt display names to English. Frontends may
//! offer identifiers the backend does not know about yet.

pub const DEFAULT_STYLE: &str = "doraemon";
pub const DEFAULT_LANGUAGE: &str = "zh";
pub const DEFAULT_IMAGE_LANGUAGE: &str = "en";

pub const KNOWN_STYLES: &[&str] = &[
    "doraemon",
    "american",
    "watercolor",
    "disney",
    "ghibli",
    "pixar",
    "shonen",
];

pub const KNOWN_LANGUAGES: &[&str] = &["zh", "en", "ja"];

fn normalize(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

pub fn is_known_style(style_id: &str) -> bool {
    KNOWN_STYLES.contains(&normalize(style_id).as_str())
}

pub fn is_known_language(language_code: &str) -> bool {
    KNOWN_LANGUAGES.contains(&normalize(language_code).as_str())
}

/// Natural-language description of a style, embedded verbatim in script and
/// optimizer prompts.
pub fn describe_style(style_id: &str) -> &'static str {
    match normalize(style_id).as_str() {
        "american" => "美式漫画风格：夸张的肌肉线条，英雄主义，强烈的明暗对比",
        "watercolor" => "水彩风格：柔和的色彩过渡，艺术感的笔触，梦幻氛围",
        "disney" => "迪士尼动画风格：经典的迪士尼角色设计，流畅的动作表现，丰富的表情，温暖明亮的色彩，充满魔法和梦幻的氛围",
        "ghibli" => "宫崎骏/吉卜力风格：细腻的自然场景描绘，柔和温暖的色调，充满想象力的奇幻元素，人物表情细腻生动，富有诗意和治愈感",
        "pixar" => "皮克斯动画风格：3D渲染质感，圆润可爱的角色设计，丰富的光影效果，细腻的材质表现，情感表达真挚动人",
        "shonen" => "日本少年漫画风格：充满动感的线条和速度线，夸张的表情和动作，热血激昂的氛围，强烈的视觉冲击力，快节奏的分镜",
        _ => "哆啦A梦风格：圆润可爱的角色设计，简洁明快的线条，温馨幽默的氛围",
    }
}

/// Short English style name used inside image-generation instructions.
pub fn style_label(style_id: &str) -> &'static str {
    match normalize(style_id).as_str() {
        "american" => "American comic book art",
        "watercolor" => "watercolor illustration",
        "disney" => "classic Disney animation",
        "ghibli" => "Studio Ghibli (Hayao Miyazaki) animation",
        "pixar" => "Pixar 3D animation",
        "shonen" => "Japanese shonen manga",
        _ => "Doraemon manga",
    }
}

/// Language instruction for script generation.
pub fn describe_language(language_code: &str) -> &'static str {
    match normalize(language_code).as_str() {
        "en" => "Please generate all content in English (including titles and panel descriptions).",
        "ja" => "すべてのコンテンツ（タイトルとパネルの説明を含む）を日本語で生成してください。",
        _ => "请用中文生成所有内容（包括标题和分镜描述）。",
    }
}

/// Target-language name used by image prompts; unknown codes mean English.
pub fn display_name(language_code: &str) -> &'static str {
    match normalize(language_code).as_str() {
        "zh" => "Chinese (简体中文)",
        "ja" => "Japanese (日本語)",
        "ko" => "Korean (한국어)",
        "fr" => "French (Français)",
        "de" => "German (Deutsch)",
        "es" => "Spanish (Español)",
        _ => "English",
    }
}
