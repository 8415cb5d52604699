//! Locale adapter for user-facing tool messages.
//!
//! Pure function of (key, params) -> string. Unknown keys never panic; they
//! render as a visible `??key??` placeholder so a missing entry is caught in
//! review rather than hidden behind a fallback language.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Parse a locale tag, defaulting to English.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "zh-tw" | "zh-hans" | "zh-hant" => Locale::Zh,
            _ => Locale::En,
        }
    }
}

/// Message table: key -> (English, Chinese).
static MESSAGES: Lazy<HashMap<&'static str, (&'static str, &'static str)>> = Lazy::new(|| {
    HashMap::from([
        (
            "no_artworks_found",
            (
                "No artworks matched your search.",
                "没有找到匹配的作品。",
            ),
        ),
        (
            "no_editions_found",
            (
                "No editions matched your search.",
                "没有找到匹配的版本。",
            ),
        ),
        (
            "no_locations_found",
            (
                "No locations matched your search.",
                "没有找到匹配的地点。",
            ),
        ),
        (
            "no_history_found",
            (
                "No history entries matched your search.",
                "没有找到匹配的历史记录。",
            ),
        ),
        (
            "no_artwork_match_for_history",
            (
                "No artworks matched '{query}', so there is no history to show.",
                "没有作品匹配“{query}”，因此没有可显示的历史记录。",
            ),
        ),
        (
            "no_editions_for_history",
            (
                "The matched artworks have no editions, so there is no history to show.",
                "匹配的作品没有任何版本，因此没有可显示的历史记录。",
            ),
        ),
        (
            "stats_empty",
            (
                "The inventory is empty: no artworks or editions yet.",
                "库存为空：还没有作品或版本。",
            ),
        ),
        ("unknown_location", ("Unknown location", "未知地点")),
        (
            "edition_not_found",
            ("Edition {id} not found.", "找不到版本 {id}。"),
        ),
        (
            "nothing_to_update",
            (
                "The update contains no fields to change.",
                "更新内容为空，没有需要修改的字段。",
            ),
        ),
        (
            "confirmation_ready",
            (
                "Please review the proposed change and confirm before it is applied.",
                "请核对拟议的修改，确认后才会生效。",
            ),
        ),
        (
            "update_applied",
            (
                "Edition updated and history recorded.",
                "版本已更新，历史已记录。",
            ),
        ),
        (
            "extraction_model_missing",
            (
                "URL import is unavailable: no extraction model is configured.",
                "无法导入链接：未配置提取模型。",
            ),
        ),
        (
            "import_fetch_failed",
            (
                "Could not fetch the page at {url}.",
                "无法抓取页面 {url}。",
            ),
        ),
        (
            "import_extraction_failed",
            (
                "Could not extract artwork details from the page.",
                "无法从页面提取作品信息。",
            ),
        ),
        (
            "import_no_title",
            (
                "The page did not contain a recognizable artwork title.",
                "页面中没有可识别的作品标题。",
            ),
        ),
        (
            "export_no_match",
            (
                "No artworks matched '{query}' to export.",
                "没有作品匹配“{query}”，无法导出。",
            ),
        ),
        (
            "export_disambiguation",
            (
                "Multiple artworks matched '{query}'. Please pick one.",
                "多个作品匹配“{query}”，请选择一个。",
            ),
        ),
        (
            "export_scope_missing",
            (
                "Specify what to export: a title, artwork ids, or 'all'.",
                "请指定导出范围：标题、作品编号或“全部”。",
            ),
        ),
    ])
});

/// Resolve a message key for a locale, substituting `{param}` placeholders.
pub fn localize(locale: Locale, key: &str, params: &[(&str, &str)]) -> String {
    let template = match MESSAGES.get(key) {
        Some((en, zh)) => match locale {
            Locale::En => *en,
            Locale::Zh => *zh,
        },
        None => return format!("??{}??", key),
    };

    let mut message = template.to_string();
    for (name, value) in params {
        message = message.replace(&format!("{{{}}}", name), value);
    }
    message
}

// ============================================================================
// TESTS
// ============================================================================
