//! Artwork metadata extraction from web pages.
//!
//! Fetches a page, reduces it to text, and asks an extraction model for a
//! structured record plus candidate images. Thumbnail selection is a pure
//! heuristic over the extracted image URLs.

use crate::{ChatModel, CompletionRequest};
use atelier_core::{AtelierResult, ChatMessage, LlmError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cap on how much page text is sent to the extraction model.
const MAX_PAGE_TEXT_CHARS: usize = 20_000;
const FETCH_TIMEOUT_SECS: u64 = 15;

const EXTRACTION_SYSTEM_PROMPT: &str = "You extract artwork metadata from web \
page text. Reply with ONLY a JSON object with these keys (null when absent): \
title_en, title_zh, year (integer), artwork_type, dimensions, materials, \
duration, image_urls (array of absolute URLs found on the page). \
No commentary, no code fences.";

/// Structured artwork metadata pulled from a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArtwork {
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_zh: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub artwork_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl ExtractedArtwork {
    /// Extraction that found neither title is unusable.
    pub fn has_title(&self) -> bool {
        self.title_en.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.title_zh.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

// ============================================================================
// PAGE FETCH
// ============================================================================

/// Fetch a page body as text, capped to [`MAX_PAGE_TEXT_CHARS`] after tag
/// stripping.
pub async fn fetch_page(url: &str) -> AtelierResult<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .unwrap_or_default();

    let response = client.get(url).send().await.map_err(|e| LlmError::RequestFailed {
        provider: "page_fetch".to_string(),
        status: 0,
        message: format!("Failed to fetch {}: {}", url, e),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            provider: "page_fetch".to_string(),
            status: status.as_u16(),
            message: format!("Fetch of {} returned {}", url, status),
        }
        .into());
    }

    let html = response.text().await.map_err(|e| LlmError::InvalidResponse {
        provider: "page_fetch".to_string(),
        reason: format!("Failed to read body: {}", e),
    })?;

    Ok(strip_html(&html))
}

/// Crude tag stripper: drops `<...>` runs and script/style bodies, collapses
/// whitespace, caps length. Good enough for an extraction prompt; never fed
/// back to a browser.
fn strip_html(html: &str) -> String {
    fn starts_ci(haystack: &str, at: usize, needle: &str) -> bool {
        haystack
            .get(at..at + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }

    let mut out = String::with_capacity(html.len().min(MAX_PAGE_TEXT_CHARS));
    let mut skip_until: Option<&str> = None;
    let mut in_tag = false;
    let mut last_was_space = true;

    for (i, ch) in html.char_indices() {
        if let Some(closer) = skip_until {
            if starts_ci(html, i, closer) {
                // Land on the '<' of the closing tag; the tag branch below
                // would not see it again, so consume it as a tag here.
                skip_until = None;
                in_tag = true;
            }
            continue;
        }
        if in_tag {
            if ch == '>' {
                in_tag = false;
            }
            continue;
        }
        if ch == '<' {
            if starts_ci(html, i, "<script") {
                skip_until = Some("</script>");
            } else if starts_ci(html, i, "<style") {
                skip_until = Some("</style>");
            }
            in_tag = true;
            // Tags separate words: "<h1>a</h1><p>b" must not fuse "ab".
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
        if out.len() >= MAX_PAGE_TEXT_CHARS {
            break;
        }
    }
    out.trim().to_string()
}

// ============================================================================
// METADATA EXTRACTION
// ============================================================================

/// Ask the extraction model for structured metadata over page text.
pub async fn extract_artwork_metadata(
    model: &dyn ChatModel,
    model_id: Option<&str>,
    url: &str,
    page_text: &str,
) -> AtelierResult<ExtractedArtwork> {
    let prompt = format!("Source URL: {}\n\nPage text:\n{}", url, page_text);
    // Structured output needs headroom beyond the default max_tokens.
    let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
        .with_system(EXTRACTION_SYSTEM_PROMPT)
        .with_model_id(model_id.unwrap_or_else(|| model.default_model_id()))
        .with_max_tokens(2048);

    let response = model.complete(&request).await?;
    let text = response.text.unwrap_or_default();
    parse_extracted(&text).ok_or_else(|| {
        LlmError::InvalidResponse {
            provider: "extraction".to_string(),
            reason: "no JSON object in extraction output".to_string(),
        }
        .into()
    })
}

fn parse_extracted(text: &str) -> Option<ExtractedArtwork> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

// ============================================================================
// THUMBNAIL SELECTION
// ============================================================================

/// Pick the best thumbnail candidate from extracted image URLs.
///
/// Prefers raster still images served over https and skips obvious
/// site furniture (logos, icons, sprites). Falls back to the first image
/// when nothing passes the filters.
pub fn pick_thumbnail(image_urls: &[String]) -> Option<String> {
    let is_noise = |url: &str| {
        let lower = url.to_lowercase();
        ["logo", "icon", "sprite", "avatar", "favicon"]
            .iter()
            .any(|kw| lower.contains(kw))
    };
    let is_raster = |url: &str| {
        let lower = url.to_lowercase();
        [".jpg", ".jpeg", ".png", ".webp"]
            .iter()
            .any(|ext| lower.contains(ext))
    };

    image_urls
        .iter()
        .find(|url| url.starts_with("https://") && is_raster(url) && !is_noise(url))
        .or_else(|| image_urls.iter().find(|url| is_raster(url) && !is_noise(url)))
        .or_else(|| image_urls.first())
        .cloned()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompletionResponse, MockChatModel};

    #[test]
    fn test_strip_html_removes_tags_and_scripts() {
        let html = "<html><head><script>var x = 1;</script><style>p{}</style></head>\
                    <body><h1>Cloud  Study</h1><p>oil on canvas</p></body></html>";
        let text = strip_html(html);
        assert_eq!(text, "Cloud Study oil on canvas");
    }

    #[tokio::test]
    async fn test_extraction_parses_json_object() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only(
            "{\"title_en\": \"Cloud Study\", \"title_zh\": \"云的研究\", \"year\": 2021, \
             \"materials\": \"oil on canvas\", \"image_urls\": [\"https://x.test/a.jpg\"]}",
        )]);
        let extracted = extract_artwork_metadata(&mock, None, "https://x.test/work", "text")
            .await
            .unwrap();
        assert_eq!(extracted.title_en.as_deref(), Some("Cloud Study"));
        assert_eq!(extracted.year, Some(2021));
        assert!(extracted.has_title());
    }

    #[tokio::test]
    async fn test_extraction_fails_on_non_json_output() {
        let mock = MockChatModel::new(vec![CompletionResponse::text_only("sorry, no idea")]);
        let result = extract_artwork_metadata(&mock, None, "https://x.test", "text").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_pick_thumbnail_prefers_clean_https_raster() {
        let urls = vec![
            "https://x.test/logo.png".to_string(),
            "http://x.test/work.jpg".to_string(),
            "https://x.test/work-large.jpg".to_string(),
        ];
        assert_eq!(
            pick_thumbnail(&urls).as_deref(),
            Some("https://x.test/work-large.jpg")
        );
    }

    #[test]
    fn test_pick_thumbnail_falls_back_to_first() {
        let urls = vec!["https://x.test/clip.svg".to_string()];
        assert_eq!(pick_thumbnail(&urls).as_deref(), Some("https://x.test/clip.svg"));
        assert_eq!(pick_thumbnail(&[]), None);
    }
}
