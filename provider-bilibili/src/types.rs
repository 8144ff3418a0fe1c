//! Bilibili API response types
//!
//! Data structures for deserializing Bilibili web API responses, plus the
//! normalization helpers that clean them up (markup stripping, duration
//! parsing, image URL fixes).

use serde::Deserialize;

/// Generic API envelope: every endpoint wraps its payload in `code`/`data`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Business status code, `0` means success.
    pub code: i64,
    /// Error message when `code != 0`.
    #[serde(default)]
    pub message: String,
    /// Payload, present on success.
    pub data: Option<T>,
}

/// Search endpoint payload
#[derive(Debug, Deserialize)]
pub struct SearchData {
    /// Matched videos; absent when the duration bucket filtered everything out.
    #[serde(default)]
    pub result: Option<Vec<SearchResult>>,
}

/// One search hit
#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub bvid: String,
    /// Title with `<em>` match markers still embedded.
    #[serde(default)]
    pub title: String,
    /// Cover URL, often protocol-relative (`//i0.hdslb.com/...`).
    #[serde(default)]
    pub pic: String,
    /// Duration as either seconds or a `"mm:ss"`/`"h:mm:ss"` string.
    #[serde(default)]
    pub duration: DurationField,
}

/// The search endpoint reports duration as a string, the view endpoint as a
/// number. One field type absorbs both.
#[derive(Debug, Deserialize, Default)]
#[serde(untagged)]
pub enum DurationField {
    Seconds(u32),
    Text(String),
    #[default]
    Missing,
}

impl DurationField {
    /// Normalize to seconds; malformed input becomes `0`.
    pub fn as_secs(&self) -> u32 {
        match self {
            DurationField::Seconds(s) => *s,
            DurationField::Text(text) => parse_duration_text(text),
            DurationField::Missing => 0,
        }
    }
}

/// View (detail) endpoint payload
#[derive(Debug, Deserialize)]
pub struct ViewData {
    pub bvid: String,
    /// Stream id of the first part.
    pub cid: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pic: String,
    #[serde(default)]
    pub duration: u32,
    /// Part list; single-part videos report one entry.
    #[serde(default)]
    pub pages: Vec<ViewPage>,
}

/// One part of a multi-part video
#[derive(Debug, Deserialize)]
pub struct ViewPage {
    pub cid: u64,
    /// Part title.
    #[serde(default)]
    pub part: String,
    #[serde(default)]
    pub duration: u32,
}

/// Playurl endpoint payload
#[derive(Debug, Deserialize)]
pub struct PlayUrlData {
    /// DASH manifest, present on modern streams.
    pub dash: Option<DashStreams>,
    /// Legacy progressive stream segments.
    #[serde(default)]
    pub durl: Vec<DurlSegment>,
}

/// DASH stream lists
#[derive(Debug, Deserialize)]
pub struct DashStreams {
    #[serde(default)]
    pub audio: Vec<DashAudio>,
}

/// One DASH audio rendition. The API has reported the URL under both
/// `baseUrl` and `base_url` across versions; accept either.
#[derive(Debug, Deserialize)]
pub struct DashAudio {
    #[serde(rename = "baseUrl", default)]
    pub base_url_camel: Option<String>,
    #[serde(rename = "base_url", default)]
    pub base_url_snake: Option<String>,
    /// Bitrate in bits per second.
    #[serde(default)]
    pub bandwidth: u64,
}

impl DashAudio {
    /// The stream URL under whichever key the API used.
    pub fn url(&self) -> Option<&str> {
        self.base_url_camel
            .as_deref()
            .or(self.base_url_snake.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// One legacy progressive segment
#[derive(Debug, Deserialize)]
pub struct DurlSegment {
    pub url: String,
}

// ============================================================================
// Normalization helpers
// ============================================================================

/// Parse `"mm:ss"` or `"h:mm:ss"` into seconds. Anything else yields 0.
pub fn parse_duration_text(text: &str) -> u32 {
    let parts: Vec<u32> = text
        .split(':')
        .map(|p| p.parse().unwrap_or(0))
        .collect();
    match parts.as_slice() {
        [m, s] => m * 60 + s,
        [h, m, s] => h * 3600 + m * 60 + s,
        _ => 0,
    }
}

/// Remove the `<em class="keyword">` markers search results embed in titles.
pub fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Normalize a cover image URL: resolve protocol-relative URLs and upgrade
/// plain http to https.
pub fn normalize_image_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if let Some(rest) = url.strip_prefix("http://") {
        return format!("https://{}", rest);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_text() {
        assert_eq!(parse_duration_text("10:30"), 630);
        assert_eq!(parse_duration_text("1:02:03"), 3723);
        assert_eq!(parse_duration_text(""), 0);
        assert_eq!(parse_duration_text("garbage"), 0);
    }

    #[test]
    fn test_strip_html_tags() {
        assert_eq!(
            strip_html_tags("<em class=\"keyword\">郭德纲</em> 相声专场"),
            "郭德纲 相声专场"
        );
        assert_eq!(strip_html_tags("no markup"), "no markup");
    }

    #[test]
    fn test_normalize_image_url() {
        assert_eq!(
            normalize_image_url("//i0.hdslb.com/cover.jpg"),
            "https://i0.hdslb.com/cover.jpg"
        );
        assert_eq!(
            normalize_image_url("http://i0.hdslb.com/cover.jpg"),
            "https://i0.hdslb.com/cover.jpg"
        );
        assert_eq!(normalize_image_url(""), "");
    }

    #[test]
    fn test_deserialize_search_envelope() {
        let json = r#"{
            "code": 0,
            "data": {
                "result": [
                    {
                        "bvid": "BV1xx411c7mD",
                        "title": "<em>郭德纲</em>相声",
                        "pic": "//i0.hdslb.com/a.jpg",
                        "duration": "45:12"
                    }
                ]
            }
        }"#;

        let envelope: ApiEnvelope<SearchData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code, 0);
        let result = envelope.data.unwrap().result.unwrap();
        assert_eq!(result[0].bvid, "BV1xx411c7mD");
        assert_eq!(result[0].duration.as_secs(), 2712);
    }

    #[test]
    fn test_deserialize_view_with_pages() {
        let json = r#"{
            "code": 0,
            "data": {
                "bvid": "BV1xx411c7mD",
                "cid": 1001,
                "title": "济公传 全集",
                "pic": "http://i0.hdslb.com/b.jpg",
                "duration": 10800,
                "pages": [
                    { "cid": 1001, "part": "第一回", "duration": 3600 },
                    { "cid": 1002, "part": "第二回", "duration": 3600 },
                    { "cid": 1003, "part": "第三回", "duration": 3600 }
                ]
            }
        }"#;

        let envelope: ApiEnvelope<ViewData> = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.pages.len(), 3);
        assert_eq!(data.pages[1].cid, 1002);
    }

    #[test]
    fn test_dash_audio_url_accepts_both_keys() {
        let camel: DashAudio =
            serde_json::from_str(r#"{"baseUrl": "https://cdn/a", "bandwidth": 192000}"#).unwrap();
        assert_eq!(camel.url(), Some("https://cdn/a"));

        let snake: DashAudio =
            serde_json::from_str(r#"{"base_url": "https://cdn/b", "bandwidth": 64000}"#).unwrap();
        assert_eq!(snake.url(), Some("https://cdn/b"));

        let neither: DashAudio = serde_json::from_str(r#"{"bandwidth": 1}"#).unwrap();
        assert_eq!(neither.url(), None);
    }

    #[test]
    fn test_deserialize_playurl_legacy() {
        let json = r#"{
            "code": 0,
            "data": {
                "durl": [ { "url": "https://cdn.example.com/legacy.flv" } ]
            }
        }"#;

        let envelope: ApiEnvelope<PlayUrlData> = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert!(data.dash.is_none());
        assert_eq!(data.durl[0].url, "https://cdn.example.com/legacy.flv");
    }
}
