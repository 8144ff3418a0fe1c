//! API endpoints, request parameters and keyword pools.

use std::time::Duration;

/// Bilibili web API base URL
pub const API_BASE: &str = "https://api.bilibili.com";

/// Keyword search endpoint
pub const SEARCH_PATH: &str = "/x/web-interface/search/type";

/// Video detail endpoint
pub const VIEW_PATH: &str = "/x/web-interface/view";

/// Stream URL endpoint
pub const PLAYURL_PATH: &str = "/x/player/playurl";

/// Per-request timeout for API calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Results per search page
pub const SEARCH_PAGE_SIZE: u32 = 20;

/// `duration=3` filters search results to the 30-60 minute bucket, the
/// typical length of a full crosstalk performance.
pub const SEARCH_DURATION_BUCKET: u32 = 3;

/// `fnval=16` requests the DASH stream manifest from the playurl endpoint.
pub const PLAYURL_FNVAL: u32 = 16;

/// `qn=64` baseline quality parameter for the playurl endpoint.
pub const PLAYURL_QN: u32 = 64;

/// How many recently played track IDs discovery remembers for dedup.
pub const PLAYED_CACHE_CAP: usize = 100;

/// Discovery draws a random page in `1..=RANDOM_PAGE_MAX` to vary results.
pub const RANDOM_PAGE_MAX: u32 = 3;

/// Default discovery keyword pool, used when the caller configured none.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "郭德纲 于谦 相声",
    "德云社 相声",
    "郭德纲 相声 完整版",
    "于谦 郭德纲",
    "德云社 郭德纲",
    "郭德纲 单口相声",
    "郭德纲 经典相声",
];

/// Keyword pool for solo performances.
pub const SOLO_KEYWORDS: &[&str] = &[
    "郭德纲 单口相声",
    "郭德纲 单口",
    "郭德纲 德云社 单口相声",
    "郭德纲 评书",
    "郭德纲 单口相声 完整版",
];

/// Keyword pool for duo performances.
pub const DUO_KEYWORDS: &[&str] = &[
    "郭德纲 于谦 相声",
    "郭德纲 德云社 对口相声",
    "郭德纲 于谦 对口",
    "于谦 郭德纲 相声",
    "郭德纲 对口相声 完整版",
];
