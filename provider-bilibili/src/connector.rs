//! Bilibili API connector implementation
//!
//! Implements the `MediaProvider` trait against the Bilibili web API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::provider::{
    AudioRenditions, DiscoveryRequest, MediaProvider, PartSummary, Rendition, TrackDetail,
    TrackSummary,
};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::constants::{
    API_BASE, PLAYURL_FNVAL, PLAYURL_PATH, PLAYURL_QN, RANDOM_PAGE_MAX, REQUEST_TIMEOUT,
    SEARCH_DURATION_BUCKET, SEARCH_PAGE_SIZE, SEARCH_PATH, VIEW_PATH,
};
use crate::discovery::{keyword_pool, PlayedCache};
use crate::error::{BilibiliError, Result};
use crate::types::{
    normalize_image_url, strip_html_tags, ApiEnvelope, PlayUrlData, SearchData, ViewData,
};

/// Bilibili web API connector
///
/// Implements `MediaProvider` over an injected `HttpClient`. The client is
/// expected to attach the referer, user-agent and cookie handshake the API
/// requires; the connector only describes requests.
///
/// # Example
///
/// ```ignore
/// use provider_bilibili::BilibiliConnector;
/// use bridge_traits::provider::MediaProvider;
///
/// let connector = BilibiliConnector::new(http_client);
/// let results = connector.search("郭德纲 相声", 1).await?;
/// ```
pub struct BilibiliConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Recently surfaced track IDs, so discovery avoids repeats
    played: Mutex<PlayedCache>,
}

impl BilibiliConnector {
    /// Create a new Bilibili connector
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            played: Mutex::new(PlayedCache::default()),
        }
    }

    /// Execute a GET against an API path and unwrap the response envelope.
    ///
    /// A non-zero business code becomes `ApiError`; the payload is returned
    /// as-is (it may legitimately be `None` for empty result sets).
    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>> {
        let request = HttpRequest::get(format!("{}{}", API_BASE, path))
            .query(params)
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(BilibiliError::HttpError {
                status_code: response.status,
            });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .map_err(|e| BilibiliError::ParseError(e.to_string()))?;

        if envelope.code != 0 {
            return Err(BilibiliError::ApiError {
                code: envelope.code,
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    /// One search request with optional duration-bucket filtering.
    async fn search_page(
        &self,
        keyword: &str,
        page: u32,
        duration_bucket: Option<u32>,
    ) -> Result<Vec<TrackSummary>> {
        let mut params = vec![
            ("keyword", keyword.to_string()),
            ("search_type", "video".to_string()),
            ("order", "totalrank".to_string()),
            ("page", page.to_string()),
            ("page_size", SEARCH_PAGE_SIZE.to_string()),
        ];
        if let Some(bucket) = duration_bucket {
            params.push(("duration", bucket.to_string()));
        }

        let data: Option<SearchData> = self.api_get(SEARCH_PATH, &params).await?;
        let results = data.and_then(|d| d.result).unwrap_or_default();

        Ok(results
            .into_iter()
            .map(|item| TrackSummary {
                id: item.bvid,
                title: strip_html_tags(&item.title),
                thumbnail_url: normalize_image_url(&item.pic),
                duration_secs: item.duration.as_secs(),
                default_part_id: None,
            })
            .collect())
    }

    /// Discovery probe: one keyword, one page, preferring unplayed tracks.
    async fn discover_from_keyword(&self, keyword: &str, page: u32) -> Result<Option<TrackDetail>> {
        let hits = match self
            .search_impl(keyword, page)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(keyword, error = %e, "discovery search failed");
                return Ok(None);
            }
        };
        if hits.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<&TrackSummary> = {
            let played = self.played.lock();
            let unplayed: Vec<&TrackSummary> =
                hits.iter().filter(|t| !played.contains(&t.id)).collect();
            if unplayed.is_empty() {
                hits.iter().collect()
            } else {
                unplayed
            }
        };
        candidates.shuffle(&mut rand::thread_rng());

        for candidate in candidates {
            match self.track_detail_impl(&candidate.id).await {
                Ok(detail) => {
                    self.played.lock().insert(&detail.summary.id);
                    return Ok(Some(detail));
                }
                Err(e) => {
                    debug!(track_id = %candidate.id, error = %e, "candidate lookup failed, trying next");
                }
            }
        }
        Ok(None)
    }

    async fn search_impl(&self, keyword: &str, page: u32) -> Result<Vec<TrackSummary>> {
        // Prefer full-length performances first; retry unfiltered when the
        // duration bucket comes back empty.
        match self
            .search_page(keyword, page, Some(SEARCH_DURATION_BUCKET))
            .await
        {
            Ok(results) if !results.is_empty() => return Ok(results),
            Ok(_) => debug!(keyword, "duration-filtered search empty, retrying unfiltered"),
            Err(e) => debug!(keyword, error = %e, "filtered search failed, retrying unfiltered"),
        }
        self.search_page(keyword, page, None).await
    }

    async fn track_detail_impl(&self, track_id: &str) -> Result<TrackDetail> {
        let params = [("bvid", track_id.to_string())];
        let data: Option<ViewData> = self.api_get(VIEW_PATH, &params).await?;
        let data = data.ok_or_else(|| BilibiliError::TrackNotFound {
            track_id: track_id.to_string(),
        })?;

        let mut parts: Vec<PartSummary> = data
            .pages
            .iter()
            .map(|page| PartSummary {
                part_id: page.cid.to_string(),
                title: page.part.clone(),
                duration_secs: page.duration,
            })
            .collect();
        if parts.is_empty() {
            // Older responses omit the page list; the top-level cid still
            // identifies the only stream.
            parts.push(PartSummary {
                part_id: data.cid.to_string(),
                title: data.title.clone(),
                duration_secs: data.duration,
            });
        }

        Ok(TrackDetail {
            summary: TrackSummary {
                id: data.bvid,
                title: strip_html_tags(&data.title),
                thumbnail_url: normalize_image_url(&data.pic),
                duration_secs: data.duration,
                default_part_id: Some(data.cid.to_string()),
            },
            parts,
        })
    }

    async fn audio_renditions_impl(
        &self,
        track_id: &str,
        part_id: &str,
    ) -> Result<AudioRenditions> {
        let params = [
            ("bvid", track_id.to_string()),
            ("cid", part_id.to_string()),
            ("fnval", PLAYURL_FNVAL.to_string()),
            ("qn", PLAYURL_QN.to_string()),
            ("platform", "html5".to_string()),
            ("high_quality", "1".to_string()),
        ];
        let data: Option<PlayUrlData> = self.api_get(PLAYURL_PATH, &params).await?;
        let Some(data) = data else {
            return Ok(AudioRenditions::Ranked(vec![]));
        };

        if let Some(dash) = data.dash {
            let mut renditions: Vec<Rendition> = dash
                .audio
                .iter()
                .filter_map(|a| {
                    a.url().map(|url| Rendition {
                        url: url.to_string(),
                        bitrate_kbps: (a.bandwidth / 1000) as u32,
                    })
                })
                .collect();
            if !renditions.is_empty() {
                renditions.sort_by(|a, b| b.bitrate_kbps.cmp(&a.bitrate_kbps));
                return Ok(AudioRenditions::Ranked(renditions));
            }
        }

        if let Some(segment) = data.durl.into_iter().next() {
            return Ok(AudioRenditions::Legacy { url: segment.url });
        }

        Ok(AudioRenditions::Ranked(vec![]))
    }
}

#[async_trait]
impl MediaProvider for BilibiliConnector {
    #[instrument(skip(self))]
    async fn search(&self, keyword: &str, page: u32) -> bridge_traits::error::Result<Vec<TrackSummary>> {
        let results = self.search_impl(keyword, page).await?;
        info!(keyword, page, hits = results.len(), "search completed");
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn track_detail(&self, track_id: &str) -> bridge_traits::error::Result<TrackDetail> {
        let detail = self.track_detail_impl(track_id).await?;
        debug!(track_id, parts = detail.parts.len(), "track detail fetched");
        Ok(detail)
    }

    #[instrument(skip(self))]
    async fn audio_renditions(
        &self,
        track_id: &str,
        part_id: &str,
    ) -> bridge_traits::error::Result<AudioRenditions> {
        let renditions = self.audio_renditions_impl(track_id, part_id).await?;
        if renditions.is_empty() {
            warn!(track_id, part_id, "no playable audio stream reported");
        }
        Ok(renditions)
    }

    #[instrument(skip(self, request))]
    async fn discover(
        &self,
        request: DiscoveryRequest,
    ) -> bridge_traits::error::Result<Option<TrackDetail>> {
        let pool = keyword_pool(&request);
        if pool.is_empty() {
            return Ok(None);
        }

        let (keyword, page) = {
            let mut rng = rand::thread_rng();
            let keyword = pool[rng.gen_range(0..pool.len())].clone();
            let page = rng.gen_range(1..=RANDOM_PAGE_MAX);
            (keyword, page)
        };

        if let Some(detail) = self.discover_from_keyword(&keyword, page).await? {
            info!(keyword, page, track_id = %detail.summary.id, "discovery hit");
            return Ok(Some(detail));
        }

        // Fall back to the sibling keywords in the pool, first page each.
        for fallback in pool.iter().filter(|k| **k != keyword) {
            if let Some(detail) = self.discover_from_keyword(fallback, 1).await? {
                info!(keyword = %fallback, track_id = %detail.summary.id, "discovery fallback hit");
                return Ok(Some(detail));
            }
        }

        info!("discovery exhausted keyword pool without a hit");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
            async fn download_stream(
                &self,
                url: String,
                headers: HashMap<String, String>,
            ) -> bridge_traits::error::Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
        }
    }

    fn ok_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn search_normalizes_results() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("duration=3"));
            Ok(ok_response(
                r#"{"code":0,"data":{"result":[
                    {"bvid":"BV1a","title":"<em>郭德纲</em>相声","pic":"//i0.hdslb.com/a.jpg","duration":"45:12"}
                ]}}"#,
            ))
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let results = connector.search("郭德纲", 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "郭德纲相声");
        assert_eq!(results[0].thumbnail_url, "https://i0.hdslb.com/a.jpg");
        assert_eq!(results[0].duration_secs, 2712);
    }

    #[tokio::test]
    async fn search_retries_without_duration_filter() {
        let mut http = MockHttp::new();
        let mut calls = 0u32;
        http.expect_execute().times(2).returning(move |req| {
            calls += 1;
            if calls == 1 {
                assert!(req.url.contains("duration=3"));
                Ok(ok_response(r#"{"code":0,"data":{"result":[]}}"#))
            } else {
                assert!(!req.url.contains("duration=3"));
                Ok(ok_response(
                    r#"{"code":0,"data":{"result":[
                        {"bvid":"BV1b","title":"短篇相声","pic":"","duration":300}
                    ]}}"#,
                ))
            }
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let results = connector.search("相声", 1).await.unwrap();
        assert_eq!(results[0].id, "BV1b");
    }

    #[tokio::test]
    async fn track_detail_maps_parts() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("/x/web-interface/view"));
            assert!(req.url.contains("bvid=BV1c"));
            Ok(ok_response(
                r#"{"code":0,"data":{
                    "bvid":"BV1c","cid":100,"title":"济公传","pic":"","duration":7200,
                    "pages":[
                        {"cid":100,"part":"上","duration":3600},
                        {"cid":101,"part":"下","duration":3600}
                    ]
                }}"#,
            ))
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let detail = connector.track_detail("BV1c").await.unwrap();

        assert_eq!(detail.summary.default_part_id.as_deref(), Some("100"));
        assert_eq!(detail.parts.len(), 2);
        assert_eq!(detail.parts[1].part_id, "101");
    }

    #[tokio::test]
    async fn renditions_ranked_by_bitrate_descending() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.contains("fnval=16"));
            Ok(ok_response(
                r#"{"code":0,"data":{"dash":{"audio":[
                    {"baseUrl":"https://cdn/low","bandwidth":64000},
                    {"base_url":"https://cdn/high","bandwidth":192000},
                    {"baseUrl":"https://cdn/mid","bandwidth":128000}
                ]}}}"#,
            ))
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let renditions = connector.audio_renditions("BV1d", "100").await.unwrap();

        match renditions {
            AudioRenditions::Ranked(list) => {
                assert_eq!(list.len(), 3);
                assert_eq!(list[0].url, "https://cdn/high");
                assert_eq!(list[0].bitrate_kbps, 192);
                assert_eq!(list[2].url, "https://cdn/low");
            }
            other => panic!("expected ranked renditions, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn renditions_fall_back_to_legacy_durl() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(ok_response(
                r#"{"code":0,"data":{"durl":[{"url":"https://cdn/legacy.flv"}]}}"#,
            ))
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let renditions = connector.audio_renditions("BV1e", "100").await.unwrap();

        assert_eq!(
            renditions,
            AudioRenditions::Legacy {
                url: "https://cdn/legacy.flv".to_string()
            }
        );
    }

    #[tokio::test]
    async fn api_error_code_surfaces() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(ok_response(r#"{"code":-412,"message":"rejected"}"#)));

        let connector = BilibiliConnector::new(Arc::new(http));
        let err = connector.track_detail("BV1f").await.unwrap_err();
        assert!(err.to_string().contains("-412"));
    }

    #[tokio::test]
    async fn discover_records_played_tracks() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|req| {
            if req.url.contains("/x/web-interface/search/type") {
                Ok(ok_response(
                    r#"{"code":0,"data":{"result":[
                        {"bvid":"BV1g","title":"相声","pic":"","duration":2400}
                    ]}}"#,
                ))
            } else {
                Ok(ok_response(
                    r#"{"code":0,"data":{
                        "bvid":"BV1g","cid":200,"title":"相声","pic":"","duration":2400,
                        "pages":[{"cid":200,"part":"","duration":2400}]
                    }}"#,
                ))
            }
        });

        let connector = BilibiliConnector::new(Arc::new(http));
        let detail = connector
            .discover(DiscoveryRequest::default())
            .await
            .unwrap()
            .expect("discovery should find the only candidate");

        assert_eq!(detail.summary.id, "BV1g");
        assert!(connector.played.lock().contains("BV1g"));
    }
}
