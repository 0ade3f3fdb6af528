use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::JikanConfig;
use crate::constants::{JIKAN_API, catalog};
use crate::domain::{AnimeId, GenreId};
use crate::models::anime::{AiredRange, AnimeRecord, AnimeType, Genre, GenreRef};
use crate::services::catalog::{CatalogError, CatalogPage, CatalogSource};

/// Envelope shared by Jikan list endpoints. Both fields are optional here so
/// their absence surfaces as a malformed-response error rather than a generic
/// decode failure.
#[derive(Debug, Deserialize)]
struct JikanListResponse<T> {
    data: Option<Vec<T>>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct MalAnime {
    pub mal_id: i32,
    pub title: String,
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub genres: Vec<MalGenericInfo>,
    pub aired: Option<Aired>,
    pub episodes: Option<u32>,
    pub score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MalGenericInfo {
    pub mal_id: i32,
    pub name: String,
}

impl From<MalAnime> for AnimeRecord {
    fn from(anime: MalAnime) -> Self {
        let anime_type = anime.anime_type.as_deref().and_then(|raw| {
            raw.parse::<AnimeType>()
                .inspect_err(|_| debug!(mal_id = anime.mal_id, raw, "Unrecognised anime type"))
                .ok()
        });

        Self {
            id: AnimeId::new(anime.mal_id),
            title: anime.title,
            anime_type,
            genres: anime
                .genres
                .into_iter()
                .map(|g| GenreRef {
                    id: GenreId::new(g.mal_id),
                    name: g.name,
                })
                .collect(),
            aired: anime
                .aired
                .map(|a| AiredRange {
                    from: a.from,
                    to: a.to,
                })
                .unwrap_or_default(),
            episodes: anime.episodes,
            score: anime.score,
        }
    }
}

#[derive(Clone)]
pub struct JikanClient {
    client: Client,
    base_url: String,
    page_size: u32,
    order_by: String,
    sort: String,
}

impl Default for JikanClient {
    fn default() -> Self {
        Self::new()
    }
}

impl JikanClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(JIKAN_API)
    }

    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: catalog::PAGE_SIZE,
            order_by: catalog::DEFAULT_ORDER_BY.to_string(),
            sort: catalog::DEFAULT_SORT.to_string(),
        }
    }

    pub fn from_config(config: &JikanConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to build Jikan HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            order_by: config.order_by.clone(),
            sort: config.sort.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        Url::parse(&format!("{}/{path}", self.base_url))
            .map_err(|e| CatalogError::network(format!("Invalid Jikan URL: {e}")))
    }

    fn anime_url(&self, page: u32, search: &str) -> Result<Url, CatalogError> {
        let mut url = self.endpoint("anime")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("limit", &self.page_size.to_string())
                .append_pair("order_by", &self.order_by)
                .append_pair("sort", &self.sort);
            if !search.is_empty() {
                query.append_pair("q", search);
            }
        }
        Ok(url)
    }

    async fn get_list<T>(&self, url: Url) -> Result<JikanListResponse<T>, CatalogError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::network(format!(
                "Jikan API error: {status} - {body}"
            )));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| CatalogError::malformed(e.to_string()))
    }

    pub async fn search_page(&self, page: u32, search: &str) -> Result<CatalogPage, CatalogError> {
        let url = self.anime_url(page, search)?;
        debug!(%url, "Requesting Jikan anime page");

        let response: JikanListResponse<MalAnime> = self.get_list(url).await?;

        let data = response
            .data
            .ok_or_else(|| CatalogError::malformed("response has no `data` list"))?;
        let pagination = response
            .pagination
            .ok_or_else(|| CatalogError::malformed("response has no `pagination` block"))?;

        Ok(CatalogPage {
            records: data.into_iter().map(AnimeRecord::from).collect(),
            has_more: pagination.has_next_page,
        })
    }

    pub async fn get_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        let url = self.endpoint("genres/anime")?;
        let response: JikanListResponse<MalGenericInfo> = self.get_list(url).await?;

        let data = response
            .data
            .ok_or_else(|| CatalogError::malformed("response has no `data` list"))?;

        Ok(data
            .into_iter()
            .map(|g| Genre {
                id: GenreId::new(g.mal_id),
                name: g.name,
            })
            .collect())
    }
}

#[async_trait]
impl CatalogSource for JikanClient {
    async fn fetch_page(&self, page: u32, search: &str) -> Result<CatalogPage, CatalogError> {
        self.search_page(page, search).await
    }

    async fn fetch_genres(&self) -> Result<Vec<Genre>, CatalogError> {
        self.get_genres().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

    fn anime_payload() -> Value {
        json!({
            "pagination": {
                "last_visible_page": 1140,
                "has_next_page": true,
                "current_page": 1,
                "items": { "count": 2, "total": 22790, "per_page": 20 }
            },
            "data": [
                {
                    "mal_id": 5114,
                    "url": "https://myanimelist.net/anime/5114",
                    "title": "Fullmetal Alchemist: Brotherhood",
                    "type": "TV",
                    "episodes": 64,
                    "aired": {
                        "from": "2009-04-05T00:00:00+00:00",
                        "to": "2010-07-04T00:00:00+00:00"
                    },
                    "score": 9.1,
                    "genres": [
                        { "mal_id": 1, "type": "anime", "name": "Action", "url": "" },
                        { "mal_id": 2, "type": "anime", "name": "Adventure", "url": "" }
                    ]
                },
                {
                    "mal_id": 59999,
                    "title": "Untitled Project",
                    "type": "Live Action",
                    "episodes": null,
                    "aired": { "from": null, "to": null },
                    "score": null,
                    "genres": []
                }
            ]
        })
    }

    async fn anime_handler(
        State(seen): State<SeenQueries>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::Json<Value> {
        seen.lock().unwrap().push(params);
        axum::Json(anime_payload())
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("server should run");
        });
        format!("http://{address}")
    }

    #[tokio::test]
    async fn fetches_and_maps_a_page() {
        let seen = SeenQueries::default();
        let router = Router::new()
            .route("/anime", get(anime_handler))
            .with_state(seen.clone());
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let page = client.fetch_page(1, "").await.unwrap();

        assert!(page.has_more);
        assert_eq!(page.records.len(), 2);

        let fma = &page.records[0];
        assert_eq!(fma.id, AnimeId::new(5114));
        assert_eq!(fma.anime_type, Some(AnimeType::Tv));
        assert_eq!(fma.episodes, Some(64));
        assert_eq!(fma.score, Some(9.1));
        assert_eq!(fma.genre_names(), "Action, Adventure");
        assert!(fma.aired.start().is_some());

        let unknown = &page.records[1];
        assert_eq!(unknown.anime_type, None);
        assert_eq!(unknown.score, None);
        assert!(unknown.aired.start().is_none());

        let params = seen.lock().unwrap()[0].clone();
        assert_eq!(params.get("page").map(String::as_str), Some("1"));
        assert_eq!(params.get("limit").map(String::as_str), Some("20"));
        assert_eq!(params.get("order_by").map(String::as_str), Some("score"));
        assert_eq!(params.get("sort").map(String::as_str), Some("desc"));
        assert!(!params.contains_key("q"));
    }

    #[tokio::test]
    async fn search_text_is_sent_as_query_term() {
        let seen = SeenQueries::default();
        let router = Router::new()
            .route("/anime", get(anime_handler))
            .with_state(seen.clone());
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        client.fetch_page(3, "naruto shippuden").await.unwrap();

        let params = seen.lock().unwrap()[0].clone();
        assert_eq!(params.get("page").map(String::as_str), Some("3"));
        assert_eq!(params.get("q").map(String::as_str), Some("naruto shippuden"));
    }

    #[tokio::test]
    async fn error_status_is_a_network_error() {
        let router = Router::new().route(
            "/anime",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let err = client.fetch_page(1, "").await.unwrap_err();
        match err {
            CatalogError::Network(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("slow down"));
            }
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_pagination_is_malformed() {
        let router = Router::new().route(
            "/anime",
            get(|| async { axum::Json(json!({ "data": [] })) }),
        );
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let err = client.fetch_page(1, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_data_is_malformed() {
        let router = Router::new().route(
            "/anime",
            get(|| async { axum::Json(json!({ "pagination": { "has_next_page": false } })) }),
        );
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let err = client.fetch_page(1, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let router = Router::new().route("/anime", get(|| async { "<html>maintenance</html>" }));
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let err = client.fetch_page(1, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = JikanClient::with_base_url(&format!("http://{address}"));
        let err = client.fetch_page(1, "").await.unwrap_err();
        assert!(matches!(err, CatalogError::Network(_)));
    }

    #[tokio::test]
    async fn fetches_genres() {
        let router = Router::new().route(
            "/genres/anime",
            get(|| async {
                axum::Json(json!({
                    "data": [
                        { "mal_id": 1, "name": "Action", "url": "", "count": 5093 },
                        { "mal_id": 36, "name": "Slice of Life", "url": "", "count": 1664 }
                    ]
                }))
            }),
        );
        let client = JikanClient::with_base_url(&spawn_server(router).await);

        let genres = client.fetch_genres().await.unwrap();
        assert_eq!(
            genres,
            vec![
                Genre { id: GenreId::new(1), name: "Action".to_string() },
                Genre { id: GenreId::new(36), name: "Slice of Life".to_string() },
            ]
        );
    }

    #[test]
    fn config_overrides_query_defaults() {
        let config = JikanConfig {
            base_url: "https://jikan.example/v4/".to_string(),
            page_size: 10,
            order_by: "members".to_string(),
            sort: "asc".to_string(),
            ..JikanConfig::default()
        };
        let client = JikanClient::from_config(&config).unwrap();

        let url = client.anime_url(2, "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://jikan.example/v4/anime?page=2&limit=10&order_by=members&sort=asc"
        );
    }
}
