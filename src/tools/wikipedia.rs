use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_upstream_timing;

#[derive(Debug, Clone)]
pub struct WikiSettings {
    pub endpoint: String,
    pub thumbnail_size: u32,
}

impl WikiSettings {
    pub fn from_config(config: &Config) -> Self {
        WikiSettings {
            endpoint: config.wiki_api_endpoint.clone(),
            thumbnail_size: config.wiki_thumbnail_size,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikiQueryResponse {
    query: Option<WikiQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    pages: Option<BTreeMap<String, WikiPage>>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    thumbnail: Option<WikiThumbnail>,
}

#[derive(Debug, Deserialize)]
struct WikiThumbnail {
    source: Option<String>,
}

const MISSING_PAGE_ID: &str = "-1";

fn thumbnail_from_response(response: WikiQueryResponse) -> Option<String> {
    let pages = response.query?.pages?;
    let (page_id, page) = pages.into_iter().next()?;
    if page_id == MISSING_PAGE_ID {
        return None;
    }
    page.thumbnail?
        .source
        .filter(|source| !source.trim().is_empty())
}

/// Resolves a page title to its lead image thumbnail. `Ok(None)` means the
/// page or its thumbnail does not exist.
pub async fn fetch_thumbnail_url(settings: &WikiSettings, title: &str) -> Result<Option<String>> {
    if title.trim().is_empty() {
        return Ok(None);
    }

    let metadata = json!({ "title": title, "thumbnailSize": settings.thumbnail_size });
    log_upstream_timing("wikipedia", "page_thumbnail", Some(metadata), move || async move {
        info!("Looking up Wikipedia thumbnail for '{}'", title);
        let client = get_http_client();
        let thumbnail_size = settings.thumbnail_size.to_string();
        let response = client
            .get(&settings.endpoint)
            .query(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "pageimages"),
                ("format", "json"),
                ("pithumbsize", thumbnail_size.as_str()),
                ("origin", "*"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|err| anyhow!("Wikipedia request failed: {}", err))?;

        let status = response.status();
        let payload = response
            .json::<WikiQueryResponse>()
            .await
            .map_err(|err| anyhow!("Wikipedia response (status {}) was not JSON: {}", status, err))?;
        let thumbnail = thumbnail_from_response(payload);
        debug!("Wikipedia thumbnail for '{}': {:?}", title, thumbnail);
        Ok(thumbnail)
    })
    .await
}
