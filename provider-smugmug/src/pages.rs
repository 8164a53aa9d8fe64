//! Paginated listing sources for albums and album images.
//!
//! Each source performs exactly one request per `fetch_page` call with
//! [`RetryPolicy::none`]; dropped pages are the aggregator's concern.

use async_trait::async_trait;
use remote_traits::{
    http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy},
    listing::{Page, PagedSource},
};
use std::sync::Arc;
use tracing::debug;

use crate::error::SmugMugError;
use crate::types::{Album, AlbumImage, AlbumsResponse, ImagesResponse, PageInfo};
use crate::{ALBUM_SEARCH_URI, ALBUM_URI_BASE, API_ROOT};

fn listing_url(uri: &str, filter: &str, start: u32, count: u32) -> String {
    format!(
        "{}?_accept={}&_verbosity=1&_filter={}&_filteruri=&start={}&count={}",
        uri,
        urlencoding::encode("application/json"),
        urlencoding::encode(filter),
        start,
        count
    )
}

async fn fetch_listing(
    transport: &dyn HttpClient,
    token: &str,
    url: String,
) -> remote_traits::Result<remote_traits::HttpResponse> {
    let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(token);
    let response = transport
        .execute_with_retry(request, RetryPolicy::none())
        .await?;

    if !response.is_success() {
        return Err(SmugMugError::Api {
            status: response.status,
            message: response.text().unwrap_or_default(),
        }
        .into());
    }

    Ok(response)
}

fn page_from<T>(items: Vec<T>, pages: PageInfo) -> Page<T> {
    Page {
        total: pages.total,
        start: pages.start,
        count: pages.count,
        items,
    }
}

/// Paged source over the authenticated user's albums.
pub struct AlbumSource {
    transport: Arc<dyn HttpClient>,
    token: String,
    albums_uri: String,
}

impl AlbumSource {
    /// `albums_uri` is the fully resolved albums endpoint for the user, as
    /// returned by [`crate::current_user_albums_uri`].
    pub fn new(transport: Arc<dyn HttpClient>, token: impl Into<String>, albums_uri: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            albums_uri: albums_uri.into(),
        }
    }
}

#[async_trait]
impl PagedSource for AlbumSource {
    type Item = Album;

    async fn fetch_page(&self, start: u32, count: u32) -> remote_traits::Result<Page<Album>> {
        debug!(start, count, "fetching album page");
        let url = listing_url(&self.albums_uri, "AlbumKey,Name", start, count);
        let response = fetch_listing(self.transport.as_ref(), &self.token, url).await?;

        let decoded: AlbumsResponse = response
            .json()
            .map_err(|e| SmugMugError::Decode(e.to_string()))?;

        Ok(page_from(decoded.response.album, decoded.response.pages))
    }
}

/// Paged source over the images of one album.
pub struct AlbumImageSource {
    transport: Arc<dyn HttpClient>,
    token: String,
    images_uri: String,
}

impl AlbumImageSource {
    pub fn new(transport: Arc<dyn HttpClient>, token: impl Into<String>, album_key: &str) -> Self {
        Self {
            transport,
            token: token.into(),
            images_uri: format!("{}{}/{}!images", API_ROOT, ALBUM_URI_BASE, album_key),
        }
    }
}

#[async_trait]
impl PagedSource for AlbumImageSource {
    type Item = AlbumImage;

    async fn fetch_page(&self, start: u32, count: u32) -> remote_traits::Result<Page<AlbumImage>> {
        debug!(start, count, "fetching album image page");
        let url = listing_url(&self.images_uri, "ArchivedMD5,FileName", start, count);
        let response = fetch_listing(self.transport.as_ref(), &self.token, url).await?;

        let decoded: ImagesResponse = response
            .json()
            .map_err(|e| SmugMugError::Decode(e.to_string()))?;

        Ok(page_from(
            decoded.response.album_image,
            decoded.response.pages,
        ))
    }
}

/// Combine search terms into the single plus-separated string the search
/// endpoint expects for its `Text` parameter.
fn combine_terms(terms: &[String]) -> String {
    terms.join("+")
}

/// Paged source over album search results, scoped to one user.
///
/// Results are ranked by the service; ordering across the merged result is
/// the aggregator's concern.
pub struct AlbumSearchSource {
    transport: Arc<dyn HttpClient>,
    token: String,
    user_uri: String,
    text: String,
}

impl AlbumSearchSource {
    /// `user_uri` is the bare user URI from
    /// [`crate::user::current_user_uri`], used as the search scope.
    pub fn new(
        transport: Arc<dyn HttpClient>,
        token: impl Into<String>,
        user_uri: impl Into<String>,
        terms: &[String],
    ) -> Self {
        Self {
            transport,
            token: token.into(),
            user_uri: user_uri.into(),
            text: combine_terms(terms),
        }
    }

    fn search_url(&self, start: u32, count: u32) -> String {
        format!(
            "{}?_accept={}&_verbosity=1&_filter={}&_filteruri=&Scope={}&SortDirection=Descending&SortMethod=Rank&Text={}&start={}&count={}",
            ALBUM_SEARCH_URI,
            urlencoding::encode("application/json"),
            urlencoding::encode("Album,Name,AlbumKey"),
            urlencoding::encode(&self.user_uri),
            urlencoding::encode(&self.text),
            start,
            count
        )
    }
}

#[async_trait]
impl PagedSource for AlbumSearchSource {
    type Item = Album;

    async fn fetch_page(&self, start: u32, count: u32) -> remote_traits::Result<Page<Album>> {
        debug!(start, count, text = %self.text, "fetching album search page");
        let url = self.search_url(start, count);
        let response = fetch_listing(self.transport.as_ref(), &self.token, url).await?;

        let decoded: AlbumsResponse = response
            .json()
            .map_err(|e| SmugMugError::Decode(e.to_string()))?;

        Ok(page_from(decoded.response.album, decoded.response.pages))
    }
}
