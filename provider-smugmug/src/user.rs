//! Current-user probe.

use remote_traits::http::{HttpClient, HttpMethod, HttpRequest};
use tracing::debug;

use crate::error::{Result, SmugMugError};
use crate::types::UserResponse;
use crate::{API_CURRENT_USER, API_ROOT};

/// Resolve the URI of the authenticated user.
///
/// Issues the `!authuser` probe. Uses the transport's default retry policy;
/// this call is cheap and outside any caller-managed retry budget.
pub async fn current_user_uri(transport: &dyn HttpClient, token: &str) -> Result<String> {
    let url = format!(
        "{}?_accept={}&_verbosity=1",
        API_CURRENT_USER,
        urlencoding::encode("application/json")
    );
    let request = HttpRequest::new(HttpMethod::Get, url).bearer_token(token);
    let response = transport.execute(request).await?;

    if !response.is_success() {
        return Err(SmugMugError::Api {
            status: response.status,
            message: response.text().unwrap_or_default(),
        });
    }

    let decoded: UserResponse = response
        .json()
        .map_err(|e| SmugMugError::Decode(e.to_string()))?;

    let user_uri = decoded
        .response
        .user
        .map(|u| u.uri)
        .filter(|uri| !uri.is_empty())
        .ok_or(SmugMugError::MissingUserUri)?;

    debug!(user_uri = %user_uri, "resolved current user");
    Ok(user_uri)
}

/// Resolve the albums endpoint for the authenticated user.
pub async fn current_user_albums_uri(transport: &dyn HttpClient, token: &str) -> Result<String> {
    let user_uri = current_user_uri(transport, token).await?;
    Ok(format!("{}{}!albums", API_ROOT, user_uri))
}
