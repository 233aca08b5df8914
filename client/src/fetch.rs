//! Listing query boundary. The engine only emits `FetchRequest`s; the host runs them.

use crate::coordinator::FetchRequest;

/// URL of the bounding-box query for `request`, appending to any query string on `endpoint`.
pub fn listings_url(endpoint: &str, request: &FetchRequest) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{separator}{}&limit={}",
        request.bounds.to_query(),
        request.limit
    )
}

/// Run `request` against the listings endpoint.
#[cfg(target_arch = "wasm32")]
pub async fn fetch_listings(
    endpoint: &str,
    request: &FetchRequest,
) -> Result<listing_map_shared::ListingBatch, crate::error::FetchError> {
    use crate::error::FetchError;
    use listing_map_shared::ListingsPayload;

    let url = listings_url(endpoint, request);
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    if !resp.ok() {
        return Err(FetchError::Status(resp.status()));
    }

    resp.json::<ListingsPayload>()
        .await
        .map(ListingsPayload::decode)
        .map_err(|e| FetchError::Malformed(e.to_string()))
}
