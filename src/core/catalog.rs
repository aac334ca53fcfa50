use crate::adapters::http::ApiClient;
use crate::core::recorder::RunRecorder;
use crate::domain::model::{CatalogItem, Stage};
use crate::utils::error::{HarnessError, Result};

/// Decodes the registry search response into catalog items, preserving order.
pub fn decode_catalog(body: &[u8]) -> Result<Vec<CatalogItem>> {
    serde_json::from_slice(body).map_err(|source| HarnessError::CatalogDecodeError { source })
}

/// Composite keys in catalog order.
pub fn composite_keys(body: &[u8]) -> Result<Vec<String>> {
    Ok(decode_catalog(body)?
        .iter()
        .map(CatalogItem::composite_key)
        .collect())
}

/// Fetches the catalog and returns the install keys.
///
/// A non-200 status is recorded and decoding is still attempted; transport
/// and decode errors are returned since nothing downstream can run without
/// the item list.
pub async fn fetch_catalog(api: &ApiClient, recorder: &RunRecorder) -> Result<Vec<String>> {
    tracing::info!("📦 Fetching package catalog from {}", api.catalog_url());
    let response = api.get_catalog().await?;

    if response.status != 200 {
        let err = HarnessError::UnexpectedStatus {
            endpoint: api.catalog_url().to_string(),
            expected: 200,
            actual: response.status,
        };
        recorder.record_error(Stage::Fetch, None, &err);
    }

    let keys = composite_keys(response.body.as_bytes())?;
    tracing::info!("📦 Catalog lists {} packages", keys.len());
    Ok(keys)
}
