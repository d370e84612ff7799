//! Privileged store client for trusted aggregate calls.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::config::SupabaseConfig;

use super::{StoreError, read_success_body};

/// One row of the aggregate result.
///
/// The RPC is defined store-side; depending on the column type it may report
/// the total as a JSON number or as a numeric string, so the raw value is
/// kept for the caller to normalize.
#[derive(Debug, Clone, Deserialize)]
pub struct TotalRow {
    #[serde(default)]
    pub total: Option<serde_json::Value>,
}

/// Store client carrying the trusted service-role credential.
///
/// Bypasses row-level security. Only the aggregate step may hold one, and it
/// never mixes with a caller's token.
#[derive(Clone)]
pub struct ServiceStore {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceStore {
    /// Create a privileged store handle from the service-role key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be encoded as a header or the
    /// HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let key = config.service_role_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Invoke the `get_other_orders_total` aggregate, excluding the order
    /// that was just created.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC fails or its result does not parse.
    #[instrument(skip(self), fields(exclude_order_id = %exclude_order_id))]
    pub async fn other_orders_total(
        &self,
        exclude_order_id: Uuid,
    ) -> Result<Vec<TotalRow>, StoreError> {
        let url = format!("{}/rest/v1/rpc/get_other_orders_total", self.base_url);
        let body = serde_json::json!({ "exclude_order_id": exclude_order_id });

        let response = self.client.post(&url).json(&body).send().await?;
        let text = read_success_body(response).await?;

        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_row_parses_number_and_string_totals() {
        let rows: Vec<TotalRow> =
            serde_json::from_str(r#"[{"total": 42}, {"total": "17.5"}, {}]"#).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].total, Some(serde_json::json!(42)));
        assert_eq!(rows[1].total, Some(serde_json::json!("17.5")));
        assert!(rows[2].total.is_none());
    }
}
