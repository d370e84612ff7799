//! Principal-scoped store client.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::models::{NewOrder, Order, OrderItemRow};

use super::{StoreError, read_success_body};

/// Columns requested back from the order insert.
const ORDER_COLUMNS: &str = "id,profile_id,recipient_name,shipping_address,created_at,updated_at";

/// The authenticated principal, as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    /// Stable principal identifier (`auth.uid()` on the store side)
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Store client that acts as the authenticated caller.
///
/// Every request carries the public anon key and the caller's bearer token,
/// so the store applies row-level security as if the caller had connected
/// directly. Constructed once per inbound request.
#[derive(Clone)]
pub struct UserStore {
    client: reqwest::Client,
    base_url: String,
}

impl UserStore {
    /// Create a store handle scoped to the caller's access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be encoded as a header or the
    /// HTTP client fails to build.
    pub fn new(config: &SupabaseConfig, access_token: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&config.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Verify the bearer token and return the authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or the identity
    /// provider is unreachable.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<AuthUser, StoreError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self.client.get(&url).send().await?;
        let text = read_success_body(response).await?;

        Ok(serde_json::from_str(&text)?)
    }

    /// Insert one order header and return the persisted row.
    ///
    /// The insert asks the store to echo the full row back
    /// (`Prefer: return=representation`) and requires exactly one row in the
    /// response.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert is rejected (including by row-level
    /// security) or the response does not contain exactly one row.
    #[instrument(skip(self, order), fields(profile_id = %order.profile_id))]
    pub async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let url = format!("{}/rest/v1/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .query(&[("select", ORDER_COLUMNS)])
            .json(order)
            .send()
            .await?;
        let text = read_success_body(response).await?;

        let mut rows: Vec<Order> = serde_json::from_str(&text)?;
        if rows.len() != 1 {
            return Err(StoreError::RowCount(rows.len()));
        }
        // len() == 1 checked above
        Ok(rows.remove(0))
    }

    /// Bulk-insert the order's line items.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects any row. The order header
    /// inserted beforehand is not rolled back by this client.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn insert_order_items(&self, items: &[OrderItemRow]) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/order_items", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(items)
            .send()
            .await?;
        read_success_body(response).await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            url: "http://localhost:54321".to_string(),
            anon_key: "anon-key".to_string(),
            service_role_key: SecretString::from("service-role-key"),
        }
    }

    #[test]
    fn test_new_accepts_ordinary_token() {
        assert!(UserStore::new(&config(), "header.payload.signature").is_ok());
    }

    #[test]
    fn test_new_rejects_token_with_control_characters() {
        let result = UserStore::new(&config(), "bad\ntoken");
        assert!(matches!(result, Err(StoreError::Header(_))));
    }

    #[test]
    fn test_auth_user_tolerates_extra_fields() {
        let user: AuthUser = serde_json::from_str(
            r#"{
                "id": "d2c1a9f4-8f6e-4a2b-b6d3-0a1b2c3d4e5f",
                "aud": "authenticated",
                "role": "authenticated",
                "email": "ada@example.com"
            }"#,
        )
        .unwrap();
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }
}
