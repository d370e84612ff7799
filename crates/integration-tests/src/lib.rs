//! Integration tests for Orderdesk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orderdesk-integration-tests
//! ```
//!
//! The tests spawn the real intake router on an ephemeral port and point it
//! at an `httpmock` server standing in for Supabase, so no credentials or
//! network access are required.

use std::net::Ipv4Addr;

use secrecy::SecretString;

use orderdesk_intake::config::{IntakeConfig, SupabaseConfig};

/// Anon key the spawned service sends on caller-scoped store calls.
pub const ANON_KEY: &str = "test-anon-key";

/// Service-role key the spawned service sends on the privileged RPC.
pub const SERVICE_ROLE_KEY: &str = "test-service-role-key";

/// A running intake service bound to an ephemeral local port.
pub struct TestApp {
    /// Base URL of the spawned service (e.g., `http://127.0.0.1:49152`)
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the intake router against the given Supabase base URL.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound; tests have no use for a
    /// degraded app.
    pub async fn spawn(supabase_url: &str) -> Self {
        let config = IntakeConfig {
            host: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            supabase: SupabaseConfig {
                url: supabase_url.trim_end_matches('/').to_string(),
                anon_key: ANON_KEY.to_string(),
                service_role_key: SecretString::from(SERVICE_ROLE_KEY),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let app = orderdesk_intake::app(config);

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let address = format!(
            "http://{}",
            listener.local_addr().expect("Listener has no local addr")
        );

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Intake server crashed");
        });

        Self {
            address,
            client: reqwest::Client::new(),
        }
    }

    /// URL of the order intake endpoint.
    #[must_use]
    pub fn orders_url(&self) -> String {
        format!("{}/orders", self.address)
    }
}
