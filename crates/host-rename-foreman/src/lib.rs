// # Foreman Inventory Source
//
// This crate reads the host list from the Foreman API v2 for the host
// rename hook.
//
// ## Scope
//
// - ✅ One HTTP request per `fetch_page` call
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error messages for HTTP status codes (401/403, 404, 429, 5xx)
// - ❌ NO pagination loop (owned by InventoryImporter)
// - ❌ NO retry logic (a failed import is reported, not retried)
// - ❌ NO store access
//
// ## Security Requirements
//
// - The API password NEVER appears in logs, URLs or Debug output
// - Credentials are sent with HTTP basic auth
//
// ## API Reference
//
// - List hosts: GET `/api/v2/hosts?page=N&per_page=M`
//
// ```json
// { "total": 2, "subtotal": 2, "page": 1, "per_page": 1000,
//   "results": [ { "id": 1, "name": "web01.example.com", ... } ] }
// ```

use async_trait::async_trait;
use host_rename_core::config::InventoryConfig;
use host_rename_core::traits::{InventoryPage, InventorySource};
use host_rename_core::{Error, HostRecord, Result};
use serde::Deserialize;
use std::time::Duration;

/// Path prefix of the Foreman API v2
const API_PREFIX: &str = "/api/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Host inventory backed by the Foreman API
pub struct ForemanInventory {
    /// Base URL without the API prefix, e.g. `https://foreman.example.com`
    base_url: String,

    /// API user
    user: String,

    /// API password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for ForemanInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForemanInventory")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Response of `GET /api/v2/hosts`
#[derive(Debug, Deserialize)]
struct HostsResponse {
    #[serde(default)]
    total: Option<u64>,
    /// Count after search filters; preferred over `total`
    #[serde(default)]
    subtotal: Option<u64>,
    results: Vec<HostRecord>,
}

impl ForemanInventory {
    /// Create a new Foreman inventory source
    ///
    /// # Parameters
    ///
    /// - `base_url`: Foreman URL, with or without a trailing slash
    /// - `user`: API user
    /// - `password`: API password
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            base_url,
            user: user.into(),
            password: password.into(),
            client,
        })
    }

    /// Create a Foreman inventory source from configuration
    pub fn from_config(config: &InventoryConfig) -> Result<Self> {
        config.validate()?;
        match config {
            InventoryConfig::Foreman {
                url,
                user,
                password,
            } => Self::new(url.clone(), user.clone(), password.clone()),
        }
    }

    /// URL of one page of the host list
    fn hosts_url(&self, page: u32, per_page: u32) -> String {
        format!(
            "{}{}/hosts?page={}&per_page={}",
            self.base_url, API_PREFIX, page, per_page
        )
    }
}

/// Turn a decoded response into an inventory page
fn into_page(response: HostsResponse) -> InventoryPage {
    InventoryPage {
        total: response.subtotal.or(response.total),
        records: response.results,
    }
}

#[async_trait]
impl InventorySource for ForemanInventory {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<InventoryPage> {
        let url = self.hosts_url(page, per_page);
        tracing::debug!("Loading hosts from {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::import(format!("Foreman request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::import(format!(
                    "Foreman authentication failed: check the API user and password. Status: {}",
                    status
                )),
                404 => Error::import(format!(
                    "Foreman host list not found at {}. Status: {}",
                    url, status
                )),
                429 => Error::import(format!("Foreman rate limit exceeded. Status: {}", status)),
                500..=599 => Error::import(format!(
                    "Foreman server error: {} - {}",
                    status, error_text
                )),
                _ => Error::import(format!(
                    "Foreman host list failed: {} - {}",
                    status, error_text
                )),
            });
        }

        let body: HostsResponse = response
            .json()
            .await
            .map_err(|e| Error::import(format!("Failed to parse Foreman response: {}", e)))?;

        let inventory_page = into_page(body);
        tracing::debug!(
            "Foreman page {}: {} hosts (total {:?})",
            page,
            inventory_page.records.len(),
            inventory_page.total
        );
        Ok(inventory_page)
    }

    fn source_name(&self) -> &'static str {
        "foreman"
    }
}
