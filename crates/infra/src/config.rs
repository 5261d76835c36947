//! Region and sync configuration
//!
//! The platform runs two deployments with distinct hostnames; every API,
//! authorization, and document URL derives from the selected [`Region`].
//! [`SyncSettings`] gathers the knobs of the persistence pipeline with the
//! defaults the rest of the workspace assumes.

use std::time::Duration;

use larkdown_common::auth::AuthConfig;
use larkdown_common::resilience::{RateLimiterConfig, RetryConfig};
use larkdown_domain::constants::{
    DEFAULT_CELL_CONCURRENCY, DEFAULT_TABLE_WIDTH_BUDGET, MAX_CHILDREN_PER_CALL,
};

/// Supported platform deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// China deployment (`open.feishu.cn`).
    #[default]
    Feishu,
    /// International deployment (`open.larksuite.com`).
    Lark,
}

impl Region {
    /// Base URL of the OpenAPI surface.
    #[must_use]
    pub fn api_base_url(&self) -> &'static str {
        match self {
            Self::Feishu => "https://open.feishu.cn",
            Self::Lark => "https://open.larksuite.com",
        }
    }

    /// Interactive authorization page.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/open-apis/authen/v1/authorize", self.api_base_url())
    }

    /// Code-for-token exchange endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/open-apis/authen/v1/oidc/access_token", self.api_base_url())
    }

    /// Refresh-token grant endpoint.
    #[must_use]
    pub fn refresh_url(&self) -> String {
        format!("{}/open-apis/authen/v1/oidc/refresh_access_token", self.api_base_url())
    }

    /// Web URL of a persisted document.
    #[must_use]
    pub fn document_url(&self, document_id: &str) -> String {
        let host = match self {
            Self::Feishu => "https://www.feishu.cn",
            Self::Lark => "https://www.larksuite.com",
        };
        format!("{host}/docx/{document_id}")
    }
}

/// Tunables of the document persistence pipeline.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Deployment to talk to.
    pub region: Region,
    /// Application identifier registered with the platform.
    pub app_id: String,
    /// Redirect URI of the interactive authorization flow.
    pub redirect_uri: String,
    /// Maximum children per append call.
    pub batch_size: usize,
    /// Maximum simultaneous cell-content calls within one table.
    pub cell_concurrency: usize,
    /// Total width distributed over each table's columns.
    pub table_width_budget: u32,
    /// Admission control for outbound requests.
    pub rate_limit: RateLimiterConfig,
    /// Backoff budgets for 429/transient failures.
    pub retry: RetryConfig,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl SyncSettings {
    /// Create a settings builder for the given application id.
    pub fn builder(app_id: impl Into<String>) -> SyncSettingsBuilder {
        SyncSettingsBuilder::new(app_id)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.is_empty() {
            return Err("app_id must not be empty".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.cell_concurrency == 0 {
            return Err("cell_concurrency must be greater than 0".to_string());
        }
        if self.table_width_budget == 0 {
            return Err("table_width_budget must be greater than 0".to_string());
        }
        self.rate_limit.validate()?;
        self.retry.validate()
    }

    /// Derive the auth configuration for this region and app.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(
            self.app_id.clone(),
            self.redirect_uri.clone(),
            self.region.authorize_url(),
            self.region.token_url(),
            self.region.refresh_url(),
        )
    }
}

/// Builder for [`SyncSettings`].
#[derive(Debug)]
pub struct SyncSettingsBuilder {
    settings: SyncSettings,
}

impl SyncSettingsBuilder {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            settings: SyncSettings {
                region: Region::default(),
                app_id: app_id.into(),
                redirect_uri: "http://localhost:8910/callback".to_string(),
                batch_size: MAX_CHILDREN_PER_CALL,
                cell_concurrency: DEFAULT_CELL_CONCURRENCY,
                table_width_budget: DEFAULT_TABLE_WIDTH_BUDGET,
                rate_limit: RateLimiterConfig::default(),
                retry: RetryConfig::default(),
                request_timeout: Duration::from_secs(30),
            },
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.settings.region = region;
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.settings.redirect_uri = redirect_uri.into();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.settings.batch_size = batch_size;
        self
    }

    pub fn cell_concurrency(mut self, cell_concurrency: usize) -> Self {
        self.settings.cell_concurrency = cell_concurrency;
        self
    }

    pub fn table_width_budget(mut self, budget: u32) -> Self {
        self.settings.table_width_budget = budget;
        self
    }

    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.settings.rate_limit = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.settings.retry = config;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SyncSettings, String> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;

    /// Validates `Region` behavior for the endpoint derivation scenario.
    ///
    /// Assertions:
    /// - Confirms each deployment derives its own hostnames.
    #[test]
    fn test_region_urls() {
        assert_eq!(
            Region::Feishu.token_url(),
            "https://open.feishu.cn/open-apis/authen/v1/oidc/access_token"
        );
        assert_eq!(
            Region::Lark.authorize_url(),
            "https://open.larksuite.com/open-apis/authen/v1/authorize"
        );
        assert_eq!(Region::Feishu.document_url("doccn123"), "https://www.feishu.cn/docx/doccn123");
        assert_eq!(Region::Lark.document_url("doccn123"), "https://www.larksuite.com/docx/doccn123");
    }

    /// Validates `SyncSettingsBuilder` behavior for the defaults scenario.
    ///
    /// Assertions:
    /// - Confirms the documented pipeline defaults.
    #[test]
    fn test_builder_defaults() {
        let settings = SyncSettings::builder("cli_abc").build().unwrap();

        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.cell_concurrency, 5);
        assert_eq!(settings.table_width_budget, 720);
        assert_eq!(settings.region, Region::Feishu);
    }

    /// Validates `SyncSettings::validate` behavior for the invalid settings
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures empty app id and zero knobs are rejected.
    #[test]
    fn test_validation() {
        assert!(SyncSettings::builder("").build().is_err());
        assert!(SyncSettings::builder("cli_abc").batch_size(0).build().is_err());
        assert!(SyncSettings::builder("cli_abc").cell_concurrency(0).build().is_err());
    }

    /// Validates `SyncSettings::auth_config` behavior for the derivation
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the auth endpoints follow the selected region.
    #[test]
    fn test_auth_config_follows_region() {
        let settings = SyncSettings::builder("cli_abc").region(Region::Lark).build().unwrap();
        let auth = settings.auth_config();

        assert_eq!(auth.app_id, "cli_abc");
        assert!(auth.token_url.starts_with("https://open.larksuite.com/"));
        assert!(auth.validate().is_ok());
    }
}
