// Configuration surface: command line flags (with environment fallbacks),
// validation, and the projection into client `Options`.

use crate::error::ConfigError;
use clap::Args;

pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_LOG_NAME: &str = "cloudflare";

/// Options the client is built from. Immutable once the client exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Name of the tracing span every client event is recorded under.
    pub log_name: String,
    pub disabled: bool,
    pub user_id: String,
    pub token: String,
    /// Prepended to every script identifier to form the remote script name.
    pub prefix: String,
    pub upstream_root_domain: Option<String>,
    pub api_base_url: String,
    /// Ask for subdomain availability on upload and enable the subdomain
    /// when the script is not yet reachable there.
    pub manage_subdomain: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            log_name: DEFAULT_LOG_NAME.into(),
            disabled: false,
            user_id: String::new(),
            token: String::new(),
            prefix: String::new(),
            upstream_root_domain: None,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            manage_subdomain: true,
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Turn the cloudflare integration off entirely
    #[arg(long = "cloudflare-disabled", env = "CLOUDFLARE_DISABLED")]
    pub disabled: bool,

    /// The cloudflare account (user) id
    #[arg(long = "cloudflare-user-id", env = "CLOUDFLARE_USER_ID", default_value = "")]
    pub user_id: String,

    /// The cloudflare API token
    #[arg(
        long = "cloudflare-token",
        env = "CLOUDFLARE_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub token: String,

    /// Prefix prepended to every worker script name
    #[arg(long = "cloudflare-prefix", env = "CLOUDFLARE_PREFIX", default_value = "")]
    pub prefix: String,

    /// Root domain the deployed workers are served under
    #[arg(
        long = "cloudflare-upstream-root-domain",
        env = "CLOUDFLARE_UPSTREAM_ROOT_DOMAIN",
        default_value = ""
    )]
    pub upstream_root_domain: String,

    /// Override the cloudflare API base url
    #[arg(
        long = "cloudflare-api-url",
        env = "CLOUDFLARE_API_URL",
        default_value = DEFAULT_API_BASE_URL
    )]
    pub api_base_url: String,

    /// Skip the subdomain availability check and enablement
    #[arg(long = "cloudflare-skip-subdomain")]
    pub skip_subdomain: bool,
}

impl Config {
    pub fn new() -> Self {
        Config {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            ..Default::default()
        }
    }

    /// Checks required fields. A disabled configuration is always valid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disabled {
            return Ok(());
        }

        if self.user_id.is_empty() {
            return Err(ConfigError::UserIdRequired);
        }

        if self.token.is_empty() {
            return Err(ConfigError::TokenRequired);
        }

        Ok(())
    }

    pub fn generate_options(&self, log_name: &str) -> Options {
        let upstream_root_domain = Some(self.upstream_root_domain.clone())
            .filter(|domain| !domain.is_empty());
        let api_base_url = if self.api_base_url.is_empty() {
            DEFAULT_API_BASE_URL.to_string()
        } else {
            self.api_base_url.clone()
        };

        Options {
            log_name: log_name.to_string(),
            disabled: self.disabled,
            user_id: self.user_id.clone(),
            token: self.token.clone(),
            prefix: self.prefix.clone(),
            upstream_root_domain,
            api_base_url,
            manage_subdomain: !self.skip_subdomain,
        }
    }
}
