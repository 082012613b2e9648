use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Supplies the defaults used when a submission does not carry its own values.
pub trait ConfigProvider: Send + Sync {
    fn from_email(&self) -> &str;
    fn from_name(&self) -> &str;
    fn content_type(&self) -> &str;
    /// Empty when no default template is configured.
    fn template_id(&self) -> &str;
    fn api_key(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bearer token for the mail API
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Sender address used when the headers carry no `From:`
    pub from_email: String,

    /// Sender name used when the headers carry no named `From:`
    pub from_name: String,

    /// Content type used when the headers carry no `Content-Type:`
    pub content_type: String,

    /// Dynamic template applied when the caller passes none
    pub template_id: String,

    /// Endpoint messages are posted to
    pub api_url: String,

    /// Upper bound for a single delivery request, in seconds
    pub timeout_secs: u64,
}

impl ConfigProvider for Config {
    fn from_email(&self) -> &str {
        &self.from_email
    }

    fn from_name(&self) -> &str {
        &self.from_name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn template_id(&self) -> &str {
        &self.template_id
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// Builds the fallback sender address for a site host, e.g.
/// `www.Example.com` becomes `wordpress@example.com`.
pub fn default_from_email(site_name: &str) -> String {
    let site = site_name.trim().to_lowercase();
    let site = site.strip_prefix("www.").unwrap_or(&site);
    format!("wordpress@{}", site)
}

fn var_or_default(name: &str, default: impl FnOnce() -> String) -> String {
    env::var(name)
        .map(|val| {
            log::info!("Config: Using {} from env: {}", name, val);
            val
        })
        .unwrap_or_else(|_| {
            let default_val = default();
            log::info!("Config: Using default {}: {}", name, default_val);
            default_val
        })
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (optional)
        let _ = dotenv::dotenv();

        let api_key = match env::var("SENDGRID_MAIL_API_KEY") {
            Ok(val) if !val.trim().is_empty() => val,
            Ok(_) => {
                let err_msg = "SENDGRID_MAIL_API_KEY environment variable must not be empty";
                log::error!("{}", err_msg);
                return Err(anyhow!(err_msg));
            }
            Err(e) => {
                let err_msg = "SENDGRID_MAIL_API_KEY environment variable must be set";
                log::error!("{}: {}", err_msg, e);
                return Err(anyhow!(e).context(err_msg));
            }
        };
        log::info!("Config: API key is set"); // Never log the key itself

        let from_email = var_or_default("SENDGRID_MAIL_FROM_EMAIL", || {
            let site_name = env::var("SENDGRID_MAIL_SITE_NAME").unwrap_or_else(|_| "localhost".to_string());
            default_from_email(&site_name)
        });
        let from_name = var_or_default("SENDGRID_MAIL_FROM_NAME", || "WordPress".to_string());
        let content_type = var_or_default("SENDGRID_MAIL_CONTENT_TYPE", || "text/html".to_string());
        let template_id = var_or_default("SENDGRID_MAIL_TEMPLATE_ID", String::new);
        let api_url = var_or_default("SENDGRID_MAIL_API_URL", || DEFAULT_API_URL.to_string());

        let timeout_str = env::var("SENDGRID_MAIL_TIMEOUT_SECS").unwrap_or_else(|_| "30".to_string());
        let timeout_secs = match timeout_str.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            Ok(_) => {
                let err_msg = "SENDGRID_MAIL_TIMEOUT_SECS must be greater than zero";
                log::error!("{}", err_msg);
                return Err(anyhow!(err_msg));
            }
            Err(e) => {
                let err_msg = format!(
                    "SENDGRID_MAIL_TIMEOUT_SECS ('{}') must be a whole number of seconds",
                    timeout_str
                );
                log::error!("{}: {}", err_msg, e);
                return Err(anyhow!(e).context(err_msg));
            }
        };
        log::info!("Config: Using timeout_secs: {}", timeout_secs);

        Ok(Config {
            api_key,
            from_email,
            from_name,
            content_type,
            template_id,
            api_url,
            timeout_secs,
        })
    }
}
