//! Payment method configuration.
//!
//! Settings are loaded from TOML and validated after parsing. Secrets are never
//! inlined: the file names the environment variables that hold them.
//!
//! # Examples
//!
//! ```
//! use anet_payment::config::{Mode, PaymentMethodConfig};
//!
//! let config = PaymentMethodConfig::from_toml(
//!     r#"
//!     [credentials]
//!     api_login = "5KP3u95bQpv"
//!     transaction_key_env = "ANET_TRANSACTION_KEY"
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.mode, Mode::Test);
//! assert_eq!(config.accept_js_path(), "https://jstest.authorize.net/v1/Accept.js");
//! ```

use std::{collections::HashMap, path::Path};

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    gateway::{AuthorizeNetClient, Credentials, Endpoints, PaymentActionType},
    transport::{HttpConfig, HttpTransport, http::validate_url},
};

/// Default post-back target of the checkout form.
pub const DEFAULT_PROCESS_PAYMENT_ACTION: &str = "{storefrontURL}/cart/externalpaymentcallback";
/// Accept.js script for the sandbox.
pub const DEFAULT_ACCEPT_JS_TEST_PATH: &str = "https://jstest.authorize.net/v1/Accept.js";
/// Accept.js script for production.
pub const DEFAULT_ACCEPT_JS_PROD_PATH: &str = "https://js.authorize.net/v1/Accept.js";

/// Gateway mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sandbox endpoint and Accept.js test script.
    #[default]
    Test,
    /// Production endpoint and Accept.js production script.
    Real,
}

/// Root payment method configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodConfig {
    /// Sandbox or production.
    #[serde(default)]
    pub mode: Mode,

    /// Sale or Authorization/Capture.
    #[serde(default)]
    pub payment_action_type: PaymentActionType,

    /// Checkout form action. `{orderId}` is replaced with the order id.
    #[serde(default = "default_process_payment_action")]
    pub process_payment_action: String,

    /// Accept.js script URL used in test mode.
    #[serde(default = "default_accept_js_test_path")]
    pub accept_js_test_path: String,

    /// Accept.js script URL used in real mode.
    #[serde(default = "default_accept_js_prod_path")]
    pub accept_js_prod_path: String,

    /// Merchant credentials.
    pub credentials: CredentialsConfig,

    /// Gateway endpoint overrides.
    #[serde(default)]
    pub endpoints: Endpoints,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Detokenizing proxies by name.
    #[serde(default)]
    pub proxies: HashMap<String, ProxyAuthConfig>,
}

fn default_process_payment_action() -> String {
    DEFAULT_PROCESS_PAYMENT_ACTION.to_owned()
}

fn default_accept_js_test_path() -> String {
    DEFAULT_ACCEPT_JS_TEST_PATH.to_owned()
}

fn default_accept_js_prod_path() -> String {
    DEFAULT_ACCEPT_JS_PROD_PATH.to_owned()
}

/// Merchant credentials, by reference to environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// API login ID. Not a secret; it is embedded in the checkout form.
    pub api_login: String,
    /// Environment variable holding the transaction key.
    pub transaction_key_env: String,
    /// Environment variable holding the hex signature key, if responses are verified.
    #[serde(default)]
    pub signature_key_env: Option<String>,
}

/// Proxy authentication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyAuthConfig {
    /// Bearer token authentication.
    Bearer {
        /// Environment variable containing the token.
        env_var: String,
    },
}

impl ProxyAuthConfig {
    fn env_var(&self) -> &str {
        match self {
            Self::Bearer { env_var } => env_var,
        }
    }
}

impl PaymentMethodConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GatewayError::Config(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the file cannot be read or is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GatewayError::Config(format!(
                "cannot read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Validates URLs, environment variable names and HTTP bounds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.api_login.trim().is_empty() {
            return Err(GatewayError::Config("credentials.api_login cannot be empty".to_owned()));
        }
        validate_env_var_name(&self.credentials.transaction_key_env)?;
        if let Some(name) = &self.credentials.signature_key_env {
            validate_env_var_name(name)?;
        }

        if self.process_payment_action.trim().is_empty() {
            return Err(GatewayError::Config("process_payment_action cannot be empty".to_owned()));
        }

        validate_https_url("accept_js_test_path", &self.accept_js_test_path)?;
        validate_https_url("accept_js_prod_path", &self.accept_js_prod_path)?;
        validate_https_url("endpoints.sandbox", &self.endpoints.sandbox)?;
        validate_https_url("endpoints.production", &self.endpoints.production)?;

        self.http.validate()?;

        for (name, proxy) in &self.proxies {
            if name.is_empty() {
                return Err(GatewayError::Config("proxy name cannot be empty".to_owned()));
            }
            validate_env_var_name(proxy.env_var())?;
        }

        Ok(())
    }

    /// True in real mode.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.mode == Mode::Real
    }

    /// Accept.js script URL for the configured mode.
    #[must_use]
    pub fn accept_js_path(&self) -> &str {
        match self.mode {
            Mode::Test => &self.accept_js_test_path,
            Mode::Real => &self.accept_js_prod_path,
        }
    }

    /// Resolves credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a referenced variable is unset or empty.
    pub fn resolve_credentials(&self) -> Result<Credentials> {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolves credentials through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if a referenced variable is unset or empty.
    pub fn resolve_credentials_with<F>(&self, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transaction_key = require_env(&lookup, &self.credentials.transaction_key_env)?;
        let signature_key = self
            .credentials
            .signature_key_env
            .as_deref()
            .map(|name| require_env(&lookup, name))
            .transpose()?;

        Ok(Credentials {
            api_login: self.credentials.api_login.clone(),
            transaction_key,
            signature_key,
            is_live_mode: self.is_live(),
        })
    }

    /// Builds a gateway client from the HTTP, endpoint and proxy settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or a proxy token is missing.
    pub fn build_client(&self) -> Result<AuthorizeNetClient<HttpTransport>> {
        self.build_client_with(|name| std::env::var(name).ok())
    }

    /// Like [`PaymentMethodConfig::build_client`], reading proxy tokens through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built or a proxy token is missing.
    pub fn build_client_with<F>(&self, lookup: F) -> Result<AuthorizeNetClient<HttpTransport>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = HttpTransport::with_config(&self.http)?;
        let mut client =
            AuthorizeNetClient::with_transport(transport).with_endpoints(self.endpoints.clone());
        for (name, proxy) in &self.proxies {
            client = client.with_proxy(name.clone(), require_env(&lookup, proxy.env_var())?);
        }
        Ok(client)
    }
}

fn require_env<F>(lookup: &F, name: &str) -> Result<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(GatewayError::Config(format!("environment variable {name} is not set"))),
    }
}

fn validate_https_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| GatewayError::Config(format!("invalid {field} '{value}': {e}")))?;
    validate_url(&url).map_err(|e| match e {
        GatewayError::InvalidInput(reason) => GatewayError::Config(format!("{field}: {reason}")),
        other => other,
    })
}

/// Validates an environment variable name.
fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first_char) = name.chars().next() else {
        return Err(GatewayError::Config("environment variable name cannot be empty".to_owned()));
    };

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(GatewayError::Config(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(GatewayError::Config(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}
