//! Explicit runtime configuration.
//!
//! [`CraftConfig`] carries everything the providers and the executor need:
//! the shared HTTP client, per-vendor credentials and models, sampling and
//! retry settings, the judge vendor, and the executor settings. It is built
//! once, either from the environment or with [`CraftConfig::builder`], and
//! passed to the components that need it.
//!
//! # Example
//!
//! ```
//! use solution_craft::config::{CraftConfig, Vendor};
//!
//! let config = CraftConfig::builder()
//!     .api_key(Vendor::OpenAi, "sk-...")
//!     .judge(Vendor::OpenAi)
//!     .max_iterations(3)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.providers().len(), 3);
//! ```

use crate::backend::{anthropic, gemini, openai};
use crate::backend::{AnthropicBackend, Backend, BackoffConfig, GeminiBackend, OpenAiBackend};
use crate::client::{LlmConfig, Provider};
use crate::correction::DEFAULT_MAX_ITERATIONS;
use crate::error::{CraftError, Result};
use crate::executor::ExecutorConfig;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// A supported LLM vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    OpenAi,
    Gemini,
    Anthropic,
}

impl Vendor {
    pub const ALL: [Vendor; 3] = [Vendor::OpenAi, Vendor::Gemini, Vendor::Anthropic];

    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::OpenAi => "openai",
            Vendor::Gemini => "gemini",
            Vendor::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding the vendor's API key.
    pub fn key_var(self) -> &'static str {
        match self {
            Vendor::OpenAi => openai::AUTH_ENV_VAR,
            Vendor::Gemini => gemini::AUTH_ENV_VAR,
            Vendor::Anthropic => anthropic::AUTH_ENV_VAR,
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            Vendor::OpenAi => "OPENAI",
            Vendor::Gemini => "GEMINI",
            Vendor::Anthropic => "ANTHROPIC",
        }
    }

    pub fn default_settings(self) -> ProviderSettings {
        let (model, base_url) = match self {
            Vendor::OpenAi => (openai::DEFAULT_MODEL, openai::DEFAULT_BASE_URL),
            Vendor::Gemini => (gemini::DEFAULT_MODEL, gemini::DEFAULT_BASE_URL),
            Vendor::Anthropic => (anthropic::DEFAULT_MODEL, anthropic::DEFAULT_BASE_URL),
        };
        ProviderSettings {
            api_key: None,
            model: model.to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn backend(self, api_key: Option<&str>) -> Arc<dyn Backend> {
        match (self, api_key) {
            (Vendor::OpenAi, Some(k)) => Arc::new(OpenAiBackend::new().with_api_key(k)),
            (Vendor::OpenAi, None) => Arc::new(OpenAiBackend::new()),
            (Vendor::Gemini, Some(k)) => Arc::new(GeminiBackend::new().with_api_key(k)),
            (Vendor::Gemini, None) => Arc::new(GeminiBackend::new()),
            (Vendor::Anthropic, Some(k)) => Arc::new(AnthropicBackend::new().with_api_key(k)),
            (Vendor::Anthropic, None) => Arc::new(AnthropicBackend::new()),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = CraftError;

    fn from_str(s: &str) -> Result<Self> {
        Vendor::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CraftError::InvalidConfig(format!("unknown vendor '{}'", s)))
    }
}

/// Connection settings for one vendor.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// `None` (or blank) disables the vendor.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub struct CraftConfig {
    /// HTTP client shared by every provider (cheap to clone, `Arc` inside).
    pub client: Client,
    pub backoff: BackoffConfig,
    pub llm: LlmConfig,
    /// Settings per vendor, in [`Vendor::ALL`] order.
    pub vendors: Vec<(Vendor, ProviderSettings)>,
    pub judge: Vendor,
    pub executor: ExecutorConfig,
    pub max_iterations: u32,
}

impl fmt::Debug for CraftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CraftConfig")
            .field("backoff", &self.backoff)
            .field("llm", &self.llm)
            .field("vendors", &self.vendors)
            .field("judge", &self.judge)
            .field("executor", &self.executor)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl CraftConfig {
    pub fn builder() -> CraftConfigBuilder {
        CraftConfigBuilder::default()
    }

    /// Read configuration from the process environment.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `OPENAI_API_KEY`, `GEMINI_API_KEY`, `ANTHROPIC_API_KEY` | credentials, absent disables |
    /// | `OPENAI_MODEL`, `GEMINI_MODEL`, `ANTHROPIC_MODEL` | model overrides |
    /// | `OPENAI_BASE_URL`, `GEMINI_BASE_URL`, `ANTHROPIC_BASE_URL` | endpoint overrides |
    /// | `CRAFT_JUDGE` | judge vendor, default `gemini` |
    /// | `CRAFT_MAX_ITERATIONS` | correction passes, default 5 |
    /// | `CRAFT_RUN_TIMEOUT_SECS` | executor timeout, default 120 |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        for vendor in Vendor::ALL {
            let mut settings = vendor.default_settings();
            settings.api_key = get(vendor.key_var());
            if let Some(model) = get(&format!("{}_MODEL", vendor.env_prefix())) {
                settings.model = model;
            }
            if let Some(url) = get(&format!("{}_BASE_URL", vendor.env_prefix())) {
                settings.base_url = url;
            }
            builder = builder.vendor(vendor, settings);
        }

        if let Some(judge) = get("CRAFT_JUDGE") {
            builder = builder.judge(judge.parse()?);
        }
        if let Some(n) = get("CRAFT_MAX_ITERATIONS") {
            builder = builder.max_iterations(parse_number("CRAFT_MAX_ITERATIONS", &n)?);
        }
        if let Some(secs) = get("CRAFT_RUN_TIMEOUT_SECS") {
            builder = builder.run_timeout(Duration::from_secs(parse_number(
                "CRAFT_RUN_TIMEOUT_SECS",
                &secs,
            )?));
        }
        builder.build()
    }

    pub fn settings(&self, vendor: Vendor) -> Option<&ProviderSettings> {
        self.vendors
            .iter()
            .find(|(v, _)| *v == vendor)
            .map(|(_, s)| s)
    }

    /// Build the provider for one vendor.
    pub fn provider(&self, vendor: Vendor) -> Provider {
        let settings = self
            .settings(vendor)
            .cloned()
            .unwrap_or_else(|| vendor.default_settings());
        let key = settings.api_key.as_deref().filter(|k| !k.trim().is_empty());
        Provider::new(
            vendor.backend(key),
            self.client.clone(),
            normalize_base_url(&settings.base_url),
            settings.model,
        )
        .with_id(vendor.as_str())
        .with_config(self.llm.clone())
        .with_backoff(self.backoff.clone())
    }

    /// Every configured vendor as an ensemble member. Members without a
    /// credential are included and skipped at query time.
    pub fn providers(&self) -> Vec<Provider> {
        self.vendors.iter().map(|(v, _)| self.provider(*v)).collect()
    }

    pub fn judge(&self) -> Provider {
        self.provider(self.judge)
    }

    /// Vendors with a credential.
    pub fn credentialed(&self) -> Vec<Vendor> {
        self.vendors
            .iter()
            .filter(|(_, s)| s.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()))
            .map(|(v, _)| *v)
            .collect()
    }
}

fn parse_number<T: FromStr>(var: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            CraftError::InvalidConfig(format!("{} must be a number, got '{}'", var, value))
        })
}

/// Strip known API path suffixes from a base URL, since each backend appends
/// its own path.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    for suffix in ["/v1/chat/completions", "/v1/messages", "/v1beta", "/v1"] {
        if let Some(stripped) = trimmed.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}

/// Builder for [`CraftConfig`].
#[derive(Default)]
pub struct CraftConfigBuilder {
    client: Option<Client>,
    http_timeout: Option<Duration>,
    backoff: Option<BackoffConfig>,
    llm: Option<LlmConfig>,
    vendors: Vec<(Vendor, ProviderSettings)>,
    judge: Option<Vendor>,
    env_dir: Option<PathBuf>,
    run_timeout: Option<Duration>,
    max_iterations: Option<u32>,
}

impl CraftConfigBuilder {
    /// Use an existing HTTP client. `http_timeout` is then ignored.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Per-request HTTP timeout. Default: 120 seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Transport retry policy. Default: [`BackoffConfig::standard()`].
    pub fn backoff(mut self, config: BackoffConfig) -> Self {
        self.backoff = Some(config);
        self
    }

    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.llm = Some(config);
        self
    }

    /// Replace one vendor's settings.
    pub fn vendor(mut self, vendor: Vendor, settings: ProviderSettings) -> Self {
        self.vendors.retain(|(v, _)| *v != vendor);
        self.vendors.push((vendor, settings));
        self
    }

    /// Set one vendor's API key, keeping its other settings.
    pub fn api_key(mut self, vendor: Vendor, key: impl Into<String>) -> Self {
        let mut settings = self.take_settings(vendor);
        settings.api_key = Some(key.into());
        self.vendor(vendor, settings)
    }

    pub fn model(mut self, vendor: Vendor, model: impl Into<String>) -> Self {
        let mut settings = self.take_settings(vendor);
        settings.model = model.into();
        self.vendor(vendor, settings)
    }

    /// Judge vendor. Default: [`Vendor::Gemini`].
    pub fn judge(mut self, vendor: Vendor) -> Self {
        self.judge = Some(vendor);
        self
    }

    /// Environment directory inside each solution folder. Default: `venv`.
    pub fn env_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.env_dir = Some(dir.into());
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    fn take_settings(&mut self, vendor: Vendor) -> ProviderSettings {
        match self.vendors.iter().position(|(v, _)| *v == vendor) {
            Some(i) => self.vendors.remove(i).1,
            None => vendor.default_settings(),
        }
    }

    pub fn build(self) -> Result<CraftConfig> {
        let defaults = ExecutorConfig::default();
        let executor = ExecutorConfig {
            env_dir: self.env_dir.unwrap_or(defaults.env_dir),
            run_timeout: self.run_timeout.unwrap_or(defaults.run_timeout),
        };
        if executor.env_dir.as_os_str().is_empty() {
            return Err(CraftError::InvalidConfig("environment directory is empty".into()));
        }
        if executor.run_timeout.is_zero() {
            return Err(CraftError::InvalidConfig("run timeout must be positive".into()));
        }

        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
                .build()?,
        };

        let mut vendors = self.vendors;
        for vendor in Vendor::ALL {
            if !vendors.iter().any(|(v, _)| *v == vendor) {
                vendors.push((vendor, vendor.default_settings()));
            }
        }
        vendors.sort_by_key(|(v, _)| Vendor::ALL.iter().position(|x| x == v));

        Ok(CraftConfig {
            client,
            backoff: self.backoff.unwrap_or_else(BackoffConfig::standard),
            llm: self.llm.unwrap_or_default(),
            vendors,
            judge: self.judge.unwrap_or(Vendor::Gemini),
            executor,
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        })
    }
}
