use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use concierge_types::error::ConfigError;

/// Name of the config file searched for during discovery.
const CONFIG_FILE_NAME: &str = "concierge.toml";

/// Environment variable holding an explicit config file path.
const CONFIG_PATH_ENV: &str = "CONCIERGE_CONFIG";

/// Environment override for `gateway.provider`.
const GATEWAY_PROVIDER_ENV: &str = "CONCIERGE_GATEWAY_PROVIDER";

/// Environment override for `gateway.model`.
const GATEWAY_MODEL_ENV: &str = "CONCIERGE_GATEWAY_MODEL";

/// Resolved runtime configuration.
///
/// Values are resolved with the precedence: explicit builder/caller values,
/// then `CONCIERGE_*` environment overrides, then config file, then built-in
/// defaults. `Config` is immutable after construction; the orchestrator and
/// stages borrow from it.
///
/// # Config File Format
///
/// ```toml
/// [policy]
/// max_tool_iterations = 5
/// max_specialist_runs = 2
/// max_review_rewrites = 1
/// escalation_confidence_floor = 0.5
/// complaint_review_floor = 5
/// fallback_to_general = false
/// fallback_confidence = 0.3
/// review_default_score = 7
///
/// [gateway]
/// provider = "openai"
/// model = "gpt-4o-mini"
/// api_key_env = "OPENAI_API_KEY"
/// max_tokens = 1024
/// call_timeout_secs = 30
///
/// [tools]
/// call_timeout_secs = 10
/// knowledge_top_k = 3
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub policy: Policy,
    pub gateway: GatewaySettings,
    pub tools: ToolSettings,
}

/// Loop bounds and escalation thresholds.
///
/// Every cap the orchestrator enforces comes from here; the stage
/// implementations never carry their own limits.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Specialist tool-loop cap per invocation.
    pub max_tool_iterations: u32,
    /// Total specialist invocations per turn (initial + re-runs).
    pub max_specialist_runs: u32,
    /// Inline reviewer rewrites per turn.
    pub max_review_rewrites: u32,
    /// Escalate when router confidence falls below this value.
    pub escalation_confidence_floor: f64,
    /// Escalate complaints whose review score falls below this value.
    pub complaint_review_floor: u8,
    /// Fall back to the `general` intent on classification failure instead
    /// of failing the turn. Off by default: a silent default intent hides
    /// routing problems.
    pub fallback_to_general: bool,
    /// Confidence assigned to a fallback classification.
    pub fallback_confidence: f64,
    /// Score assumed when a reviewer reply does not parse.
    pub review_default_score: u8,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_tool_iterations: 5,
            max_specialist_runs: 2,
            max_review_rewrites: 1,
            escalation_confidence_floor: 0.5,
            complaint_review_floor: 5,
            fallback_to_general: false,
            fallback_confidence: 0.3,
            review_default_score: 7,
        }
    }
}

/// Model gateway provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Provider selector for the backend factory; `"openai"` selects the
    /// OpenAI-compatible HTTP backend. Injected backends (tests, demo mode)
    /// bypass the factory and leave this field unread.
    pub provider: String,
    /// Default model name passed to the provider.
    pub model: String,
    /// Environment variable the API key is read from, never the key itself.
    pub api_key_env: String,
    /// Override for the chat-completions endpoint.
    pub base_url: Option<String>,
    pub max_tokens: u32,
    /// Per model call deadline.
    pub call_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 1024,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Tool execution settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Per tool call deadline.
    pub call_timeout: Duration,
    /// Passages returned by knowledge search when the caller gives no count.
    pub knowledge_top_k: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            knowledge_top_k: 3,
        }
    }
}

/// `[policy]` table as read from the file; unset keys fall to defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyFileTable {
    pub max_tool_iterations: Option<u32>,
    pub max_specialist_runs: Option<u32>,
    pub max_review_rewrites: Option<u32>,
    pub escalation_confidence_floor: Option<f64>,
    pub complaint_review_floor: Option<u8>,
    pub fallback_to_general: Option<bool>,
    pub fallback_confidence: Option<f64>,
    pub review_default_score: Option<u8>,
}

/// `[gateway]` table as read from the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayFileTable {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub call_timeout_secs: Option<u64>,
}

/// `[tools]` table as read from the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsFileTable {
    pub call_timeout_secs: Option<u64>,
    pub knowledge_top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct ConfigFile {
    policy: Option<PolicyFileTable>,
    gateway: Option<GatewayFileTable>,
    tools: Option<ToolsFileTable>,
}

impl Config {
    /// Discover and load configuration.
    ///
    /// Uses `CONCIERGE_CONFIG` when set, otherwise walks up from the current
    /// directory looking for `concierge.toml`. Built-in defaults apply when
    /// no file is found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a located file cannot be read or parsed,
    /// or if the resolved values fail validation.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::load_from_path(Path::new(&path));
        }
        let start_dir = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Self::discover_from(&start_dir)
    }

    /// Discover configuration starting from a specific directory.
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path) -> Result<Self, ConfigError> {
        match Self::find_config_file(start_dir) {
            Some(path) => Self::load_from_path(&path),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from an explicit file path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config = Self::from_file(file);
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Walk up from `start_dir` looking for the config file.
    fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    /// Apply `CONCIERGE_*` environment overrides on top of file values.
    /// Blank values are ignored. The builder path skips this so tests stay
    /// free of process-global state.
    fn apply_env_overrides(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = get(GATEWAY_PROVIDER_ENV)
            && !provider.is_empty()
        {
            self.gateway.provider = provider;
        }
        if let Some(model) = get(GATEWAY_MODEL_ENV)
            && !model.is_empty()
        {
            self.gateway.model = model;
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(policy) = file.policy {
            let p = &mut config.policy;
            if let Some(v) = policy.max_tool_iterations {
                p.max_tool_iterations = v;
            }
            if let Some(v) = policy.max_specialist_runs {
                p.max_specialist_runs = v;
            }
            if let Some(v) = policy.max_review_rewrites {
                p.max_review_rewrites = v;
            }
            if let Some(v) = policy.escalation_confidence_floor {
                p.escalation_confidence_floor = v;
            }
            if let Some(v) = policy.complaint_review_floor {
                p.complaint_review_floor = v;
            }
            if let Some(v) = policy.fallback_to_general {
                p.fallback_to_general = v;
            }
            if let Some(v) = policy.fallback_confidence {
                p.fallback_confidence = v;
            }
            if let Some(v) = policy.review_default_score {
                p.review_default_score = v;
            }
        }

        if let Some(gateway) = file.gateway {
            let g = &mut config.gateway;
            if let Some(v) = gateway.provider {
                g.provider = v;
            }
            if let Some(v) = gateway.model {
                g.model = v;
            }
            if let Some(v) = gateway.api_key_env {
                g.api_key_env = v;
            }
            if gateway.base_url.is_some() {
                g.base_url = gateway.base_url;
            }
            if let Some(v) = gateway.max_tokens {
                g.max_tokens = v;
            }
            if let Some(v) = gateway.call_timeout_secs {
                g.call_timeout = Duration::from_secs(v);
            }
        }

        if let Some(tools) = file.tools {
            let t = &mut config.tools;
            if let Some(v) = tools.call_timeout_secs {
                t.call_timeout = Duration::from_secs(v);
            }
            if let Some(v) = tools.knowledge_top_k {
                t.knowledge_top_k = v;
            }
        }

        config
    }

    /// Validate resolved values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for out-of-range thresholds, zero
    /// caps, or zero timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.policy;
        if p.max_tool_iterations == 0 {
            return Err(invalid("policy.max_tool_iterations must be at least 1"));
        }
        if p.max_specialist_runs == 0 {
            return Err(invalid("policy.max_specialist_runs must be at least 1"));
        }
        if !(0.0..=1.0).contains(&p.escalation_confidence_floor) {
            return Err(invalid(
                "policy.escalation_confidence_floor must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&p.fallback_confidence) {
            return Err(invalid("policy.fallback_confidence must be within [0, 1]"));
        }
        if !(1..=10).contains(&p.complaint_review_floor) {
            return Err(invalid(
                "policy.complaint_review_floor must be within [1, 10]",
            ));
        }
        if !(1..=10).contains(&p.review_default_score) {
            return Err(invalid("policy.review_default_score must be within [1, 10]"));
        }

        if self.gateway.call_timeout.is_zero() {
            return Err(invalid("gateway.call_timeout_secs must be positive"));
        }
        if self.gateway.provider.is_empty() {
            return Err(invalid("gateway.provider must not be empty"));
        }
        if self.tools.call_timeout.is_zero() {
            return Err(invalid("tools.call_timeout_secs must be positive"));
        }
        if self.tools.knowledge_top_k == 0 {
            return Err(invalid("tools.knowledge_top_k must be at least 1"));
        }

        Ok(())
    }

    /// Fluent builder, primarily for tests.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            gateway: GatewaySettings::default(),
            tools: ToolSettings::default(),
        }
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// Fluent construction of [`Config`] values.
///
/// ```rust
/// use concierge_config::Config;
///
/// let config = Config::builder()
///     .max_tool_iterations(2)
///     .fallback_to_general(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.policy.max_tool_iterations, 2);
/// assert!(config.policy.fallback_to_general);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Option<Config>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Some(Config::default()),
        }
    }

    fn config_mut(&mut self) -> &mut Config {
        self.config.get_or_insert_with(Config::default)
    }

    #[must_use]
    pub fn max_tool_iterations(mut self, value: u32) -> Self {
        self.config_mut().policy.max_tool_iterations = value;
        self
    }

    #[must_use]
    pub fn max_specialist_runs(mut self, value: u32) -> Self {
        self.config_mut().policy.max_specialist_runs = value;
        self
    }

    #[must_use]
    pub fn max_review_rewrites(mut self, value: u32) -> Self {
        self.config_mut().policy.max_review_rewrites = value;
        self
    }

    #[must_use]
    pub fn escalation_confidence_floor(mut self, value: f64) -> Self {
        self.config_mut().policy.escalation_confidence_floor = value;
        self
    }

    #[must_use]
    pub fn complaint_review_floor(mut self, value: u8) -> Self {
        self.config_mut().policy.complaint_review_floor = value;
        self
    }

    #[must_use]
    pub fn fallback_to_general(mut self, value: bool) -> Self {
        self.config_mut().policy.fallback_to_general = value;
        self
    }

    #[must_use]
    pub fn fallback_confidence(mut self, value: f64) -> Self {
        self.config_mut().policy.fallback_confidence = value;
        self
    }

    #[must_use]
    pub fn review_default_score(mut self, value: u8) -> Self {
        self.config_mut().policy.review_default_score = value;
        self
    }

    #[must_use]
    pub fn gateway_provider(mut self, value: impl Into<String>) -> Self {
        self.config_mut().gateway.provider = value.into();
        self
    }

    #[must_use]
    pub fn gateway_model(mut self, value: impl Into<String>) -> Self {
        self.config_mut().gateway.model = value.into();
        self
    }

    #[must_use]
    pub fn gateway_call_timeout(mut self, value: Duration) -> Self {
        self.config_mut().gateway.call_timeout = value;
        self
    }

    #[must_use]
    pub fn tool_call_timeout(mut self, value: Duration) -> Self {
        self.config_mut().tools.call_timeout = value;
        self
    }

    /// Finish and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the assembled values fail
    /// [`Config::validate`].
    pub fn build(mut self) -> Result<Config, ConfigError> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}
