use crate::debounce::DEFAULT_DEBOUNCE;
use crate::error::{Result, SearchError};
use crate::gemini::{GeminiMatcher, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::merge::MergePolicy;
use crate::pipeline::{PipelineConfig, DEFAULT_SEMANTIC_TIMEOUT};
use crate::semantic::SemanticMatcher;
use crate::stub::StubMatcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const API_KEY_VARS: [&str; 3] = ["NEXUS_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Which semantic matcher backs the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticMode {
    /// Gemini when an API key is available, otherwise off
    #[default]
    Auto,
    Off,
    Stub,
    Gemini,
}

impl SemanticMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Off => "off",
            Self::Stub => "stub",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for SemanticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticMode {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "off" | "none" => Ok(Self::Off),
            "stub" => Ok(Self::Stub),
            "gemini" => Ok(Self::Gemini),
            other => Err(SearchError::invalid_config(format!(
                "unsupported semantic mode '{other}' (expected auto, off, stub or gemini)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    pub debounce_ms: u64,
    pub merge_policy: MergePolicy,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            debounce_ms: duration_ms(DEFAULT_DEBOUNCE),
            merge_policy: MergePolicy::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemanticConfig {
    pub mode: SemanticMode,
    pub timeout_ms: u64,
    pub model: String,
    pub endpoint: String,
    /// Never read from config files; taken from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: SemanticMode::default(),
            timeout_ms: duration_ms(DEFAULT_SEMANTIC_TIMEOUT),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for SemanticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticConfig")
            .field("mode", &self.mode)
            .field("timeout_ms", &self.timeout_ms)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SemanticConfig {
    /// Mode after resolving `auto` against the API key
    #[must_use]
    pub fn effective_mode(&self) -> SemanticMode {
        match self.mode {
            SemanticMode::Auto if self.api_key.is_some() => SemanticMode::Gemini,
            SemanticMode::Auto => SemanticMode::Off,
            other => other,
        }
    }
}

/// Search settings loaded from TOML with environment overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub pipeline: PipelineSection,
    pub semantic: SemanticConfig,
}

impl SearchConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|err| SearchError::invalid_config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|err| match err {
            SearchError::InvalidConfig(msg) => {
                SearchError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Apply `NEXUS_*` overrides and pick up the API key from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(raw) = lookup("NEXUS_DEBOUNCE_MS") {
            self.pipeline.debounce_ms = parse_ms("NEXUS_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("NEXUS_MERGE_POLICY") {
            self.pipeline.merge_policy = raw.parse().map_err(|err: String| {
                SearchError::invalid_config(format!("NEXUS_MERGE_POLICY: {err}"))
            })?;
        }
        if let Some(raw) = lookup("NEXUS_SEMANTIC_MODE") {
            self.semantic.mode = raw.parse()?;
        }
        if let Some(raw) = lookup("NEXUS_SEMANTIC_TIMEOUT_MS") {
            self.semantic.timeout_ms = parse_ms("NEXUS_SEMANTIC_TIMEOUT_MS", &raw)?;
        }
        if let Some(model) = lookup("NEXUS_SEMANTIC_MODEL") {
            self.semantic.model = model.trim().to_string();
        }
        if let Some(endpoint) = lookup("NEXUS_SEMANTIC_ENDPOINT") {
            self.semantic.endpoint = endpoint.trim().to_string();
        }
        if self.semantic.api_key.is_none() {
            self.semantic.api_key = API_KEY_VARS
                .iter()
                .find_map(|key| lookup(*key))
                .map(|key| key.trim().to_string());
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.semantic.timeout_ms == 0 {
            return Err(SearchError::invalid_config(
                "semantic.timeout_ms must be greater than zero",
            ));
        }
        if self.semantic.model.trim().is_empty() {
            return Err(SearchError::invalid_config("semantic.model must not be empty"));
        }
        if !(self.semantic.endpoint.starts_with("http://")
            || self.semantic.endpoint.starts_with("https://"))
        {
            return Err(SearchError::invalid_config(format!(
                "semantic.endpoint must be an http(s) URL, got '{}'",
                self.semantic.endpoint
            )));
        }
        Ok(())
    }

    /// Pipeline settings; `off` forces lexical-only merging
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let merge_policy = if self.semantic.effective_mode() == SemanticMode::Off {
            MergePolicy::LexicalOnly
        } else {
            self.pipeline.merge_policy
        };
        PipelineConfig {
            debounce: Duration::from_millis(self.pipeline.debounce_ms),
            merge_policy,
            semantic_timeout: Duration::from_millis(self.semantic.timeout_ms),
        }
    }
}

/// Build the configured matcher, or `None` when semantic matching is off
pub fn build_matcher(config: &SemanticConfig) -> Result<Option<Arc<dyn SemanticMatcher>>> {
    let matcher: Arc<dyn SemanticMatcher> = match (config.mode, config.api_key.as_deref()) {
        (SemanticMode::Off, _) => return Ok(None),
        (SemanticMode::Auto, None) => {
            log::debug!("No API key configured, semantic matching off");
            return Ok(None);
        }
        (SemanticMode::Stub, _) => Arc::new(StubMatcher::new()),
        (SemanticMode::Auto | SemanticMode::Gemini, Some(api_key)) => {
            Arc::new(gemini_matcher(config, api_key)?)
        }
        (SemanticMode::Gemini, None) => {
            return Err(SearchError::invalid_config(format!(
                "semantic mode 'gemini' needs an API key (set one of {})",
                API_KEY_VARS.join(", ")
            )));
        }
    };
    log::debug!("Semantic matcher: {}", matcher.name());
    Ok(Some(matcher))
}

fn gemini_matcher(config: &SemanticConfig, api_key: &str) -> Result<GeminiMatcher> {
    Ok(GeminiMatcher::new(api_key)?
        .endpoint(config.endpoint.clone())
        .model(config.model.clone()))
}

fn parse_ms(var: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        SearchError::invalid_config(format!("{var} must be a number of milliseconds, got '{raw}'"))
    })
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_timings() {
        let config = SearchConfig::default();
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.debounce, Duration::from_millis(300));
        assert_eq!(pipeline.semantic_timeout, Duration::from_secs(5));
        assert_eq!(pipeline.merge_policy, MergePolicy::LexicalOnly);
        assert_eq!(config.semantic.model, "gemini-3-flash-preview");
    }

    #[test]
    fn parses_toml_sections() {
        let config = SearchConfig::from_toml_str(
            r#"
            [pipeline]
            debounce_ms = 150
            merge_policy = "semantic_preferred"

            [semantic]
            mode = "stub"
            timeout_ms = 1200
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.debounce_ms, 150);
        assert_eq!(config.pipeline.merge_policy, MergePolicy::SemanticPreferred);
        assert_eq!(config.semantic.mode, SemanticMode::Stub);
        assert_eq!(config.semantic.timeout_ms, 1200);
        assert_eq!(config.semantic.endpoint, DEFAULT_GEMINI_ENDPOINT);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(SearchConfig::from_toml_str("[pipeline]\nspeed = 1\n").is_err());
        assert!(SearchConfig::from_toml_str("[semantic]\ntimeout_ms = 0\n").is_err());
        assert!(SearchConfig::from_toml_str("[semantic]\nendpoint = \"ftp://x\"\n").is_err());
        assert!(SearchConfig::from_toml_str("[semantic]\nmode = \"magic\"\n").is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = SearchConfig::default();
        config
            .apply_env_from(env(&[
                ("NEXUS_DEBOUNCE_MS", "50"),
                ("NEXUS_MERGE_POLICY", "semantic"),
                ("NEXUS_SEMANTIC_MODE", "gemini"),
                ("NEXUS_SEMANTIC_TIMEOUT_MS", "2500"),
                ("GEMINI_API_KEY", "secret"),
            ]))
            .unwrap();

        assert_eq!(config.pipeline.debounce_ms, 50);
        assert_eq!(config.pipeline.merge_policy, MergePolicy::SemanticPreferred);
        assert_eq!(config.semantic.mode, SemanticMode::Gemini);
        assert_eq!(config.semantic.timeout_ms, 2500);
        assert_eq!(config.semantic.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn env_rejects_non_numeric_durations() {
        let mut config = SearchConfig::default();
        let err = config
            .apply_env_from(env(&[("NEXUS_DEBOUNCE_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn api_key_precedence() {
        let mut config = SearchConfig::default();
        config
            .apply_env_from(env(&[("API_KEY", "generic"), ("NEXUS_API_KEY", "nexus")]))
            .unwrap();
        assert_eq!(config.semantic.api_key.as_deref(), Some("nexus"));
    }

    #[test]
    fn auto_mode_resolves_against_api_key() {
        let mut semantic = SemanticConfig::default();
        assert_eq!(semantic.effective_mode(), SemanticMode::Off);
        assert!(build_matcher(&semantic).unwrap().is_none());

        semantic.api_key = Some("k".to_string());
        assert_eq!(semantic.effective_mode(), SemanticMode::Gemini);
        let matcher = build_matcher(&semantic).unwrap().expect("gemini matcher");
        assert_eq!(matcher.name(), "gemini");
    }

    #[test]
    fn stub_is_used_only_when_selected() {
        let semantic = SemanticConfig {
            mode: SemanticMode::Stub,
            ..SemanticConfig::default()
        };
        let matcher = build_matcher(&semantic).unwrap().expect("stub matcher");
        assert_eq!(matcher.name(), "stub");
    }

    #[test]
    fn keyless_default_config_stays_lexical() {
        let mut config = SearchConfig::default();
        config.pipeline.merge_policy = MergePolicy::SemanticPreferred;
        config.apply_env_from(env(&[])).unwrap();
        assert_eq!(config.pipeline_config().merge_policy, MergePolicy::LexicalOnly);
    }

    #[test]
    fn off_mode_forces_lexical_only() {
        let mut config = SearchConfig::default();
        config.pipeline.merge_policy = MergePolicy::SemanticPreferred;
        config.semantic.mode = SemanticMode::Off;
        assert_eq!(config.pipeline_config().merge_policy, MergePolicy::LexicalOnly);
        assert!(build_matcher(&config.semantic).unwrap().is_none());
    }

    #[test]
    fn gemini_mode_requires_api_key() {
        let semantic = SemanticConfig {
            mode: SemanticMode::Gemini,
            ..SemanticConfig::default()
        };
        assert!(matches!(
            build_matcher(&semantic),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let semantic = SemanticConfig {
            api_key: Some("top-secret".to_string()),
            ..SemanticConfig::default()
        };
        let rendered = format!("{semantic:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
