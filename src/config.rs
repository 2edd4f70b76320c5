//! Configuration types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::compose::{GatewayConfig, GatewayGenerator, ResponseGenerator, TemplateGenerator};
use crate::error::ConfigError;
use crate::inbox::{Department, User};

const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Which backend writes reply drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorBackend {
    /// Built-in letter templates.
    #[default]
    Template,
    /// OpenAI-compatible chat-completions gateway.
    Gateway,
}

impl std::fmt::Display for GeneratorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Gateway => write!(f, "gateway"),
        }
    }
}

impl std::str::FromStr for GeneratorBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "gateway" => Ok(Self::Gateway),
            _ => Err(format!("Unknown generator backend: {}", s)),
        }
    }
}

/// Inbox configuration.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    pub generator: GeneratorBackend,
    /// Chat-completions endpoint for the gateway backend.
    pub gateway_url: String,
    /// Required when `generator` is `Gateway`.
    pub gateway_api_key: Option<SecretString>,
    pub model: String,
    pub gateway_timeout: Duration,
    /// Signature prefix, e.g. `City Hall` in `City Hall Finance Department`.
    pub organization: String,
    /// Delay before the template backend answers.
    pub simulated_latency: Duration,
    pub seed_path: Option<PathBuf>,
    /// The signed-in staff member.
    pub user: User,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorBackend::Template,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            gateway_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            gateway_timeout: Duration::from_secs(30),
            organization: "City Hall".to_string(),
            simulated_latency: Duration::ZERO,
            seed_path: None,
            user: User {
                id: "1".to_string(),
                name: "Admin User".to_string(),
                email: "admin@cityhall.gov".to_string(),
                department: Department::Administration,
            },
        }
    }
}

impl InboxConfig {
    /// Read `CITYHALL_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("CITYHALL_GENERATOR") {
            config.generator = parse_value("CITYHALL_GENERATOR", &raw)?;
        }
        if let Some(url) = get("CITYHALL_GATEWAY_URL") {
            config.gateway_url = url;
        }
        config.gateway_api_key = get("CITYHALL_GATEWAY_API_KEY").map(SecretString::from);
        if let Some(model) = get("CITYHALL_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("CITYHALL_GATEWAY_TIMEOUT_SECS") {
            let secs: u64 = parse_value("CITYHALL_GATEWAY_TIMEOUT_SECS", &raw)?;
            config.gateway_timeout = Duration::from_secs(secs);
        }
        if let Some(org) = lookup("CITYHALL_ORGANIZATION") {
            // An explicitly blank organization drops the signature prefix.
            config.organization = org.trim().to_string();
        }
        if let Some(raw) = get("CITYHALL_SIMULATED_LATENCY_MS") {
            let ms: u64 = parse_value("CITYHALL_SIMULATED_LATENCY_MS", &raw)?;
            config.simulated_latency = Duration::from_millis(ms);
        }
        config.seed_path = get("CITYHALL_SEED_PATH").map(PathBuf::from);

        if let Some(name) = get("CITYHALL_USER_NAME") {
            config.user.name = name;
        }
        if let Some(email) = get("CITYHALL_USER_EMAIL") {
            config.user.email = email;
        }
        if let Some(raw) = get("CITYHALL_USER_DEPARTMENT") {
            config.user.department = parse_value("CITYHALL_USER_DEPARTMENT", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.generator == GeneratorBackend::Gateway && self.gateway_api_key.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "CITYHALL_GATEWAY_API_KEY".to_string(),
                hint: "Set it, or use CITYHALL_GENERATOR=template".to_string(),
            });
        }
        if self.gateway_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "CITYHALL_GATEWAY_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Construct the configured reply generator.
    pub fn build_generator(&self) -> Result<Arc<dyn ResponseGenerator>, crate::Error> {
        match self.generator {
            GeneratorBackend::Template => Ok(Arc::new(
                TemplateGenerator::new(self.organization.clone())
                    .with_latency(self.simulated_latency),
            )),
            GeneratorBackend::Gateway => {
                let api_key = self.gateway_api_key.clone().ok_or_else(|| {
                    ConfigError::MissingRequired {
                        key: "CITYHALL_GATEWAY_API_KEY".to_string(),
                        hint: "Set it, or use CITYHALL_GENERATOR=template".to_string(),
                    }
                })?;
                let generator = GatewayGenerator::new(GatewayConfig {
                    endpoint: self.gateway_url.clone(),
                    api_key,
                    model: self.model.clone(),
                    timeout: self.gateway_timeout,
                })?;
                Ok(Arc::new(generator))
            }
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = InboxConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.generator, GeneratorBackend::Template);
        assert_eq!(config.organization, "City Hall");
        assert_eq!(config.simulated_latency, Duration::ZERO);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.seed_path.is_none());
        assert_eq!(config.user.department, Department::Administration);
    }

    #[test]
    fn reads_overrides() {
        let config = InboxConfig::from_lookup(lookup(&[
            ("CITYHALL_ORGANIZATION", "Springfield"),
            ("CITYHALL_SIMULATED_LATENCY_MS", "1500"),
            ("CITYHALL_SEED_PATH", "/tmp/seed.json"),
            ("CITYHALL_USER_DEPARTMENT", "finance"),
            ("CITYHALL_USER_NAME", "Finance Manager"),
        ]))
        .unwrap();
        assert_eq!(config.organization, "Springfield");
        assert_eq!(config.simulated_latency, Duration::from_millis(1500));
        assert_eq!(config.seed_path, Some(PathBuf::from("/tmp/seed.json")));
        assert_eq!(config.user.department, Department::Finance);
        assert_eq!(config.user.name, "Finance Manager");
    }

    #[test]
    fn blank_organization_is_kept_blank() {
        let config = InboxConfig::from_lookup(lookup(&[("CITYHALL_ORGANIZATION", " ")])).unwrap();
        assert_eq!(config.organization, "");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = InboxConfig::from_lookup(lookup(&[("CITYHALL_SIMULATED_LATENCY_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "CITYHALL_SIMULATED_LATENCY_MS"
        ));

        let err = InboxConfig::from_lookup(lookup(&[("CITYHALL_GENERATOR", "magic")])).unwrap_err();
        assert!(err.to_string().contains("Unknown generator backend"));

        let err = InboxConfig::from_lookup(lookup(&[("CITYHALL_USER_DEPARTMENT", "zoo")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = InboxConfig::from_lookup(lookup(&[("CITYHALL_GATEWAY_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn gateway_requires_api_key() {
        let err = InboxConfig::from_lookup(lookup(&[("CITYHALL_GENERATOR", "gateway")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { ref key, .. } if key == "CITYHALL_GATEWAY_API_KEY"
        ));

        let config = InboxConfig::from_lookup(lookup(&[
            ("CITYHALL_GENERATOR", "Gateway"),
            ("CITYHALL_GATEWAY_API_KEY", "sk-test"),
            ("CITYHALL_MODEL", "test-model"),
        ]))
        .unwrap();
        assert_eq!(config.generator, GeneratorBackend::Gateway);
        assert_eq!(config.model, "test-model");
        assert_eq!(config.build_generator().unwrap().name(), "gateway");
    }

    #[test]
    fn builds_template_generator_by_default() {
        let generator = InboxConfig::default().build_generator().unwrap();
        assert_eq!(generator.name(), "template");
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("template".parse::<GeneratorBackend>().unwrap(), GeneratorBackend::Template);
        assert_eq!(GeneratorBackend::Gateway.to_string(), "gateway");
        assert!("local".parse::<GeneratorBackend>().is_err());
    }
}
