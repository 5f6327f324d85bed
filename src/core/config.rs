//! Pipeline configuration from YAML

use crate::core::context::{placeholders, BUILTIN_VARIABLES};
use crate::core::refs::Trigger;
use crate::core::rules::{EnvironmentRule, RefPattern, DEV_WEBHOOK_SECRET, PROD_WEBHOOK_SECRET};
use crate::core::Pipeline;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Image to build and push
    pub image: ImageConfig,

    /// Explicit registry login (absent = rely on an existing credential)
    #[serde(default)]
    pub registry_auth: Option<RegistryAuthConfig>,

    #[serde(default)]
    pub build: BuildConfig,

    /// Ordered ref → environment rules
    #[serde(default = "default_environments")]
    pub environments: Vec<EnvironmentConfig>,

    #[serde(default)]
    pub deploy: DeployConfig,

    /// User variables available to every template
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Image name and tag templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Registry host (e.g. `ghcr.io`)
    #[serde(default)]
    pub registry: Option<String>,

    /// Repository path within the registry
    pub repository: String,

    /// Tag templates rendered against the run context
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

impl ImageConfig {
    /// Registry host without trailing slashes; `None` when unset or blank
    pub fn registry_host(&self) -> Option<String> {
        self.registry
            .as_deref()
            .map(|registry| registry.trim().trim_end_matches('/'))
            .filter(|host| !host.is_empty())
            .map(str::to_string)
    }

    /// `registry/repository`, or the repository alone when no registry is set
    pub fn reference(&self) -> String {
        match self.registry_host() {
            Some(host) => format!("{}/{}", host, self.repository),
            None => self.repository.clone(),
        }
    }
}

/// Names of the environment variables holding the registry credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryAuthConfig {
    pub username_env: String,
    pub password_env: String,
}

/// Image build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub enabled: bool,
    pub context: String,
    pub dockerfile: String,
    pub platforms: Vec<String>,

    /// Build arguments; values are templates
    pub build_args: BTreeMap<String, String>,

    /// Push to the registry (otherwise load into the local daemon)
    pub push: bool,

    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context: ".".to_string(),
            dockerfile: "Dockerfile".to_string(),
            platforms: Vec::new(),
            build_args: BTreeMap::new(),
            push: true,
            timeout_secs: 1800,
        }
    }
}

/// Environment rule as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Environment label
    pub name: String,

    /// Ref (or regex when `use_regex`) selecting this environment
    #[serde(rename = "ref")]
    pub git_ref: String,

    /// Secret holding the webhook URL for this environment
    pub webhook_secret: String,

    #[serde(default)]
    pub use_regex: bool,
}

/// What the deploy stage does when no environment matches the ref
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedRefPolicy {
    /// Skip the deploy stage
    #[default]
    Skip,
    /// Fail the deploy stage
    Fail,
}

/// Webhook dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub enabled: bool,
    pub on_unmatched_ref: UnmatchedRefPolicy,
    pub timeout_secs: u64,

    /// Extra payload fields; values are templates
    pub payload: BTreeMap<String, String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_unmatched_ref: UnmatchedRefPolicy::Skip,
            timeout_secs: 60,
            payload: BTreeMap::new(),
        }
    }
}

fn default_tags() -> Vec<String> {
    vec!["{{ branch_tag }}".to_string(), "{{ short_sha }}".to_string()]
}

fn default_environments() -> Vec<EnvironmentConfig> {
    vec![
        EnvironmentConfig {
            name: "prod".to_string(),
            git_ref: "refs/heads/main".to_string(),
            webhook_secret: PROD_WEBHOOK_SECRET.to_string(),
            use_regex: false,
        },
        EnvironmentConfig {
            name: "dev".to_string(),
            git_ref: "refs/heads/develop".to_string(),
            webhook_secret: DEV_WEBHOOK_SECRET.to_string(),
            use_regex: false,
        },
    ]
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }
        if self.image.repository.trim().is_empty() {
            anyhow::bail!("image.repository must not be empty");
        }
        if self.image.tags.is_empty() {
            anyhow::bail!("image.tags must contain at least one tag");
        }

        if self.build.timeout_secs == 0 {
            anyhow::bail!("build.timeout_secs must be greater than zero");
        }
        if self.deploy.timeout_secs == 0 {
            anyhow::bail!("deploy.timeout_secs must be greater than zero");
        }

        if let Some(auth) = &self.registry_auth {
            if auth.username_env.trim().is_empty() || auth.password_env.trim().is_empty() {
                anyhow::bail!("registry_auth must name both username_env and password_env");
            }
        }

        // Environment names must be unique
        let mut seen = HashSet::new();
        for env in &self.environments {
            if !seen.insert(&env.name) {
                anyhow::bail!("Duplicate environment: {}", env.name);
            }
            if env.webhook_secret.trim().is_empty() {
                anyhow::bail!("Environment '{}' has an empty webhook_secret", env.name);
            }
            if env.use_regex {
                Regex::new(&env.git_ref).with_context(|| {
                    format!("Environment '{}' has an invalid ref pattern", env.name)
                })?;
            }
        }

        self.check_templates()
    }

    /// Every placeholder must name a built-in or a declared variable
    fn check_templates(&self) -> Result<()> {
        let known: HashSet<&str> = BUILTIN_VARIABLES
            .iter()
            .copied()
            .chain(self.variables.keys().map(String::as_str))
            .collect();

        let templates = self
            .image
            .tags
            .iter()
            .map(|t| ("image.tags", t))
            .chain(self.build.build_args.values().map(|t| ("build.build_args", t)))
            .chain(self.deploy.payload.values().map(|t| ("deploy.payload", t)));

        for (section, template) in templates {
            for name in placeholders(template) {
                if !known.contains(name.as_str()) {
                    anyhow::bail!("{} references unknown variable '{}'", section, name);
                }
            }
        }

        Ok(())
    }

    /// Compile environment rules in declaration order
    pub fn environment_rules(&self) -> Result<Vec<EnvironmentRule>> {
        self.environments
            .iter()
            .map(|env| -> Result<EnvironmentRule> {
                let pattern = if env.use_regex {
                    RefPattern::Regex(Regex::new(&env.git_ref)?)
                } else {
                    RefPattern::Exact(env.git_ref.clone())
                };
                Ok(EnvironmentRule {
                    name: env.name.clone(),
                    pattern,
                    webhook_secret: env.webhook_secret.clone(),
                })
            })
            .collect()
    }

    /// Names of every secret the deploy stage may read
    pub fn webhook_secret_names(&self) -> Vec<String> {
        self.environments
            .iter()
            .map(|env| env.webhook_secret.clone())
            .collect()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self, trigger: Trigger) -> Result<Pipeline> {
        Pipeline::from_config(self, trigger)
    }
}
