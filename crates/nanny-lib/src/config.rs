//! Nanny configuration
//!
//! Loaded once at startup from an optional file layered under `NANNY_*`
//! environment variables, then validated into an immutable [`Configuration`].

use crate::cluster::WorkloadRef;
use crate::estimator::{Estimator, ExponentialEstimator, LinearEstimator, DEFAULT_MIN_CLUSTER_SIZE};
use crate::quantity::{Quantity, QuantityError};
use crate::resources::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("{name} must be between 0 and 100, got {value}")]
    OffsetOutOfRange { name: &'static str, value: i64 },

    #[error("recommendation_offset ({recommendation}) must not exceed acceptance_offset ({acceptance})")]
    OffsetOrder { recommendation: i64, acceptance: i64 },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("no resources configured")]
    NoResources,

    #[error("resource {0} configured more than once")]
    DuplicateResource(String),

    #[error("invalid {field} for resource {resource}: {source}")]
    InvalidQuantity {
        resource: String,
        field: &'static str,
        #[source]
        source: QuantityError,
    },

    #[error("poll_period_secs must be greater than zero")]
    ZeroPollPeriod,
}

/// Estimation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    #[default]
    Linear,
    Exponential,
}

impl EstimatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::Linear => "linear",
            EstimatorKind::Exponential => "exponential",
        }
    }
}

/// One managed resource as written in the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    pub base: String,
    #[serde(default = "default_extra_per_node")]
    pub extra_per_node: String,
}

/// Raw configuration as loaded from file and environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NannyConfig {
    /// Namespace of the managed deployment
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Name of the managed deployment
    #[serde(default)]
    pub deployment: String,

    /// Container whose resources are managed
    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    /// Half-width of the recommended range, in percent of the node count
    #[serde(default = "default_recommendation_offset")]
    pub recommendation_offset: i64,

    /// Half-width of the acceptable range, in percent of the node count
    #[serde(default = "default_acceptance_offset")]
    pub acceptance_offset: i64,

    #[serde(default = "default_poll_period")]
    pub poll_period_secs: u64,

    #[serde(default)]
    pub estimator: EstimatorKind,

    /// Smallest node bucket of the exponential estimator
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: u64,

    #[serde(default)]
    pub dry_run: bool,

    /// Port for the health and metrics server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_namespace() -> String {
    std::env::var("MY_POD_NAMESPACE").unwrap_or_default()
}

fn default_container() -> String {
    "pod-nanny".to_string()
}

fn default_extra_per_node() -> String {
    "0".to_string()
}

fn default_recommendation_offset() -> i64 {
    10
}

fn default_acceptance_offset() -> i64 {
    20
}

fn default_poll_period() -> u64 {
    10
}

fn default_min_cluster_size() -> u64 {
    DEFAULT_MIN_CLUSTER_SIZE
}

fn default_api_port() -> u16 {
    8080
}

impl NannyConfig {
    /// Load from an optional file and `NANNY_*` environment variables
    ///
    /// Environment variables override the file, e.g. `NANNY_POLL_PERIOD_SECS=30`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config = builder
            .add_source(
                ::config::Environment::with_prefix("NANNY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check every field and build the runtime configuration
    pub fn validate(&self) -> Result<Configuration, ConfigError> {
        let recommendation_offset =
            check_offset("recommendation_offset", self.recommendation_offset)?;
        let acceptance_offset = check_offset("acceptance_offset", self.acceptance_offset)?;
        if recommendation_offset > acceptance_offset {
            return Err(ConfigError::OffsetOrder {
                recommendation: self.recommendation_offset,
                acceptance: self.acceptance_offset,
            });
        }

        for (name, value) in [
            ("namespace", &self.namespace),
            ("deployment", &self.deployment),
            ("container", &self.container),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if self.poll_period_secs == 0 {
            return Err(ConfigError::ZeroPollPeriod);
        }

        let resources = self.parse_resources()?;

        Ok(Configuration {
            workload: WorkloadRef {
                namespace: self.namespace.clone(),
                deployment: self.deployment.clone(),
                container: self.container.clone(),
            },
            resources,
            recommendation_offset,
            acceptance_offset,
            poll_period: Duration::from_secs(self.poll_period_secs),
            estimator: self.estimator,
            min_cluster_size: self.min_cluster_size,
            dry_run: self.dry_run,
        })
    }

    /// Parse only the estimation settings
    ///
    /// Used where no workload is involved, such as previewing envelopes.
    pub fn estimator_settings(&self) -> Result<Arc<dyn Estimator>, ConfigError> {
        let recommendation_offset =
            check_offset("recommendation_offset", self.recommendation_offset)?;
        let acceptance_offset = check_offset("acceptance_offset", self.acceptance_offset)?;
        let resources = self.parse_resources()?;
        Ok(build_estimator(
            self.estimator,
            resources,
            recommendation_offset,
            acceptance_offset,
            self.min_cluster_size,
        ))
    }

    fn parse_resources(&self) -> Result<Vec<Resource>, ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::NoResources);
        }

        let mut seen = HashSet::new();
        self.resources
            .iter()
            .map(|r| {
                let kind = ResourceKind::from_name(r.name.trim());
                if !seen.insert(kind.clone()) {
                    return Err(ConfigError::DuplicateResource(kind.to_string()));
                }
                let parse = |field: &'static str, value: &str| {
                    Quantity::parse(value).map_err(|source| ConfigError::InvalidQuantity {
                        resource: r.name.clone(),
                        field,
                        source,
                    })
                };
                Ok(Resource::new(
                    kind,
                    parse("base", &r.base)?,
                    parse("extra_per_node", &r.extra_per_node)?,
                ))
            })
            .collect()
    }
}

fn check_offset(name: &'static str, value: i64) -> Result<u32, ConfigError> {
    if (0..=100).contains(&value) {
        Ok(value as u32)
    } else {
        Err(ConfigError::OffsetOutOfRange { name, value })
    }
}

fn build_estimator(
    kind: EstimatorKind,
    resources: Vec<Resource>,
    recommendation_offset: u32,
    acceptance_offset: u32,
    min_cluster_size: u64,
) -> Arc<dyn Estimator> {
    match kind {
        EstimatorKind::Linear => Arc::new(LinearEstimator::new(
            resources,
            recommendation_offset,
            acceptance_offset,
        )),
        EstimatorKind::Exponential => Arc::new(ExponentialEstimator::new(
            resources,
            recommendation_offset,
            acceptance_offset,
            min_cluster_size,
        )),
    }
}

/// Validated, immutable process configuration
#[derive(Debug, Clone)]
pub struct Configuration {
    pub workload: WorkloadRef,
    pub resources: Vec<Resource>,
    pub recommendation_offset: u32,
    pub acceptance_offset: u32,
    pub poll_period: Duration,
    pub estimator: EstimatorKind,
    pub min_cluster_size: u64,
    pub dry_run: bool,
}

impl Configuration {
    pub fn build_estimator(&self) -> Arc<dyn Estimator> {
        build_estimator(
            self.estimator,
            self.resources.clone(),
            self.recommendation_offset,
            self.acceptance_offset,
            self.min_cluster_size,
        )
    }
}
