//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the provider.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the provider.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// HTTP listener serving the generated document.
    pub listener: ListenerConfig,

    /// Cluster management endpoint.
    pub cluster: ClusterConfig,

    /// Poll cycle settings.
    pub poll: PollConfig,

    /// Cluster API passthrough.
    pub passthrough: PassthroughConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Cluster management API settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the HTTP gateway.
    pub endpoint: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// `api-version` query parameter sent with every call.
    pub api_version: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:19080/".to_string(),
            timeout_secs: 5,
            api_version: "6.0".to_string(),
        }
    }
}

/// Poll cycle settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between the end of one poll and the start of the next.
    pub interval_secs: u64,

    /// File the YAML document is written to after each successful poll.
    pub output_path: Option<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            output_path: None,
        }
    }
}

/// GET passthrough to the cluster management API.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PassthroughConfig {
    pub enabled: bool,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Timeout configuration for served requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format (pretty, compact, json).
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.cluster.endpoint, "http://localhost:19080/");
        assert_eq!(config.cluster.timeout_secs, 5);
        assert_eq!(config.poll.interval_secs, 10);
        assert!(config.poll.output_path.is_none());
        assert!(config.passthrough.enabled);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProviderConfig = toml::from_str(
            r#"
            [poll]
            interval_secs = 30
            output_path = "/etc/traefik/dynamic/fabric.yaml"

            [cluster]
            endpoint = "https://cluster.example:19080/"
            "#,
        )
        .unwrap();
        assert_eq!(config.poll.interval_secs, 30);
        assert_eq!(
            config.poll.output_path.as_deref(),
            Some("/etc/traefik/dynamic/fabric.yaml")
        );
        assert_eq!(config.cluster.endpoint, "https://cluster.example:19080/");
        assert_eq!(config.cluster.api_version, "6.0");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
