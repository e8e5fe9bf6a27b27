use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use binding::{
    Attribute, BindingIdentity, CoerceError, ConfigBinder, ConfigObject,
    ConfigurationBindingListener, ConfigurationMetadata, FromConfigValue, WarningsMonitor,
    parse_enum_variant,
};
use parking_lot::Mutex;
use url::Url;
use validator::Validate;

/// Builds the immutable property map a factory is constructed with.
pub fn properties(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error
}

impl FromConfigValue for LogLevel {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        parse_enum_variant(
            raw,
            &[
                ("INFO", Self::Info),
                ("WARN", Self::Warn),
                ("ERROR", Self::Error),
            ],
        )
    }
}

/// An opaque credential. Only strings carrying the `token:` scheme are
/// representable, which makes it handy for exercising invalid-value
/// diagnostics on security-sensitive attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl FromConfigValue for ApiToken {
    fn from_config_value(raw: &str) -> Result<Self, CoerceError> {
        match raw.strip_prefix("token:") {
            Some(secret) if !secret.is_empty() => Ok(Self(secret.to_string())),
            _ => Err(CoerceError::Invalid {
                target: "ApiToken",
                reason: "expected the token: scheme".to_string()
            })
        }
    }
}

/// HTTP server settings: an operative port name with two legacy aliases,
/// an enum-valued level, a deprecated tuning knob, and a defunct name.
#[derive(Debug, Validate)]
pub struct HttpServerConfig {
    #[validate(range(min = 1, max = 65535, message = "must be between 1 and 65535"))]
    pub port: u16,
    pub bind_address: String,
    pub log_level: LogLevel,
    pub accept_queue: u32
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            log_level: LogLevel::Info,
            accept_queue: 128
        }
    }
}

impl HttpServerConfig {
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_bind_address(&mut self, address: String) {
        self.bind_address = address;
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    pub fn set_accept_queue(&mut self, depth: u32) {
        self.accept_queue = depth;
    }
}

impl ConfigObject for HttpServerConfig {
    fn configuration_metadata() -> ConfigurationMetadata<Self> {
        ConfigurationMetadata::builder()
            .attribute(
                Attribute::new("Port", "http.port", Self::set_port)
                    .legacy("server.http-port")
                    .legacy("legacy.http"),
            )
            .attribute(Attribute::new(
                "BindAddress",
                "http.bind-address",
                Self::set_bind_address,
            ))
            .attribute(Attribute::new("LogLevel", "http.log-level", Self::set_log_level))
            .attribute(
                Attribute::new("AcceptQueue", "http.accept-queue", Self::set_accept_queue)
                    .deprecated(Some("0.9"), false),
            )
            .defunct(["http.so-linger"])
            .build()
    }
}

/// Credentials with a security-sensitive token whose raw value must never
/// surface in diagnostics.
#[derive(Debug, Default, Validate)]
pub struct CredentialsConfig {
    pub username: String,
    pub token: Option<ApiToken>
}

impl CredentialsConfig {
    pub fn set_username(&mut self, username: String) {
        self.username = username;
    }

    pub fn set_token(&mut self, token: Option<ApiToken>) {
        self.token = token;
    }
}

impl ConfigObject for CredentialsConfig {
    fn configuration_metadata() -> ConfigurationMetadata<Self> {
        ConfigurationMetadata::builder()
            .attribute(Attribute::new("Username", "auth.user", Self::set_username))
            .attribute(
                Attribute::new("Token", "auth.token", Self::set_token)
                    .legacy("auth.password")
                    .security_sensitive(),
            )
            .build()
    }
}

/// Worker pool settings, mainly exercised through named bindings and
/// layered defaults.
#[derive(Debug, Validate)]
pub struct WorkerConfig {
    #[validate(range(min = 1, max = 512, message = "must be between 1 and 512"))]
    pub threads: u32,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub queue: String
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            queue: "default".to_string()
        }
    }
}

impl WorkerConfig {
    pub fn set_threads(&mut self, threads: u32) {
        self.threads = threads;
    }

    pub fn set_queue(&mut self, queue: String) {
        self.queue = queue;
    }
}

impl ConfigObject for WorkerConfig {
    fn configuration_metadata() -> ConfigurationMetadata<Self> {
        ConfigurationMetadata::builder()
            .attribute(Attribute::new("Threads", "workers.threads", Self::set_threads))
            .attribute(Attribute::new("Queue", "workers.queue", Self::set_queue))
            .build()
    }
}

/// Collection-valued and URL-valued attributes.
#[derive(Debug, Default, Validate)]
pub struct ClusterConfig {
    pub hosts: Vec<String>,
    pub ports: HashSet<u16>,
    pub seed: Option<Url>
}

impl ClusterConfig {
    pub fn set_hosts(&mut self, hosts: Vec<String>) {
        self.hosts = hosts;
    }

    pub fn set_ports(&mut self, ports: HashSet<u16>) {
        self.ports = ports;
    }

    pub fn set_seed(&mut self, seed: Option<Url>) {
        self.seed = seed;
    }
}

impl ConfigObject for ClusterConfig {
    fn configuration_metadata() -> ConfigurationMetadata<Self> {
        ConfigurationMetadata::builder()
            .attribute(Attribute::new("Hosts", "cluster.hosts", Self::set_hosts))
            .attribute(Attribute::new("Ports", "cluster.ports", Self::set_ports))
            .attribute(Attribute::new("Seed", "cluster.seed", Self::set_seed))
            .build()
    }
}

/// Captures every warning delivered by the factory.
#[derive(Debug, Default)]
pub struct RecordingWarningsMonitor {
    warnings: Mutex<Vec<String>>
}

impl RecordingWarningsMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl WarningsMonitor for RecordingWarningsMonitor {
    fn on_warning(&self, message: &str) {
        self.warnings.lock().push(message.to_string());
    }
}

/// Records the config type of every binding it is notified about.
#[derive(Debug, Default)]
pub struct CountingListener {
    bound: Mutex<Vec<String>>
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bound_types(&self) -> Vec<String> {
        self.bound.lock().clone()
    }
}

impl ConfigurationBindingListener for CountingListener {
    fn configuration_bound(&self, binding: &BindingIdentity, _binder: &ConfigBinder) {
        self.bound.lock().push(binding.config_type().to_string());
    }
}
