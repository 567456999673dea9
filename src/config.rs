use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KubernetesConfig {
    /// Path to a kubeconfig file. When unset, the in-cluster / inferred config is used.
    pub kubeconfig: Option<String>,
    /// Context to select from the kubeconfig file.
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Fixed partition for published snapshots; unset lets the partitioner choose.
    pub partition: Option<i32>,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_send_retries")]
    pub send_retries: u32,
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Buffered messages per partition worker before the consume loop waits.
    #[serde(default = "default_partition_queue_capacity")]
    pub partition_queue_capacity: usize,
    #[serde(default = "default_consume_backoff_initial_ms")]
    pub consume_backoff_initial_ms: u64,
    #[serde(default = "default_consume_backoff_max_ms")]
    pub consume_backoff_max_ms: u64,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brokers: default_brokers(),
            topic: default_topic(),
            partition: None,
            group_id: default_group_id(),
            session_timeout_ms: default_session_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            send_retries: default_send_retries(),
            compression: default_compression(),
            partition_queue_capacity: default_partition_queue_capacity(),
            consume_backoff_initial_ms: default_consume_backoff_initial_ms(),
            consume_backoff_max_ms: default_consume_backoff_max_ms(),
        }
    }
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".into()]
}

fn default_topic() -> String {
    "cluster-info".into()
}

fn default_group_id() -> String {
    "cluster-info-consumer".into()
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_heartbeat_interval_ms() -> u64 {
    3_000
}

fn default_send_retries() -> u32 {
    5
}

fn default_compression() -> String {
    "snappy".into()
}

fn default_partition_queue_capacity() -> usize {
    64
}

fn default_consume_backoff_initial_ms() -> u64 {
    500
}

fn default_consume_backoff_max_ms() -> u64 {
    30_000
}

const COMPRESSION_CODECS: &[&str] = &["none", "gzip", "snappy", "lz4", "zstd"];

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Snapshots captured longer ago than this are deleted. 0 disables the age policy.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Keep at most this many snapshots. 0 disables the count policy.
    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Upper bound on snapshots deleted per policy per tick (one transaction).
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_age_secs: default_max_age_secs(),
            max_snapshots: default_max_snapshots(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            delete_batch_size: default_delete_batch_size(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    7 * 24 * 3600
}

fn default_max_snapshots() -> u64 {
    100
}

fn default_cleanup_interval_secs() -> u64 {
    6 * 3600
}

fn default_delete_batch_size() -> u32 {
    50
}

fn default_vacuum_interval_secs() -> u64 {
    24 * 3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; RUST_LOG takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "json" or "text".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "json".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often the consumer logs pipeline stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config file {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );

        if self.kafka.enabled {
            anyhow::ensure!(
                self.kafka.brokers.iter().any(|b| !b.trim().is_empty()),
                "kafka.brokers must contain at least one address"
            );
            anyhow::ensure!(!self.kafka.topic.is_empty(), "kafka.topic must be non-empty");
            anyhow::ensure!(
                !self.kafka.group_id.is_empty(),
                "kafka.group_id must be non-empty"
            );
        }
        if let Some(partition) = self.kafka.partition {
            anyhow::ensure!(
                partition >= 0,
                "kafka.partition must be >= 0, got {}",
                partition
            );
        }
        anyhow::ensure!(
            self.kafka.heartbeat_interval_ms > 0
                && self.kafka.heartbeat_interval_ms < self.kafka.session_timeout_ms,
            "kafka.heartbeat_interval_ms must be > 0 and below session_timeout_ms ({}), got {}",
            self.kafka.session_timeout_ms,
            self.kafka.heartbeat_interval_ms
        );
        anyhow::ensure!(
            COMPRESSION_CODECS.contains(&self.kafka.compression.as_str()),
            "kafka.compression must be one of {:?}, got {:?}",
            COMPRESSION_CODECS,
            self.kafka.compression
        );
        anyhow::ensure!(
            self.kafka.partition_queue_capacity > 0,
            "kafka.partition_queue_capacity must be > 0"
        );
        anyhow::ensure!(
            self.kafka.consume_backoff_initial_ms > 0
                && self.kafka.consume_backoff_initial_ms <= self.kafka.consume_backoff_max_ms,
            "kafka.consume_backoff_initial_ms must be > 0 and <= consume_backoff_max_ms"
        );

        if self.retention.enabled {
            anyhow::ensure!(
                self.retention.cleanup_interval_secs > 0,
                "retention.cleanup_interval_secs must be > 0 when retention is enabled"
            );
            anyhow::ensure!(
                self.retention.delete_batch_size > 0,
                "retention.delete_batch_size must be > 0 when retention is enabled"
            );
            anyhow::ensure!(
                self.retention.vacuum_interval_secs > 0,
                "retention.vacuum_interval_secs must be > 0 when retention is enabled"
            );
        }
        if let Some(expr) = &self.retention.vacuum_schedule {
            cron::Schedule::from_str(expr).map_err(|e| {
                anyhow::anyhow!("retention.vacuum_schedule {:?} is not a valid cron expression: {}", expr, e)
            })?;
        }

        anyhow::ensure!(
            matches!(self.logging.format.as_str(), "json" | "text"),
            "logging.format must be \"json\" or \"text\", got {:?}",
            self.logging.format
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
