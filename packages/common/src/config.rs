use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: false.
    /// When disabled, publication events are delivered by an in-process task.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue carrying publication events to the notification consumer.
    /// Default: "publication_events".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
    /// Concurrent deliveries handled by the consumer. Default: 4.
    #[serde(default = "default_mq_concurrency")]
    pub concurrency: usize,
}

fn default_mq_enabled() -> bool {
    false
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "publication_events".into()
}
fn default_mq_concurrency() -> usize {
    4
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
            concurrency: default_mq_concurrency(),
        }
    }
}
