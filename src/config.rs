use std::env;

use crate::error::ConfigError;
use crate::publisher::BatchSettings;

const TOPIC_ARN: &str = "TOPIC_ARN";
const PUBLISH_MAX_MESSAGES: &str = "PUBLISH_MAX_MESSAGES";
const PUBLISH_MAX_BYTES: &str = "PUBLISH_MAX_BYTES";
const WORKER_COUNT: &str = "WORKER_COUNT";

// Largest vCPU count a Lambda function can be given
const MAX_WORKERS: usize = 6;

/// Everything the function reads from its environment at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub topic_arn: String,
    pub batch: BatchSettings,
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let topic_arn = lookup(TOPIC_ARN)
            .map(|arn| arn.trim().to_string())
            .filter(|arn| !arn.is_empty())
            .ok_or(ConfigError::Missing(TOPIC_ARN))?;

        let defaults = BatchSettings::default();
        let max_messages = read_number(&lookup, PUBLISH_MAX_MESSAGES)?
            .unwrap_or(defaults.max_messages);
        let max_bytes = read_number(&lookup, PUBLISH_MAX_BYTES)?
            .unwrap_or(defaults.max_bytes);

        Ok(Config {
            topic_arn,
            batch: BatchSettings::new(max_messages, max_bytes),
            workers: worker_count(&lookup),
        })
    }
}

fn read_number(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

// Worker count from env var or detected CPUs, clamped to 1-6
fn worker_count(lookup: &impl Fn(&str) -> Option<String>) -> usize {
    if let Some(count) = lookup(WORKER_COUNT).and_then(|s| s.trim().parse::<usize>().ok()) {
        return count.clamp(1, MAX_WORKERS);
    }
    num_cpus::get().clamp(1, MAX_WORKERS)
}
