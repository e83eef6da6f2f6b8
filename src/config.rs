//! Configuration for the chatbot, sourced from the environment.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ChatbotError, ChatbotResult};

/// Prefix shared by every environment variable the chatbot reads.
pub const ENV_PREFIX: &str = "RAG_CHATBOT_";

/// Default seconds between ingestion status checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
/// Default ceiling on the total ingestion wait.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;
/// Default number of user/assistant exchanges kept per conversation.
pub const DEFAULT_MAX_MESSAGES: usize = 10;
/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8501;
/// Default number of conversations held in memory at once.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;
/// Default idle time after which a conversation is dropped.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;
/// Default directory holding the interactive page.
const DEFAULT_STATIC_DIR: &str = "static";

/// AWS credentials handed to every client.
#[derive(Clone)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Identifiers of the remote resources the chatbot works against.
#[derive(Clone, Debug)]
pub struct KnowledgeBaseTarget {
    /// Bucket receiving uploaded documents.
    pub bucket: String,
    /// Knowledge base id.
    pub knowledge_base_id: String,
    /// Data source id synced by ingestion jobs.
    pub data_source_id: String,
    /// Model ARN used for retrieve-and-generate.
    pub model_arn: String,
}

/// Ingestion polling settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between two status checks.
    pub interval: Duration,
    /// Ceiling on the total wait.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    /// Maximum number of status checks: `ceil(timeout / interval)`.
    #[must_use]
    pub fn max_ticks(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        let ticks = self.timeout.as_millis().div_ceil(interval);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// Bounds on the in-memory conversation table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    /// Conversations kept at once; the least recently used goes first.
    pub max_sessions: usize,
    /// Conversations untouched for longer than this are dropped.
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

/// Complete, validated application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Credentials for every AWS client.
    pub credentials: AwsCredentials,
    /// Region for storage and ingestion control.
    pub region: String,
    /// Region for the inference runtime.
    pub inference_region: String,
    /// Remote resource identifiers.
    pub target: KnowledgeBaseTarget,
    /// Ingestion polling.
    pub poll: PollConfig,
    /// Exchanges kept per conversation.
    pub max_messages: usize,
    /// Conversation table bounds.
    pub sessions: SessionLimits,
    /// HTTP port.
    pub port: u16,
    /// Directory served as the interactive page.
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigurationMissing` for an absent required variable and
    /// `InvalidConfig` for an unusable value.
    pub fn from_env() -> ChatbotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ChatbotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let region = vars.required("REGION")?;
        let inference_region = vars.optional("INFERENCE_REGION").unwrap_or_else(|| region.clone());

        let config = Self {
            credentials: AwsCredentials {
                access_key_id: vars.required("AWS_ACCESS_KEY_ID")?,
                secret_access_key: vars.required("AWS_SECRET_ACCESS_KEY")?,
            },
            region,
            inference_region,
            target: KnowledgeBaseTarget {
                bucket: vars.required("BUCKET")?,
                knowledge_base_id: vars.required("KNOWLEDGE_BASE_ID")?,
                data_source_id: vars.required("DATA_SOURCE_ID")?,
                model_arn: vars.required("MODEL_ARN")?,
            },
            poll: PollConfig {
                interval: Duration::from_secs(
                    vars.parsed("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?,
                ),
                timeout: Duration::from_secs(
                    vars.parsed("POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?,
                ),
            },
            max_messages: vars.parsed("MAX_MESSAGES", DEFAULT_MAX_MESSAGES)?,
            sessions: SessionLimits {
                max_sessions: vars.parsed("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?,
                idle_timeout: Duration::from_secs(
                    vars.parsed("SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?,
                ),
            },
            port: vars.parsed("PORT", DEFAULT_PORT)?,
            static_dir: vars
                .optional("STATIC_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR), PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range.
    pub fn validate(&self) -> ChatbotResult<()> {
        if self.poll.interval.is_zero() {
            return Err(ChatbotError::InvalidConfig(
                "poll interval must be > 0".to_string(),
            ));
        }

        if self.poll.timeout < self.poll.interval {
            return Err(ChatbotError::InvalidConfig(
                "poll timeout must be >= poll interval".to_string(),
            ));
        }

        if self.max_messages == 0 {
            return Err(ChatbotError::InvalidConfig(
                "max messages must be > 0".to_string(),
            ));
        }

        if self.sessions.max_sessions == 0 {
            return Err(ChatbotError::InvalidConfig(
                "max sessions must be > 0".to_string(),
            ));
        }

        if self.sessions.idle_timeout.is_zero() {
            return Err(ChatbotError::InvalidConfig(
                "session idle timeout must be > 0".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ChatbotError::InvalidConfig("port must be > 0".to_string()));
        }

        if !self.target.model_arn.starts_with("arn:") {
            return Err(ChatbotError::InvalidConfig(format!(
                "model reference `{}` is not an ARN",
                self.target.model_arn
            )));
        }

        Ok(())
    }
}

/// Prefixed variable access.
struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> ChatbotResult<String> {
        self.optional(name)
            .ok_or_else(|| ChatbotError::ConfigurationMissing(format!("{ENV_PREFIX}{name}")))
    }

    fn parsed<T>(&self, name: &str, default: T) -> ChatbotResult<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e| {
                ChatbotError::InvalidConfig(format!("{ENV_PREFIX}{name}=`{raw}`: {e}"))
            }),
        }
    }
}
