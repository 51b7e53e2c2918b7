use std::{fmt, str::FromStr};

use crate::{
    accumulator::BatchAccumulator, byte_capacity::ByteCapacity, error::ConfigError,
    sender::Sender,
};

pub const CONNECTION_STRING_VAR: &str = "SERVICE_BUS_CONNECTION_STR";
pub const QUEUE_NAME_VAR: &str = "SERVICE_BUS_QUEUE_NAME";
pub const MAX_BATCH_SIZE_VAR: &str = "SERVICE_BUS_MAX_BATCH_SIZE";

/// Boundary configuration of a sending session, read once at startup
#[derive(Clone, Debug)]
pub struct Environment {
    pub(crate) options: EnvironmentOptions,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder(PartialOptions::default())
    }

    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Environment::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let connection_string = lookup(CONNECTION_STRING_VAR)
            .ok_or(ConfigError::MissingVariable(CONNECTION_STRING_VAR))?;
        let queue_name =
            lookup(QUEUE_NAME_VAR).ok_or(ConfigError::MissingVariable(QUEUE_NAME_VAR))?;

        let mut builder = Environment::builder()
            .connection_string(&connection_string)
            .queue_name(&queue_name);

        if let Some(max_batch_size) = lookup(MAX_BATCH_SIZE_VAR) {
            let capacity = max_batch_size
                .parse::<ByteCapacity>()
                .map_err(|err| ConfigError::InvalidValue {
                    variable: MAX_BATCH_SIZE_VAR,
                    reason: err.to_string(),
                })?;
            builder = builder.max_batch_size(capacity);
        }

        builder.build()
    }

    pub fn from_options(options: EnvironmentOptions) -> Result<Self, ConfigError> {
        if options.connection_string.is_empty() {
            return Err(ConfigError::MissingField("connection_string"));
        }
        if options.queue_name.is_empty() {
            return Err(ConfigError::MissingField("queue_name"));
        }
        if options.max_batch_size.bytes() == 0 {
            return Err(ConfigError::InvalidValue {
                variable: "max_batch_size",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(Environment { options })
    }

    /// Returns an accumulator bound to the configured batch ceiling
    pub fn accumulator<S: Sender>(&self, sender: S) -> BatchAccumulator<S> {
        BatchAccumulator::new(sender, self.options.max_batch_size.bytes())
    }

    pub fn connection_string(&self) -> &str {
        &self.options.connection_string
    }

    pub fn queue_name(&self) -> &str {
        &self.options.queue_name
    }

    pub fn max_batch_size(&self) -> ByteCapacity {
        self.options.max_batch_size
    }

    pub fn transport(&self) -> TransportType {
        self.options.transport
    }

    pub fn http_proxy(&self) -> Option<&str> {
        self.options.http_proxy.as_deref()
    }

    pub fn logging_enabled(&self) -> bool {
        self.options.logging
    }
}

#[derive(Default)]
struct PartialOptions {
    connection_string: Option<String>,
    queue_name: Option<String>,
    max_batch_size: Option<ByteCapacity>,
    transport: Option<TransportType>,
    http_proxy: Option<String>,
    logging: bool,
}

/// Builder for [`Environment`]
pub struct EnvironmentBuilder(PartialOptions);

impl EnvironmentBuilder {
    pub fn build(self) -> Result<Environment, ConfigError> {
        let options = EnvironmentOptions {
            connection_string: self
                .0
                .connection_string
                .ok_or(ConfigError::MissingField("connection_string"))?,
            queue_name: self
                .0
                .queue_name
                .ok_or(ConfigError::MissingField("queue_name"))?,
            max_batch_size: self.0.max_batch_size.unwrap_or_else(default_max_batch_size),
            transport: self.0.transport.unwrap_or_default(),
            http_proxy: self.0.http_proxy,
            logging: self.0.logging,
        };
        Environment::from_options(options)
    }

    pub fn connection_string(mut self, connection_string: &str) -> EnvironmentBuilder {
        self.0.connection_string = Some(connection_string.to_owned());
        self
    }

    pub fn queue_name(mut self, queue_name: &str) -> EnvironmentBuilder {
        self.0.queue_name = Some(queue_name.to_owned());
        self
    }

    pub fn max_batch_size(mut self, max_batch_size: ByteCapacity) -> EnvironmentBuilder {
        self.0.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn transport(mut self, transport: TransportType) -> EnvironmentBuilder {
        self.0.transport = Some(transport);
        self
    }

    pub fn http_proxy(mut self, http_proxy: Option<String>) -> EnvironmentBuilder {
        self.0.http_proxy = http_proxy;
        self
    }

    pub fn logging(mut self, enabled: bool) -> EnvironmentBuilder {
        self.0.logging = enabled;
        self
    }
}

fn default_max_batch_size() -> ByteCapacity {
    ByteCapacity::KB(256)
}

#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct EnvironmentOptions {
    pub(crate) connection_string: String,
    pub(crate) queue_name: String,
    #[cfg_attr(feature = "serde", serde(default = "default_max_batch_size"))]
    pub(crate) max_batch_size: ByteCapacity,
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) transport: TransportType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) http_proxy: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) logging: bool,
}

impl fmt::Debug for EnvironmentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentOptions")
            .field("connection_string", &"<redacted>")
            .field("queue_name", &self.queue_name)
            .field("max_batch_size", &self.max_batch_size)
            .field("transport", &self.transport)
            .field("http_proxy", &self.http_proxy)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Transport the external sender is expected to use. The accumulator never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TransportType {
    Amqp,
    #[default]
    AmqpOverWebsocket,
}

impl AsRef<str> for TransportType {
    fn as_ref(&self) -> &str {
        match self {
            TransportType::Amqp => "amqp",
            TransportType::AmqpOverWebsocket => "amqp-over-websocket",
        }
    }
}

impl FromStr for TransportType {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "amqp" => Ok(TransportType::Amqp),
            "amqp-over-websocket" | "websocket" => Ok(TransportType::AmqpOverWebsocket),
            other => Err(ConfigError::InvalidValue {
                variable: "transport",
                reason: format!("unknown transport '{}'", other),
            }),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}
