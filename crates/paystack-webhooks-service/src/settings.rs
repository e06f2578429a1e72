//! Configuration loading for the service binary.
//!
//! Sources (later sources override earlier ones):
//!  1. `/etc/paystack-webhooks/service.yaml`: system-wide defaults
//!  2. `./config/service.yaml`: deployment-local override
//!  3. the file named by `PSW_CONFIG_FILE`
//!  4. environment variables prefixed `PSW__` with `__` as the separator,
//!     e.g. `PSW__SERVER__PORT=9090` sets `server.port`
//!
//! Every field carries a serde default, so missing files produce the built-in
//! defaults. A malformed file or a value of the wrong type is an error.
//! List values such as `webhooks.allowed_ips` are read from files only.

use paystack_webhooks_api::ServiceConfig;
use tracing::info;

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "PSW_CONFIG_FILE";

const ENV_PREFIX: &str = "PSW";

/// Load the service configuration from all sources
///
/// `explicit_path` is required to exist when given.
pub fn load_config(explicit_path: Option<&str>) -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/paystack-webhooks/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(path) = explicit_path.filter(|path| !path.is_empty()) {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
        info!(path = %path, "Loading configuration from explicit path");
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
