mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    LogSettings, PartialSettings, RegistryBackend, RegistrySettings, ServerSettings, Settings,
};

/// Prefix for environment overrides, e.g. `SIGRELAY_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "SIGRELAY";

/// Loads configuration from `config/default` (if present) and the environment,
/// then merges whatever was found with the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;

    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}
