use serde::Deserialize;

/// Top-level configuration for the relay.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub log: LogSettings,
}

/// Where the WebSocket server binds.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Which topic registry backend to open and how to scan it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RegistrySettings {
    pub backend: RegistryBackend,
    /// Directory of the sled database. Ignored by the memory backend.
    pub path: String,
    /// Number of topics fetched per scan page during disconnect cleanup.
    pub page_size: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Sled,
    Memory,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration as read from files or environment.
///
/// Every field is optional; missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub registry: Option<PartialRegistrySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialRegistrySettings {
    pub backend: Option<RegistryBackend>,
    pub path: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            registry: RegistrySettings {
                backend: RegistryBackend::Sled,
                path: "sigrelay_db".to_string(),
                page_size: 100,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from the defaults.
    pub fn merge_with_defaults(self) -> Settings {
        let default = Settings::default();
        let server = self.server.unwrap_or_default();
        let registry = self.registry.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            registry: RegistrySettings {
                backend: registry.backend.unwrap_or(default.registry.backend),
                path: registry.path.unwrap_or(default.registry.path),
                page_size: registry
                    .page_size
                    .unwrap_or(default.registry.page_size)
                    .max(1),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}
