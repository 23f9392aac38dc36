use serde::Deserialize;
use std::time::Duration;

const CONFIG_FILE: &str = "config/gios";
const ENV_PREFIX: &str = "GIOS";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub data_dir: String,
    pub export_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("api.base_url", "https://api.gios.gov.pl/pjp-api/rest")?
        .set_default("api.request_timeout_secs", 30)?
        .set_default("storage.data_dir", "data")?
        .set_default("storage.export_dir", "exports")?
        .set_default("server.bind", "0.0.0.0:8080")
}

/// Defaults, then `config/gios.*` if present, then `GIOS__SECTION__KEY` variables
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: AppConfig = builder().unwrap().build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.api.base_url, "https://api.gios.gov.pl/pjp-api/rest");
        assert_eq!(config.api.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.storage.export_dir, "exports");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [api]
            request_timeout_secs = 5

            [storage]
            export_dir = "/tmp/air"
        "#;
        let config: AppConfig = builder()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.storage.export_dir, "/tmp/air");
        assert_eq!(config.storage.data_dir, "data");
    }
}
