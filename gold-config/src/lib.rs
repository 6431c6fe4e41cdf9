use config::{Config, Environment};
use gold_core::{
    ChatConfig, ExchangeConfig, MonitorConfig, MonitorError, Result, ServerConfig, TlsConfig,
    DEFAULT_HTTPS_PORT, DEFAULT_INSTRUMENT, DEFAULT_OKX_BASE_URL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MODEL, DEFAULT_STATIC_DIR, DEFAULT_TEMPERATURE,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variables the server understands.
pub const RECOGNIZED_VARS: &[&str] = &[
    "PORT",
    "HTTPS_PORT",
    "STATIC_DIR",
    "OKX_INSTRUMENT",
    "OKX_BASE_URL",
    "TLS_KEY_FILE",
    "TLS_CERT_FILE",
    "TLS_PASSPHRASE",
    "TLS_CA_FILE",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OPENAI_MODEL",
    "OPENAI_TEMPERATURE",
];

/// Raw string settings as they come out of the environment. Keys are the
/// lower-cased variable names.
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    port: Option<String>,
    https_port: Option<String>,
    static_dir: Option<String>,
    okx_instrument: Option<String>,
    okx_base_url: Option<String>,
    tls_key_file: Option<String>,
    tls_cert_file: Option<String>,
    tls_passphrase: Option<String>,
    tls_ca_file: Option<String>,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    openai_temperature: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_port(value: Option<&str>) -> Option<u16> {
    value
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|port| *port > 0)
}

impl RawSettings {
    fn resolve(self) -> MonitorConfig {
        let http_port = parse_port(self.port.as_deref());
        let https_port = parse_port(self.https_port.as_deref())
            .or(http_port)
            .unwrap_or(DEFAULT_HTTPS_PORT);

        let server = ServerConfig {
            http_port,
            https_port,
            static_dir: PathBuf::from(
                non_empty(self.static_dir).unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            ),
        };

        let exchange = ExchangeConfig {
            instrument: non_empty(self.okx_instrument)
                .unwrap_or_else(|| DEFAULT_INSTRUMENT.to_string()),
            base_url: non_empty(self.okx_base_url)
                .unwrap_or_else(|| DEFAULT_OKX_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            ..ExchangeConfig::default()
        };

        let temperature = match self.openai_temperature.as_deref().map(str::trim) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => value,
                _ => {
                    warn!(value = raw, "OPENAI_TEMPERATURE is not a number, using default");
                    DEFAULT_TEMPERATURE
                }
            },
            None => DEFAULT_TEMPERATURE,
        };

        let chat = ChatConfig {
            api_key: non_empty(self.openai_api_key),
            base_url: non_empty(self.openai_base_url)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: non_empty(self.openai_model).unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            temperature,
            ..ChatConfig::default()
        };

        let tls = match (non_empty(self.tls_key_file), non_empty(self.tls_cert_file)) {
            (Some(key_file), Some(cert_file)) => Some(TlsConfig {
                key_file: PathBuf::from(key_file),
                cert_file: PathBuf::from(cert_file),
                passphrase: non_empty(self.tls_passphrase),
                ca_files: self
                    .tls_ca_file
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(PathBuf::from)
                    .collect(),
            }),
            _ => None,
        };

        MonitorConfig {
            server,
            exchange,
            chat,
            tls,
        }
    }
}

pub struct ConfigManager {
    monitor_config: MonitorConfig,
}

impl ConfigManager {
    /// Read the recognized variables from the process environment.
    pub fn from_env() -> Result<Self> {
        let vars = std::env::vars().filter(|(key, _)| RECOGNIZED_VARS.contains(&key.as_str()));
        let manager = Self::from_vars(vars)?;

        info!("Configuration loaded from environment");
        Ok(manager)
    }

    /// Build from an explicit set of variables instead of the process
    /// environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let config = Config::builder()
            .add_source(Environment::default().ignore_empty(true).source(Some(source)))
            .build()
            .map_err(|e| MonitorError::Configuration(e.to_string()))?;

        let raw: RawSettings = config
            .try_deserialize()
            .map_err(|e| MonitorError::Configuration(e.to_string()))?;

        Ok(Self {
            monitor_config: raw.resolve(),
        })
    }

    pub fn get_config(&self) -> &MonitorConfig {
        &self.monitor_config
    }

    pub fn get_config_mut(&mut self) -> &mut MonitorConfig {
        &mut self.monitor_config
    }

    pub fn into_config(self) -> MonitorConfig {
        self.monitor_config
    }

    pub fn validate(&self) -> Result<()> {
        let config = &self.monitor_config;

        if config.exchange.instrument.trim().is_empty() {
            return Err(MonitorError::Configuration(
                "No OKX instrument configured".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&config.chat.temperature) {
            return Err(MonitorError::Configuration(format!(
                "OPENAI_TEMPERATURE must be between 0 and 2, got {}",
                config.chat.temperature
            )));
        }

        if config.chat.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; /api/chat will answer 500");
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> MonitorConfig {
        ConfigManager::from_vars(vars.iter().copied())
            .unwrap()
            .into_config()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load(&[]);

        assert_eq!(config.server.http_port, None);
        assert_eq!(config.server.https_port, 3443);
        assert_eq!(config.server.static_dir, PathBuf::from("public"));
        assert_eq!(config.exchange.instrument, "XAUT-USDT");
        assert_eq!(config.chat.api_key, None);
        assert_eq!(config.chat.base_url, "https://api.openai.com/v1");
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.chat.temperature, 0.3);
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("OKX_INSTRUMENT", "BTC-USDT"),
            ("OPENAI_API_KEY", "sk-live"),
            ("OPENAI_BASE_URL", "https://llm.internal/v1//"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_TEMPERATURE", "0.9"),
        ]);

        assert_eq!(config.server.http_port, Some(8080));
        // HTTPS_PORT falls back to PORT before the default
        assert_eq!(config.server.https_port, 8080);
        assert_eq!(config.exchange.instrument, "BTC-USDT");
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-live"));
        assert_eq!(config.chat.completions_url(), "https://llm.internal/v1/chat/completions");
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.temperature, 0.9);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("PORT", "0"),
            ("HTTPS_PORT", "not-a-port"),
            ("OPENAI_TEMPERATURE", "warm"),
            ("OPENAI_API_KEY", ""),
        ]);

        assert_eq!(config.server.http_port, None);
        assert_eq!(config.server.https_port, 3443);
        assert_eq!(config.chat.temperature, 0.3);
        assert_eq!(config.chat.api_key, None);
    }

    #[test]
    fn test_tls_requires_key_and_cert() {
        let config = load(&[("TLS_KEY_FILE", "certs/key.pem")]);
        assert!(config.tls.is_none());

        let config = load(&[
            ("TLS_KEY_FILE", "certs/key.pem"),
            ("TLS_CERT_FILE", "certs/cert.pem"),
            ("TLS_CA_FILE", " certs/ca1.pem, ,certs/ca2.pem "),
            ("HTTPS_PORT", "8443"),
        ]);
        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_file, PathBuf::from("certs/cert.pem"));
        assert_eq!(
            tls.ca_files,
            vec![PathBuf::from("certs/ca1.pem"), PathBuf::from("certs/ca2.pem")]
        );
        assert!(tls.passphrase.is_none());
        assert_eq!(config.server.https_port, 8443);
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let manager = ConfigManager::from_vars([("OPENAI_TEMPERATURE", "3.5")]).unwrap();
        assert!(matches!(
            manager.validate(),
            Err(MonitorError::Configuration(_))
        ));

        let manager = ConfigManager::from_vars([("OPENAI_TEMPERATURE", "1.0")]).unwrap();
        assert!(manager.validate().is_ok());
    }
}
