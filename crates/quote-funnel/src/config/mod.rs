use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the relay service and funnel clients.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub mail: MailSettings,
    pub delivery: DeliveryConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mail = MailSettings::from_env();
        let delivery = DeliveryConfig::from_env(&mail);
        let storage = StorageConfig {
            state_dir: non_empty_var("FUNNEL_STATE_DIR").map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            mail,
            delivery,
            storage,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Raw SMTP settings as found in the environment; any of them may be missing.
#[derive(Debug, Clone, Default)]
pub struct MailSettings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub to_email: Option<String>,
}

impl MailSettings {
    pub fn from_env() -> Self {
        Self {
            host: non_empty_var("SMTP_HOST"),
            port: non_empty_var("SMTP_PORT"),
            user: non_empty_var("SMTP_USER"),
            password: non_empty_var("SMTP_PASS").map(SecretString::from),
            to_email: non_empty_var("TO_EMAIL"),
        }
    }

    pub fn smtp_configured(&self) -> bool {
        self.host.is_some() && self.user.is_some()
    }

    pub fn to_email_configured(&self) -> bool {
        self.to_email.is_some()
    }

    /// Complete SMTP configuration, or the list of missing variables.
    pub fn resolve(&self) -> Result<MailConfig, ConfigError> {
        let mut missing = Vec::new();
        if self.host.is_none() {
            missing.push("SMTP_HOST");
        }
        if self.port.is_none() {
            missing.push("SMTP_PORT");
        }
        if self.user.is_none() {
            missing.push("SMTP_USER");
        }
        if self.password.is_none() {
            missing.push("SMTP_PASS");
        }
        if self.to_email.is_none() {
            missing.push("TO_EMAIL");
        }

        match (&self.host, &self.port, &self.user, &self.password, &self.to_email) {
            (Some(host), Some(port), Some(user), Some(password), Some(to_email)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidSmtpPort)?;
                Ok(MailConfig {
                    host: host.clone(),
                    port,
                    user: user.clone(),
                    password: password.clone(),
                    to_email: to_email.clone(),
                })
            }
            _ => Err(ConfigError::MissingMailSettings(missing)),
        }
    }
}

/// Validated SMTP relay configuration.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub to_email: String,
}

impl MailConfig {
    /// Port 465 speaks TLS from the first byte; everything else upgrades via STARTTLS.
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

pub const EMAILJS_SEND_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Templated e-mail service identifiers (EmailJS).
#[derive(Debug, Clone)]
pub struct EmailTemplateConfig {
    pub endpoint: String,
    pub public_key: Option<String>,
    pub service_id: Option<String>,
    pub template_id: Option<String>,
}

impl EmailTemplateConfig {
    /// Placeholder values shipped in sample configs count as missing.
    pub fn is_configured(&self) -> bool {
        [&self.public_key, &self.service_id, &self.template_id]
            .iter()
            .all(|value| match value {
                Some(value) => !value.is_empty() && !is_placeholder(value),
                None => false,
            })
    }
}

fn is_placeholder(value: &str) -> bool {
    value.starts_with("YOUR_") && value.ends_with("_HERE")
}

/// Where captured leads are delivered.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub email_template: EmailTemplateConfig,
    pub api_endpoint: Option<String>,
    /// Recipient of the manual `mailto:` fallback.
    pub fallback_email: String,
}

impl DeliveryConfig {
    fn from_env(mail: &MailSettings) -> Self {
        Self {
            email_template: EmailTemplateConfig {
                endpoint: non_empty_var("EMAILJS_ENDPOINT")
                    .unwrap_or_else(|| EMAILJS_SEND_ENDPOINT.to_string()),
                public_key: non_empty_var("EMAILJS_PUBLIC_KEY"),
                service_id: non_empty_var("EMAILJS_SERVICE_ID"),
                template_id: non_empty_var("EMAILJS_TEMPLATE_ID"),
            },
            api_endpoint: non_empty_var("QUOTE_API_ENDPOINT"),
            fallback_email: non_empty_var("QUOTE_FALLBACK_EMAIL")
                .or_else(|| mail.to_email.clone())
                .unwrap_or_default(),
        }
    }
}

/// Location of the durable funnel snapshot; `None` keeps it in memory.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSmtpPort,
    MissingMailSettings(Vec<&'static str>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSmtpPort => write!(f, "SMTP_PORT must be a valid u16"),
            ConfigError::MissingMailSettings(missing) => write!(
                f,
                "Missing required environment variables: {}",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSmtpPort
            | ConfigError::MissingMailSettings(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USER",
            "SMTP_PASS",
            "TO_EMAIL",
            "EMAILJS_ENDPOINT",
            "EMAILJS_PUBLIC_KEY",
            "EMAILJS_SERVICE_ID",
            "EMAILJS_TEMPLATE_ID",
            "QUOTE_API_ENDPOINT",
            "QUOTE_FALLBACK_EMAIL",
            "FUNNEL_STATE_DIR",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.mail.smtp_configured());
        assert!(!config.delivery.email_template.is_configured());
        assert_eq!(config.delivery.email_template.endpoint, EMAILJS_SEND_ENDPOINT);
        assert!(config.storage.state_dir.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3001));
    }

    #[test]
    fn mail_settings_report_every_missing_variable() {
        let settings = MailSettings {
            host: Some("smtp.gmail.com".to_string()),
            user: Some("me@example.ge".to_string()),
            ..MailSettings::default()
        };

        assert!(settings.smtp_configured());
        assert!(!settings.to_email_configured());
        match settings.resolve() {
            Err(ConfigError::MissingMailSettings(missing)) => {
                assert_eq!(missing, vec!["SMTP_PORT", "SMTP_PASS", "TO_EMAIL"])
            }
            other => panic!("expected missing settings, got {other:?}"),
        }
    }

    #[test]
    fn complete_mail_settings_resolve() {
        let settings = MailSettings {
            host: Some("smtp.example.ge".to_string()),
            port: Some("465".to_string()),
            user: Some("relay@example.ge".to_string()),
            password: Some(SecretString::from("hunter2".to_string())),
            to_email: Some("inbox@example.ge".to_string()),
        };

        let config = settings.resolve().expect("resolves");
        assert!(config.implicit_tls());
        assert_eq!(config.to_email, "inbox@example.ge");
    }

    #[test]
    fn placeholder_template_ids_are_not_configured() {
        let config = EmailTemplateConfig {
            endpoint: EMAILJS_SEND_ENDPOINT.to_string(),
            public_key: Some("YOUR_PUBLIC_KEY_HERE".to_string()),
            service_id: Some("service_abc".to_string()),
            template_id: Some("template_xyz".to_string()),
        };
        assert!(!config.is_configured());

        let config = EmailTemplateConfig {
            public_key: Some("pk_live".to_string()),
            ..config
        };
        assert!(config.is_configured());
    }

    #[test]
    fn fallback_email_defaults_to_relay_recipient() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TO_EMAIL", "inbox@example.ge");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.delivery.fallback_email, "inbox@example.ge");
        reset_env();
    }
}
