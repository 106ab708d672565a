use std::fmt;
use std::str::FromStr;

use anyhow::Context;

/// Deployment environment. Controls cookie security flags and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "development" => Ok(Environment::Development),
            other => anyhow::bail!("unknown environment '{other}'"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
    pub cookie_expires_days: i64,
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from_name: String,
    pub from_address: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.smtp_username.is_some() && self.smtp_password.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Process configuration, loaded once at startup and passed explicitly.
/// `DATABASE_URL` and `JWT_SECRET` are required; everything else has a
/// development-friendly default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub public_url: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub query: QueryConfig,
    pub email: EmailConfig,
    pub checkout: CheckoutConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = parse_env("APP_ENV", Environment::Development)?;
        let port = parse_env("PORT", 3000u16)?;
        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10u32)?,
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            expires_in_hours: parse_env("JWT_EXPIRES_IN_HOURS", 24i64 * 90)?,
            cookie_expires_days: parse_env("JWT_COOKIE_EXPIRES_DAYS", 90i64)?,
        };

        let query = QueryConfig {
            default_page_size: parse_env("QUERY_DEFAULT_PAGE_SIZE", 100i64)?,
            max_page_size: parse_env("QUERY_MAX_PAGE_SIZE", 100i64)?,
        };

        let email = EmailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok(),
            smtp_port: parse_env("SMTP_PORT", 587u16)?,
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            from_name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| "Trailhead".to_string()),
            from_address: std::env::var("EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "hello@trailhead.example".to_string()),
        };

        let checkout = CheckoutConfig {
            endpoint: std::env::var("CHECKOUT_ENDPOINT").ok(),
            api_key: std::env::var("CHECKOUT_API_KEY").ok(),
            currency: std::env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{public_url}/my-bookings")),
            cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| public_url.clone()),
        };

        Ok(Self {
            environment,
            port,
            public_url,
            database,
            jwt,
            query,
            email,
            checkout,
        })
    }
}

fn parse_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name} '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn email_config_requires_full_credentials() {
        let mut config = EmailConfig {
            smtp_host: Some("smtp.example.com".into()),
            smtp_port: 587,
            smtp_username: Some("user".into()),
            smtp_password: Some("pass".into()),
            from_name: "Trailhead".into(),
            from_address: "hello@trailhead.example".into(),
        };
        assert!(config.is_configured());

        config.smtp_password = None;
        assert!(!config.is_configured());
    }
}
