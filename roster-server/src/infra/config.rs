use std::{env, fmt, str::FromStr, time::Duration};

use anyhow::{Context, anyhow, bail};

const DEV_JWT_SECRET: &str = "change-me-jwt-secret";
const DEV_PASSWORD_PEPPER: &str = "change-me-password-pepper";

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    /// `None` selects the in-memory user store.
    pub database_url: Option<String>,

    // Token settings
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    pub auth_password_pepper: String,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,

    pub registration_role_policy: RegistrationRolePolicy,

    // Development settings
    pub dev_mode: bool,

    pub bootstrap_superuser: Option<BootstrapSuperuser>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("registration_role_policy", &self.registration_role_policy)
            .field("dev_mode", &self.dev_mode)
            .finish_non_exhaustive()
    }
}

/// How `POST /api/register/` treats a requested role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationRolePolicy {
    /// Anything other than Employee is rejected.
    #[default]
    EmployeeOnly,
    /// The requested role is honored, Admin included.
    CallerSupplied,
}

impl RegistrationRolePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationRolePolicy::EmployeeOnly => "employee-only",
            RegistrationRolePolicy::CallerSupplied => "caller-supplied",
        }
    }
}

impl FromStr for RegistrationRolePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee-only" => Ok(RegistrationRolePolicy::EmployeeOnly),
            "caller-supplied" => Ok(RegistrationRolePolicy::CallerSupplied),
            other => Err(anyhow!(
                "unknown registration role policy '{other}' (expected employee-only or caller-supplied)"
            )),
        }
    }
}

/// Superuser created at `serve` start when absent.
#[derive(Clone)]
pub struct BootstrapSuperuser {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl fmt::Debug for BootstrapSuperuser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapSuperuser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset and blank values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dev_mode = match get("DEV_MODE") {
            Some(raw) => parse_bool(&raw).with_context(|| format!("DEV_MODE={raw}"))?,
            None => false,
        };

        let server_port = match get("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid SERVER_PORT '{raw}'"))?,
            None => 8000,
        };

        let access_token_ttl = parse_ttl(get("ACCESS_TOKEN_TTL"), "ACCESS_TOKEN_TTL", "5m")?;
        let refresh_token_ttl = parse_ttl(get("REFRESH_TOKEN_TTL"), "REFRESH_TOKEN_TTL", "1day")?;

        let registration_role_policy = get("REGISTRATION_ROLE_POLICY")
            .map(|raw| raw.parse::<RegistrationRolePolicy>())
            .transpose()?
            .unwrap_or_default();

        let bootstrap_superuser = match (
            get("BOOTSTRAP_SUPERUSER_USERNAME"),
            get("BOOTSTRAP_SUPERUSER_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapSuperuser {
                username,
                email: get("BOOTSTRAP_SUPERUSER_EMAIL"),
                password,
            }),
            (None, None) => None,
            _ => bail!(
                "BOOTSTRAP_SUPERUSER_USERNAME and BOOTSTRAP_SUPERUSER_PASSWORD must be set together"
            ),
        };

        let config = Self {
            server_host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port,
            database_url: get("DATABASE_URL"),
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            access_token_ttl,
            refresh_token_ttl,
            auth_password_pepper: get("AUTH_PASSWORD_PEPPER")
                .unwrap_or_else(|| DEV_PASSWORD_PEPPER.to_string()),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000,http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            registration_role_policy,
            dev_mode,
            bootstrap_superuser,
        };

        config.ensure_secrets()?;
        Ok(config)
    }

    /// Refuse the built-in development secrets outside `DEV_MODE`.
    pub fn ensure_secrets(&self) -> anyhow::Result<()> {
        if self.dev_mode {
            return Ok(());
        }
        if self.jwt_secret == DEV_JWT_SECRET {
            bail!("JWT_SECRET must be set unless DEV_MODE=true");
        }
        if self.auth_password_pepper == DEV_PASSWORD_PEPPER {
            bail!("AUTH_PASSWORD_PEPPER must be set unless DEV_MODE=true");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{other}'")),
    }
}

fn parse_ttl(raw: Option<String>, key: &str, default: &str) -> anyhow::Result<Duration> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    let ttl = humantime::parse_duration(raw.trim())
        .with_context(|| format!("invalid {key} '{raw}'"))?;
    if ttl.is_zero() {
        bail!("{key} must be greater than zero");
    }
    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn dev_mode_uses_defaults() {
        let config = load(&[("DEV_MODE", "true")]).unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8000);
        assert!(config.database_url.is_none());
        assert_eq!(config.access_token_ttl, Duration::from_secs(300));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(86_400));
        assert_eq!(
            config.registration_role_policy,
            RegistrationRolePolicy::EmployeeOnly
        );
        assert!(config.bootstrap_superuser.is_none());
    }

    #[test]
    fn refuses_default_secrets_outside_dev_mode() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = load(&[("JWT_SECRET", "s3cret")]).unwrap_err();
        assert!(err.to_string().contains("AUTH_PASSWORD_PEPPER"));

        let config = load(&[("JWT_SECRET", "s3cret"), ("AUTH_PASSWORD_PEPPER", "pep")]).unwrap();
        assert!(!config.dev_mode);
    }

    #[test]
    fn parses_overrides() {
        let config = load(&[
            ("DEV_MODE", "1"),
            ("SERVER_PORT", "9090"),
            ("ACCESS_TOKEN_TTL", "90s"),
            ("REFRESH_TOKEN_TTL", "2h"),
            ("REGISTRATION_ROLE_POLICY", "caller-supplied"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("DATABASE_URL", "postgres://localhost/roster"),
        ])
        .unwrap();
        assert_eq!(config.server_port, 9090);
        assert_eq!(config.access_token_ttl, Duration::from_secs(90));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(7200));
        assert_eq!(
            config.registration_role_policy,
            RegistrationRolePolicy::CallerSupplied
        );
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
        assert!(config.database_url.is_some());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("DEV_MODE", "true"), ("SERVER_PORT", "http")]).is_err());
        assert!(load(&[("DEV_MODE", "true"), ("ACCESS_TOKEN_TTL", "soon")]).is_err());
        assert!(load(&[("DEV_MODE", "true"), ("ACCESS_TOKEN_TTL", "0s")]).is_err());
        assert!(load(&[("DEV_MODE", "true"), ("REGISTRATION_ROLE_POLICY", "anyone")]).is_err());
        assert!(load(&[("DEV_MODE", "maybe")]).is_err());
    }

    #[test]
    fn bootstrap_superuser_needs_username_and_password() {
        let config = load(&[
            ("DEV_MODE", "true"),
            ("BOOTSTRAP_SUPERUSER_USERNAME", "root"),
            ("BOOTSTRAP_SUPERUSER_PASSWORD", "hunter"),
            ("BOOTSTRAP_SUPERUSER_EMAIL", "root@example.com"),
        ])
        .unwrap();
        let bootstrap = config.bootstrap_superuser.unwrap();
        assert_eq!(bootstrap.username, "root");
        assert_eq!(bootstrap.email.as_deref(), Some("root@example.com"));

        assert!(
            load(&[
                ("DEV_MODE", "true"),
                ("BOOTSTRAP_SUPERUSER_USERNAME", "root"),
            ])
            .is_err()
        );
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let config = load(&[("JWT_SECRET", "topsecret"), ("AUTH_PASSWORD_PEPPER", "spicy")]).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("topsecret"));
        assert!(!printed.contains("spicy"));
    }
}
