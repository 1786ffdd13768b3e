use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Argon2 cost and the password policy enforced on register/change.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    /// Allowed CORS origins; empty means permissive.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "spendlog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "spendlog-users".into()),
            access_ttl_minutes: env_parse("JWT_ACCESS_TTL_MINUTES", 15),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        if jwt.access_secret == jwt.refresh_secret {
            anyhow::bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            min_length: env_parse("PASSWORD_MIN_LENGTH", defaults.min_length),
            memory_kib: env_parse("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_parse("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_parse("ARGON2_PARALLELISM", defaults.parallelism),
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT", 8080),
            jwt,
            password,
            cors_origins,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins("http://localhost:3000, http://localhost:5173,,");
        assert_eq!(
            origins,
            vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()]
        );
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("SPENDLOG_TEST_PORT", "not-a-number");
        assert_eq!(env_parse::<u16>("SPENDLOG_TEST_PORT", 8080), 8080);
        std::env::set_var("SPENDLOG_TEST_PORT", "9090");
        assert_eq!(env_parse::<u16>("SPENDLOG_TEST_PORT", 8080), 9090);
    }
}
