use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub token_ttl_hours: i64,
    pub max_body_size: usize,
    pub trusted_proxies: Vec<IpNet>,
    pub cors_origins: Vec<String>,
    /// Lets admins update and delete entries they did not author.
    pub admin_entry_override: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("FIELDFORMS_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid FIELDFORMS_HOST: {e}"))?;

        let port: u16 = env_or("FIELDFORMS_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid FIELDFORMS_PORT: {e}"))?;

        let token_ttl_hours: i64 = env_or("FIELDFORMS_TOKEN_TTL_HOURS", "24")
            .parse()
            .map_err(|e| format!("Invalid FIELDFORMS_TOKEN_TTL_HOURS: {e}"))?;
        if token_ttl_hours <= 0 {
            return Err("FIELDFORMS_TOKEN_TTL_HOURS must be positive".to_string());
        }

        let max_body_size: usize = env_or("FIELDFORMS_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid FIELDFORMS_MAX_BODY_SIZE: {e}"))?;

        let trusted_proxies: Vec<IpNet> = env_or("FIELDFORMS_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e| format!("Invalid FIELDFORMS_TRUSTED_PROXIES entry '{s}': {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cors_origins: Vec<String> = env_or("FIELDFORMS_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let admin_entry_override = parse_bool(
            "FIELDFORMS_ADMIN_ENTRY_OVERRIDE",
            &env_or("FIELDFORMS_ADMIN_ENTRY_OVERRIDE", "false"),
        )?;

        let log_level = env_or("FIELDFORMS_LOG_LEVEL", "info");

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            token_ttl_hours,
            max_body_size,
            trusted_proxies,
            cors_origins,
            admin_entry_override,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("Invalid {key}: '{other}' is not a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool;

    #[test]
    fn parses_boolean_spellings() {
        assert_eq!(parse_bool("K", "true"), Ok(true));
        assert_eq!(parse_bool("K", " ON "), Ok(true));
        assert_eq!(parse_bool("K", "0"), Ok(false));
        assert_eq!(parse_bool("K", ""), Ok(false));
        assert!(parse_bool("K", "maybe").unwrap_err().contains("Invalid K"));
    }
}
