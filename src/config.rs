use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub fn is_origin_allowed(rules: &[CorsRule], origin: &str) -> bool {
    for rule in rules {
        if origin_matches(&rule.origin, origin) {
            return rule.action == CorsAction::Allow;
        }
    }
    false
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    // Convert wildcard pattern to anchored regex
    let mut re_pat = String::new();
    re_pat.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => re_pat.push_str(".*"),
            '.' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
                re_pat.push('\\');
                re_pat.push(ch);
            }
            _ => re_pat.push(ch),
        }
    }
    re_pat.push('$');
    Regex::new(&re_pat)
        .map(|re| re.is_match(origin))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    pub ssl_mode: String,
}

#[derive(Debug, Clone)]
pub struct CorsRule {
    pub origin: String,
    pub action: CorsAction,
    pub methods: Vec<String>,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CorsAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub file_path: Option<String>,
}

/// Settings for the Lightspeed POS integration.
///
/// None of these are required at startup: with no refresh token configured
/// the sales endpoints answer 401 rather than aborting the whole server.
#[derive(Debug, Clone, Default)]
pub struct LightspeedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
    pub account_id: String,
    pub api_base: String,
    pub token_url: String,
    pub authorize_url: String,
    pub redirect_uri: String,
}

impl LightspeedConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads_dir: String,
    pub csv_import_path: String,
    pub max_upload_bytes: usize,
    /// Offset of the business timezone from UTC, in hours. Sales day buckets
    /// are computed in this timezone.
    pub business_tz_offset_hours: i32,
    pub lightspeed: LightspeedConfig,
    pub cors_rules: Vec<CorsRule>,
    pub logging: LoggingConfig,
}

pub fn load_config_from_file(config_path: &str) -> AppConfig {
    // Load .env file if it exists
    let abs_config_path = Path::new(config_path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(config_path));

    if Path::new(config_path).exists() {
        match dotenvy::from_filename(config_path) {
            Ok(_) => tracing::info!("✓ Loaded .env file from: {}", abs_config_path.display()),
            Err(e) => tracing::warn!(
                "Failed to load .env file from {}: {}",
                abs_config_path.display(),
                e
            ),
        }
    } else {
        tracing::warn!(
            ".env file not found at: {} (using defaults)",
            abs_config_path.display()
        );
    }

    // Server configuration
    let server = ServerConfig {
        host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3231),
        name: std::env::var("SERVER_NAME").unwrap_or_else(|_| "warehouse231_backend".to_string()),
    };

    // Database configuration
    let database = DatabaseConfig {
        host: std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: std::env::var("DB_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5432),
        database: std::env::var("DB_NAME").unwrap_or_else(|_| "warehouse231".to_string()),
        username: std::env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
        password: std::env::var("DB_PASSWORD").unwrap_or_else(|_| "".to_string()),
        max_connections: std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        ssl_mode: std::env::var("DB_SSL_MODE").unwrap_or_else(|_| "prefer".to_string()),
    };

    // Logging configuration
    let logging = LoggingConfig {
        level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        file_enabled: std::env::var("LOG_FILE_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false),
        file_path: std::env::var("LOG_FILE_PATH").ok(),
    };

    let uploads_dir = std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "public/uploads".to_string());
    let csv_import_path = std::env::var("CSV_IMPORT_PATH")
        .unwrap_or_else(|_| "public/sandbox/von_items.csv".to_string());
    let max_upload_bytes = std::env::var("MAX_UPLOAD_MB")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(5)
        * 1024
        * 1024;
    let business_tz_offset_hours = std::env::var("BUSINESS_TZ_OFFSET_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let lightspeed = LightspeedConfig {
        client_id: std::env::var("LS_CLIENT_ID").unwrap_or_default(),
        client_secret: std::env::var("LS_CLIENT_SECRET").unwrap_or_default(),
        refresh_token: std::env::var("LS_REFRESH_TOKEN").ok().filter(|v| !v.is_empty()),
        account_id: std::env::var("LS_ACCOUNT_ID").unwrap_or_default(),
        api_base: std::env::var("LS_API_BASE")
            .unwrap_or_else(|_| "https://api.lightspeedapp.com".to_string()),
        token_url: std::env::var("LS_TOKEN_URL")
            .unwrap_or_else(|_| "https://cloud.lightspeedapp.com/oauth/access_token.php".to_string()),
        authorize_url: std::env::var("LS_AUTHORIZE_URL")
            .unwrap_or_else(|_| "https://cloud.lightspeedapp.com/oauth/authorize.php".to_string()),
        redirect_uri: std::env::var("LS_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3231/callback".to_string()),
    };

    // Load CORS rules from .env_cors file
    let cors_rules = load_cors_rules(".env_cors");

    AppConfig {
        server,
        database,
        uploads_dir,
        csv_import_path,
        max_upload_bytes,
        business_tz_offset_hours,
        lightspeed,
        cors_rules,
        logging,
    }
}

pub fn load_cors_rules(path: &str) -> Vec<CorsRule> {
    let mut rules = Vec::new();

    if !Path::new(path).exists() {
        tracing::warn!(".env_cors file not found at: {} (CORS will be disabled)", path);
        return rules;
    }

    let content = match fs::read_to_string(path) {
        Ok(s) => {
            tracing::info!("✓ Loaded .env_cors file from: {}", path);
            s
        }
        Err(e) => {
            tracing::error!("Failed to read .env_cors file from {}: {}", path, e);
            return rules;
        }
    };

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Tokens: origin [ACTION] [METHODS] [HEADERS]
        // Examples:
        // http://localhost:3000
        // http://site ALLOW GET,POST
        // https://x ALLOW ALL content-type,authorization
        let mut parts = line.split_whitespace();
        let origin = match parts.next() {
            Some(o) => o.to_string(),
            None => continue,
        };
        let action_str = parts.next().unwrap_or("ALLOW");
        let action = match action_str.to_uppercase().as_str() {
            "DENY" => CorsAction::Deny,
            _ => CorsAction::Allow,
        };
        let methods = parts.next().unwrap_or("ALL").to_string();
        let headers = parts.next().unwrap_or("ALL").to_string();

        let methods_vec: Vec<String> = if methods.eq_ignore_ascii_case("ALL") {
            vec!["ALL".to_string()]
        } else {
            methods
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let headers_vec: Vec<String> = if headers.eq_ignore_ascii_case("ALL") {
            vec!["ALL".to_string()]
        } else {
            headers
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };

        rules.push(CorsRule {
            origin,
            action,
            methods: methods_vec,
            headers: headers_vec,
        });
    }
    rules
}

pub fn database_url_from_env_or_config(explicit: Option<&str>, cfg: &AppConfig) -> String {
    if let Some(url) = explicit {
        if !url.is_empty() {
            return url.to_string();
        }
    }
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            return url;
        }
    }
    // Build from DatabaseConfig
    let sslmode = cfg.database.ssl_mode.clone();
    format!(
        "postgres://{user}:{pass}@{host}:{port}/{db}?sslmode={sslmode}",
        user = urlencoding::encode(&cfg.database.username),
        pass = urlencoding::encode(&cfg.database.password),
        host = cfg.database.host,
        port = cfg.database.port,
        db = cfg.database.database,
        sslmode = sslmode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(origin: &str, action: CorsAction) -> CorsRule {
        CorsRule {
            origin: origin.into(),
            action,
            methods: vec!["ALL".into()],
            headers: vec!["ALL".into()],
        }
    }

    #[test]
    fn test_origin_wildcard_matching() {
        let rules = vec![
            rule("https://*.warehouse231.com", CorsAction::Allow),
            rule("http://localhost:*", CorsAction::Allow),
            rule("*", CorsAction::Deny),
        ];
        assert!(is_origin_allowed(&rules, "https://app.warehouse231.com"));
        assert!(is_origin_allowed(&rules, "http://localhost:5173"));
        assert!(!is_origin_allowed(&rules, "https://evil.example"));
    }

    #[test]
    fn test_no_rules_denies_everything() {
        assert!(!is_origin_allowed(&[], "http://localhost:3000"));
    }

    #[test]
    #[serial_test::serial]
    fn test_database_url_prefers_explicit() {
        temp_env::with_var("DATABASE_URL", None::<&str>, || {
            let cfg = load_config_from_file("/nonexistent/.env");
            let url = database_url_from_env_or_config(Some("postgres://x@y/z"), &cfg);
            assert_eq!(url, "postgres://x@y/z");
        });
    }

    #[test]
    #[serial_test::serial]
    fn test_database_url_built_from_parts() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("DB_HOST", Some("db.internal")),
                ("DB_NAME", Some("claimsdb")),
                ("DB_USER", Some("wh231")),
            ],
            || {
                let cfg = load_config_from_file("/nonexistent/.env");
                let url = database_url_from_env_or_config(None, &cfg);
                assert!(url.starts_with("postgres://wh231:@db.internal:5432/claimsdb"));
            },
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_lightspeed_defaults_unconfigured() {
        temp_env::with_vars(
            [("LS_CLIENT_ID", None::<&str>), ("LS_REFRESH_TOKEN", None::<&str>)],
            || {
                let cfg = load_config_from_file("/nonexistent/.env");
                assert!(!cfg.lightspeed.is_configured());
                assert!(cfg.lightspeed.refresh_token.is_none());
                assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
            },
        );
    }
}
