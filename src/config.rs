use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_APP_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub embed_secret: Option<String>,
    pub app_url: String,
    pub cron_secret: Option<String>,
    pub test_secret: Option<String>,
    pub local_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let supabase_url = env_string("NEXT_PUBLIC_SUPABASE_URL").or_else(|| env_string("SUPABASE_URL"));
        let supabase_service_key =
            env_string("SUPABASE_SERVICE_ROLE_KEY").or_else(|| env_string("SUPABASE_SERVICE_KEY"));

        let embed_secret = resolve_embed_secret(&[
            env_string("JWT_EMBED_SECRET"),
            env_string("JWTEMBEDSECRET"),
            env_string("JWT_SECRET"),
            supabase_service_key.clone(),
        ]);

        let app_url = resolve_app_url(
            env_string("NEXT_PUBLIC_APP_URL").as_deref(),
            env_string("VERCEL_URL").as_deref(),
        );

        Self {
            host,
            port,
            log_level,
            supabase_url,
            supabase_service_key,
            embed_secret,
            app_url,
            cron_secret: env_string("CRON_SECRET"),
            test_secret: env_string("TEST_SECRET"),
            local_mode: env_bool("PROGRESSPATH_LOCAL_MODE").unwrap_or(false),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Secrets accepted by the cron/test endpoints.
    pub fn automation_secrets(&self) -> Vec<&str> {
        [self.cron_secret.as_deref(), self.test_secret.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            log_level: "info".to_string(),
            supabase_url: None,
            supabase_service_key: None,
            embed_secret: None,
            app_url: DEFAULT_APP_URL.to_string(),
            cron_secret: None,
            test_secret: None,
            local_mode: false,
        }
    }
}

/// Picks the first configured candidate, in priority order.
pub fn resolve_embed_secret(candidates: &[Option<String>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn resolve_app_url(app_url: Option<&str>, vercel_url: Option<&str>) -> String {
    if let Some(url) = app_url.map(str::trim).filter(|v| !v.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }

    if let Some(host) = vercel_url.map(str::trim).filter(|v| !v.is_empty()) {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return host.to_string();
        }
        return format!("https://{host}");
    }

    DEFAULT_APP_URL.to_string()
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
