use std::env;
use tracing::warn;

pub const DEFAULT_SLOT_HORIZON_DAYS: u32 = 30;
pub const DEFAULT_SLOT_GRANULARITY: &str = "hourly";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Forward horizon, in calendar days, used when a slot query names none.
    pub slot_horizon_days: u32,
    /// `hourly` or `block`.
    pub slot_granularity: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            slot_horizon_days: parse_or_default("SLOT_HORIZON_DAYS", DEFAULT_SLOT_HORIZON_DAYS),
            slot_granularity: env::var("SLOT_GRANULARITY")
                .unwrap_or_else(|_| DEFAULT_SLOT_GRANULARITY.to_string()),
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            slot_horizon_days: DEFAULT_SLOT_HORIZON_DAYS,
            slot_granularity: DEFAULT_SLOT_GRANULARITY.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

fn parse_or_default<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
