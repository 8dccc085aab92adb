use std::collections::HashMap;
use std::env;
use std::fs;

use crate::clients::calendar_client::GoogleCredentials;

pub const DEFAULT_RUN_MODE: &str = "api";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    // Config file takes precedence, environment variables fill the gaps.
    pub fn prop(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone)]
pub struct BookingConfig {
    pub run_mode: String,
    pub port: u16,
    pub timezone: String,
    pub duration_minutes: i64,
    pub credentials: Option<GoogleCredentials>,
    pub intent_endpoint: Option<String>,
    pub intent_token: Option<String>,
}

impl BookingConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        let credentials = match (
            config.prop("GOOGLE_CLIENT_ID"),
            config.prop("GOOGLE_CLIENT_SECRET"),
            config.prop("GOOGLE_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                Some(GoogleCredentials {
                    client_id,
                    client_secret,
                    refresh_token,
                    calendar_id: config
                        .prop("GOOGLE_CALENDAR_ID")
                        .unwrap_or_else(|| "primary".to_string()),
                })
            }
            _ => None,
        };

        Self {
            run_mode: config
                .prop("RUN_MODE")
                .unwrap_or_else(|| DEFAULT_RUN_MODE.to_string()),
            port: config
                .prop("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            timezone: config
                .prop("BOOKING_TIMEZONE")
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            duration_minutes: config
                .prop("DEFAULT_EVENT_DURATION_MINUTES")
                .and_then(|d| d.parse().ok())
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            credentials,
            intent_endpoint: config.prop("INTENT_API_ENDPOINT"),
            intent_token: config.prop("INTENT_API_TOKEN"),
        }
    }
}
