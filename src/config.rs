use std::env;

use chrono_tz::Tz;

use crate::error::AppError;

/// Runtime configuration, loaded once at startup from the environment and
/// passed explicitly to the services that need it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub canvas_base_url: String,
    pub canvas_token: Option<String>,
    pub webhook_url: Option<String>,
    /// Zone used only for rendering instants in payloads; storage is UTC.
    pub display_tz: Tz,
    /// Reminder scheduler cadence in seconds.
    pub tick_interval_secs: u64,
    /// Symmetric match window around a reminder target, in seconds.
    pub tolerance_secs: i64,
    /// Cadence of the background Canvas sync, in seconds.
    pub sync_interval_secs: u64,
    pub listen_port: u16,
    /// Clock time of the weekly Monday summary. Consumed by the summary
    /// feature, which lives outside this service; kept here so one config
    /// surface covers the deployment.
    pub weekly_notification_hour: u32,
    pub weekly_notification_minute: u32,
}

const DEFAULT_CANVAS_BASE_URL: &str = "https://canvas.instructure.com/api/v1";

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let display_tz = match env::var("TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|e| AppError::Config(format!("invalid TIMEZONE: {e}")))?,
            Err(_) => Tz::UTC,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://coursebell.db".to_string()),
            canvas_base_url: env::var("CANVAS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CANVAS_BASE_URL.to_string()),
            canvas_token: env::var("CANVAS_TOKEN").ok(),
            webhook_url: env::var("WEBHOOK_URL").ok(),
            display_tz,
            tick_interval_secs: parse_env("TICK_INTERVAL_SECS", 60)?,
            tolerance_secs: parse_env("TOLERANCE_SECS", 60)?,
            sync_interval_secs: parse_env("SYNC_INTERVAL_SECS", 3600)?,
            listen_port: parse_env("PORT", 3000)?,
            weekly_notification_hour: parse_env("WEEKLY_NOTIFICATION_HOUR", 9)?,
            weekly_notification_minute: parse_env("WEEKLY_NOTIFICATION_MINUTE", 0)?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}
