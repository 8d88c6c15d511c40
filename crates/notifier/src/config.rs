use std::env;
use std::time::Duration;

use chrono_tz::Tz;
use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;

use pelada_core::schedule::DEFAULT_TOLERANCE_HOURS;

/// Connection details for the WhatsApp HTTP gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway (required)
    pub base_url: String,
    /// Bearer token, when the gateway is protected
    pub token: Option<String>,
    /// Gateway session the messages are sent from
    pub session: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("WHATSAPP_GATEWAY_URL")
            .map_err(|_| eyre!("WHATSAPP_GATEWAY_URL environment variable not set"))?;

        let token = env::var("WHATSAPP_GATEWAY_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let session = env::var("WHATSAPP_SESSION").unwrap_or_else(|_| "default".to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            session,
        })
    }
}

/// Knobs of the scheduler, dispatcher and reply handling.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Time between scheduler ticks
    pub tick_interval: Duration,
    /// Half-width of a schedule entry's firing window, in hours
    pub tolerance_hours: f64,
    /// Minimum gap between two messages of one batch
    pub send_spacing: Duration,
    /// Upper bound for any gateway or database call
    pub call_timeout: Duration,
    /// Zone session dates and times are written in
    pub timezone: Tz,
    /// Post the roster to the group chat after each reply
    pub roster_updates: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            tolerance_hours: DEFAULT_TOLERANCE_HOURS,
            send_spacing: Duration::from_millis(1000),
            call_timeout: Duration::from_secs(10),
            timezone: chrono_tz::America::Sao_Paulo,
            roster_updates: true,
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let tick_interval = env_var("SCHEDULER_INTERVAL_SECONDS")
            .map(|raw| raw.parse::<u64>().wrap_err("SCHEDULER_INTERVAL_SECONDS must be a number"))
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.tick_interval);

        let tolerance_hours = env_var("NOTIFICATION_TOLERANCE_HOURS")
            .map(|raw| raw.parse::<f64>().wrap_err("NOTIFICATION_TOLERANCE_HOURS must be a number"))
            .transpose()?
            .unwrap_or(defaults.tolerance_hours);
        if tolerance_hours.is_nan() || tolerance_hours <= 0.0 {
            return Err(eyre!("NOTIFICATION_TOLERANCE_HOURS must be positive"));
        }

        let send_spacing = env_var("SEND_SPACING_MS")
            .map(|raw| raw.parse::<u64>().wrap_err("SEND_SPACING_MS must be a number"))
            .transpose()?
            .map(Duration::from_millis)
            .unwrap_or(defaults.send_spacing);

        let call_timeout = env_var("EXTERNAL_CALL_TIMEOUT_SECONDS")
            .map(|raw| {
                raw.parse::<u64>()
                    .wrap_err("EXTERNAL_CALL_TIMEOUT_SECONDS must be a number")
            })
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(defaults.call_timeout);

        let timezone = env_var("GAME_TIMEZONE")
            .map(|raw| {
                raw.parse::<Tz>()
                    .map_err(|e| eyre!("GAME_TIMEZONE is not a valid timezone: {}", e))
            })
            .transpose()?
            .unwrap_or(defaults.timezone);

        let roster_updates = env_var("ROSTER_UPDATES")
            .map(|raw| parse_flag(&raw))
            .transpose()?
            .unwrap_or(defaults.roster_updates);

        Ok(Self {
            tick_interval,
            tolerance_hours,
            send_spacing,
            call_timeout,
            timezone,
            roster_updates,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(eyre!("'{}' is not a boolean flag", other)),
    }
}
