//! Assistant configuration
//!
//! Values come from the environment (a `.env` file is honoured by the
//! binaries). Anything unset falls back to [`AssistantConfig::default`].

use crate::error::JournalError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Cosmetic pause before a reply is returned (lower bound)
    pub reply_delay_min: Duration,
    /// Cosmetic pause before a reply is returned (upper bound)
    pub reply_delay_max: Duration,
    /// Trades required before the analysis handler says anything
    pub analysis_min_trades: usize,
    /// Matches listed in a search reply
    pub search_result_limit: usize,
    /// Days without a logged trade before "what now" nudges the user
    pub stale_after_days: f64,
    /// Drop withdrawals from the chat summary, like the dashboard does
    pub summary_excludes_withdrawals: bool,
    /// Conversations unused for this long are dropped; zero keeps them forever
    pub session_idle_timeout: Duration,
    pub api_port: u16,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            reply_delay_min: Duration::ZERO,
            reply_delay_max: Duration::ZERO,
            analysis_min_trades: 5,
            search_result_limit: 5,
            stale_after_days: 2.0,
            summary_excludes_withdrawals: false,
            session_idle_timeout: Duration::from_secs(60 * 60),
            api_port: 8080,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let delay_min: u64 = parse_var("JOURNAL_REPLY_DELAY_MIN_MS")?.unwrap_or(0);
        let delay_max: u64 = parse_var("JOURNAL_REPLY_DELAY_MAX_MS")?.unwrap_or(delay_min);
        if delay_max < delay_min {
            return Err(JournalError::ConfigError(format!(
                "JOURNAL_REPLY_DELAY_MAX_MS ({}) is below JOURNAL_REPLY_DELAY_MIN_MS ({})",
                delay_max, delay_min
            )));
        }

        let api_port = match parse_var::<u16>("PORT")? {
            Some(port) => port,
            None => parse_var("API_PORT")?.unwrap_or(defaults.api_port),
        };

        Ok(Self {
            reply_delay_min: Duration::from_millis(delay_min),
            reply_delay_max: Duration::from_millis(delay_max),
            analysis_min_trades: parse_var("JOURNAL_ANALYSIS_MIN_TRADES")?
                .unwrap_or(defaults.analysis_min_trades),
            search_result_limit: parse_var("JOURNAL_SEARCH_LIMIT")?
                .unwrap_or(defaults.search_result_limit),
            stale_after_days: parse_var("JOURNAL_STALE_DAYS")?
                .unwrap_or(defaults.stale_after_days),
            summary_excludes_withdrawals: parse_var("JOURNAL_SUMMARY_EXCLUDES_WITHDRAWALS")?
                .unwrap_or(defaults.summary_excludes_withdrawals),
            session_idle_timeout: parse_var::<u64>("JOURNAL_SESSION_IDLE_MINUTES")?
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(defaults.session_idle_timeout),
            api_port,
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            JournalError::ConfigError(format!("Invalid value for {}: {} ({})", name, raw, e))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.analysis_min_trades, 5);
        assert_eq!(config.search_result_limit, 5);
        assert_eq!(config.stale_after_days, 2.0);
        assert!(!config.summary_excludes_withdrawals);
        assert_eq!(config.reply_delay_max, Duration::ZERO);
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_var() {
        env::set_var("JOURNAL_TEST_PARSE_OK", " 42 ");
        env::set_var("JOURNAL_TEST_PARSE_BAD", "forty-two");
        env::set_var("JOURNAL_TEST_PARSE_EMPTY", "");

        assert_eq!(parse_var::<usize>("JOURNAL_TEST_PARSE_OK").unwrap(), Some(42));
        assert!(parse_var::<usize>("JOURNAL_TEST_PARSE_BAD").is_err());
        assert_eq!(parse_var::<usize>("JOURNAL_TEST_PARSE_EMPTY").unwrap(), None);
        assert_eq!(parse_var::<usize>("JOURNAL_TEST_PARSE_MISSING").unwrap(), None);
    }
}
