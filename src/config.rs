use std::env;

use anyhow::Context;

use crate::services::checkout_service::StockDecrement;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub starting_balance: i64,
    pub stock_decrement: StockDecrement,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3001);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let jwt_ttl_hours = parse_ttl_hours(env::var("JWT_TTL_HOURS").ok().as_deref());
        let starting_balance = match env::var("STARTING_BALANCE") {
            Ok(raw) => parse_balance(&raw)?,
            Err(_) => 5000,
        };
        let stock_decrement =
            parse_stock_decrement(env::var("CHECKOUT_STOCK_DECREMENT").ok().as_deref())?;
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            starting_balance,
            stock_decrement,
        })
    }
}

/// One year. Longer lifetimes are clamped to it.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 365;

fn parse_ttl_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|h| h.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .map(|h| h.min(MAX_JWT_TTL_HOURS))
        .unwrap_or(24)
}

fn parse_stock_decrement(raw: Option<&str>) -> anyhow::Result<StockDecrement> {
    match raw {
        Some(raw) => raw.parse::<StockDecrement>(),
        None => Ok(StockDecrement::default()),
    }
}

fn parse_balance(raw: &str) -> anyhow::Result<i64> {
    let balance = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("STARTING_BALANCE is not an integer: {raw}"))?;
    anyhow::ensure!(balance >= 0, "STARTING_BALANCE must not be negative");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_must_be_a_non_negative_integer() {
        assert_eq!(parse_balance(" 250 ").unwrap(), 250);
        assert!(parse_balance("-1").is_err());
        assert!(parse_balance("lots").is_err());
    }

    #[test]
    fn stock_decrement_defaults_to_one_per_line() {
        assert_eq!(parse_stock_decrement(None).unwrap(), StockDecrement::PerLine);
        assert_eq!(
            parse_stock_decrement(Some("per_unit")).unwrap(),
            StockDecrement::PerUnit
        );
        assert!(parse_stock_decrement(Some("flat")).is_err());
    }

    #[test]
    fn token_lifetime_is_clamped_to_a_year() {
        assert_eq!(parse_ttl_hours(None), 24);
        assert_eq!(parse_ttl_hours(Some("0")), 24);
        assert_eq!(parse_ttl_hours(Some("48")), 48);
        assert_eq!(parse_ttl_hours(Some("9223372036854775807")), MAX_JWT_TTL_HOURS);
    }
}
