use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Days between a bill's issue date and its due date.
    pub bill_due_days: i64,
}

pub const DEFAULT_BILL_DUE_DAYS: i64 = 30;
/// Ten years; anything longer is treated as a typo.
pub const MAX_BILL_DUE_DAYS: i64 = 3650;

/// `None` gives the default. Values outside `0..=MAX_BILL_DUE_DAYS` are rejected.
pub fn parse_bill_due_days(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_BILL_DUE_DAYS);
    };
    let days = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("BILL_DUE_DAYS `{raw}` is not a whole number"))?;
    if !(0..=MAX_BILL_DUE_DAYS).contains(&days) {
        anyhow::bail!("BILL_DUE_DAYS must be between 0 and {MAX_BILL_DUE_DAYS}, got {days}");
    }
    Ok(days)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let bill_due_days = parse_bill_due_days(env::var("BILL_DUE_DAYS").ok().as_deref())?;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            bill_due_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_days_default_and_bounds() -> anyhow::Result<()> {
        assert_eq!(parse_bill_due_days(None)?, DEFAULT_BILL_DUE_DAYS);
        assert_eq!(parse_bill_due_days(Some(" 14 "))?, 14);
        assert_eq!(parse_bill_due_days(Some("3650"))?, MAX_BILL_DUE_DAYS);
        assert!(parse_bill_due_days(Some("-1")).is_err());
        assert!(parse_bill_due_days(Some("10000000000")).is_err());
        assert!(parse_bill_due_days(Some("soon")).is_err());
        Ok(())
    }
}
