use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_FREE_RETURN_DAYS: i64 = 7;
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Grace window applied when a doctor record has no `free_return_days`
    pub default_free_return_days: i64,
    /// Upper bound on prior-visit queries in flight for one report
    pub lookup_concurrency: usize,
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
            default_free_return_days: parse_or_default(
                "DEFAULT_FREE_RETURN_DAYS",
                DEFAULT_FREE_RETURN_DAYS,
            ),
            lookup_concurrency: parse_or_default(
                "PRIOR_VISIT_LOOKUP_CONCURRENCY",
                DEFAULT_LOOKUP_CONCURRENCY,
            )
            .max(1),
            port: parse_or_default("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Config pointing at an explicit backend, everything else defaulted.
    pub fn with_supabase(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            supabase_anon_key: anon_key.into(),
            default_free_return_days: DEFAULT_FREE_RETURN_DAYS,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
            port: DEFAULT_PORT,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_supabase_uses_defaults() {
        let config = AppConfig::with_supabase("http://localhost:54321", "anon");

        assert!(config.is_configured());
        assert_eq!(config.default_free_return_days, 7);
        assert_eq!(config.lookup_concurrency, 4);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_unconfigured_when_url_missing() {
        let config = AppConfig::with_supabase("", "anon");
        assert!(!config.is_configured());
    }

    #[test]
    fn test_parse_or_default_falls_back_on_garbage() {
        env::set_var("BILLING_TEST_GARBAGE_DAYS", "seven");
        assert_eq!(parse_or_default("BILLING_TEST_GARBAGE_DAYS", 7i64), 7);

        env::set_var("BILLING_TEST_GOOD_DAYS", " 14 ");
        assert_eq!(parse_or_default("BILLING_TEST_GOOD_DAYS", 7i64), 14);
    }
}
