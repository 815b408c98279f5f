use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub points_file: String,
    pub cache_ttl: Duration,
    pub fetch_concurrency: usize,
    pub forecast_horizon_days: u32,
    pub top_deadline: Duration,
    pub warm_deadline: Duration,
    pub refresh_deadline: Duration,
    pub forecast_base_url: String,
    pub air_quality_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
            points_file: "data/districts.json".to_string(),
            cache_ttl: Duration::from_secs(300),
            fetch_concurrency: 5,
            forecast_horizon_days: 7,
            top_deadline: Duration::from_millis(500),
            warm_deadline: Duration::from_secs(60),
            refresh_deadline: Duration::from_secs(30),
            forecast_base_url: "https://api.open-meteo.com".to_string(),
            air_quality_base_url: "https://air-quality-api.open-meteo.com".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        let fetch_concurrency = parse_var("FETCH_CONCURRENCY", defaults.fetch_concurrency)?;
        if fetch_concurrency == 0 {
            return Err(AppError::Config("FETCH_CONCURRENCY must be > 0".to_string()));
        }

        let cache_ttl_secs = parse_var("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        if cache_ttl_secs < 2 {
            return Err(AppError::Config("CACHE_TTL_SECS must be >= 2".to_string()));
        }

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            points_file: env::var("POINTS_FILE").unwrap_or(defaults.points_file),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            fetch_concurrency,
            forecast_horizon_days: parse_var("FORECAST_HORIZON_DAYS", defaults.forecast_horizon_days)?,
            top_deadline: Duration::from_millis(parse_var(
                "TOP_DEADLINE_MS",
                defaults.top_deadline.as_millis() as u64,
            )?),
            warm_deadline: Duration::from_secs(parse_var(
                "WARM_DEADLINE_SECS",
                defaults.warm_deadline.as_secs(),
            )?),
            refresh_deadline: Duration::from_secs(parse_var(
                "REFRESH_DEADLINE_SECS",
                defaults.refresh_deadline.as_secs(),
            )?),
            forecast_base_url: env::var("FORECAST_BASE_URL").unwrap_or(defaults.forecast_base_url),
            air_quality_base_url: env::var("AIR_QUALITY_BASE_URL")
                .unwrap_or(defaults.air_quality_base_url),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
