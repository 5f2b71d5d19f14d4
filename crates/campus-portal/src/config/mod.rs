use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::Serialize;

use crate::workflows::attendance::{CampusLocation, GeoPoint, WindowStrategy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub attendance: AttendanceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            attendance: AttendanceConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_CAMPUS_LATITUDE: f64 = 24.552041628310768;
pub const DEFAULT_CAMPUS_LONGITUDE: f64 = 46.684321294327596;
pub const DEFAULT_CAMPUS_RADIUS_METERS: f64 = 500.0;
pub const DEFAULT_CAMPUS_NAME: &str = "MYISU University Campus";

/// Campus geofence, window strategy, and the geolocation options handed to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceConfig {
    pub campus: CampusLocation,
    pub strategy: WindowStrategy,
    pub geolocation: GeolocationOptions,
}

impl AttendanceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let latitude = parse_f64("CAMPUS_LATITUDE", DEFAULT_CAMPUS_LATITUDE)?;
        let longitude = parse_f64("CAMPUS_LONGITUDE", DEFAULT_CAMPUS_LONGITUDE)?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::InvalidCampusCoordinates);
        }

        let radius = parse_f64("CAMPUS_RADIUS_METERS", DEFAULT_CAMPUS_RADIUS_METERS)?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConfigError::InvalidRadius);
        }

        let name = env::var("CAMPUS_NAME").unwrap_or_else(|_| DEFAULT_CAMPUS_NAME.to_string());

        let strategy = match env::var("ATTENDANCE_WINDOW_STRATEGY") {
            Ok(raw) => WindowStrategy::parse(&raw)
                .ok_or(ConfigError::InvalidWindowStrategy { value: raw })?,
            Err(_) => WindowStrategy::Fixed,
        };

        let timeout = parse_secs("GEOLOCATION_TIMEOUT_SECS", 10)?;
        let maximum_age = parse_secs("GEOLOCATION_MAX_AGE_SECS", 60)?;

        Ok(Self {
            campus: CampusLocation {
                name,
                center: GeoPoint::new(latitude, longitude),
                allowed_radius_meters: radius,
            },
            strategy,
            geolocation: GeolocationOptions {
                enable_high_accuracy: true,
                timeout,
                maximum_age,
            },
        })
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            campus: CampusLocation::reference(),
            strategy: WindowStrategy::Fixed,
            geolocation: GeolocationOptions::default(),
        }
    }
}

/// Request options for the device geolocation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
    #[serde(rename = "maximum_age_ms", serialize_with = "serialize_millis")]
    pub maximum_age: Duration,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(60),
        }
    }
}

fn serialize_millis<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(value.as_millis() as u64)
}

fn parse_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_secs(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidCampusCoordinates,
    InvalidRadius,
    InvalidWindowStrategy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be numeric"),
            ConfigError::InvalidCampusCoordinates => write!(
                f,
                "CAMPUS_LATITUDE must be within [-90, 90] and CAMPUS_LONGITUDE within [-180, 180]"
            ),
            ConfigError::InvalidRadius => {
                write!(f, "CAMPUS_RADIUS_METERS must be a positive number of meters")
            }
            ConfigError::InvalidWindowStrategy { value } => write!(
                f,
                "ATTENDANCE_WINDOW_STRATEGY must be 'fixed' or 'course' (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
