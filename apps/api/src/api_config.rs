use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crewdesk_core::AppError;
use tracing_subscriber::EnvFilter;

/// Storage behind the directory, role and audit ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryBackend {
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: String,
    pub backend: DirectoryBackend,
    pub dev_seed: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(env::args().nth(1).as_deref(), |name| env::var(name).ok())
    }

    pub fn from_lookup(
        command: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let migrate_only = command == Some("migrate");

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = match lookup("API_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3001,
        };
        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());

        let backend = match lookup("DIRECTORY_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .trim()
        {
            "memory" => DirectoryBackend::Memory,
            "postgres" => DirectoryBackend::Postgres {
                database_url: lookup("DATABASE_URL")
                    .filter(|value| !value.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "DATABASE_URL is required when DIRECTORY_BACKEND=postgres".to_owned(),
                        )
                    })?,
            },
            other => {
                return Err(AppError::Validation(format!(
                    "DIRECTORY_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        if migrate_only && backend == DirectoryBackend::Memory {
            return Err(AppError::Validation(
                "the migrate command requires DIRECTORY_BACKEND=postgres".to_owned(),
            ));
        }

        let dev_seed = lookup("DEV_SEED")
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            frontend_url,
            backend,
            dev_seed,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
