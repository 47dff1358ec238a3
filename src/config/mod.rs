use serde::Deserialize;
use std::env;

// Top-level configuration container for all four services.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub databases: DatabaseConfig,
    pub jwt: JwtConfig,
    pub services: ServiceUrls,
    pub http: HttpClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

// Each service owns its own SQLite database file.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub users_url: String,
    pub payments_url: String,
    pub availability_url: String,
    pub reservations_url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

// Base URLs for service-to-service calls. They default to the local process
// so the single-binary deployment works out of the box, and can point at
// separately deployed services via env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceUrls {
    pub users_url: String,
    pub payments_url: String,
    pub availability_url: String,
    pub reservations_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .expect("PORT must be a valid number");
        let local_base = format!("http://127.0.0.1:{}", port);

        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "ridedemand=debug,tower_http=debug".to_string()),
            },
            databases: DatabaseConfig {
                users_url: env::var("USERS_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:/tmp/ridedemand-users.db".to_string()),
                payments_url: env::var("PAYMENTS_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:/tmp/ridedemand-payments.db".to_string()),
                availability_url: env::var("AVAILABILITY_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:/tmp/ridedemand-availability.db".to_string()),
                reservations_url: env::var("RESERVATIONS_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:/tmp/ridedemand-reservations.db".to_string()),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
                expires_in_hours: env::var("JWT_EXPIRES_IN_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .expect("JWT_EXPIRES_IN_HOURS must be a valid number"),
            },
            services: ServiceUrls {
                users_url: env::var("USERS_SERVICE_URL").unwrap_or_else(|_| local_base.clone()),
                payments_url: env::var("PAYMENTS_SERVICE_URL")
                    .unwrap_or_else(|_| local_base.clone()),
                availability_url: env::var("AVAILABILITY_SERVICE_URL")
                    .unwrap_or_else(|_| local_base.clone()),
                reservations_url: env::var("RESERVATIONS_SERVICE_URL")
                    .unwrap_or_else(|_| local_base.clone()),
            },
            http: HttpClientConfig {
                timeout_seconds: env::var("HTTP_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("HTTP_TIMEOUT_SECONDS must be a valid number"),
            },
        }
    }
}
