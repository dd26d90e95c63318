use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub catalog_path: String,
    pub bucket_dir: String,
    pub notes_dir: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub token_secret: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let catalog_path =
            env::var("CATALOG_PATH").unwrap_or_else(|_| "./data/catalog.json".to_string());

        let bucket_dir = env::var("BUCKET_DIR").unwrap_or_else(|_| "./data/objects".to_string());

        let notes_dir = env::var("NOTES_DIR").unwrap_or_else(|_| "./data/notes".to_string());

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let token_secret =
            env::var("TOKEN_SECRET").map_err(|_| "TOKEN_SECRET must be set for auth tokens")?;

        Ok(Config {
            server_host,
            server_port,
            catalog_path,
            bucket_dir,
            notes_dir,
            allowed_origins,
            environment,
            token_secret,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
