use std::{env, fmt};

/// AppConfig
///
/// Holds the console's entire configuration state. Loaded once at startup and then
/// shared immutably with every request through the application state (see `FromRef`
/// in `lib.rs`). `Debug` redacts every secret.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // The single privileged identity allowed into the admin surface.
    pub admin_username: String,
    pub admin_password: String,
    // Secret used to sign the session cookie.
    pub secret_key: String,
    // Connection parameters of the Postgres instance holding the managed tables.
    pub db: DatabaseConfig,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Env
///
/// Defines the runtime context: `Local` for development, `Production` for deployed
/// instances where insecure defaults are refused.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// DatabaseConfig
///
/// Persistent-store connection parameters, read from the `db_*` variables.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub login: String,
    pub password: String,
}

impl DatabaseConfig {
    /// Builds the Postgres connection string handed to the sqlx pool.
    pub fn url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.login, self.password, self.host, self.port, self.name
        )
    }
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &REDACTED)
            .field("secret_key", &REDACTED)
            .field("db", &self.db)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("login", &self.login)
            .field("password", &REDACTED)
            .finish()
    }
}

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_SECRET_KEY: &str = "supersecretkey";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5051";

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests: default admin identity, a throwaway
    /// signing secret and a local database that is never actually contacted.
    fn default() -> Self {
        Self {
            env: Env::Local,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            db: DatabaseConfig {
                host: "localhost".to_string(),
                port: 5432,
                name: "lawly_test".to_string(),
                login: "test_user".to_string(),
                password: "test_pass".to_string(),
            },
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and applies the **fail-fast** rule.
    ///
    /// # Panics
    /// Panics if a database parameter is missing or malformed, or, in production, if
    /// the admin password or the session-signing secret is left at its default.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let admin_username =
            env::var("ADMIN_USERNAME").unwrap_or_else(|_| DEFAULT_ADMIN_USERNAME.to_string());

        // Production refuses to start with the well-known fallbacks.
        let (admin_password, secret_key) = match env {
            Env::Production => (
                env::var("ADMIN_PASSWORD")
                    .expect("FATAL: ADMIN_PASSWORD must be set in production."),
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production."),
            ),
            Env::Local => (
                env::var("ADMIN_PASSWORD")
                    .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string()),
                env::var("SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.to_string()),
            ),
        };

        let db = DatabaseConfig {
            host: env::var("db_host").expect("FATAL: db_host is required"),
            port: env::var("db_port")
                .expect("FATAL: db_port is required")
                .parse()
                .expect("FATAL: db_port must be a valid port number"),
            name: env::var("db_name").expect("FATAL: db_name is required"),
            login: env::var("db_login").expect("FATAL: db_login is required"),
            password: env::var("db_password").expect("FATAL: db_password is required"),
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        Self {
            env,
            admin_username,
            admin_password,
            secret_key,
            db,
            bind_addr,
        }
    }
}
