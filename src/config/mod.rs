use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    pub otp: OtpConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_user_expiry_hours")]
    pub expiry_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Static admin key accepted via `X-Admin-Key`; empty disables key auth.
    #[serde(default)]
    pub api_key: String,
    /// Comma-separated whitelist of admin login emails.
    #[serde(default)]
    pub emails: String,
    /// Argon2 PHC hash shared by whitelisted admins.
    #[serde(default)]
    pub password_hash: String,
    #[serde(default = "default_admin_expiry_hours")]
    pub expiry_hours: u64,
}

impl AdminConfig {
    pub fn email_whitelist(&self) -> Vec<String> {
        self.emails
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    #[serde(default = "default_otp_expires_minutes")]
    pub expires_minutes: i64,
    #[serde(default = "default_resend_cooldown_seconds")]
    pub resend_cooldown_seconds: i64,
    pub hash_pepper: String,
    #[serde(default)]
    pub log_for_dev: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Empty host puts the mailer in no-op mode.
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    #[serde(default = "default_true")]
    pub starttls: bool,
    /// Applied by lettre to the TCP connect and the server greeting alike.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_upload_expiry")]
    pub upload_expiry_seconds: u64,
    #[serde(default = "default_download_expiry")]
    pub download_expiry_seconds: u64,
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_id.is_empty()
            && !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
            && !self.bucket.is_empty()
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_max_connections() -> u32 {
    10
}

fn default_user_expiry_hours() -> u64 {
    24 * 7
}

fn default_admin_expiry_hours() -> u64 {
    12
}

fn default_otp_expires_minutes() -> i64 {
    5
}

fn default_resend_cooldown_seconds() -> i64 {
    60
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_key_prefix() -> String {
    "digital-house".to_string()
}

fn default_upload_expiry() -> u64 {
    900
}

fn default_download_expiry() -> u64 {
    3600
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("database.url", "postgres://localhost/digital_house")?
            .set_default("database.max_connections", 10)?
            .set_default("jwt.secret", "development-secret-change-in-production")?
            .set_default("jwt.expiry_hours", 24 * 7)?
            .set_default("admin.api_key", "")?
            .set_default("admin.emails", "")?
            .set_default("admin.password_hash", "")?
            .set_default("admin.expiry_hours", 12)?
            .set_default("otp.expires_minutes", 5)?
            .set_default("otp.resend_cooldown_seconds", 60)?
            .set_default("otp.hash_pepper", "dev-pepper")?
            .set_default("otp.log_for_dev", false)?
            .set_default("smtp.host", "")?
            .set_default("smtp.port", 587)?
            .set_default("smtp.from", "Digital House <no-reply@digitalhouse.local>")?
            .set_default("smtp.starttls", true)?
            .set_default("smtp.connection_timeout_seconds", 10)?
            .set_default("storage.key_prefix", "digital-house")?
            .set_default("storage.upload_expiry_seconds", 900)?
            .set_default("storage.download_expiry_seconds", 3600)?)
    }

    /// Defaults only, without reading the environment.
    pub fn defaults() -> anyhow::Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }
}
