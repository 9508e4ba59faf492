// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Two layers:
//!
//! - [`Config`]: service settings, read once at startup from environment
//!   variables (a `.env` file is honoured by `main`).
//! - [`SmtpSettings`]: relay credentials, read per request by
//!   [`SmtpConfigLoader`] from the first usable candidate file. The file
//!   must live outside the served site root.

use ::config::{File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory with the static site (default: ./public)
    #[serde(default = "default_site_root")]
    pub site_root: PathBuf,

    /// Candidate SMTP config files, tried in order
    #[serde(default = "default_smtp_config_paths")]
    pub smtp_config_paths: Vec<PathBuf>,

    /// Rotated log of rejected and failed submissions
    #[serde(default)]
    pub failure_log: FailureLogConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Submission validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Outgoing mail configuration
    #[serde(default)]
    pub mail: MailConfig,
}

/// Where rate-limit records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One locked file per client under `storage_dir`
    File,
    /// Process-local map; only correct for a single instance
    Memory,
}

/// Per-IP rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Accepted submissions per client within the window (default: 5)
    #[serde(default = "default_max_submissions")]
    pub max_submissions: u32,

    /// Sliding window in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Storage backend (default: file)
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Directory for the file backend (default: <tmp>/gts_ratelimit)
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

/// Daily-rotated failure log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureLogConfig {
    /// Directory for the log files (default: ./logs)
    #[serde(default = "default_failure_log_dir")]
    pub dir: PathBuf,

    /// Rotated files kept before the oldest is deleted (default: 14)
    #[serde(default = "default_failure_log_keep")]
    pub keep_files: usize,
}

/// Limits applied to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum seconds between rendering the form and submitting it (default: 3)
    #[serde(default = "default_min_submit_secs")]
    pub min_submit_secs: i64,

    /// Smallest accepted headcount (default: 1)
    #[serde(default = "default_headcount_min")]
    pub headcount_min: u8,

    /// Largest accepted headcount (default: 50)
    #[serde(default = "default_headcount_max")]
    pub headcount_max: u8,

    /// Maximum characters for location and occasion (default: 100)
    #[serde(default = "default_max_short_chars")]
    pub max_short_chars: usize,

    /// Maximum characters for the phone number (default: 50)
    #[serde(default = "default_max_phone_chars")]
    pub max_phone_chars: usize,

    /// Maximum characters for the free-text message (default: 2000)
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

/// Settings for the mail that is relayed and the pages around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Subject of the relayed mail
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Redirect target after a successful send
    #[serde(default = "default_success_location")]
    pub success_location: String,

    /// Public inbox offered on error pages
    #[serde(default = "default_fallback_inbox")]
    pub fallback_inbox: String,

    /// SMTP connection timeout in seconds (default: 20)
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_site_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_smtp_config_paths() -> Vec<PathBuf> {
    vec![
        Path::new("config").join("smtp-config.toml"),
        Path::new("..").join("config").join("smtp-config.toml"),
        Path::new("..").join("smtp-config.toml"),
    ]
}

fn default_failure_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_failure_log_keep() -> usize {
    14
}

fn default_max_submissions() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    3600
}

fn default_backend() -> StoreBackend {
    StoreBackend::File
}

fn default_storage_dir() -> PathBuf {
    std::env::temp_dir().join("gts_ratelimit")
}

fn default_min_submit_secs() -> i64 {
    3
}

fn default_headcount_min() -> u8 {
    1
}

fn default_headcount_max() -> u8 {
    50
}

fn default_max_short_chars() -> usize {
    100
}

fn default_max_phone_chars() -> usize {
    50
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_subject() -> String {
    "Neue Anfrage über das Kontaktformular".to_string()
}

fn default_success_location() -> String {
    "kontakt.html?sent=1".to_string()
}

fn default_fallback_inbox() -> String {
    "info@grazing-tables-saar.de".to_string()
}

fn default_smtp_timeout_secs() -> u64 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            site_root: default_site_root(),
            smtp_config_paths: default_smtp_config_paths(),
            failure_log: FailureLogConfig::default(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for FailureLogConfig {
    fn default() -> Self {
        Self {
            dir: default_failure_log_dir(),
            keep_files: default_failure_log_keep(),
        }
    }
}

impl FailureLogConfig {
    /// Read `FAILURE_LOG_DIR` and `FAILURE_LOG_KEEP`. Needed before the
    /// rest of [`Config`] so logging is up while that is read.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dir: std::env::var_os("FAILURE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            keep_files: env_parse("FAILURE_LOG_KEEP", defaults.keep_files),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: default_max_submissions(),
            window_secs: default_window_secs(),
            backend: default_backend(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_submit_secs: default_min_submit_secs(),
            headcount_min: default_headcount_min(),
            headcount_max: default_headcount_max(),
            max_short_chars: default_max_short_chars(),
            max_phone_chars: default_max_phone_chars(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            success_location: default_success_location(),
            fallback_inbox: default_fallback_inbox(),
            timeout_secs: default_smtp_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `BIND_ADDR`: server bind address
    /// - `SITE_ROOT`: static site directory
    /// - `SMTP_CONFIG_PATHS`: candidate SMTP config files, separated like `PATH`
    /// - `FAILURE_LOG_DIR`, `FAILURE_LOG_KEEP`: failure log directory and
    ///   number of daily files kept
    /// - `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`: per-IP limit and window
    /// - `RATE_LIMIT_BACKEND`: `file` or `memory`
    /// - `RATE_LIMIT_DIR`: directory for the file backend
    /// - `MIN_SUBMIT_SECS`: minimum form fill time
    /// - `SUCCESS_LOCATION`, `FALLBACK_INBOX`: redirect target and public inbox
    ///
    /// SMTP candidates inside the site root are dropped, see
    /// [`Config::drop_exposed_smtp_paths`].
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut config = Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            site_root: std::env::var_os("SITE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.site_root),
            smtp_config_paths: std::env::var_os("SMTP_CONFIG_PATHS")
                .map(|v| std::env::split_paths(&v).collect())
                .unwrap_or(defaults.smtp_config_paths),
            failure_log: FailureLogConfig::from_env(),
            rate_limit: RateLimitConfig {
                max_submissions: env_parse("RATE_LIMIT_MAX", defaults.rate_limit.max_submissions),
                window_secs: env_parse("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs),
                backend: match std::env::var("RATE_LIMIT_BACKEND").as_deref() {
                    Ok("memory") => StoreBackend::Memory,
                    Ok("file") | Err(_) => StoreBackend::File,
                    Ok(other) => {
                        warn!(backend = %other, "Unknown rate limit backend, using file");
                        StoreBackend::File
                    }
                },
                storage_dir: std::env::var_os("RATE_LIMIT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.rate_limit.storage_dir),
            },
            validation: ValidationConfig {
                min_submit_secs: env_parse("MIN_SUBMIT_SECS", defaults.validation.min_submit_secs),
                ..defaults.validation
            },
            mail: MailConfig {
                success_location: env_or("SUCCESS_LOCATION", defaults.mail.success_location),
                fallback_inbox: env_or("FALLBACK_INBOX", defaults.mail.fallback_inbox),
                ..defaults.mail
            },
        };

        let base = std::env::current_dir().unwrap_or_default();
        config.drop_exposed_smtp_paths(&base);
        config
    }

    /// Remove SMTP candidates that the static file service would serve.
    /// Relative paths are resolved against `base`. Returns what was removed.
    pub fn drop_exposed_smtp_paths(&mut self, base: &Path) -> Vec<PathBuf> {
        let site_root = normalize(base, &self.site_root);
        let (exposed, kept): (Vec<_>, Vec<_>) = self
            .smtp_config_paths
            .drain(..)
            .partition(|path| normalize(base, path).starts_with(&site_root));

        for path in &exposed {
            warn!(
                path = %path.display(),
                site_root = %self.site_root.display(),
                "Ignoring SMTP config candidate inside the site root"
            );
        }

        self.smtp_config_paths = kept;
        exposed
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
fn normalize(base: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// How the SMTP session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityMode {
    /// Plaintext connect, then upgrade with STARTTLS (`tls`)
    StartTls,
    /// TLS from the first byte (`ssl`)
    Implicit,
}

impl SecurityMode {
    /// Parse the `smtp_secure` value. Anything but `ssl` means STARTTLS.
    pub fn from_setting(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("ssl") {
            Self::Implicit
        } else {
            Self::StartTls
        }
    }
}

/// Resolved SMTP relay settings.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: SecurityMode,
    pub username: String,
    pub password: String,
    pub mail_from: String,
    pub mail_to: String,
}

impl SmtpSettings {
    /// Implicit TLS when configured as `ssl` or when talking to port 465.
    pub fn uses_implicit_tls(&self) -> bool {
        self.secure == SecurityMode::Implicit || self.port == 465
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mail_from", &self.mail_from)
            .field("mail_to", &self.mail_to)
            .finish()
    }
}

/// SMTP config file contents before defaulting.
#[derive(Debug, Default, Deserialize)]
struct SmtpFile {
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_secure: Option<String>,
    smtp_user: Option<String>,
    smtp_pass: Option<String>,
    mail_from: Option<String>,
    mail_to: Option<String>,
}

/// Errors from loading the SMTP settings.
#[derive(Debug, Error)]
pub enum SmtpConfigError {
    #[error("no usable SMTP config among {tried} candidate(s)")]
    Missing { tried: usize },

    #[error("SMTP config incomplete, empty: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
}

/// Reads [`SmtpSettings`] from the first existing, well-formed candidate file.
#[derive(Debug, Clone)]
pub struct SmtpConfigLoader {
    candidates: Vec<PathBuf>,
}

impl SmtpConfigLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Load and complete the settings. No defaults are invented for
    /// credentials or addresses.
    pub fn load(&self) -> Result<SmtpSettings, SmtpConfigError> {
        let file = self
            .candidates
            .iter()
            .filter(|path| path.is_file())
            .find_map(|path| match read_smtp_file(path) {
                Ok(file) => {
                    debug!(path = %path.display(), "Loaded SMTP config");
                    Some(file)
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable SMTP config");
                    None
                }
            })
            .ok_or(SmtpConfigError::Missing {
                tried: self.candidates.len(),
            })?;

        resolve(file)
    }
}

fn read_smtp_file(path: &Path) -> Result<SmtpFile, ::config::ConfigError> {
    ::config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .build()?
        .try_deserialize()
}

fn resolve(file: SmtpFile) -> Result<SmtpSettings, SmtpConfigError> {
    let settings = SmtpSettings {
        host: file
            .smtp_host
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "smtp.ionos.de".to_string()),
        port: file.smtp_port.unwrap_or(587),
        secure: SecurityMode::from_setting(file.smtp_secure.as_deref().unwrap_or("tls")),
        username: file.smtp_user.unwrap_or_default(),
        password: file.smtp_pass.unwrap_or_default(),
        mail_from: file.mail_from.unwrap_or_default(),
        mail_to: file.mail_to.unwrap_or_default(),
    };

    let missing: Vec<&'static str> = [
        ("smtp_user", &settings.username),
        ("smtp_pass", &settings.password),
        ("mail_from", &settings.mail_from),
        ("mail_to", &settings.mail_to),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(key, _)| key)
    .collect();

    if missing.is_empty() {
        Ok(settings)
    } else {
        Err(SmtpConfigError::Incomplete { missing })
    }
}
