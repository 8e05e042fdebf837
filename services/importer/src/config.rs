//! Runtime configuration
//!
//! Database settings come from the environment (optionally seeded from a
//! `.env` file by the binary). Import options come from the command line.

use std::fmt;

use encoding_rs::Encoding;

use crate::error::ImportError;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_NAME: &str = "protestos_db";

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_PROGRESS_EVERY: u64 = 1000;

/// Database connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Full connection URL; overrides every other field when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: None,
            database: DEFAULT_DB_NAME.to_string(),
        }
    }
}

impl DbConfig {
    /// Read `DB_URL`, `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD` and `DB_NAME`
    pub fn from_env() -> Result<Self, ImportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ImportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("DB_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                ImportError::Config(format!("DB_PORT '{}' is not a valid port: {}", raw, e))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            url: get("DB_URL"),
            host: get("DB_HOST").unwrap_or(defaults.host),
            port,
            user: get("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").filter(|v| !v.is_empty()),
            database: get("DB_NAME").unwrap_or(defaults.database),
        })
    }

    /// Config that connects straight to `url`
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// URL handed to the driver
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let credentials = match &self.password {
            Some(password) => format!(
                "{}:{}",
                urlencoding::encode(&self.user),
                urlencoding::encode(password)
            ),
            None => urlencoding::encode(&self.user).into_owned(),
        };

        format!(
            "mysql://{}@{}:{}/{}",
            credentials, self.host, self.port, self.database
        )
    }
}

// Never print the password.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Display for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => {
                let scheme = url.split(':').next().unwrap_or("db");
                write!(f, "{}://<from DB_URL>", scheme)
            }
            None => write!(
                f,
                "mysql://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }
}

/// Options controlling how the source file is read and reported
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub progress_every: u64,
    /// Extract and validate rows without touching the database
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoding: encoding_rs::UTF_8,
            progress_every: DEFAULT_PROGRESS_EVERY,
            dry_run: false,
        }
    }
}

impl ImportOptions {
    /// Validate raw command line values
    pub fn new(
        delimiter: char,
        encoding_label: &str,
        progress_every: u64,
        dry_run: bool,
    ) -> Result<Self, ImportError> {
        if !delimiter.is_ascii() || delimiter.is_ascii_alphanumeric() {
            return Err(ImportError::Config(format!(
                "delimiter must be a single ASCII punctuation or whitespace character, got {:?}",
                delimiter
            )));
        }
        // Amounts use a decimal comma.
        if delimiter == ',' {
            return Err(ImportError::Config(
                "',' cannot be the delimiter: it is the decimal separator of amounts".to_string(),
            ));
        }
        if delimiter == '"' {
            return Err(ImportError::Config(
                "'\"' is the quote character and cannot be the delimiter".to_string(),
            ));
        }

        let encoding = Encoding::for_label(encoding_label.trim().as_bytes()).ok_or_else(|| {
            ImportError::Config(format!("unknown encoding label '{}'", encoding_label))
        })?;
        if !encoding.is_ascii_compatible() {
            return Err(ImportError::Config(format!(
                "encoding {} is not ASCII-compatible",
                encoding.name()
            )));
        }

        if progress_every == 0 {
            return Err(ImportError::Config(
                "progress interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            delimiter: delimiter as u8,
            encoding,
            progress_every,
            dry_run,
        })
    }
}
