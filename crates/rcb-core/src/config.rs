use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{delivery::RetryPolicy, errors::Error, Result};

/// Telegram refuses bot downloads above 20MB, so larger uploads are rejected up front.
const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Typed configuration for the bot process.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_allowed_users: Vec<i64>,

    // Working storage
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_file_size: u64,

    // Delivery
    pub delivery_max_attempts: u32,
    pub delivery_max_backoff: Duration,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        // Empty allow-list keeps the bot open to everyone.
        let telegram_allowed_users = parse_csv_i64(env_str("TELEGRAM_ALLOWED_USERS"));

        let input_dir = env_path("RCB_INPUT_DIR").unwrap_or_else(|| PathBuf::from("uploads"));
        let output_dir = env_path("RCB_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from("outputs"));
        fs::create_dir_all(&input_dir)?;
        fs::create_dir_all(&output_dir)?;

        let max_file_size = env_u64("RCB_MAX_FILE_SIZE").unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let defaults = RetryPolicy::default();
        let delivery_max_attempts = env_u32("RCB_DELIVERY_MAX_ATTEMPTS")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_attempts);
        let delivery_max_backoff = env_u64("RCB_DELIVERY_MAX_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/rcb-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            telegram_allowed_users,
            input_dir,
            output_dir,
            max_file_size,
            delivery_max_attempts,
            delivery_max_backoff,
            audit_log_path,
            audit_log_json,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.delivery_max_attempts,
            max_backoff: self.delivery_max_backoff,
            ..RetryPolicy::default()
        }
    }

    /// Empty allow-list means everyone may use the bot.
    pub fn is_user_allowed(&self, user_id: Option<i64>) -> bool {
        if self.telegram_allowed_users.is_empty() {
            return true;
        }
        user_id.is_some_and(|id| self.telegram_allowed_users.contains(&id))
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
