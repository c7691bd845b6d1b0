use anyhow::Result;
use std::path::PathBuf;

const KEYPOOL_DIR: &str = ".keypool";
const DB_FILE: &str = "keypool.db";
const HISTORY_FILE: &str = "balance_history.json";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the KeyPool directory.
const KEYPOOL_DIR_ENV: &str = "KEYPOOL_DIR";

/// Resolve the KeyPool data directory.
/// Priority: KEYPOOL_DIR env var > ~/.keypool/
pub fn resolve_keypool_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(KEYPOOL_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(KEYPOOL_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the KeyPool directory exists and return its path.
pub fn ensure_keypool_dir() -> Result<PathBuf> {
    let dir = resolve_keypool_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the database path: ~/.keypool/keypool.db
pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_keypool_dir()?.join(DB_FILE))
}

/// Ensure the data directory exists and return the database path.
pub fn ensure_database_path() -> Result<PathBuf> {
    Ok(ensure_keypool_dir()?.join(DB_FILE))
}

/// Get the lookup history path: ~/.keypool/balance_history.json
pub fn history_path() -> Result<PathBuf> {
    Ok(resolve_keypool_dir()?.join(HISTORY_FILE))
}

/// Get the logs directory: ~/.keypool/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_keypool_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    #[test]
    fn test_default_keypool_dir() {
        let _lock = env_lock();
        unsafe { std::env::remove_var(KEYPOOL_DIR_ENV) };
        let dir = resolve_keypool_dir().unwrap();
        assert!(dir.ends_with(KEYPOOL_DIR));
    }

    #[test]
    fn test_env_override() {
        let _lock = env_lock();
        unsafe { std::env::set_var(KEYPOOL_DIR_ENV, "/tmp/test-keypool") };
        assert_eq!(resolve_keypool_dir().unwrap(), PathBuf::from("/tmp/test-keypool"));
        assert_eq!(
            history_path().unwrap(),
            PathBuf::from("/tmp/test-keypool/balance_history.json")
        );
        unsafe { std::env::remove_var(KEYPOOL_DIR_ENV) };
    }

    #[test]
    fn test_database_path() {
        let _lock = env_lock();
        unsafe { std::env::remove_var(KEYPOOL_DIR_ENV) };
        let path = database_path().unwrap();
        assert!(path.ends_with(DB_FILE));
        assert!(path.parent().unwrap().ends_with(KEYPOOL_DIR));
    }
}
