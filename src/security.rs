/// 🔐 SECURITY MODULE: cryptographically secure operations
/// CRITICAL: all security-sensitive operations centralized here for audit
/// Purpose: API key generation, secure random generation, security constants
use crate::error::CoordinatorError;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// 🔑 API KEY SPECIFICATIONS
/// DECISION: 64 base62 chars ≈ 380 bits of entropy, comfortably above the 256-bit floor
/// Alternative: 32 chars (rejected: too little entropy), 128 chars (rejected: unwieldy)
pub const API_KEY_LENGTH: usize = 64;

/// 📁 API KEY FILE LOCATION
/// DECISION: project-root dotfile, gitignored, not env-var-only
/// Why: persists across restarts without committing a secret to the repo
pub const API_KEY_FILE: &str = ".coordinator-api-key";

/// 🎲 SECURE RANDOM API KEY GENERATOR
/// Why: `thread_rng()` seeds from OS entropy, unlike a timestamp or counter
pub fn generate_secure_api_key() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// 💾 API KEY PERSISTENCE: writes with owner-only permissions on unix
/// CRITICAL: 0600 prevents other local users/processes from reading the key
pub fn save_api_key_to_file(api_key: &str) -> Result<(), CoordinatorError> {
    fs::write(API_KEY_FILE, api_key)
        .map_err(|e| CoordinatorError::Configuration(format!("failed to write API key file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(API_KEY_FILE)
            .map_err(|e| CoordinatorError::Configuration(format!("failed to stat API key file: {e}")))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(API_KEY_FILE, perms)
            .map_err(|e| CoordinatorError::Configuration(format!("failed to chmod API key file: {e}")))?;
    }

    info!("saved API key to {}", API_KEY_FILE);
    Ok(())
}

/// 📖 API KEY LOADING
/// DECISION: a missing file returns `None` rather than erroring, so the
/// generate-and-persist fallback in `ensure_api_key_exists` can run
pub fn load_api_key_from_file() -> Result<Option<String>, CoordinatorError> {
    if !Path::new(API_KEY_FILE).exists() {
        return Ok(None);
    }

    let key = fs::read_to_string(API_KEY_FILE)
        .map_err(|e| CoordinatorError::Configuration(format!("failed to read API key file: {e}")))?
        .trim()
        .to_string();

    if key.len() != API_KEY_LENGTH || !key.chars().all(|c| c.is_alphanumeric()) {
        warn!("API key file {} has an invalid format", API_KEY_FILE);
        return Err(CoordinatorError::Configuration(
            "invalid API key format in file".to_string(),
        ));
    }

    Ok(Some(key))
}

/// 🔄 API KEY INITIALIZATION
/// DECISION: an `API_KEY` env var always wins; otherwise load (or generate
/// and persist) the file-backed key, so a fresh checkout still boots secured
pub fn ensure_api_key_exists(existing_api_key: Option<&str>) -> Result<String, CoordinatorError> {
    if let Some(key) = existing_api_key {
        if !key.trim().is_empty() {
            return Ok(key.to_string());
        }
    }

    match load_api_key_from_file()? {
        Some(key) => Ok(key),
        None => {
            let key = generate_secure_api_key();
            save_api_key_to_file(&key)?;
            Ok(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_expected_length_and_charset() {
        let key = generate_secure_api_key();
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = generate_secure_api_key();
        let b = generate_secure_api_key();
        assert_ne!(a, b);
    }
}
