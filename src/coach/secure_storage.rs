//! Encrypted on-disk storage for the coaching API key.
//!
//! Values are sealed with AES-256-GCM under a key derived (Argon2id) from a
//! machine identifier and a salt persisted alongside the ciphertexts.

use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{JournalError, JournalResult};

const STORE_FILE: &str = "secrets.enc";
const STORE_VERSION: u8 = 1;

pub const COACH_API_KEY: &str = "coach.api_key";

#[derive(Serialize, Deserialize, Clone)]
struct SealedValue {
    nonce: String,
    ciphertext: String,
}

#[derive(Serialize, Deserialize)]
struct SecretFile {
    version: u8,
    salt: String,
    values: HashMap<String, SealedValue>,
}

fn encryption_error(context: &str, err: impl std::fmt::Display) -> JournalError {
    JournalError::Encryption(format!("{}: {}", context, err))
}

pub struct SecureStorage {
    path: PathBuf,
    master_key: [u8; 32],
}

impl SecureStorage {
    pub fn new(app_data_dir: &Path) -> JournalResult<Self> {
        Self::with_machine_id(app_data_dir, &machine_id())
    }

    pub(crate) fn with_machine_id(app_data_dir: &Path, machine_id: &str) -> JournalResult<Self> {
        let path = app_data_dir.join(STORE_FILE);
        let file = load_or_create(&path)?;
        if !path.exists() {
            write_file(&path, &file)?;
        }

        let master_key = derive_key(machine_id, &file.salt)?;
        Ok(Self { path, master_key })
    }

    fn cipher(&self) -> JournalResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.master_key).map_err(|e| encryption_error("Invalid key", e))
    }

    pub fn store(&self, key: &str, value: &str) -> JournalResult<()> {
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), value.as_bytes())?;

        let mut file = load_or_create(&self.path)?;
        file.values.insert(
            key.to_string(),
            SealedValue {
                nonce: BASE64.encode(nonce_bytes),
                ciphertext: BASE64.encode(&ciphertext),
            },
        );
        write_file(&self.path, &file)?;

        log::info!("Stored secret '{}'", key);
        Ok(())
    }

    /// `None` when nothing is stored under `key`
    pub fn retrieve(&self, key: &str) -> JournalResult<Option<String>> {
        let file = load_or_create(&self.path)?;
        let Some(sealed) = file.values.get(key) else {
            return Ok(None);
        };

        let nonce_bytes = BASE64
            .decode(&sealed.nonce)
            .map_err(|e| encryption_error("Invalid nonce", e))?;
        if nonce_bytes.len() != 12 {
            return Err(JournalError::Encryption("Invalid nonce length".to_string()));
        }
        let ciphertext = BASE64
            .decode(&sealed.ciphertext)
            .map_err(|e| encryption_error("Invalid ciphertext", e))?;

        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())?;

        String::from_utf8(plaintext)
            .map(Some)
            .map_err(|e| encryption_error("Invalid UTF-8", e))
    }

    pub fn delete(&self, key: &str) -> JournalResult<()> {
        let mut file = load_or_create(&self.path)?;
        if file.values.remove(key).is_some() {
            write_file(&self.path, &file)?;
            log::info!("Deleted secret '{}'", key);
        }
        Ok(())
    }
}

fn load_or_create(path: &Path) -> JournalResult<SecretFile> {
    if path.exists() {
        let data = fs::read(path).map_err(|e| encryption_error("Failed to read store", e))?;
        return serde_json::from_slice(&data).map_err(|e| encryption_error("Failed to parse store", e));
    }

    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    Ok(SecretFile {
        version: STORE_VERSION,
        salt: BASE64.encode(salt),
        values: HashMap::new(),
    })
}

fn write_file(path: &Path, file: &SecretFile) -> JournalResult<()> {
    let data = serde_json::to_vec_pretty(file)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| encryption_error("Failed to create directory", e))?;
    }
    fs::write(path, data).map_err(|e| encryption_error("Failed to write store", e))
}

fn machine_id() -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string());

    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".to_string());

    format!("trade-journal-{}-{}", hostname, username)
}

fn derive_key(machine_id: &str, salt_b64: &str) -> JournalResult<[u8; 32]> {
    let salt = BASE64
        .decode(salt_b64)
        .map_err(|e| encryption_error("Invalid salt", e))?;

    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
        .hash_password_into(machine_id.as_bytes(), &salt, &mut key)
        .map_err(|e| encryption_error("Key derivation failed", e))?;
    Ok(key)
}
