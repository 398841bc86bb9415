//! Wallet key material on disk.
//!
//! The env-file layout is one `KEY=value` per line:
//!
//! ```text
//! PUBLIC_KEY=<base64 ed25519 public key>
//! PRIVATE_KEY=<base64 seed||public key>  or  enc:<salt>:<nonce>:<ciphertext>
//! WALLET_ADDRESS=<user-friendly address>
//! MNEMONIC=<recovery phrase, may be empty>
//! SEED=<hex seed, may be empty>
//! ```
//!
//! An encrypted private key uses a password-derived key (Argon2id) with
//! XChaCha20-Poly1305; every part is standard base64.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::{SECRET_KEY_LENGTH, SigningKey, VerifyingKey};
use log::{debug, info};
use rand::RngCore;
use thiserror::Error;

use crate::log::mask_string;
use crate::wallet::{WalletError, derive_address};

const ENCRYPTED_PREFIX: &str = "enc:";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Credential file is missing {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Stored public key does not match the private key")]
    PublicKeyMismatch,

    #[error("Private key is encrypted; a password is required")]
    PasswordRequired,

    #[error("Failed to derive encryption key: {0}")]
    KeyDerivation(String),

    #[error("Failed to encrypt private key")]
    Encryption,

    #[error("Failed to decrypt private key, wrong password?")]
    Decryption,

    #[error("Failed to derive wallet address: {0}")]
    AddressDerivation(#[from] WalletError),
}

/// An ed25519 signing key. Never printed.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.0.verifying_key()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.0
    }

    /// Seed followed by the public key, 64 bytes.
    fn to_keypair_bytes(&self) -> [u8; 64] {
        self.0.to_keypair_bytes()
    }

    /// Accepts a bare 32-byte seed or a 64-byte seed||public key pair.
    fn from_key_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .get(..SECRET_KEY_LENGTH)
            .and_then(|s| s.try_into().ok())
            .filter(|_| bytes.len() == SECRET_KEY_LENGTH || bytes.len() == 2 * SECRET_KEY_LENGTH)
            .ok_or_else(|| CredentialError::InvalidField {
                field: "PRIVATE_KEY",
                reason: format!("expected 32 or 64 bytes, got {}", bytes.len()),
            })?;
        let key = Self::from_seed(&seed);

        if bytes.len() == 2 * SECRET_KEY_LENGTH && bytes[SECRET_KEY_LENGTH..] != key.public_key().to_bytes() {
            return Err(CredentialError::PublicKeyMismatch);
        }
        Ok(key)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<REDACTED>)")
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub private_key: PrivateKey,
    pub address: String,
    pub mnemonic: Option<String>,
    pub seed: Option<String>,
}

impl Credentials {
    /// Fresh random key pair and the v4r2 wallet address it controls. The
    /// address is non-bounceable since the wallet is not deployed yet.
    pub fn generate(workchain: i8, testnet: bool) -> Result<Self, CredentialError> {
        let mut seed = [0u8; SECRET_KEY_LENGTH];
        OsRng.fill_bytes(&mut seed);
        let private_key = PrivateKey::from_seed(&seed);
        let address = derive_address(&private_key.public_key().to_bytes(), workchain)?.with_flags(false, testnet);

        Ok(Self {
            private_key,
            address: address.to_user_friendly(),
            mnemonic: None,
            seed: Some(hex::encode(seed)),
        })
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.private_key.public_key()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &hex::encode(self.public_key().to_bytes()))
            .field("private_key", &self.private_key)
            .field("address", &self.address)
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<REDACTED>"))
            .field("seed", &self.seed.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

pub trait CredentialStore {
    fn exists(&self) -> bool;

    fn load(&self, password: Option<&str>) -> Result<Credentials, CredentialError>;

    /// Writes `credentials`, encrypting the private key when `password` is
    /// given. Refuses to overwrite unless `overwrite` is set.
    fn save(&self, credentials: &Credentials, password: Option<&str>, overwrite: bool) -> Result<(), CredentialError>;
}

/// Credentials in a `.env`-style file.
#[derive(Debug, Clone)]
pub struct EnvFileCredentialStore {
    path: PathBuf,
}

impl EnvFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for EnvFileCredentialStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self, password: Option<&str>) -> Result<Credentials, CredentialError> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let fields = EnvFields::parse(&content);

        let private_key = match fields.private_key.filter(|v| !v.is_empty()) {
            None => return Err(CredentialError::MissingField("PRIVATE_KEY")),
            Some(value) => match value.strip_prefix(ENCRYPTED_PREFIX) {
                Some(encrypted) => {
                    let password = password.ok_or(CredentialError::PasswordRequired)?;
                    PrivateKey::from_key_bytes(&decrypt_private_key(encrypted, password)?)?
                },
                None => PrivateKey::from_key_bytes(&decode_base64("PRIVATE_KEY", value)?)?,
            },
        };

        if let Some(public) = fields.public_key.filter(|v| !v.is_empty()) {
            if decode_base64("PUBLIC_KEY", public)? != private_key.public_key().to_bytes() {
                return Err(CredentialError::PublicKeyMismatch);
            }
        }

        let address = fields
            .address
            .filter(|v| !v.is_empty())
            .ok_or(CredentialError::MissingField("WALLET_ADDRESS"))?
            .to_string();

        debug!(path:% = self.path.display(), address = &*mask_string(&address); "Loaded credentials");

        Ok(Credentials {
            private_key,
            address,
            mnemonic: fields.mnemonic.filter(|v| !v.is_empty()).map(str::to_string),
            seed: fields.seed.filter(|v| !v.is_empty()).map(str::to_string),
        })
    }

    fn save(&self, credentials: &Credentials, password: Option<&str>, overwrite: bool) -> Result<(), CredentialError> {
        if !overwrite && self.exists() {
            return Err(CredentialError::AlreadyExists(self.path.clone()));
        }

        let keypair = credentials.private_key.to_keypair_bytes();
        let private_key = match password {
            Some(password) => encrypt_private_key(&keypair, password)?,
            None => STANDARD.encode(keypair),
        };

        let content = format!(
            "PUBLIC_KEY={}\nPRIVATE_KEY={}\nWALLET_ADDRESS={}\nMNEMONIC={}\nSEED={}\n",
            STANDARD.encode(credentials.public_key().to_bytes()),
            private_key,
            credentials.address,
            credentials.mnemonic.as_deref().unwrap_or_default(),
            credentials.seed.as_deref().unwrap_or_default(),
        );

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, content).map_err(|e| self.io_error(e))?;
        restrict_permissions(&self.path).map_err(|e| self.io_error(e))?;

        info!(
            path:% = self.path.display(),
            encrypted = password.is_some();
            "Saved credentials"
        );
        Ok(())
    }
}

#[derive(Default)]
struct EnvFields<'a> {
    public_key: Option<&'a str>,
    private_key: Option<&'a str>,
    address: Option<&'a str>,
    mnemonic: Option<&'a str>,
    seed: Option<&'a str>,
}

impl<'a> EnvFields<'a> {
    /// Later lines win; unknown keys are ignored.
    fn parse(content: &'a str) -> Self {
        let mut fields = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "PUBLIC_KEY" => fields.public_key = Some(value),
                "PRIVATE_KEY" => fields.private_key = Some(value),
                "WALLET_ADDRESS" => fields.address = Some(value),
                "MNEMONIC" => fields.mnemonic = Some(value),
                "SEED" => fields.seed = Some(value),
                _ => {},
            }
        }
        fields
    }
}

/// Keys written by other tools sometimes lack padding.
fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>, CredentialError> {
    STANDARD_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| CredentialError::InvalidField {
            field,
            reason: e.to_string(),
        })
}

fn derive_key(password: &str, salt: &[u8]) -> Result<Key, CredentialError> {
    let mut key_bytes = [0u8; 32];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| CredentialError::KeyDerivation(e.to_string()))?;
    Ok(Key::from(key_bytes))
}

fn encrypt_private_key(data: &[u8], password: &str) -> Result<String, CredentialError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let cipher = XChaCha20Poly1305::new(&derive_key(password, &salt)?);
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher.encrypt(&nonce, data).map_err(|_| CredentialError::Encryption)?;

    Ok(format!(
        "{ENCRYPTED_PREFIX}{}:{}:{}",
        STANDARD.encode(salt),
        STANDARD.encode(nonce),
        STANDARD.encode(ciphertext)
    ))
}

fn decrypt_private_key(encrypted: &str, password: &str) -> Result<Vec<u8>, CredentialError> {
    let invalid = |reason: &str| CredentialError::InvalidField {
        field: "PRIVATE_KEY",
        reason: reason.to_string(),
    };

    let mut parts = encrypted.split(':');
    let (Some(salt), Some(nonce), Some(ciphertext), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid("expected enc:<salt>:<nonce>:<ciphertext>"));
    };

    let salt = decode_base64("PRIVATE_KEY", salt)?;
    let nonce: [u8; NONCE_LEN] = decode_base64("PRIVATE_KEY", nonce)?
        .try_into()
        .map_err(|_| invalid("nonce must be 24 bytes"))?;
    let ciphertext = decode_base64("PRIVATE_KEY", ciphertext)?;

    let cipher = XChaCha20Poly1305::new(&derive_key(password, &salt)?);
    cipher
        .decrypt(&XNonce::from(nonce), ciphertext.as_slice())
        .map_err(|_| CredentialError::Decryption)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
