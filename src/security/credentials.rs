//! Basic-Auth credential store.
//!
//! # Responsibilities
//! - Hold users configured with plain, base64 or hex digest passwords
//! - Reject duplicate usernames across every encoding
//! - Verify a supplied plaintext password
//!
//! # Design Decisions
//! - Secrets are decoded once at load time; a bad secret is a config error
//! - Username comparison optionally case-insensitive, passwords always exact

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::config::schema::UserConfig;

/// How a configured password is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Plain,
    Base64,
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Plain => "plain",
            Encoding::Base64 => "base64",
            Encoding::Md5 => "md5",
            Encoding::Sha1 => "sha1",
            Encoding::Sha256 => "sha256",
            Encoding::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes for hashed encodings.
    fn digest_len(&self) -> Option<usize> {
        match self {
            Encoding::Plain | Encoding::Base64 => None,
            Encoding::Md5 => Some(16),
            Encoding::Sha1 => Some(20),
            Encoding::Sha256 => Some(32),
            Encoding::Sha512 => Some(64),
        }
    }

    /// Bytes compared against the stored secret for a supplied password.
    fn digest(&self, password: &[u8]) -> Vec<u8> {
        match self {
            Encoding::Plain | Encoding::Base64 => password.to_vec(),
            Encoding::Md5 => Md5::digest(password).to_vec(),
            Encoding::Sha1 => Sha1::digest(password).to_vec(),
            Encoding::Sha256 => Sha256::digest(password).to_vec(),
            Encoding::Sha512 => Sha512::digest(password).to_vec(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while loading credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("duplicated usernames: {}", .0.join(", "))]
    DuplicateUsernames(Vec<String>),

    #[error("user {username:?}: password is not a valid {encoding} value")]
    InvalidSecret { username: String, encoding: Encoding },
}

#[derive(Debug, Clone)]
struct StoredCredential {
    encoding: Encoding,
    secret: Vec<u8>,
}

/// Users of one virtual host.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    match_case: bool,
    users: HashMap<String, StoredCredential>,
}

impl CredentialStore {
    pub fn new(match_case: bool) -> Self {
        Self {
            match_case,
            users: HashMap::new(),
        }
    }

    /// Build a store from configured users.
    ///
    /// All duplicate usernames are gathered into a single error, alongside
    /// every undecodable secret.
    pub fn from_users(users: &[UserConfig], match_case: bool) -> Result<Self, Vec<CredentialError>> {
        let mut store = Self::new(match_case);
        let mut errors = Vec::new();

        // Duplicates are found on names alone, whether or not secrets decode.
        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for user in users {
            if !seen.insert(store.key(&user.username)) && !duplicates.contains(&user.username) {
                duplicates.push(user.username.clone());
            }
        }

        for user in users {
            match store.add(&user.username, &user.password, user.encoding) {
                Ok(()) | Err(CredentialError::DuplicateUsernames(_)) => {}
                Err(e) => errors.push(e),
            }
        }

        if !duplicates.is_empty() {
            errors.insert(0, CredentialError::DuplicateUsernames(duplicates));
        }
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(store)
    }

    fn key<'a>(&self, username: &'a str) -> Cow<'a, str> {
        if self.match_case {
            Cow::Borrowed(username)
        } else {
            Cow::Owned(username.to_lowercase())
        }
    }

    /// Register a user. Fails if the username is already taken under any encoding.
    pub fn add(&mut self, username: &str, secret: &str, encoding: Encoding) -> Result<(), CredentialError> {
        let key = self.key(username).into_owned();
        if self.users.contains_key(&key) {
            return Err(CredentialError::DuplicateUsernames(vec![username.to_string()]));
        }

        let invalid = || CredentialError::InvalidSecret {
            username: username.to_string(),
            encoding,
        };
        let secret = match encoding {
            Encoding::Plain => secret.as_bytes().to_vec(),
            Encoding::Base64 => general_purpose::STANDARD.decode(secret).map_err(|_| invalid())?,
            _ => {
                let digest = hex::decode(secret).map_err(|_| invalid())?;
                if Some(digest.len()) != encoding.digest_len() {
                    return Err(invalid());
                }
                digest
            }
        };

        self.users.insert(key, StoredCredential { encoding, secret });
        Ok(())
    }

    /// Check a username and plaintext password.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let key = self.key(username);
        match self.users.get(key.as_ref()) {
            Some(stored) => stored.encoding.digest(password.as_bytes()) == stored.secret,
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}
