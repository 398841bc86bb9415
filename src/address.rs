//! TON account addresses.
//!
//! Two textual forms are accepted:
//!
//! - raw: `workchain:hex` (e.g. `0:83df...`)
//! - user-friendly: 48 characters of base64 or base64url encoding
//!   `tag:u8 workchain:i8 hash:[u8; 32] crc16:u16`
//!
//! The CRC16 of the user-friendly form is verified on parse.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use thiserror::Error;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Invalid workchain: {0}")]
    InvalidWorkchain(String),

    #[error("Invalid account hash: {0}")]
    InvalidHash(String),

    #[error("Invalid base64 address: {0}")]
    InvalidBase64(String),

    #[error("User-friendly address must be 36 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Unknown address tag 0x{0:02x}")]
    InvalidTag(u8),

    #[error("CRC16 mismatch: expected {expected:04x}, got {actual:04x}")]
    ChecksumMismatch { expected: u16, actual: u16 },
}

/// A standard (`addr_std`) internal address plus the flags of its
/// user-friendly rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    workchain: i8,
    hash_part: [u8; 32],
    bounceable: bool,
    testnet: bool,
}

impl TonAddress {
    pub fn new(workchain: i8, hash_part: [u8; 32]) -> Self {
        Self {
            workchain,
            hash_part,
            bounceable: true,
            testnet: false,
        }
    }

    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some((workchain, hash)) = s.split_once(':') {
            return Self::parse_raw(workchain, hash);
        }

        Self::parse_user_friendly(s)
    }

    fn parse_raw(workchain: &str, hash: &str) -> Result<Self, AddressError> {
        let workchain: i8 = workchain
            .parse()
            .map_err(|_| AddressError::InvalidWorkchain(workchain.to_string()))?;

        let bytes = hex::decode(hash).map_err(|e| AddressError::InvalidHash(e.to_string()))?;
        let hash_part: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| AddressError::InvalidHash(format!("expected 32 bytes, got {}", b.len())))?;

        Ok(Self::new(workchain, hash_part))
    }

    fn parse_user_friendly(s: &str) -> Result<Self, AddressError> {
        let bytes = if s.contains(['-', '_']) {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| AddressError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(AddressError::InvalidLength(bytes.len()));
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        let actual = crc16(&bytes[..34]);
        if expected != actual {
            return Err(AddressError::ChecksumMismatch { expected, actual });
        }

        let tag = bytes[0];
        let testnet = tag & TAG_TESTNET != 0;
        let bounceable = match tag & !TAG_TESTNET {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            _ => return Err(AddressError::InvalidTag(tag)),
        };

        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8,
            hash_part,
            bounceable,
            testnet,
        })
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn hash_part(&self) -> &[u8; 32] {
        &self.hash_part
    }

    pub fn is_bounceable(&self) -> bool {
        self.bounceable
    }

    pub fn is_testnet(&self) -> bool {
        self.testnet
    }

    pub fn with_flags(mut self, bounceable: bool, testnet: bool) -> Self {
        self.bounceable = bounceable;
        self.testnet = testnet;
        self
    }

    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    /// Renders the base64url user-friendly form using this address's flags.
    pub fn to_user_friendly(&self) -> String {
        let mut tag = if self.bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if self.testnet {
            tag |= TAG_TESTNET;
        }

        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash_part);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());

        URL_SAFE.encode(bytes)
    }
}

impl FromStr for TonAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_friendly())
    }
}

fn crc16(data: &[u8]) -> u16 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    CRC16.checksum(data)
}
