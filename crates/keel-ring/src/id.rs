//! Server identities and request keys.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a backend server on the ring.
///
/// Ordered numerically, so "the highest-numbered server" is well defined.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(u64);

impl ServerId {
    /// Wrap a raw server number.
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    /// Return the raw server number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id directly after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for ServerId {
    fn from(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server-{}", self.0)
    }
}

impl fmt::Debug for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerId({})", self.0)
    }
}

/// Error returned when parsing a [`ServerId`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server id: {0:?}")]
pub struct ParseServerIdError(String);

impl FromStr for ServerId {
    type Err = ParseServerIdError;

    /// Accepts either a bare number (`"7"`) or the display form (`"server-7"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("server-").unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseServerIdError(s.to_string()))
    }
}

/// A request key to be routed.
///
/// Integer keys keep their numeric value so that arithmetic hash strategies
/// can use it directly. Everything else is carried as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestKey {
    /// A numeric key, e.g. a request id.
    Int(u64),
    /// An opaque byte-string key, e.g. a client address or a path.
    Bytes(Vec<u8>),
}

impl RequestKey {
    /// Numeric view of the key.
    ///
    /// Byte keys fold their first 8 bytes little-endian (zero padded).
    pub fn as_u64(&self) -> u64 {
        match self {
            Self::Int(n) => *n,
            Self::Bytes(b) => {
                let mut buf = [0u8; 8];
                let len = b.len().min(8);
                buf[..len].copy_from_slice(&b[..len]);
                u64::from_le_bytes(buf)
            }
        }
    }

    /// Canonical byte form fed to digest hashes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Int(n) => n.to_le_bytes().to_vec(),
            Self::Bytes(b) => b.clone(),
        }
    }
}

macro_rules! int_key {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RequestKey {
                fn from(n: $t) -> Self {
                    Self::Int(n as u64)
                }
            }
        )*
    };
}

int_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl From<&str> for RequestKey {
    fn from(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for RequestKey {
    fn from(s: String) -> Self {
        Self::Bytes(s.into_bytes())
    }
}

impl From<&[u8]> for RequestKey {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.to_vec())
    }
}

impl From<IpAddr> for RequestKey {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::Bytes(v4.octets().to_vec()),
            IpAddr::V6(v6) => Self::Bytes(v6.octets().to_vec()),
        }
    }
}

/// Only the IP is used: the ephemeral port changes per connection.
impl From<SocketAddr> for RequestKey {
    fn from(addr: SocketAddr) -> Self {
        addr.ip().into()
    }
}
