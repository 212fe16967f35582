//! Remote uplink target.

use core::fmt;
use core::str::FromStr;

use crate::error::UplinkError;

/// `host:port` of the receiving endpoint.
///
/// Immutable once built; two endpoints are the same target exactly when
/// they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Validate and build an endpoint.  The host is trimmed; it must be
    /// non-empty and free of whitespace.  Port `0` is rejected.
    pub fn new(host: &str, port: u16) -> Result<Self, UplinkError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(UplinkError::EndpointInvalid("host is empty"));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(UplinkError::EndpointInvalid("host contains whitespace"));
        }
        if port == 0 {
            return Err(UplinkError::EndpointInvalid("port must be in 1-65535"));
        }
        Ok(Self {
            host: host.to_owned(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = UplinkError;

    /// Accepts `host:port` and `[v6addr]:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or(UplinkError::EndpointInvalid("expected host:port"))?;
        let host = match host.strip_prefix('[') {
            Some(inner) => inner
                .strip_suffix(']')
                .ok_or(UplinkError::EndpointInvalid("unterminated IPv6 bracket"))?,
            None if host.contains(':') => {
                return Err(UplinkError::EndpointInvalid("IPv6 hosts need brackets"));
            }
            None => host,
        };
        let port = port
            .parse::<u16>()
            .map_err(|_| UplinkError::EndpointInvalid("port must be a number in 1-65535"))?;
        Self::new(host, port)
    }
}
