//! Network endpoints.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};

use crate::error::{Result, SyncError};

/// Host used when an endpoint string leaves it empty.
pub const DEFAULT_HOST: &str = "localhost";

/// A validated `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkEndpoint {
    host: String,
    port: u16,
}

impl NetworkEndpoint {
    /// Create an endpoint. An empty host means [`DEFAULT_HOST`].
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let host = if host.trim().is_empty() {
            DEFAULT_HOST.to_owned()
        } else {
            host.trim().to_owned()
        };
        Self { host, port }
    }

    /// Parse `host:port` or `:port`.
    ///
    /// Returns [`SyncError::Port`] if the port part is missing or not a
    /// valid integer.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| SyncError::Port(s.to_owned()))?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| SyncError::Port(s.to_owned()))?;
        Ok(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve to a socket address.
    ///
    /// Returns [`SyncError::Address`] if the host does not resolve.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| SyncError::Address {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;
        addrs.next().ok_or_else(|| SyncError::Address {
            host: self.host.clone(),
            reason: "no addresses".into(),
        })
    }

    /// Check that something is listening, with a bounded connect.
    pub async fn validate_connection(&self, timeout: Duration) -> Result<()> {
        let addr = self.resolve().await?;
        match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Err(_) => Err(SyncError::Timeout("connect")),
            Ok(Err(e)) => Err(SyncError::Connection(format!("{}: {}", self, e))),
            Ok(Ok(_stream)) => Ok(()),
        }
    }
}

impl fmt::Display for NetworkEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NetworkEndpoint {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SocketAddr> for NetworkEndpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let endpoint = NetworkEndpoint::parse("10.0.0.5:6668").unwrap();
        assert_eq!(endpoint.host(), "10.0.0.5");
        assert_eq!(endpoint.port(), 6668);
        assert_eq!(endpoint.to_string(), "10.0.0.5:6668");
    }

    #[test]
    fn test_empty_host_is_localhost() {
        let endpoint = NetworkEndpoint::parse(":6667").unwrap();
        assert_eq!(endpoint.host(), "localhost");
    }

    #[test]
    fn test_bad_port() {
        assert!(matches!(
            NetworkEndpoint::parse("localhost:abc"),
            Err(SyncError::Port(_))
        ));
        assert!(matches!(
            NetworkEndpoint::parse("localhost"),
            Err(SyncError::Port(_))
        ));
        assert!(matches!(
            NetworkEndpoint::parse("localhost:70000"),
            Err(SyncError::Port(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_failure() {
        let endpoint = NetworkEndpoint::new("no-such-host.invalid", 6667);
        assert!(matches!(
            endpoint.resolve().await,
            Err(SyncError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn test_validate_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = NetworkEndpoint::from(listener.local_addr().unwrap());
        endpoint
            .validate_connection(Duration::from_secs(1))
            .await
            .unwrap();

        drop(listener);
        assert!(endpoint
            .validate_connection(Duration::from_secs(1))
            .await
            .is_err());
    }
}
