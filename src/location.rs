use crate::error::ConfigError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// The address of a memtro endpoint, written as `tcp://*:<port>` or `tcp://<ip>:<port>`.
#[non_exhaustive] // future-proofing for other transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// A TCP socket address. An unspecified IP listens on every interface.
    Tcp {
        /// The address to bind or connect to.
        addr: SocketAddr,
    },
}

impl Location {
    /// Listen on `port` on every IPv4 interface, i.e. `tcp://*:<port>`.
    #[inline]
    pub const fn any(port: u16) -> Self {
        Self::Tcp {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }

    /// The loopback address on `port`. Port `0` lets the operating system pick one.
    #[inline]
    pub const fn localhost(port: u16) -> Self {
        Self::Tcp {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        }
    }

    /// The socket address behind this location.
    #[inline]
    pub const fn socket_addr(&self) -> SocketAddr {
        match self {
            Self::Tcp { addr } => *addr,
        }
    }
}

impl From<SocketAddr> for Location {
    fn from(addr: SocketAddr) -> Self {
        Self::Tcp { addr }
    }
}

impl FromStr for Location {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Location(s.to_owned());

        let rest = s.strip_prefix("tcp://").ok_or_else(invalid)?;
        if let Some(port) = rest.strip_prefix("*:") {
            return port.parse().map(Self::any).map_err(|_| invalid());
        }
        rest.parse::<SocketAddr>()
            .map(Self::from)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { addr } if addr.ip() == IpAddr::V4(Ipv4Addr::UNSPECIFIED) => {
                write!(f, "tcp://*:{}", addr.port())
            }
            Self::Tcp { addr } => write!(f, "tcp://{addr}"),
        }
    }
}
