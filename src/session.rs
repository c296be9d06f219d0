use std::fmt::Display;
use std::hash::Hash;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A remote peer connected over the transport.
///
/// Identity is the id alone, the address and connect time are for diagnostics.
#[derive(Debug, Clone, Eq)]
pub struct Session {
    id: Uuid,
    addr: SocketAddr,
    since: DateTime<Utc>,
}

impl Session {
    /// A new, unique session for a peer at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            addr,
            since: Utc::now(),
        }
    }

    /// The unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Where the peer connected from.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// When the peer connected.
    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Session {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id.simple().to_string();
        write!(f, "{}@{}", &id[..8], self.addr)
    }
}
