//! A short-lived service on the loopback interface paired with a client connected to it.

use crate::error::Error;
use crate::supervisor::{Config, Supervisor};
use crate::transport::Client;
use crate::Location;
use std::ops::{Deref, DerefMut};

/// A [`Client`] connected to a service that exists only as long as this value.
///
/// Dropping it shuts the service down and joins its workers.
#[derive(Debug)]
pub struct Transitive {
    client: Client,
    supervisor: Supervisor,
}

impl Transitive {
    /// The service the client is connected to.
    #[inline]
    pub const fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Open another connection to the same service.
    pub async fn connect(&self) -> Result<Client, Error> {
        Client::connect(&Location::from(self.supervisor().local_addr())).await
    }
}

impl Deref for Transitive {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl DerefMut for Transitive {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}

/// Start a service with `workers` threads on an unused loopback port and connect to it.
pub async fn client(workers: usize) -> Result<Transitive, Error> {
    let supervisor = Supervisor::start(Config::new(Location::localhost(0), workers)?)?;
    let client = Client::connect(&Location::from(supervisor.local_addr())).await?;

    Ok(Transitive {
        client,
        supervisor,
    })
}
