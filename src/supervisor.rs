//! Ownership and supervision of the worker pool.

use crate::error::{ConfigError, Error};
use crate::store::Store;
use crate::tracing_shim::{debug, error, info};
use crate::transport::Endpoint;
use crate::worker::Worker;
use crate::Location;
use crossbeam::channel;
use std::io;
use std::net::SocketAddr;
use std::ops::Range;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The permitted number of workers.
pub const WORKER_COUNT: Range<usize> = 1..500;

/// Validated parameters for a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    location: Location,
    workers: usize,
}

impl Config {
    /// Listen on `location` with a pool of `workers` threads.
    ///
    /// `workers` must lie within [`WORKER_COUNT`].
    pub fn new(location: Location, workers: usize) -> Result<Self, ConfigError> {
        if !WORKER_COUNT.contains(&workers) {
            return Err(ConfigError::WorkerCount(workers));
        }
        Ok(Self { location, workers })
    }

    /// Where the service listens.
    #[inline]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// How many workers serve requests.
    #[inline]
    pub const fn workers(&self) -> usize {
        self.workers
    }
}

/// Owns the [`Store`], the [`Endpoint`], and the workers sharing them.
///
/// Workers are expected to run for as long as the process does. [`wait`](Self::wait) blocks until
/// that expectation is broken. Dropping the supervisor closes the endpoint and joins the workers.
#[derive(Debug)]
pub struct Supervisor {
    store: Arc<Store>,
    endpoint: Arc<Endpoint>,
    workers: Vec<JoinHandle<()>>,
    exits: channel::Receiver<WorkerExit>,
}

/// Sent when a worker thread finishes, whether it returned or unwound.
#[derive(Debug, Clone, Copy)]
struct WorkerExit {
    worker: usize,
    panicked: bool,
}

/// Reports the exit of the worker running on the current thread when dropped.
#[derive(Debug)]
struct ExitGuard {
    worker: usize,
    exits: channel::Sender<WorkerExit>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let exit = WorkerExit {
            worker: self.worker,
            panicked: thread::panicking(),
        };
        // The supervisor may already be gone during shutdown.
        let _sent = self.exits.send(exit);
    }
}

/// Run `body` on a new thread named for worker `id`, reporting its exit on `exits`.
fn spawn_worker<F>(
    id: usize,
    exits: &channel::Sender<WorkerExit>,
    body: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let guard = ExitGuard {
        worker: id,
        exits: exits.clone(),
    };
    thread::Builder::new()
        .name(format!("memtro-worker-{id}"))
        .spawn(move || {
            let _guard = guard;
            body();
        })
}

impl Supervisor {
    /// Bind the endpoint, create the store, and spawn every worker.
    pub fn start(config: Config) -> Result<Self, Error> {
        let endpoint = Arc::new(Endpoint::bind(config.location())?);
        let store = Arc::new(Store::new());
        let (exits_tx, exits) = channel::unbounded();

        let workers = (0..config.workers())
            .map(|id| {
                let worker = Worker::new(id, Arc::clone(&store), Arc::clone(&endpoint));
                spawn_worker(id, &exits_tx, move || worker.run())
            })
            .collect::<Result<Vec<_>, _>>();

        let workers = match workers {
            Ok(workers) => workers,
            Err(err) => {
                // Threads that did start exit once the endpoint is closed.
                endpoint.close();
                return Err(err.into());
            }
        };

        info!(
            location = %config.location(),
            local_addr = %endpoint.local_addr(),
            "all {} threads online; system ready",
            workers.len()
        );

        Ok(Self {
            store,
            endpoint,
            workers,
            exits,
        })
    }

    /// The address the endpoint is bound to.
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// The store shared by the workers.
    #[inline]
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// The number of workers in the pool.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Block until a worker terminates, then report it.
    ///
    /// Workers never finish while the service is running, so this only returns when an
    /// invariant has been violated. The returned error is always fatal.
    pub fn wait(self) -> Error {
        let Ok(WorkerExit { worker, panicked }) = self.exits.recv() else {
            // Every guard was dropped without reporting, which cannot happen while `self` holds
            // the join handles. Treat it as the loss of the whole pool.
            return Error::WorkerTerminated {
                worker: 0,
                panicked: false,
            };
        };
        error!(worker, panicked, "worker terminated unexpectedly");
        Error::WorkerTerminated { worker, panicked }
    }

    /// Close the endpoint and wait for every worker to stop.
    ///
    /// Dropping the supervisor does the same.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Close the endpoint and join the workers. Stopping twice does nothing.
    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        info!(local_addr = %self.endpoint.local_addr(), "shutting down");
        self.endpoint.close();

        for (id, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() {
                error!(worker = id, "worker panicked");
            }
        }
        debug!(entries = self.store.len(), "all workers stopped");
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_worker_count_bounds() {
        let location = Location::localhost(0);

        assert_eq!(
            Config::new(location, 0),
            Err(ConfigError::WorkerCount(0))
        );
        assert_eq!(
            Config::new(location, 500),
            Err(ConfigError::WorkerCount(500))
        );
        assert_eq!(Config::new(location, 1).map(|c| c.workers()), Ok(1));
        assert_eq!(Config::new(location, 499).map(|c| c.workers()), Ok(499));
    }

    #[test]
    fn test_start_and_shutdown() -> Result<(), Error> {
        let supervisor = Supervisor::start(Config::new(Location::localhost(0), 4)?)?;

        assert_eq!(supervisor.workers(), 4);
        assert_ne!(supervisor.local_addr().port(), 0);
        assert!(supervisor.store().is_empty());

        supervisor.shutdown();
        Ok(())
    }

    #[test]
    fn test_wait_reports_terminated_worker() -> Result<(), Error> {
        let supervisor = Supervisor::start(Config::new(Location::localhost(0), 2)?)?;

        // Closing the endpoint out from under the pool makes the workers return.
        supervisor.endpoint.close();

        assert!(matches!(
            supervisor.wait(),
            Error::WorkerTerminated {
                panicked: false,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_wait_reports_panicked_worker() -> Result<(), Error> {
        let (exits_tx, exits) = channel::unbounded();
        let supervisor = Supervisor {
            store: Arc::new(Store::new()),
            endpoint: Arc::new(Endpoint::bind(&Location::localhost(0))?),
            workers: vec![spawn_worker(3, &exits_tx, || panic!("worker bug"))?],
            exits,
        };

        assert!(matches!(
            supervisor.wait(),
            Error::WorkerTerminated {
                worker: 3,
                panicked: true,
            }
        ));
        Ok(())
    }
}
