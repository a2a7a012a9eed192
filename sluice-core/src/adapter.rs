use crate::{
    Callback, Client, Config, Driver, DriverConnection, Pending, Persistence, StateError,
    TabularResult, UpdateOutcome, bridge, shape, shape_update, truncate_long,
};
use std::{
    fmt, mem,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::runtime::Handle;

type ConnectionOf<D> = <<D as Driver>::Client as Client>::Connection;

enum Lifecycle<C: Client> {
    Uninitialized,
    Connecting,
    Connected {
        client: Arc<C>,
        connection: Arc<C::Connection>,
    },
    Closed,
}

impl<C: Client> fmt::Debug for Lifecycle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifecycle::Uninitialized => "Uninitialized",
            Lifecycle::Connecting => "Connecting",
            Lifecycle::Connected { .. } => "Connected",
            Lifecycle::Closed => "Closed",
        })
    }
}

struct Shared<D: Driver> {
    lifecycle: Mutex<Lifecycle<D::Client>>,
    transaction: AtomicBool,
}

impl<D: Driver> Shared<D> {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle<D::Client>> {
        // The lock is never held across user code, a poisoned lock still holds a consistent state
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> Result<Arc<ConnectionOf<D>>, StateError> {
        match &*self.lifecycle() {
            Lifecycle::Connected { connection, .. } => Ok(connection.clone()),
            Lifecycle::Connecting => Err(StateError::Connecting),
            Lifecycle::Uninitialized | Lifecycle::Closed => Err(StateError::NotConnected),
        }
    }
}

/// Reverts a `Connecting` lifecycle to what it was before, unless the connection got installed.
struct ConnectingGuard<D: Driver> {
    shared: Arc<Shared<D>>,
    previous: Option<Lifecycle<D::Client>>,
}

impl<D: Driver> ConnectingGuard<D> {
    fn connected(mut self, client: Arc<D::Client>, connection: Arc<ConnectionOf<D>>) {
        self.previous = None;
        self.shared.transaction.store(false, Ordering::Release);
        *self.shared.lifecycle() = Lifecycle::Connected { client, connection };
        log::debug!("{} connection established", D::NAME);
    }
}

impl<D: Driver> Drop for ConnectingGuard<D> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.shared.lifecycle() = previous;
        }
    }
}

/// Persistence adapter over a single driver connection.
///
/// Owns at most one live connection and tracks whether an explicit
/// transaction is open on it. Clones share the same connection and state.
pub struct Adapter<D: Driver> {
    driver: Arc<D>,
    shared: Arc<Shared<D>>,
}

impl<D: Driver> Adapter<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle::Uninitialized),
                transaction: AtomicBool::new(false),
            }),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// True between a successful `init` and a successful `close`.
    pub fn is_connected(&self) -> bool {
        matches!(&*self.shared.lifecycle(), Lifecycle::Connected { .. })
    }

    fn end_transaction(&self, commit: bool, executor: &Handle) -> Pending<()> {
        if !self.is_in_transaction() {
            return Pending::ok(());
        }
        let connection = match self.shared.connection() {
            Ok(connection) => connection,
            Err(error) => return Pending::fail(error),
        };
        let shared = self.shared.clone();
        bridge(
            executor,
            move |callback| {
                if commit {
                    connection.commit(callback)
                } else {
                    connection.rollback(callback)
                }
            },
            move |()| {
                shared.transaction.store(false, Ordering::Release);
                log::debug!(
                    "Transaction {}",
                    if commit { "committed" } else { "rolled back" }
                );
                Ok(())
            },
        )
    }
}

impl<D: Driver> Clone for Adapter<D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<D: Driver> fmt::Debug for Adapter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("driver", &D::NAME)
            .field("lifecycle", &*self.shared.lifecycle())
            .field("transaction", &self.is_in_transaction())
            .finish()
    }
}

impl<D: Driver> Persistence for Adapter<D> {
    fn init(&self, config: Config, executor: &Handle) -> Pending<Self> {
        let previous = {
            let mut lifecycle = self.shared.lifecycle();
            if matches!(
                *lifecycle,
                Lifecycle::Connecting | Lifecycle::Connected { .. }
            ) {
                drop(lifecycle);
                return Pending::fail(StateError::AlreadyConnected);
            }
            mem::replace(&mut *lifecycle, Lifecycle::Connecting)
        };
        let guard = ConnectingGuard::<D> {
            shared: self.shared.clone(),
            previous: Some(previous),
        };
        let driver = self.driver.clone();
        let adapter = self.clone();
        let url = config.redacted_url();
        log::debug!("Connecting to {}", truncate_long!(url));
        bridge(
            executor,
            move |callback: Callback<(Arc<D::Client>, ConnectionOf<D>)>| {
                let client = match driver.create_client(&config) {
                    Ok(client) => Arc::new(client),
                    Err(error) => return callback(Err(error)),
                };
                let owned = client.clone();
                client.get_connection(Box::new(move |outcome| match outcome {
                    Ok(connection) => callback(Ok((owned, connection))),
                    Err(error) => {
                        owned.close();
                        callback(Err(error))
                    }
                }));
            },
            move |(client, connection)| {
                guard.connected(client, Arc::new(connection));
                Ok(adapter)
            },
        )
    }

    fn close(&self, executor: &Handle) -> Pending<()> {
        let (client, connection) = match &*self.shared.lifecycle() {
            Lifecycle::Connected { client, connection } => (client.clone(), connection.clone()),
            Lifecycle::Connecting => return Pending::fail(StateError::Connecting),
            Lifecycle::Uninitialized | Lifecycle::Closed => {
                return Pending::fail(StateError::NotConnected);
            }
        };
        if self.is_in_transaction() {
            return Pending::fail(StateError::TransactionActive);
        }
        let shared = self.shared.clone();
        bridge(
            executor,
            move |callback| connection.close(callback),
            move |()| {
                client.close();
                *shared.lifecycle() = Lifecycle::Closed;
                shared.transaction.store(false, Ordering::Release);
                log::debug!("{} connection closed", D::NAME);
                Ok(())
            },
        )
    }

    fn begin(&self, executor: &Handle) -> Pending<()> {
        if self.is_in_transaction() {
            return Pending::ok(());
        }
        let connection = match self.shared.connection() {
            Ok(connection) => connection,
            Err(error) => return Pending::fail(error),
        };
        let shared = self.shared.clone();
        bridge(
            executor,
            move |callback| connection.set_auto_commit(false, callback),
            move |()| {
                shared.transaction.store(true, Ordering::Release);
                log::debug!("Transaction started");
                Ok(())
            },
        )
    }

    fn commit(&self, executor: &Handle) -> Pending<()> {
        self.end_transaction(true, executor)
    }

    fn rollback(&self, executor: &Handle) -> Pending<()> {
        self.end_transaction(false, executor)
    }

    fn is_in_transaction(&self) -> bool {
        self.shared.transaction.load(Ordering::Acquire)
    }

    fn query(&self, sql: impl Into<String>, executor: &Handle) -> Pending<TabularResult> {
        let connection = match self.shared.connection() {
            Ok(connection) => connection,
            Err(error) => return Pending::fail(error),
        };
        let sql = sql.into();
        log::debug!("Query:\n{}", truncate_long!(sql));
        bridge(executor, move |callback| connection.query(sql, callback), shape)
    }

    fn update(&self, sql: impl Into<String>, executor: &Handle) -> Pending<UpdateOutcome> {
        let connection = match self.shared.connection() {
            Ok(connection) => connection,
            Err(error) => return Pending::fail(error),
        };
        let sql = sql.into();
        log::debug!("Update:\n{}", truncate_long!(sql));
        bridge(
            executor,
            move |callback| connection.update(sql, callback),
            |raw| Ok(shape_update(raw)),
        )
    }
}
