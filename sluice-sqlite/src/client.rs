use crate::{Database, SqliteConnection, connection::serve, driver::Target};
use libsqlite3_sys::{SQLITE_OPEN_CREATE, SQLITE_OPEN_NOMUTEX, SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI};
use sluice_core::{Callback, Client, Error};
use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    thread,
};

const OPEN_FLAGS: i32 =
    SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI | SQLITE_OPEN_NOMUTEX;

/// Opens SQLite connections, each one served by its own worker thread.
#[derive(Debug)]
pub struct SqliteClient {
    target: Target,
    closed: AtomicBool,
    spawned: AtomicU64,
}

impl SqliteClient {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            closed: AtomicBool::new(false),
            spawned: AtomicU64::new(0),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Client for SqliteClient {
    type Connection = SqliteConnection;

    fn get_connection(&self, callback: Callback<SqliteConnection>) {
        if self.is_closed() {
            return callback(Err(Error::msg("The sqlite client is closed")));
        }
        let target = self.target.clone();
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let spawned = thread::Builder::new()
            .name(format!("sluice-sqlite-{id}"))
            .spawn(move || {
                let database =
                    match Database::open(&target.filename, OPEN_FLAGS, target.busy_timeout) {
                        Ok(database) => database,
                        Err(error) => return callback(Err(error)),
                    };
                let (commands, receiver) = flume::unbounded();
                callback(Ok(SqliteConnection { commands }));
                serve(database, receiver);
            });
        if let Err(e) = spawned {
            // The callback went down with the closure, the caller observes a dropped callback
            log::error!("Could not spawn the sqlite connection thread: {:#}", e);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
