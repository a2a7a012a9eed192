use crate::Database;
use flume::{Receiver, Sender};
use sluice_core::{Callback, DriverConnection, Error, RawResultSet, RawUpdateResult};

pub(crate) enum Command {
    Query(String, Callback<RawResultSet>),
    Update(String, Callback<RawUpdateResult>),
    Execute(&'static str, Callback<()>),
    AutoCommit(Callback<()>),
    Close(Callback<()>),
}

impl Command {
    fn fail(self, error: Error) {
        match self {
            Command::Query(_, callback) => callback(Err(error)),
            Command::Update(_, callback) => callback(Err(error)),
            Command::Execute(_, callback)
            | Command::AutoCommit(callback)
            | Command::Close(callback) => callback(Err(error)),
        }
    }
}

/// Serves commands until the connection is closed or every sender is gone.
pub(crate) fn serve(mut database: Database, commands: Receiver<Command>) {
    while let Ok(command) = commands.recv() {
        match command {
            Command::Query(sql, callback) => callback(database.query(&sql)),
            Command::Update(sql, callback) => callback(database.update(&sql)),
            Command::Execute(sql, callback) => callback(database.execute(sql)),
            Command::AutoCommit(callback) => callback(if database.is_autocommit() {
                Ok(())
            } else {
                database.execute("COMMIT")
            }),
            Command::Close(callback) => match database.close() {
                Ok(()) => {
                    log::debug!("SQLite connection closed");
                    callback(Ok(()));
                    break;
                }
                Err(error) => callback(Err(error)),
            },
        }
    }
    // Anything still queued raced with close
    for command in commands.drain() {
        command.fail(Error::msg("The connection is closed"));
    }
}

/// Handle to a SQLite database served by a dedicated worker thread.
///
/// Every call is queued to the worker and completes on the worker thread.
pub struct SqliteConnection {
    pub(crate) commands: Sender<Command>,
}

impl SqliteConnection {
    fn send(&self, command: Command) {
        if let Err(flume::SendError(command)) = self.commands.send(command) {
            let error = Error::msg("The connection is closed");
            log::error!("{:#}", error);
            command.fail(error);
        }
    }
}

impl DriverConnection for SqliteConnection {
    fn query(&self, sql: String, callback: Callback<RawResultSet>) {
        self.send(Command::Query(sql, callback));
    }

    fn update(&self, sql: String, callback: Callback<RawUpdateResult>) {
        self.send(Command::Update(sql, callback));
    }

    fn set_auto_commit(&self, auto_commit: bool, callback: Callback<()>) {
        self.send(if auto_commit {
            Command::AutoCommit(callback)
        } else {
            Command::Execute("BEGIN", callback)
        });
    }

    fn commit(&self, callback: Callback<()>) {
        self.send(Command::Execute("COMMIT", callback));
    }

    fn rollback(&self, callback: Callback<()>) {
        self.send(Command::Execute("ROLLBACK", callback));
    }

    fn close(&self, callback: Callback<()>) {
        self.send(Command::Close(callback));
    }
}
