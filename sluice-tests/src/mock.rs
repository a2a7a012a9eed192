use sluice_core::{
    Callback, Client, Config, Driver, DriverConnection, Error, RawResultSet, RawUpdateResult,
    Result,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};
use tokio::sync::oneshot;

/// Driver calls recorded by [`MockDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateClient,
    GetConnection,
    CloseClient,
    Query,
    Update,
    SetAutoCommit(bool),
    Commit,
    Rollback,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub sql: Option<String>,
}

enum Script {
    Fail(Error),
    Drop,
    Hold(oneshot::Receiver<()>),
    ResultSet(RawResultSet),
    Update(RawUpdateResult),
}

#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<Call>>,
    scripts: Mutex<HashMap<Operation, VecDeque<Script>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    fn record(&self, operation: Operation, sql: Option<String>) -> Option<Script> {
        lock(&self.calls).push(Call { operation, sql });
        lock(&self.scripts)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
    }

    fn script(&self, operation: Operation, script: Script) {
        lock(&self.scripts)
            .entry(operation)
            .or_default()
            .push_back(script);
    }
}

/// Completes the callback from a separate thread, the way an event loop based driver would.
fn deliver<T, F>(script: Option<Script>, callback: Callback<T>, respond: F)
where
    T: Send + 'static,
    F: FnOnce(Option<Script>) -> T + Send + 'static,
{
    thread::spawn(move || match script {
        Some(Script::Drop) => drop(callback),
        Some(Script::Fail(error)) => callback(Err(error)),
        Some(Script::Hold(gate)) => {
            let _ = gate.blocking_recv();
            callback(Ok(respond(None)))
        }
        other => callback(Ok(respond(other))),
    });
}

/// Scriptable driver test double recording every call it receives.
///
/// Without a script every call succeeds: queries return an empty result set
/// and updates report zero affected rows.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.state.calls).clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        lock(&self.state.calls)
            .iter()
            .filter(|v| v.operation == operation)
            .count()
    }

    /// The next `operation` completes with `error`.
    pub fn fail_next(&self, operation: Operation, error: impl Into<Error>) {
        self.state.script(operation, Script::Fail(error.into()));
    }

    /// The next `operation` drops its callback without invoking it.
    pub fn drop_next(&self, operation: Operation) {
        self.state.script(operation, Script::Drop);
    }

    /// The next `operation` succeeds only once the returned sender fires or is dropped.
    pub fn hold_next(&self, operation: Operation) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.state.script(operation, Script::Hold(gate));
        release
    }

    pub fn respond_query(&self, result: RawResultSet) {
        self.state.script(Operation::Query, Script::ResultSet(result));
    }

    pub fn respond_update(&self, result: RawUpdateResult) {
        self.state.script(Operation::Update, Script::Update(result));
    }
}

impl Driver for MockDriver {
    type Client = MockClient;

    const NAME: &'static str = "mock";

    fn create_client(&self, config: &Config) -> Result<MockClient> {
        if let Some(Script::Fail(error)) =
            self.state.record(Operation::CreateClient, Some(config.url.clone()))
        {
            return Err(error);
        }
        Ok(MockClient {
            state: self.state.clone(),
        })
    }
}

pub struct MockClient {
    state: Arc<MockState>,
}

impl Client for MockClient {
    type Connection = MockConnection;

    fn get_connection(&self, callback: Callback<MockConnection>) {
        let script = self.state.record(Operation::GetConnection, None);
        let state = self.state.clone();
        deliver(script, callback, move |_| MockConnection { state });
    }

    fn close(&self) {
        self.state.record(Operation::CloseClient, None);
    }
}

pub struct MockConnection {
    state: Arc<MockState>,
}

impl MockConnection {
    fn unit(&self, operation: Operation, callback: Callback<()>) {
        let script = self.state.record(operation, None);
        deliver(script, callback, |_| ());
    }
}

impl DriverConnection for MockConnection {
    fn query(&self, sql: String, callback: Callback<RawResultSet>) {
        let script = self.state.record(Operation::Query, Some(sql));
        deliver(script, callback, |script| match script {
            Some(Script::ResultSet(result)) => result,
            _ => RawResultSet::default(),
        });
    }

    fn update(&self, sql: String, callback: Callback<RawUpdateResult>) {
        let script = self.state.record(Operation::Update, Some(sql));
        deliver(script, callback, |script| match script {
            Some(Script::Update(result)) => result,
            _ => RawUpdateResult::default(),
        });
    }

    fn set_auto_commit(&self, auto_commit: bool, callback: Callback<()>) {
        self.unit(Operation::SetAutoCommit(auto_commit), callback);
    }

    fn commit(&self, callback: Callback<()>) {
        self.unit(Operation::Commit, callback);
    }

    fn rollback(&self, callback: Callback<()>) {
        self.unit(Operation::Rollback, callback);
    }

    fn close(&self, callback: Callback<()>) {
        self.unit(Operation::Close, callback);
    }
}
