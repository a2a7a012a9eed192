use crate::{BridgeError, Callback, Result, send_value};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{runtime::Handle, sync::oneshot};

/// One in-flight driver operation.
///
/// Resolves exactly once: either with the value produced by the completion
/// callback or, if the driver releases the callback without calling it, with
/// [`BridgeError::CallbackDropped`]. Dropping it discards the late result but
/// does not cancel the driver call.
#[must_use = "the result of the operation is only observable by awaiting it"]
pub struct Pending<T> {
    state: PendingState<T>,
}

enum PendingState<T> {
    Ready(Option<Result<T>>),
    Waiting(oneshot::Receiver<Result<T>>),
}

impl<T> Pending<T> {
    /// Already resolved operation, no driver involved.
    pub fn ready(value: Result<T>) -> Self {
        Self {
            state: PendingState::Ready(Some(value)),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::ready(Ok(value))
    }

    /// Already failed operation. The error is logged once here.
    pub fn fail(error: impl Into<crate::Error>) -> Self {
        let error = error.into();
        log::error!("{:#}", error);
        Self::ready(Err(error))
    }
}

impl<T> Unpin for Pending<T> {}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Ready(value) => match value.take() {
                Some(value) => Poll::Ready(value),
                None => panic!("Pending operation polled after completion"),
            },
            PendingState::Waiting(receiver) => Pin::new(receiver).poll(cx).map(|v| match v {
                Ok(result) => result,
                Err(..) => {
                    let error = crate::Error::new(BridgeError::CallbackDropped);
                    log::error!("{:#}", error);
                    Err(error)
                }
            }),
        }
    }
}

/// State captured by a completion callback.
///
/// Fields drop in declaration order: if the driver drops the callback, the
/// shaping closure (and any state it restores on drop) goes before the waiter
/// is woken up.
struct Completion<S, R> {
    shape: S,
    tx: oneshot::Sender<Result<R>>,
}

impl<S, R> Completion<S, R> {
    fn complete<T>(self, outcome: Result<T>)
    where
        S: FnOnce(T) -> Result<R>,
    {
        let Completion { shape, tx } = self;
        let result = outcome.and_then(shape);
        if let Err(error) = &result {
            log::error!("{:#}", error);
        }
        send_value!(tx, result);
    }
}

/// Run a callback based driver call on `executor` and expose its completion as a [`Pending`].
///
/// `call` receives the completion callback and hands it to the driver. A
/// failed outcome is forwarded untouched, a successful payload goes through
/// `shape` and whatever it returns (including its error) resolves the
/// operation. `shape` runs on the thread the driver completes on.
pub fn bridge<T, R, C, S>(executor: &Handle, call: C, shape: S) -> Pending<R>
where
    T: Send + 'static,
    R: Send + 'static,
    C: FnOnce(Callback<T>) + Send + 'static,
    S: FnOnce(T) -> Result<R> + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<Result<R>>();
    let completion = Completion { shape, tx };
    let callback: Callback<T> = Box::new(move |outcome| completion.complete(outcome));
    executor.spawn_blocking(move || call(callback));
    Pending {
        state: PendingState::Waiting(rx),
    }
}
