use crate::Gate;
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use pin_project_lite::pin_project;
use tokio_util::sync::{WaitForCancellationFuture, WaitForCancellationFutureOwned};

impl Gate {
    /// Returns a future that resolves once the gate fires.
    ///
    /// The future is executor-agnostic and resolves immediately if the gate
    /// has already fired.
    pub fn fired(&self) -> Fired<'_> {
        Fired {
            inner: self.inner.token.cancelled(),
        }
    }

    /// Like [`Self::fired`], but the future owns a handle on the gate and
    /// can be moved into a spawned task.
    pub fn fired_owned(&self) -> FiredOwned {
        FiredOwned {
            inner: self.inner.token.clone().cancelled_owned(),
        }
    }
}

pin_project! {
    /// Future returned by [`Gate::fired`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Fired<'a> {
        #[pin]
        inner: WaitForCancellationFuture<'a>,
    }
}

impl Future for Fired<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.project().inner.poll(cx)
    }
}

pin_project! {
    /// Future returned by [`Gate::fired_owned`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct FiredOwned {
        #[pin]
        inner: WaitForCancellationFutureOwned,
    }
}

impl Future for FiredOwned {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.project().inner.poll(cx)
    }
}
