use crate::{CompletionCounter, FiredOwned};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use pin_project_lite::pin_project;

impl CompletionCounter {
    /// Returns a future that resolves to the final count once every expected
    /// completion has been reported.
    pub fn all_completed(&self) -> AllCompleted {
        AllCompleted {
            done: self.inner.done.fired_owned(),
            counter: self.clone(),
        }
    }
}

pin_project! {
    /// Future returned by [`CompletionCounter::all_completed`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct AllCompleted {
        #[pin]
        done: FiredOwned,
        counter: CompletionCounter,
    }
}

impl Future for AllCompleted {
    type Output = usize;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<usize> {
        let this = self.project();
        match this.done.poll(cx) {
            Poll::Ready(()) => Poll::Ready(this.counter.completed()),
            Poll::Pending => Poll::Pending,
        }
    }
}
