//! Structured cancellation for the load pipeline.
//!
//! An [`AbortController`] is created per load. Its [`AbortSignal`] is threaded
//! through every async stage and checked before each state mutation, while the
//! whole load future is wrapped in a [`futures::future::Abortable`] so suspended
//! network or decode work stops being polled as soon as the load is superseded.

use std::future::Future;

use futures::future::{AbortHandle, AbortRegistration, Abortable};

use crate::error::ViewerError;

#[derive(Debug)]
pub struct AbortController {
    handle: AbortHandle,
    registration: Option<AbortRegistration>,
}

impl AbortController {
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            handle,
            registration: Some(registration),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            handle: Some(self.handle.clone()),
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.is_aborted()
    }

    /// Ties `fut` to this controller. An abort resolves it to [`ViewerError::Aborted`]
    /// without polling the inner future again.
    ///
    /// Only the first wrapped future is registered, later ones rely on explicit
    /// signal checks.
    pub fn wrap<T, F>(&mut self, fut: F) -> impl Future<Output = Result<T, ViewerError>> + use<T, F>
    where
        F: Future<Output = Result<T, ViewerError>>,
    {
        let registration = self.registration.take();
        let signal = self.signal();
        async move {
            match registration {
                Some(registration) => Abortable::new(fut, registration).await?,
                None => {
                    let out = fut.await;
                    signal.check()?;
                    out
                }
            }
        }
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap, clonable view of an [`AbortController`].
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    handle: Option<AbortHandle>,
}

impl AbortSignal {
    /// A signal that is never aborted, for one-shot loads outside a session.
    pub fn never() -> Self {
        Self { handle: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.as_ref().is_some_and(AbortHandle::is_aborted)
    }

    /// Fails with [`ViewerError::Aborted`] once the owning controller aborted.
    pub fn check(&self) -> Result<(), ViewerError> {
        if self.is_aborted() {
            Err(ViewerError::Aborted)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_future_resolves_to_aborted() {
        let mut controller = AbortController::new();
        let signal = controller.signal();
        let fut = controller.wrap(async { Ok::<_, ViewerError>(7) });
        controller.abort();
        assert!(signal.is_aborted());
        assert_eq!(futures::executor::block_on(fut), Err(ViewerError::Aborted));
    }

    #[test]
    fn never_signal_passes() {
        assert!(AbortSignal::never().check().is_ok());
    }
}
