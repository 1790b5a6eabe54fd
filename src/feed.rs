use std::{
    cell::{Ref, RefCell},
    future::Future,
    rc::Rc,
};

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, warn};

use crate::{error::LoadError, single_flight::SingleFlight};

/// Source of more items.
///
/// Every call is independent: there is no cursor, so a loader that always
/// hits the same resource yields the same items every time.
pub trait Loader<T> {
    fn load(&self) -> LocalBoxFuture<'static, Result<Vec<T>, LoadError>>;
}

impl<T, F, Fut> Loader<T> for F
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, LoadError>> + 'static,
{
    fn load(&self) -> LocalBoxFuture<'static, Result<Vec<T>, LoadError>> {
        self().boxed_local()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// This many items were added to the end of the feed
    Appended(usize),
    Failed(LoadError),
}

struct FeedInner<T> {
    items: RefCell<Vec<T>>,
    guard: SingleFlight,
    last_error: RefCell<Option<LoadError>>,
    notify: Box<dyn Fn()>,
}

/// Append-only collection of loaded items plus the guard that keeps loads
/// from overlapping.
///
/// Cloning is cheap and yields a handle to the same feed.
pub struct Feed<T> {
    inner: Rc<FeedInner<T>>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Feed<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: 'static> Feed<T> {
    /// `notify` runs whenever the visible state changes: a load starts, or a
    /// load finishes either way.
    pub fn new(notify: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(FeedInner {
                items: RefCell::default(),
                guard: SingleFlight::new(),
                last_error: RefCell::default(),
                notify: Box::new(notify),
            }),
        }
    }

    pub fn items(&self) -> Ref<'_, [T]> {
        Ref::map(self.inner.items.borrow(), Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.inner.guard.is_in_flight()
    }

    pub fn last_error(&self) -> Option<LoadError> {
        self.inner.last_error.borrow().clone()
    }

    /// Starts a load unless one is already running.
    ///
    /// When a load is in flight this returns `None` without touching the
    /// loader; the signal is dropped, not queued. Otherwise the loader is
    /// called right away and the returned future appends its items once
    /// awaited. The guard is released when that future completes or is
    /// dropped.
    pub fn load_more<L>(&self, loader: &L) -> Option<LocalBoxFuture<'static, LoadOutcome>>
    where
        L: Loader<T> + ?Sized,
    {
        let Some(permit) = self.inner.guard.try_acquire() else {
            debug!("load already in flight, dropping signal");
            return None;
        };
        let pending = loader.load();
        (self.inner.notify)();

        let inner = self.inner.clone();
        Some(
            async move {
                let outcome = match pending.await {
                    Ok(batch) => {
                        let count = batch.len();
                        let total = {
                            let mut items = inner.items.borrow_mut();
                            items.extend(batch);
                            items.len()
                        };
                        inner.last_error.replace(None);
                        debug!(count, total, "appended items");
                        LoadOutcome::Appended(count)
                    }
                    Err(err) => {
                        warn!(error = %err, "loading more items failed");
                        inner.last_error.replace(Some(err.clone()));
                        LoadOutcome::Failed(err)
                    }
                };
                drop(permit);
                (inner.notify)();
                outcome
            }
            .boxed_local(),
        )
    }
}
