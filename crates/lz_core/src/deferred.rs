//! Deferred values.
//!
//! A [`Deferred<T>`] is a handle to a value that becomes available only after
//! some asynchronous provisioning step completes. Handles can be transformed and
//! combined immediately; the transformations run when the inputs resolve.
//!
//! Every deferred value remembers which resource descriptors it was derived
//! from (its *sources*). Passing a deferred value into a property bag therefore
//! records the dependency edge on the consuming descriptor.
//!
//! # Example
//!
//! ```rust
//! use lz_core::Deferred;
//!
//! let group_id = Deferred::known("/subscriptions/0000/resourceGroups/rg-aks".to_string());
//! let subscription = group_id.map(|id| id.split('/').nth(2).unwrap_or_default().to_string());
//! let scope = subscription.map(|sub| format!("/subscriptions/{}", sub));
//! assert!(scope.sources().next().is_none());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared, TryFutureExt};

use crate::error::ResolutionFailure;

/// Terminal state of a deferred value.
pub type Resolution<T> = Result<T, ResolutionFailure>;

type SharedResolution<T> = Shared<BoxFuture<'static, Resolution<T>>>;

/// Bound for anything that can travel through a deferred value.
pub trait DeferredItem: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> DeferredItem for T {}

/// A value that becomes available asynchronously.
#[derive(Clone)]
pub struct Deferred<T: DeferredItem> {
    future: SharedResolution<T>,
    sources: Arc<BTreeSet<String>>,
    secret: bool,
}

impl<T: DeferredItem> Deferred<T> {
    fn from_parts(
        future: BoxFuture<'static, Resolution<T>>,
        sources: BTreeSet<String>,
        secret: bool,
    ) -> Self {
        Self {
            future: future.shared(),
            sources: Arc::new(sources),
            secret,
        }
    }

    /// A value that is already known.
    pub fn known(value: T) -> Self {
        Self::from_parts(future::ready(Ok(value)).boxed(), BTreeSet::new(), false)
    }

    /// A value that has already failed.
    pub fn failed(failure: ResolutionFailure) -> Self {
        Self::from_parts(future::ready(Err(failure)).boxed(), BTreeSet::new(), false)
    }

    /// A value produced by an arbitrary future with no resource sources.
    pub fn from_future<F>(producer: F) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        Self::from_parts(producer.boxed(), BTreeSet::new(), false)
    }

    /// A value produced by applying the named resource descriptor.
    pub(crate) fn from_resource<F>(resource: &str, producer: F) -> Self
    where
        F: Future<Output = Resolution<T>> + Send + 'static,
    {
        let mut sources = BTreeSet::new();
        sources.insert(resource.to_string());
        Self::from_parts(producer.boxed(), sources, false)
    }

    /// Same value, additionally produced only after the given sources.
    pub(crate) fn with_sources(mut self, sources: &BTreeSet<String>) -> Self {
        let mut merged = (*self.sources).clone();
        merged.extend(sources.iter().cloned());
        self.sources = Arc::new(merged);
        self
    }

    /// Transform the value once it resolves.
    ///
    /// `f` is never invoked when the source fails; the failure is carried over
    /// unchanged.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: DeferredItem,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.future.clone();
        Deferred {
            future: source.map(|resolution| resolution.map(f)).boxed().shared(),
            sources: self.sources.clone(),
            secret: self.secret,
        }
    }

    /// Transform the value with a function that may reject its input.
    pub fn try_map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: DeferredItem,
        F: FnOnce(T) -> Resolution<U> + Send + 'static,
    {
        let source = self.future.clone();
        Deferred {
            future: source
                .map(|resolution| resolution.and_then(f))
                .boxed()
                .shared(),
            sources: self.sources.clone(),
            secret: self.secret,
        }
    }

    /// Chain an asynchronous step after the value resolves.
    pub fn and_then<U, F, Fut>(&self, f: F) -> Deferred<U>
    where
        U: DeferredItem,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Resolution<U>> + Send + 'static,
    {
        let source = self.future.clone();
        Deferred {
            future: async move {
                let value = source.await?;
                f(value).await
            }
            .boxed()
            .shared(),
            sources: self.sources.clone(),
            secret: self.secret,
        }
    }

    /// Pair this value with another one.
    pub fn zip<U: DeferredItem>(&self, other: &Deferred<U>) -> Deferred<(T, U)> {
        combine(self, other, |a, b| (a, b))
    }

    /// Combine a list of values into one; fails as soon as any input fails.
    pub fn all(values: impl IntoIterator<Item = Deferred<T>>) -> Deferred<Vec<T>> {
        let values: Vec<Deferred<T>> = values.into_iter().collect();
        let mut sources = BTreeSet::new();
        let mut secret = false;
        for value in &values {
            sources.extend(value.sources.iter().cloned());
            secret |= value.secret;
        }
        let futures: Vec<_> = values.iter().map(|v| v.future.clone()).collect();
        Deferred::from_parts(future::try_join_all(futures).boxed(), sources, secret)
    }

    /// Mark the value as sensitive. The mark survives every transformation.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Names of the resource descriptors this value was derived from.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.as_str())
    }

    pub(crate) fn source_set(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// The terminal state, if the value has already been driven to completion.
    pub fn peek(&self) -> Option<Resolution<T>> {
        self.future.peek().cloned()
    }

    /// Wait for the terminal state.
    ///
    /// Reserved for the outermost driver and for tests; component code composes
    /// values with `map`/`combine` instead.
    pub async fn resolve(&self) -> Resolution<T> {
        self.future.clone().await
    }

    pub(crate) fn shared(&self) -> SharedResolution<T> {
        self.future.clone()
    }
}

/// Combine two values once both resolve.
pub fn combine<A, B, V, F>(a: &Deferred<A>, b: &Deferred<B>, f: F) -> Deferred<V>
where
    A: DeferredItem,
    B: DeferredItem,
    V: DeferredItem,
    F: FnOnce(A, B) -> V + Send + 'static,
{
    let mut sources = (*a.sources).clone();
    sources.extend(b.sources.iter().cloned());
    let joined = future::try_join(a.future.clone(), b.future.clone()).map_ok(move |(x, y)| f(x, y));
    Deferred::from_parts(joined.boxed(), sources, a.secret || b.secret)
}

impl<T: DeferredItem + fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Deferred");
        out.field("sources", &self.sources);
        if self.secret {
            out.field("state", &"[secret]");
        } else {
            out.field("state", &self.future.peek());
        }
        out.finish()
    }
}
