//! Live object caches backed by externally supplied watch sources.
//!
//! A [`WatchCache`] keeps a queryable snapshot of every object of one
//! resource kind in one context, bootstrapped by a list call and kept live by
//! a long-lived delta stream. The transport behind both is opaque: the cache
//! only consumes the [`WatchSource`] contract.

mod cache;
mod store;
pub use cache::*;
pub use store::*;


use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::ApiObject;
use crate::ObjectRef;
use crate::Result;

/// One add/update/delete observed on the watch stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchDelta {
    /// Object added or updated in place
    Applied(ApiObject),
    Deleted(ObjectRef),
}

/// External list+watch transport for one (context, kind) pair, produced by a
/// capability entry's watch-source factory.
#[async_trait]
pub trait WatchSource: Send + Sync + 'static {
    /// Initial full listing.
    async fn bootstrap(&self) -> Result<Vec<ApiObject>>;

    /// Continuous delta stream. The stream erroring or ending means the
    /// watch transport disconnected.
    async fn subscribe(&self) -> Result<BoxStream<'static, Result<WatchDelta>>>;
}
