// ── Data-access seam ──
//
// Views never talk to storage directly. They are generic over a
// `CollectionRepository`, which hands back whole collections for a
// document and removes single items by id.

mod memory;

use std::future::Future;

use crate::error::RepositoryError;
use crate::model::{DocumentId, ItemId};

pub use memory::MemoryRepository;

/// An item that can live in a collection view.
///
/// The view layer only ever reads the identifier; item contents are
/// opaque to it.
pub trait CollectionItem: Clone + Send + Sync + 'static {
    fn id(&self) -> &ItemId;
}

/// Asynchronous data access for one item type.
///
/// Implementations must tolerate repeated and concurrent calls: a view
/// may start a second fetch before the first resolves, and a bulk
/// removal issues one `remove` per item concurrently.
pub trait CollectionRepository: Send + Sync + 'static {
    type Item: CollectionItem;

    /// Fetch every item attached to `document`, in display order.
    fn fetch_all(
        &self,
        document: &DocumentId,
    ) -> impl Future<Output = Result<Vec<Self::Item>, RepositoryError>> + Send;

    /// Remove one item. Removing an id that no longer exists succeeds.
    fn remove(&self, id: &ItemId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
