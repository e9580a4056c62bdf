// Service exports
pub mod appwrite;
pub mod cache;
pub mod directory;
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use directory::{CachedDirectory, DirectoryError, UserDirectory};
pub use memory::MemoryStore;
pub use notifier::{spawn_dispatch, NoopNotifier, NotificationDispatcher, NotifyError};
pub use postgres::PostgresClient;
pub use store::{MessageStore, RelationshipStore, RelationshipTx, StoreError};
