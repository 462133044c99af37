mod blob;
mod clone;
mod findings;
mod lifecycle;
mod walker;

pub use blob::{BlobLookup, BlobRetriever, BlobSource};
pub use clone::{CloneControl, CloneProvider, Git2Cloner};
pub use findings::{FileSink, FindingSink, FindingStore, MemorySink};
pub use lifecycle::{HandleRegistry, RepositoryHandle, RepositoryLifecycle};
pub use walker::{ChangedFileSet, CommitWalker};
