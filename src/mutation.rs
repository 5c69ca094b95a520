use tokio::sync::oneshot;

use crate::path::Path;

/// Single-use completion signal for a [`Mutation`]. Dropping the sender
/// without calling `signal` (e.g. because shutdown discarded the mutation
/// before a worker reached it) simply leaves the receiver's `await`
/// resolving to an error, which callers in write-through mode treat as "the
/// mutation will not be observed" — documented shutdown behavior, not a bug.
pub type CompletionSender = oneshot::Sender<()>;
pub type CompletionReceiver = oneshot::Receiver<()>;

/// An optional callback run by the writer worker after a `Set` has been
/// persisted to the filesystem, before the completion fires.
pub type PostPersistCallback = Box<dyn FnOnce() + Send>;

/// The kind of durable work a [`Mutation`] carries.
pub enum MutationKind {
    Set { bytes: bytes::Bytes },
    Delete,
}

/// A unit of durable work enqueued by the write-behind layer and applied by
/// a writer worker: kind, target Path, optional payload bytes (Set only), a
/// completion signal, and an optional post-persist callback.
pub struct Mutation {
    pub kind: MutationKind,
    pub path: Path,
    pub completion: CompletionSender,
    pub on_persisted: Option<PostPersistCallback>,
}

impl Mutation {
    pub fn set(
        path: Path,
        bytes: bytes::Bytes,
        completion: CompletionSender,
        on_persisted: Option<PostPersistCallback>,
    ) -> Self {
        Mutation {
            kind: MutationKind::Set { bytes },
            path,
            completion,
            on_persisted,
        }
    }

    pub fn delete(path: Path, completion: CompletionSender) -> Self {
        Mutation {
            kind: MutationKind::Delete,
            path,
            completion,
            on_persisted: None,
        }
    }
}
