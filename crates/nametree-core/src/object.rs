//! Application-level objects attached to namespace nodes.

use bytes::Bytes;
use std::any::Any;
use std::sync::Arc;

/// A deserialized object held by a node
///
/// Handlers store whatever type they produce; use [`Object::downcast_ref`]
/// (via `Any`) to recover it.
pub type Object = Arc<dyn Any + Send + Sync>;

/// Object produced by the default deserializer: the raw content bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject(pub Bytes);

impl BlobObject {
    /// Wrap bytes as a shareable [`Object`]
    pub fn object(bytes: impl Into<Bytes>) -> Object {
        Arc::new(Self(bytes.into()))
    }

    /// The wrapped bytes
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.0
    }
}

/// Get the bytes of `object` if it is a [`BlobObject`]
#[must_use]
pub fn as_blob(object: &Object) -> Option<&Bytes> {
    object.downcast_ref::<BlobObject>().map(BlobObject::bytes)
}
