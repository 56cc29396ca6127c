//! Higher-level content handlers.
//!
//! A handler attaches to one namespace node and usually registers callbacks
//! there (for example a deserialize-needed callback that decodes a specific
//! format). Implementors embed a [`HandlerBinding`] and get attachment,
//! lookup and `object_needed` for free.

use crate::error::{NamespaceError, Result};
use crate::namespace::Namespace;
use parking_lot::Mutex;

/// Records the node a handler is attached to
#[derive(Debug, Default)]
pub struct HandlerBinding {
    namespace: Mutex<Option<Namespace>>,
}

impl HandlerBinding {
    /// Create an unattached binding
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to `namespace`
    ///
    /// Returns true if newly attached, false if already attached to the same
    /// node.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::HandlerAlreadyAttached`] if attached to a
    /// different node.
    pub fn bind(&self, namespace: &Namespace) -> Result<bool> {
        let mut current = self.namespace.lock();
        match current.as_ref() {
            Some(existing) if existing == namespace => Ok(false),
            Some(existing) => {
                let existing = existing.clone();
                drop(current);
                Err(NamespaceError::HandlerAlreadyAttached(existing.name()))
            }
            None => {
                *current = Some(namespace.clone());
                Ok(true)
            }
        }
    }

    /// Node the handler is attached to
    #[must_use]
    pub fn namespace(&self) -> Option<Namespace> {
        self.namespace.lock().clone()
    }
}

/// A handler attached to one namespace node
pub trait Handler: Send + Sync {
    /// The binding embedded in the handler
    fn binding(&self) -> &HandlerBinding;

    /// Called once when the handler is first attached
    ///
    /// Handlers typically register their callbacks here.
    ///
    /// # Errors
    ///
    /// Errors are returned from [`set_namespace`](Self::set_namespace).
    fn on_namespace_set(&self, _namespace: &Namespace) -> Result<()> {
        Ok(())
    }

    /// Attach the handler to `namespace`
    ///
    /// Attaching again to the same node does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::HandlerAlreadyAttached`] if the handler is
    /// attached to a different node, or any error from
    /// [`on_namespace_set`](Self::on_namespace_set).
    fn set_namespace(&self, namespace: &Namespace) -> Result<()> {
        if self.binding().bind(namespace)? {
            self.on_namespace_set(namespace)?;
        }
        Ok(())
    }

    /// Node the handler is attached to
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::HandlerNotAttached`] before
    /// [`set_namespace`](Self::set_namespace).
    fn namespace(&self) -> Result<Namespace> {
        self.binding()
            .namespace()
            .ok_or(NamespaceError::HandlerNotAttached)
    }

    /// Request the object of the attached node
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::HandlerNotAttached`] if not attached, or any
    /// error from [`Namespace::object_needed`].
    fn object_needed(&self, must_be_fresh: bool) -> Result<()> {
        self.namespace()?.object_needed(must_be_fresh)
    }
}
