//! Error types for the nametree core.
//!
//! Errors fall into two groups:
//!
//! - **Usage errors** ([`NamespaceError`]): misuse of the tree, such as
//!   operating on a shut down tree, naming a node outside a subtree, or
//!   attaching a handler to two trees. These are returned immediately.
//! - **Collaborator errors** ([`TransportError`], [`SignError`],
//!   [`DecryptError`], [`ValidationError`], [`SyncError`]): failures reported
//!   by the transport, crypto and sync collaborators. Inside the pipelines these
//!   never propagate to the caller; they are recorded on the node and surfaced
//!   as terminal states.

use crate::name::Name;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;

/// Result type for namespace tree operations
pub type Result<T> = std::result::Result<T, NamespaceError>;

/// Errors returned by namespace tree operations
#[derive(Debug, Error, Clone)]
pub enum NamespaceError {
    // ============ Usage Errors ============
    /// The tree has been shut down
    #[error("cannot {0}: the namespace tree is shut down")]
    ShutDown(Cow<'static, str>),

    /// The node's name is not a prefix of the requested name
    #[error("the name {prefix} is not a prefix of {name}")]
    NotPrefix {
        /// Name of the node the call was made on
        prefix: Name,
        /// Requested descendant name
        name: Name,
    },

    /// A Data packet was attached to a node with a different name
    #[error("the Data name {actual} does not equal the node name {expected}")]
    NameMismatch {
        /// Name of the node
        expected: Name,
        /// Name carried by the Data packet
        actual: Name,
    },

    /// The operation may only be called on the root node
    #[error("{0} can only be called on the root node")]
    NotRoot(Cow<'static, str>),

    /// The root node has no parent
    #[error("the root node has no parent")]
    NoParent,

    /// No transport is set on this node or an ancestor
    #[error("no transport is set for {0} or an ancestor")]
    NoTransport(Name),

    /// No signer is set on this node or an ancestor
    #[error("no signer is set for {0} or an ancestor, so the object cannot be serialized")]
    NoSigner(Name),

    /// `enable_sync` was called without a sync provider on the root
    #[error("no sync provider is set on the root node")]
    NoSyncProvider,

    /// A handler is already attached to a different node
    #[error("this handler is already attached to {0}")]
    HandlerAlreadyAttached(Name),

    /// A handler was used before being attached
    #[error("this handler is not attached to a namespace node")]
    HandlerNotAttached,

    /// The node was removed by a subtree eviction
    #[error("the node {0} was evicted from the tree")]
    NodeEvicted(Name),

    /// The default serializer cannot handle the object
    #[error("unsupported object: {0}")]
    UnsupportedObject(Cow<'static, str>),

    // ============ Collaborator Errors ============
    /// The transport rejected a request
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The sync provider could not join the group
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The tree configuration was rejected
    #[error("config error: {0}")]
    Config(Arc<ConfigError>),
}

impl From<ConfigError> for NamespaceError {
    fn from(err: ConfigError) -> Self {
        NamespaceError::Config(Arc::new(err))
    }
}

impl NamespaceError {
    /// Returns true if this error reports misuse of the tree
    ///
    /// Usage errors are not recoverable by retrying the same call.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        !matches!(
            self,
            NamespaceError::Transport(_) | NamespaceError::Sync(_) | NamespaceError::Config(_)
        )
    }

    /// Returns true if the error was caused by a shut down tree
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        matches!(self, NamespaceError::ShutDown(_))
    }
}

/// Name parsing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// A component could not be percent-decoded
    #[error("invalid percent-encoding in component {0:?}")]
    InvalidEscape(String),

    /// A component is `.` or `..`, which have no meaning in a name
    #[error("illegal component {0:?}")]
    IllegalComponent(String),

    /// A digest component has a bad hex value
    #[error("invalid digest component: {0}")]
    InvalidDigest(String),
}

/// Errors reported by a [`Transport`](crate::transport::Transport) or
/// [`ReplyChannel`](crate::transport::ReplyChannel)
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// Prefix registration was refused
    #[error("prefix registration failed for {0}")]
    RegisterFailed(Name),

    /// The transport is closed
    #[error("transport closed")]
    Closed,

    /// Sending a packet failed
    #[error("send failed: {0}")]
    Send(Cow<'static, str>),
}

/// Signing failure reported by a [`Signer`](crate::security::Signer)
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct SignError(pub Cow<'static, str>);

/// Decryption error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptErrorCode {
    /// The encrypted content envelope could not be decoded
    InvalidEncryptedFormat,
    /// No key is available for the envelope's key locator
    NoDecryptKey,
    /// The ciphertext failed authentication
    DecryptionFailure,
    /// Anything else
    General,
}

impl std::fmt::Display for DecryptErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DecryptErrorCode::InvalidEncryptedFormat => "InvalidEncryptedFormat",
            DecryptErrorCode::NoDecryptKey => "NoDecryptKey",
            DecryptErrorCode::DecryptionFailure => "DecryptionFailure",
            DecryptErrorCode::General => "General",
        };
        f.write_str(text)
    }
}

/// Decryption failure reported by a [`Decryptor`](crate::security::Decryptor)
#[derive(Debug, Error, Clone)]
#[error("decryptor error {code}: {message}")]
pub struct DecryptError {
    /// Error category
    pub code: DecryptErrorCode,
    /// Human-readable detail
    pub message: Cow<'static, str>,
}

impl DecryptError {
    /// Create a decrypt error
    pub fn new(code: DecryptErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Validation failure reported by a [`Validator`](crate::security::Validator)
#[derive(Debug, Error, Clone)]
#[error("validation failed: {0}")]
pub struct ValidationError(pub Cow<'static, str>);

/// Errors reported by a [`SyncProvider`](crate::sync::SyncProvider)
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    /// Joining the sync group failed
    #[error("cannot join sync group {0}")]
    JoinFailed(Name),
}

/// Wire encoding errors
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The input could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),

    /// A decoded field is out of range
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A configuration value is out of range
    #[error("invalid config: {0}")]
    Invalid(Cow<'static, str>),
}
