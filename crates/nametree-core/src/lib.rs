//! # nametree Core
//!
//! A namespace tree for named-data networking clients.
//!
//! Applications address content by hierarchical name. The tree turns a
//! request for a name into network Interests, assembles the returned Data
//! into application objects, answers inbound Interests from cached content,
//! and spreads the existence of names through a sync group.
//!
//! This crate provides:
//! - Names and packets (Interest, Data, network nacks, encrypted content)
//! - The [`Namespace`] tree with its per-node state machine
//! - Callback registries with process-wide unique IDs
//! - The pending interest table for inbound requests
//! - Collaborator traits for transports, signers, decryptors, validators and
//!   sync groups
//! - Tree configuration and error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Handlers / Application                      │
//! │   (object-needed and deserialize-needed callbacks)              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Namespace tree                           │
//! │   (node states, pipelines, pending interests, sync binding)     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                        Collaborators                            │
//! │   (transport, signer, decryptor, validator, sync provider)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod callback;
pub mod config;
pub mod encrypted;
pub mod error;
pub mod handler;
pub mod name;
pub mod namespace;
pub mod object;
pub mod packet;
pub mod pending;
pub mod security;
pub mod state;
pub mod sync;
pub mod transport;

pub use callback::{
    CallbackId, CallbackRegistry, OnDeserializeNeeded, OnDeserialized, OnObjectNeeded,
    OnObjectSet, OnStateChanged, OnValidateStateChanged,
};
pub use config::{SyncConfig, TreeConfig};
pub use encrypted::EncryptedContent;
pub use error::{
    ConfigError, DecryptError, DecryptErrorCode, EncodingError, NameError, NamespaceError,
    Result, SignError, SyncError, TransportError, ValidationError,
};
pub use handler::{Handler, HandlerBinding};
pub use name::{Name, NameComponent};
pub use namespace::Namespace;
pub use object::{BlobObject, Object};
pub use packet::{ContentType, Data, Interest, MetaInfo, NackReason, NetworkNack, SignatureInfo};
pub use pending::PendingInterestTable;
pub use security::{Decryptor, DigestSigner, DigestValidator, Signer, Validator};
pub use state::{NamespaceState, NamespaceValidateState};
pub use sync::{SyncDepth, SyncGroup, SyncProvider};
pub use transport::{InterestOutcome, RegistrationId, ReplyChannel, Transport};
