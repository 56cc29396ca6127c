//! Namespace node states.
//!
//! A node moves through two independent state axes:
//!
//! ```text
//! fetch:    NameExists → InterestExpressed → {InterestTimeout | InterestNetworkNack | DataReceived}
//!           DataReceived → [Decrypting → DecryptionError] → Deserializing → ObjectReady
//! produce:  NameExists → ProducingObject → Serializing → [Encrypting → EncryptionError]
//!           → Signing → {SigningError | ObjectReady}
//!
//! validate: WaitingForData → Validating → {ValidateSuccess | ValidateFailure}
//! ```
//!
//! The numeric order of [`NamespaceState`] follows the pipeline, so states can
//! be compared with `<`.

use std::fmt;

/// Protocol state of a namespace node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamespaceState {
    /// The node exists; nothing has been requested
    NameExists = 0,
    /// An Interest was expressed for the node
    InterestExpressed = 1,
    /// The Interest timed out after all re-expressions
    InterestTimeout = 2,
    /// The network rejected the Interest
    InterestNetworkNack = 3,
    /// A Data packet was attached
    DataReceived = 4,
    /// Waiting for a handler to deserialize the content
    Deserializing = 5,
    /// Waiting for the decryptor
    Decrypting = 6,
    /// Decryption failed
    DecryptionError = 7,
    /// A producer accepted responsibility for the object
    ProducingObject = 8,
    /// Serializing a produced object
    Serializing = 9,
    /// Encrypting a produced object
    Encrypting = 10,
    /// Encryption failed
    EncryptionError = 11,
    /// Signing the produced Data packet
    Signing = 12,
    /// Signing failed
    SigningError = 13,
    /// The object is ready
    ObjectReady = 14,
    /// The object is ready but its Data is no longer fresh
    ObjectReadyButStale = 15,
}

impl NamespaceState {
    /// Check if the object is available
    #[must_use]
    pub fn is_object_ready(self) -> bool {
        matches!(
            self,
            NamespaceState::ObjectReady | NamespaceState::ObjectReadyButStale
        )
    }

    /// Check if the pipeline stopped on a failure
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            NamespaceState::InterestTimeout
                | NamespaceState::InterestNetworkNack
                | NamespaceState::DecryptionError
                | NamespaceState::EncryptionError
                | NamespaceState::SigningError
        )
    }

    /// Check if a later event is expected to advance the state
    #[must_use]
    pub fn is_transient(self) -> bool {
        !self.is_object_ready() && !self.is_failure()
    }
}

impl fmt::Display for NamespaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NamespaceState::NameExists => "NAME_EXISTS",
            NamespaceState::InterestExpressed => "INTEREST_EXPRESSED",
            NamespaceState::InterestTimeout => "INTEREST_TIMEOUT",
            NamespaceState::InterestNetworkNack => "INTEREST_NETWORK_NACK",
            NamespaceState::DataReceived => "DATA_RECEIVED",
            NamespaceState::Deserializing => "DESERIALIZING",
            NamespaceState::Decrypting => "DECRYPTING",
            NamespaceState::DecryptionError => "DECRYPTION_ERROR",
            NamespaceState::ProducingObject => "PRODUCING_OBJECT",
            NamespaceState::Serializing => "SERIALIZING",
            NamespaceState::Encrypting => "ENCRYPTING",
            NamespaceState::EncryptionError => "ENCRYPTION_ERROR",
            NamespaceState::Signing => "SIGNING",
            NamespaceState::SigningError => "SIGNING_ERROR",
            NamespaceState::ObjectReady => "OBJECT_READY",
            NamespaceState::ObjectReadyButStale => "OBJECT_READY_BUT_STALE",
        };
        f.write_str(text)
    }
}

/// Validation state of a namespace node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamespaceValidateState {
    /// No Data packet yet
    WaitingForData = 0,
    /// Validation in progress
    Validating = 1,
    /// The Data packet validated
    ValidateSuccess = 2,
    /// The Data packet failed validation
    ValidateFailure = 3,
}

impl fmt::Display for NamespaceValidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NamespaceValidateState::WaitingForData => "WAITING_FOR_DATA",
            NamespaceValidateState::Validating => "VALIDATING",
            NamespaceValidateState::ValidateSuccess => "VALIDATE_SUCCESS",
            NamespaceValidateState::ValidateFailure => "VALIDATE_FAILURE",
        };
        f.write_str(text)
    }
}
