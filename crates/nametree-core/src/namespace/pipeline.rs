//! Object pipelines.
//!
//! ```text
//! object_needed ─┬─ cached Data in subtree ──────────► re-announce its state
//!                ├─ producer callback accepts ───────► PRODUCING_OBJECT
//!                └─ express Interest ─┬─ Data ───────► DATA_RECEIVED → [DECRYPTING] → deserialize
//!                                     ├─ timeout ────► INTEREST_TIMEOUT
//!                                     └─ nack ───────► INTEREST_NETWORK_NACK
//!
//! serialize_object ─► SIGNING ─┬─ error ─► SIGNING_ERROR
//!                              └─ ok ────► attach Data → OBJECT_READY
//! ```
//!
//! Failures inside the pipelines are recorded on the node and reported through
//! its state, never returned to the caller.

use super::Namespace;
use crate::callback::{OnDeserialized, OnObjectSet, invoke_guarded};
use crate::encrypted::EncryptedContent;
use crate::error::{NamespaceError, Result};
use crate::object::{BlobObject, Object, as_blob};
use crate::packet::{Data, Interest};
use crate::security::Decryptor;
use crate::state::{NamespaceState, NamespaceValidateState};
use crate::transport::{InterestOutcome, express_with_reexpress};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

impl Namespace {
    // ============ Consumer ============

    /// Request the object for this node
    ///
    /// Answers from cached Data in this subtree if possible, then offers the
    /// request to object-needed callbacks on this node and its ancestors, and
    /// finally expresses an Interest through the nearest transport.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::NoTransport`] if nothing answered and no
    /// transport is set, or [`NamespaceError::Transport`] if the Interest
    /// could not be sent.
    pub fn object_needed(&self, must_be_fresh: bool) -> Result<()> {
        if self.observe_shut_down() {
            return Ok(());
        }

        let cached = {
            let arena = self.tree.arena.lock();
            arena
                .find_best_match(self.index, must_be_fresh, Instant::now())
                .and_then(|index| arena.node(index).map(|node| (index, node.state)))
        };
        if let Some((index, state)) = cached {
            self.at(index).set_state(state);
            return Ok(());
        }

        if self.fire_object_needed(self) {
            // A producer may have published synchronously.
            if !self.state().is_object_ready() {
                self.set_state(NamespaceState::ProducingObject);
            }
            return Ok(());
        }

        let transport = self
            .resolve(|node| node.transport.clone())
            .ok_or_else(|| NamespaceError::NoTransport(self.name()))?;
        let max_lifetime = self.max_interest_lifetime()?;
        let interest = Interest::new(self.name())
            .with_must_be_fresh(must_be_fresh)
            .with_lifetime(self.tree.config.interest_lifetime);

        self.set_state(NamespaceState::InterestExpressed);
        let requester = self.clone();
        express_with_reexpress(
            transport,
            interest,
            max_lifetime,
            Box::new(move |outcome| requester.on_interest_outcome(outcome)),
        )?;
        Ok(())
    }

    fn on_interest_outcome(&self, outcome: InterestOutcome) {
        if self.observe_shut_down() {
            return;
        }
        match outcome {
            InterestOutcome::Data(data) => self.on_data(data),
            InterestOutcome::Timeout(interest) => {
                tracing::debug!("Interest timed out for {}", interest.name());
                self.set_state(NamespaceState::InterestTimeout);
            }
            InterestOutcome::NetworkNack(interest, nack) => {
                tracing::debug!(
                    "Network nack {:?} for {}",
                    nack.reason,
                    interest.name()
                );
                self.with_node_mut(|node| node.network_nack = Some(nack));
                self.set_state(NamespaceState::InterestNetworkNack);
            }
        }
    }

    fn on_data(&self, data: Data) {
        let own_name = self.name();
        if !own_name.is_prefix_of(data.name()) {
            tracing::debug!(
                "Ignoring Data {} outside the requested subtree {}",
                data.name(),
                own_name
            );
            return;
        }

        let data_node = match self.get_descendant(data.name()) {
            Ok(node) => node,
            Err(e) => {
                tracing::debug!("Cannot store Data {}: {}", data.name(), e);
                return;
            }
        };
        match data_node.set_data(data.clone()) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::debug!("Cannot attach Data {}: {}", data.name(), e);
                return;
            }
        }
        self.set_state(NamespaceState::DataReceived);
        data_node.validate(&data);

        match data_node.resolve(|node| node.decryptor.clone()) {
            Some(decryptor) => data_node.decrypt(decryptor.as_ref(), data.content()),
            None => data_node.deserialize(data.content().clone(), None),
        }
    }

    fn validate(&self, data: &Data) {
        self.set_validate_state(NamespaceValidateState::Validating);
        let Some(validator) = self.resolve(|node| node.validator.clone()) else {
            return;
        };

        match invoke_guarded("Validator", || validator.validate(data)) {
            Some(Ok(())) => self.set_validate_state(NamespaceValidateState::ValidateSuccess),
            Some(Err(e)) => {
                tracing::debug!("Data {} failed validation: {}", data.name(), e);
                self.with_node_mut(|node| node.validation_error = Some(e));
                self.set_validate_state(NamespaceValidateState::ValidateFailure);
            }
            None => self.set_validate_state(NamespaceValidateState::ValidateFailure),
        }
    }

    fn decrypt(&self, decryptor: &dyn Decryptor, content: &Bytes) {
        self.set_state(NamespaceState::Decrypting);
        let envelope = match EncryptedContent::wire_decode(content) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.fail_decryption(format!("Error decoding the EncryptedContent: {e}"));
                return;
            }
        };

        let on_plaintext_node = self.clone();
        let on_error_node = self.clone();
        let started = invoke_guarded("Decryptor", || {
            decryptor.decrypt(
                envelope,
                Box::new(move |plaintext| {
                    if !on_plaintext_node.observe_shut_down() {
                        on_plaintext_node.deserialize(plaintext, None);
                    }
                }),
                Box::new(move |e| {
                    if !on_error_node.observe_shut_down() {
                        on_error_node.fail_decryption(e.to_string());
                    }
                }),
            )
        });
        if started.is_none() {
            self.fail_decryption("Error decrypting: decryptor panicked".to_string());
        }
    }

    fn fail_decryption(&self, message: String) {
        tracing::debug!("Decryption failed for {}: {}", self.name(), message);
        self.with_node_mut(|node| node.decryption_error = Some(message));
        self.set_state(NamespaceState::DecryptionError);
    }

    /// Turn content bytes into this node's object
    ///
    /// Deserialize-needed callbacks on this node and its ancestors are asked
    /// first; the first that accepts owns the conversion. Otherwise the bytes
    /// become a [`BlobObject`]. Once the object is set the state becomes
    /// `OBJECT_READY` and `on_object_set` is called.
    pub fn deserialize(&self, content: Bytes, on_object_set: Option<OnObjectSet>) {
        if self.observe_shut_down() {
            return;
        }

        let completed = Arc::new(AtomicBool::new(false));
        let on_object_set = Arc::new(Mutex::new(on_object_set));
        let make_completion = || -> OnDeserialized {
            let node = self.clone();
            let completed = Arc::clone(&completed);
            let on_object_set = Arc::clone(&on_object_set);
            Box::new(move |object| {
                if completed.swap(true, Ordering::SeqCst) {
                    return;
                }
                let on_object_set = on_object_set.lock().take();
                node.finish_deserialize(object, on_object_set);
            })
        };

        if self.fire_deserialize_needed(&content, &make_completion) {
            if !completed.load(Ordering::SeqCst) {
                self.set_state(NamespaceState::Deserializing);
            }
            return;
        }

        let default_completion = make_completion();
        default_completion(BlobObject::object(content));
    }

    fn finish_deserialize(&self, object: Object, on_object_set: Option<OnObjectSet>) {
        if self.observe_shut_down() {
            return;
        }
        self.with_node_mut(|node| node.object = Some(object));
        self.set_state(NamespaceState::ObjectReady);
        if let Some(on_object_set) = on_object_set {
            invoke_guarded("OnObjectSet", || on_object_set(self));
        }
    }

    // ============ Producer ============

    /// Publish `object` at this node
    ///
    /// The object must be a [`BlobObject`]. Its bytes become the content of a
    /// Data packet named after this node, using the nearest MetaInfo
    /// template, signed by the nearest signer. On success the Data is attached,
    /// answering any pending Interests, and the state becomes `OBJECT_READY`.
    /// A signing failure is recorded and reported as `SIGNING_ERROR`.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError::UnsupportedObject`] for other object types and
    /// [`NamespaceError::NoSigner`] if no signer is set.
    pub fn serialize_object(&self, object: Object) -> Result<()> {
        if self.observe_shut_down() {
            return Ok(());
        }

        let Some(content) = as_blob(&object).cloned() else {
            return Err(NamespaceError::UnsupportedObject(
                "the default serializer only handles BlobObject".into(),
            ));
        };
        let signer = self
            .resolve(|node| node.signer.clone())
            .ok_or_else(|| NamespaceError::NoSigner(self.name()))?;
        let meta_info = self.new_data_meta_info()?;
        let mut data = Data::new(self.name(), content).with_meta_info(meta_info);

        self.set_state(NamespaceState::Signing);
        let signed = invoke_guarded("Signer", || signer.sign(&mut data));
        match signed {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                self.fail_signing(format!("Error signing the serialized Data: {e}"));
                return Ok(());
            }
            None => {
                self.fail_signing("Error signing the serialized Data: signer panicked".to_string());
                return Ok(());
            }
        }

        self.set_data(data)?;
        self.with_node_mut(|node| node.object = Some(object));
        self.set_state(NamespaceState::ObjectReady);
        Ok(())
    }

    fn fail_signing(&self, message: String) {
        tracing::error!("{} for {}", message, self.name());
        self.with_node_mut(|node| node.signing_error = Some(message));
        self.set_state(NamespaceState::SigningError);
    }
}
