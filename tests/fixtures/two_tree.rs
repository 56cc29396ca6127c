//! Producer/consumer fixture.
//!
//! Two trees rooted at the same prefix share a [`LoopbackNetwork`]. The
//! producer registers the prefix and signs with a digest signer; the
//! consumer only expresses Interests and validates digests.

use super::LoopbackNetwork;
use nametree_core::{
    BlobObject, DigestSigner, DigestValidator, Name, Namespace, NamespaceError, Transport,
};
use std::sync::Arc;

/// A producer tree and a consumer tree on one network
pub struct TwoTreeFixture {
    /// Network shared by both trees
    pub network: Arc<LoopbackNetwork>,
    /// Tree answering Interests under the prefix
    pub producer: Namespace,
    /// Tree fetching objects under the prefix
    pub consumer: Namespace,
}

impl TwoTreeFixture {
    /// Build both trees rooted at `prefix`
    pub fn new(prefix: &Name) -> Result<Self, NamespaceError> {
        let network = LoopbackNetwork::new();
        let transport: Arc<dyn Transport> = network.clone();

        let producer = Namespace::new(prefix.clone());
        producer.set_signer(Arc::new(DigestSigner));
        producer.set_transport(Arc::clone(&transport), true)?;

        let consumer = Namespace::new(prefix.clone());
        consumer.set_validator(Arc::new(DigestValidator));
        consumer.set_transport(transport, false)?;

        Ok(Self {
            network,
            producer,
            consumer,
        })
    }

    /// Publish `content` at `name` in the producer tree
    pub fn publish(&self, name: &Name, content: &'static [u8]) -> Result<Namespace, NamespaceError> {
        let node = self.producer.get_descendant(name)?;
        node.serialize_object(BlobObject::object(content))?;
        Ok(node)
    }

    /// Node for `name` in the consumer tree
    pub fn consumer_node(&self, name: &Name) -> Result<Namespace, NamespaceError> {
        self.consumer.get_descendant(name)
    }

    /// Shut both trees down
    pub fn cleanup(&self) {
        let _ = self.producer.shutdown();
        let _ = self.consumer.shutdown();
    }
}
