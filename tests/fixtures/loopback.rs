//! In-memory forwarder.
//!
//! Interests go to the registration with the longest matching prefix.
//! Unanswered Interests stay outstanding until the test times them out, and
//! Interests with no route are nacked immediately. Every Data packet is
//! passed through its wire encoding on the way back.

use nametree_core::transport::{OnInterest, OnInterestOutcome};
use nametree_core::{
    Data, Interest, InterestOutcome, Name, NackReason, NetworkNack, RegistrationId, ReplyChannel,
    Transport, TransportError,
};
use parking_lot::Mutex;
use std::sync::Arc;

struct Route {
    id: RegistrationId,
    prefix: Name,
    on_interest: OnInterest,
}

/// One expressed Interest waiting for its outcome
struct Exchange {
    interest: Interest,
    on_outcome: Mutex<Option<OnInterestOutcome>>,
}

impl Exchange {
    fn finish(&self, outcome: InterestOutcome) -> bool {
        let on_outcome = self.on_outcome.lock().take();
        match on_outcome {
            Some(on_outcome) => {
                on_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn is_finished(&self) -> bool {
        self.on_outcome.lock().is_none()
    }
}

impl ReplyChannel for Exchange {
    fn put_data(&self, data: &Data) -> Result<(), TransportError> {
        if !self.interest.matches_data(data) {
            return Ok(());
        }
        let wire = data
            .wire_encode()
            .map_err(|e| TransportError::Send(e.to_string().into()))?;
        let received =
            Data::wire_decode(&wire).map_err(|e| TransportError::Send(e.to_string().into()))?;
        self.finish(InterestOutcome::Data(received));
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    routes: Vec<Route>,
    outstanding: Vec<Arc<Exchange>>,
    expressed: Vec<Interest>,
    closed: bool,
}

/// In-memory forwarder shared by the trees under test
#[derive(Default)]
pub struct LoopbackNetwork {
    inner: Mutex<Inner>,
}

impl LoopbackNetwork {
    /// Create an empty network
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every Interest expressed so far, in order
    pub fn expressed(&self) -> Vec<Interest> {
        self.inner.lock().expressed.clone()
    }

    /// Number of registered prefixes
    pub fn route_count(&self) -> usize {
        self.inner.lock().routes.len()
    }

    /// Number of Interests still waiting for an outcome
    pub fn outstanding(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.outstanding.retain(|exchange| !exchange.is_finished());
        inner.outstanding.len()
    }

    /// Report a timeout for every outstanding Interest
    ///
    /// Returns the number of Interests timed out. Re-expressed Interests
    /// become outstanding again.
    pub fn time_out_outstanding(&self) -> usize {
        let exchanges = std::mem::take(&mut self.inner.lock().outstanding);
        exchanges
            .into_iter()
            .filter(|exchange| exchange.finish(InterestOutcome::Timeout(exchange.interest.clone())))
            .count()
    }

    /// Refuse all further Interests and registrations
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }
}

impl Transport for LoopbackNetwork {
    fn express_interest(
        &self,
        interest: Interest,
        on_outcome: OnInterestOutcome,
    ) -> Result<(), TransportError> {
        let exchange = Arc::new(Exchange {
            interest: interest.clone(),
            on_outcome: Mutex::new(Some(on_outcome)),
        });

        let route = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(TransportError::Closed);
            }
            inner.expressed.push(interest.clone());
            let route = inner
                .routes
                .iter()
                .filter(|route| route.prefix.is_prefix_of(interest.name()))
                .max_by_key(|route| route.prefix.len())
                .map(|route| (route.prefix.clone(), Arc::clone(&route.on_interest)));
            if route.is_some() {
                inner.outstanding.push(Arc::clone(&exchange));
            }
            route
        };

        match route {
            Some((prefix, on_interest)) => {
                tracing::trace!("Forwarding {} to {}", interest.name(), prefix);
                on_interest(&prefix, &interest, exchange);
            }
            None => {
                exchange.finish(InterestOutcome::NetworkNack(
                    interest,
                    NetworkNack::new(NackReason::NoRoute),
                ));
            }
        }
        Ok(())
    }

    fn register_prefix(
        &self,
        prefix: &Name,
        on_interest: OnInterest,
    ) -> Result<RegistrationId, TransportError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::RegisterFailed(prefix.clone()));
        }
        inner.next_id += 1;
        let id = RegistrationId(inner.next_id);
        inner.routes.push(Route {
            id,
            prefix: prefix.clone(),
            on_interest,
        });
        Ok(id)
    }

    fn unregister_prefix(&self, id: RegistrationId) {
        self.inner.lock().routes.retain(|route| route.id != id);
    }
}

/// Reply channel that keeps every Data packet sent on it
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Data>>,
}

impl RecordingChannel {
    /// Create an empty channel
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Data packets sent so far
    pub fn sent(&self) -> Vec<Data> {
        self.sent.lock().clone()
    }
}

impl ReplyChannel for RecordingChannel {
    fn put_data(&self, data: &Data) -> Result<(), TransportError> {
        self.sent.lock().push(data.clone());
        Ok(())
    }
}
