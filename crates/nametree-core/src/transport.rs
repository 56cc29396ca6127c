//! Transport collaborator interface.
//!
//! The tree never frames or sends packets itself. It expresses Interests and
//! registers prefixes through a [`Transport`], and answers inbound Interests
//! through the [`ReplyChannel`] they arrived on.
//!
//! [`express_with_reexpress`] wraps a transport with exponential lifetime
//! growth: each time an Interest times out, its lifetime is doubled and it is
//! expressed again until the doubled lifetime would exceed a cap.

use crate::error::TransportError;
use crate::name::Name;
use crate::packet::{Data, Interest, NetworkNack};
use std::sync::Arc;
use std::time::Duration;

/// Handle for a prefix registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// Final result of an expressed Interest
#[derive(Debug, Clone)]
pub enum InterestOutcome {
    /// A matching Data packet arrived
    Data(Data),
    /// The Interest lifetime elapsed without a reply
    Timeout(Interest),
    /// The network rejected the Interest
    NetworkNack(Interest, NetworkNack),
}

/// Receives the single outcome of an expressed Interest
pub type OnInterestOutcome = Box<dyn FnOnce(InterestOutcome) + Send>;

/// Called for every Interest arriving under a registered prefix
///
/// Arguments are the registered prefix, the Interest, and the channel to
/// reply on.
pub type OnInterest = Arc<dyn Fn(&Name, &Interest, Arc<dyn ReplyChannel>) + Send + Sync>;

/// Request/response transport
pub trait Transport: Send + Sync {
    /// Send an Interest
    ///
    /// Exactly one outcome is eventually delivered to `on_outcome`, possibly
    /// from another thread.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the Interest could not be sent at all; in
    /// that case `on_outcome` is never called.
    fn express_interest(
        &self,
        interest: Interest,
        on_outcome: OnInterestOutcome,
    ) -> Result<(), TransportError>;

    /// Register to receive Interests under `prefix`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::RegisterFailed`] if the registration is refused.
    fn register_prefix(
        &self,
        prefix: &Name,
        on_interest: OnInterest,
    ) -> Result<RegistrationId, TransportError>;

    /// Remove a prefix registration
    fn unregister_prefix(&self, id: RegistrationId);
}

/// Channel an inbound Interest arrived on
pub trait ReplyChannel: Send + Sync {
    /// Send a Data packet back
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the packet could not be sent.
    fn put_data(&self, data: &Data) -> Result<(), TransportError>;
}

/// Lifetime to re-express with after a timeout, or `None` to give up
///
/// The lifetime doubles on each attempt and the Interest is re-expressed only
/// while the doubled lifetime does not exceed `max_lifetime`.
#[must_use]
pub fn next_lifetime(current: Duration, max_lifetime: Duration) -> Option<Duration> {
    let next = current.checked_mul(2)?;
    (next <= max_lifetime).then_some(next)
}

/// Express `interest`, re-expressing with a doubled lifetime on each timeout
///
/// An Interest without a lifetime is never re-expressed. If a re-expression
/// fails to send, the last timeout is reported.
///
/// # Errors
///
/// Returns [`TransportError`] if the first expression fails to send.
pub fn express_with_reexpress(
    transport: Arc<dyn Transport>,
    interest: Interest,
    max_lifetime: Duration,
    on_outcome: OnInterestOutcome,
) -> Result<(), TransportError> {
    let retry_transport = Arc::clone(&transport);
    transport.express_interest(
        interest,
        Box::new(move |outcome| match outcome {
            InterestOutcome::Timeout(mut timed_out) => {
                let next = timed_out
                    .lifetime()
                    .and_then(|lifetime| next_lifetime(lifetime, max_lifetime));
                let Some(lifetime) = next else {
                    on_outcome(InterestOutcome::Timeout(timed_out));
                    return;
                };

                tracing::debug!(
                    "Re-expressing interest for {} with lifetime {:?}",
                    timed_out.name(),
                    lifetime
                );
                timed_out.set_lifetime(lifetime);
                let on_outcome = Arc::new(parking_lot::Mutex::new(Some(on_outcome)));
                let on_retry_outcome = Arc::clone(&on_outcome);
                let result = express_with_reexpress(
                    retry_transport,
                    timed_out.clone(),
                    max_lifetime,
                    Box::new(move |outcome| {
                        if let Some(on_outcome) = on_retry_outcome.lock().take() {
                            on_outcome(outcome);
                        }
                    }),
                );
                if let Err(e) = result {
                    tracing::warn!("Failed to re-express interest for {}: {}", timed_out.name(), e);
                    if let Some(on_outcome) = on_outcome.lock().take() {
                        on_outcome(InterestOutcome::Timeout(timed_out));
                    }
                }
            }
            other => on_outcome(other),
        }),
    )
}
