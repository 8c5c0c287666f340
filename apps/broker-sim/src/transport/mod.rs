//! Transport implementations.
//!
//! [`ChannelTransport`] hands outbound messages to a channel whose
//! receiver belongs to the session/encoding collaborator.
//! [`RecordingTransport`] captures sends for tests and demos.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ports::{DeliveryContext, OutboundMessage, TransportError, TransportPort};

/// Transport that forwards messages over an unbounded channel.
///
/// The send is non-blocking, so it is safe inside the engine's
/// operation gate.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<(OutboundMessage, DeliveryContext)>,
}

impl ChannelTransport {
    /// Create the transport and the receiver the collaborator drains.
    #[must_use]
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<(OutboundMessage, DeliveryContext)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TransportPort for ChannelTransport {
    fn send(
        &self,
        message: &OutboundMessage,
        context: &DeliveryContext,
    ) -> Result<(), TransportError> {
        self.tx
            .send((message.clone(), context.clone()))
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Transport that records every send in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(OutboundMessage, DeliveryContext)>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail, to exercise the report-only error
    /// policy.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Clone everything sent so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<(OutboundMessage, DeliveryContext)> {
        self.sent.lock().clone()
    }

    /// Number of recorded sends.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Clone the most recent send.
    #[must_use]
    pub fn last(&self) -> Option<(OutboundMessage, DeliveryContext)> {
        self.sent.lock().last().cloned()
    }
}

impl TransportPort for RecordingTransport {
    fn send(
        &self,
        message: &OutboundMessage,
        context: &DeliveryContext,
    ) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                message: "recording transport set to fail".to_string(),
            });
        }
        self.sent.lock().push((message.clone(), context.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientOrderId, OrderStatus, SessionId};
    use crate::ports::{CancelReject, RequestKind};

    fn make_message() -> OutboundMessage {
        OutboundMessage::CancelReject(CancelReject {
            order_id: None,
            client_order_id: ClientOrderId::new("CLIENT-1"),
            orig_client_order_id: None,
            status: OrderStatus::New,
            refused: RequestKind::Cancel,
        })
    }

    fn make_context() -> DeliveryContext {
        DeliveryContext::plain(SessionId::new("FIX.4.2:A->B"))
    }

    #[tokio::test]
    async fn channel_transport_delivers_to_receiver() {
        let (transport, mut rx) = ChannelTransport::new();

        transport.send(&make_message(), &make_context()).unwrap();

        let (message, context) = rx.recv().await.unwrap();
        assert!(matches!(message, OutboundMessage::CancelReject(_)));
        assert_eq!(context.session.as_str(), "FIX.4.2:A->B");
    }

    #[test]
    fn channel_transport_reports_closed_receiver() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);

        let result = transport.send(&make_message(), &make_context());

        assert!(matches!(result, Err(TransportError::ChannelClosed)));
    }

    #[test]
    fn recording_transport_captures_in_order() {
        let transport = RecordingTransport::new();

        transport.send(&make_message(), &make_context()).unwrap();
        transport.send(&make_message(), &make_context()).unwrap();

        assert_eq!(transport.sent_count(), 2);
        assert!(transport.last().is_some());
    }

    #[test]
    fn recording_transport_can_fail_on_demand() {
        let transport = RecordingTransport::new();
        transport.set_failing(true);

        let result = transport.send(&make_message(), &make_context());

        assert!(matches!(result, Err(TransportError::SendFailed { .. })));
        assert_eq!(transport.sent_count(), 0);

        transport.set_failing(false);
        transport.send(&make_message(), &make_context()).unwrap();
        assert_eq!(transport.sent_count(), 1);
    }
}
