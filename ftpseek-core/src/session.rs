//! Sessions bound to an admission slot

use ftpseek_common::ServerEndpoint;
use tracing::debug;

use crate::admission::AdmissionSlot;
use crate::transport::{Session, Transport, TransportError};

/// An authenticated session that owns the slot it was admitted with
///
/// The slot is released when the session is closed, or dropped together with
/// it on any early return.
pub(crate) struct OpenSession {
    session: Box<dyn Session>,
    slot: AdmissionSlot,
}

impl OpenSession {
    /// Connect and log in using an already-acquired slot
    pub(crate) async fn open(
        transport: &dyn Transport,
        endpoint: &ServerEndpoint,
        slot: AdmissionSlot,
    ) -> Result<Self, TransportError> {
        let mut session = transport
            .connect(endpoint.hostname(), endpoint.port(), endpoint.timeout())
            .await?;

        if let Err(e) = session.authenticate(endpoint.credentials()).await {
            let _ = session.close().await;
            return Err(e);
        }

        debug!(
            attempt = slot.id(),
            host = endpoint.hostname(),
            "session established"
        );
        Ok(Self { session, slot })
    }

    pub(crate) fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }

    /// Close the session, then release its slot
    pub(crate) async fn close(mut self) {
        if let Err(e) = self.session.close().await {
            debug!(attempt = self.slot.id(), error = %e, "error while closing session");
        }
        debug!(attempt = self.slot.id(), "session closed");
        self.slot.release();
    }
}
