use crate::{
    modem_client::{UplinkState, UplinkStatus},
    services::bringup::BringupError,
};
use log::debug;
use std::time::Duration;
use tokio::sync::watch;

/// Blocks the bring-up flow until the modem reports an acquired address.
///
/// The readiness signal is level-triggered: if it was already raised when
/// the wait starts, the waiter returns immediately instead of missing the
/// edge. The waiter is single-use; the caller is either woken with a ready
/// status or still suspended.
pub struct UplinkWaiter {
    uplink: watch::Receiver<UplinkState>,
    timeout: Option<Duration>,
}

impl UplinkWaiter {
    pub fn new(uplink: watch::Receiver<UplinkState>, timeout: Option<Duration>) -> Self {
        Self { uplink, timeout }
    }

    /// Suspends until the uplink is ready. With a configured timeout the
    /// wait fails with [`BringupError::UplinkTimeout`] once it elapses;
    /// without one it is unbounded.
    pub async fn await_ready(mut self) -> Result<UplinkStatus, BringupError> {
        match self.timeout {
            Some(limit) => {
                debug!("waiting for uplink (timeout {limit:?})");
                tokio::time::timeout(limit, Self::wait(&mut self.uplink))
                    .await
                    .map_err(|_| BringupError::UplinkTimeout(limit))?
            }
            None => {
                debug!("waiting for uplink");
                Self::wait(&mut self.uplink).await
            }
        }
    }

    async fn wait(
        uplink: &mut watch::Receiver<UplinkState>,
    ) -> Result<UplinkStatus, BringupError> {
        let state = uplink
            .wait_for(UplinkState::is_ready)
            .await
            .map_err(|_| BringupError::UplinkSignalLost)?;

        state.status().cloned().ok_or(BringupError::UplinkSignalLost)
    }
}
