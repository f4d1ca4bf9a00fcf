//! Datagram send with fixed-backoff retries.

use std::net::SocketAddr;

use tokio::time::sleep;
use tracing::warn;

use crate::domain::SendPolicy;
use crate::ports::{DatagramTransport, TransportError};

/// Send `bytes`, retrying after `policy.backoff` until `policy.attempts`
/// sends have failed. Returns the last error.
pub(crate) async fn send_with_retry(
    transport: &dyn DatagramTransport,
    bytes: &[u8],
    target: SocketAddr,
    policy: SendPolicy,
) -> Result<(), TransportError> {
    let mut attempt = 1;
    loop {
        match transport.send_datagram(bytes, target).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.attempts => {
                warn!(error = %e, attempt, %target, "[fc-03] Send failed; retrying");
                attempt += 1;
                sleep(policy.backoff).await;
            }
            Err(e) => {
                warn!(error = %e, attempts = attempt, %target, "[fc-03] Send failed; giving up");
                return Err(e);
            }
        }
    }
}
