use lanlobby_transport::TransportError;

/// Errors starting the host-side responder. Probes never return errors;
/// failures become [`PreconnectResult`](crate::PreconnectResult) values.
#[derive(Debug, thiserror::Error)]
pub enum PreconnectError {
    #[error("preconnect socket: {0}")]
    Socket(#[from] TransportError),
}
