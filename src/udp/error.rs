use thiserror::Error;

/// UDP request failures. The `Display` form is the message carried by the
/// action=3 error packet.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServerError {
    #[error("invalid connection id")]
    InvalidConnectionId,
}
