use thiserror::Error;

#[derive(Error, Debug)]
pub enum PairingError {
    /// The generated token pair is already registered by a live ticket.
    #[error("Pairing tokens collided with a live ticket, issue a new pair")]
    Collision,
}
