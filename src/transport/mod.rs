//! Delivery capability behind the mailer
//!
//! The mailer resolves recipients and assembles the raw message; a
//! `Transport` performs the actual delivery of the finished envelope. Two
//! transports are provided:
//!
//! * The `SmtpTransport` submits the message to an authenticated relay over
//!   the SMTP protocol. It is the delivery path used by
//!   [`Mailer::send`][crate::Mailer::send].
//! * The `StubTransport` records what it is asked to deliver and returns a
//!   preconfigured response. It is useful for testing.

use crate::Envelope;

pub mod smtp;
pub mod stub;

/// Blocking transport method for emails
pub trait Transport {
    /// Response produced by the transport
    type Ok;
    /// Error produced by the transport
    type Error;

    /// Sends the raw email bytes to the envelope recipients
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error>;
}
