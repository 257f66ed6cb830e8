use crate::Error;

/// Simple email envelope representation
///
/// Carries the sender and the recipient list handed to a transport alongside
/// the raw message bytes. Addresses are kept as the caller resolved them; the
/// relay performs the actual validation.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<String>,
    /// The envelope sender address
    reverse_path: String,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// # Errors
    ///
    /// If `to` has no elements in it.
    pub fn new(from: String, to: Vec<String>) -> Result<Envelope, Error> {
        if to.is_empty() {
            return Err(Error::NoRecipients);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from,
        })
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[String] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> &str {
        &self.reverse_path
    }
}
