use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

use crate::BoxError;

/// Error type for message resolution and delivery
///
/// The public [`Mailer::send`][crate::Mailer::send] boundary collapses every
/// variant to `false`; the variants exist so the resolution pipeline and its
/// tests can tell failure causes apart.
#[derive(Debug)]
pub enum Error {
    /// No secret is configured, the mailer cannot authenticate
    MissingCredentials,
    /// Recipient resolution produced an empty address list
    NoRecipients,
    /// The transport reported a delivery failure
    Transport(BoxError),
}

impl Display for Error {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Error::MissingCredentials => fmt.write_str("missing relay credentials"),
            Error::NoRecipients => fmt.write_str("empty recipient list, invalid envelope"),
            Error::Transport(e) => write!(fmt, "transport error: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(e) => Some(&**e),
            _ => None,
        }
    }
}
