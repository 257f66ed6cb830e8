//! The stub transport only records the messages given to it, and can be
//! useful for testing purposes.

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    sync::{Arc, Mutex},
};

use crate::{transport::Transport, Envelope};

/// Stub transport failure
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Error;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("stub delivery error")
    }
}

impl StdError for Error {}

/// Stub result type
pub type StubResult = Result<(), Error>;

/// This transport records the message envelopes and contents, and returns the
/// given response
#[derive(Debug, Clone)]
pub struct StubTransport {
    response: StubResult,
    messages: Arc<Mutex<Vec<(Envelope, String)>>>,
}

impl StubTransport {
    /// Creates a new transport that always returns the given response
    pub fn new(response: StubResult) -> StubTransport {
        StubTransport {
            response,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a new transport that always succeeds
    pub fn new_ok() -> StubTransport {
        StubTransport::new(Ok(()))
    }

    /// Creates a new transport that always fails
    pub fn new_error() -> StubTransport {
        StubTransport::new(Err(Error))
    }

    /// Returns the recorded envelopes and message contents
    pub fn messages(&self) -> Vec<(Envelope, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    type Ok = ();
    type Error = Error;

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.messages
            .lock()
            .unwrap()
            .push((envelope.clone(), String::from_utf8_lossy(email).into_owned()));
        self.response
    }
}
