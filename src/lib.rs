//! Relaynote is a small notification mailer written in Rust. It resolves
//! recipients from several sources, assembles a plaintext subject/body pair
//! and submits the result to an authenticated SMTP relay.
//!
//! ## Features
//!
//! * Recipient resolution from explicit address lists, newline-delimited
//!   files or sections of unit configuration files
//! * Content-classified send inputs: one call accepts addresses, a file
//!   path or a section name and does the right thing
//! * Alert formatting for urgent notifications
//! * Blocking SMTP submission with PLAIN authentication
//! * A recording stub transport for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use relaynote::{Body, Mailer, Subject};
//!
//! let mut mailer = Mailer::new("robot@example.com", "secret", "relay.example.com");
//! let delivered = mailer.send("ops@example.com", Subject::Default, Body::Default);
//! assert!(delivered);
//! ```

#![doc(html_root_url = "https://docs.rs/relaynote/0.1.0")]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod mailer;
pub mod transport;
pub mod unit;

mod envelope;
mod error;

pub use crate::{
    envelope::Envelope,
    error::Error,
    mailer::{
        input::{Body, Recipients, Subject},
        Mailer,
    },
    transport::Transport,
};

/// Boxed error, for transports and error sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The machine hostname, falling back to `localhost`
///
/// Used for the default subject and the EHLO client id.
pub(crate) fn localhost_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
