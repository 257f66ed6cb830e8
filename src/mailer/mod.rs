//! Notification mailer
//!
//! A [`Mailer`] holds relay credentials and a pending message that is
//! populated, delivered and cleared by a single [`send`][Mailer::send] call.
//! Recipients may come from an explicit list, a newline-delimited file, or a
//! unit-file section; the send entry point accepts all of those shapes and
//! normalizes them before handing the assembled message to a transport.
//!
//! ```rust,no_run
//! use relaynote::{Body, Mailer, Subject};
//!
//! let mut mailer = Mailer::new("robot@example.com", "secret", "relay.example.com");
//!
//! // explicit addresses, default subject, default body
//! mailer.send("ops@example.com,dev@example.com", Subject::Default, Body::Default);
//!
//! // recipients from the [oncall] section of a unit file, alert formatting
//! let mut mailer = Mailer::from_unit("/etc/notify.unit", &["notify"]);
//! mailer.alert().send("oncall", "disk full", "replace /dev/sda");
//! # let _ = mailer;
//! ```
//!
//! The mailer is not safe for concurrent reuse: the pending message is shared
//! mutable state between the population helpers and `send`. Use one mailer
//! per logical sender or serialize calls externally.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::debug;

use crate::{
    transport::{
        smtp::{Credentials, SmtpTransport},
        Transport,
    },
    unit::Unit,
    BoxError, Envelope, Error,
};

pub mod input;

use self::input::{Body, RawRecipients, Recipients, Subject};

/// Line terminator used in assembled messages
pub const NEWLINE: &str = "\r\n";

/// Scratch state for exactly one in-flight send
///
/// Logically empty before a caller begins populating it and after every
/// `send` call returns.
#[derive(Default, Clone, Debug)]
struct Pending {
    to: Vec<String>,
    subject: String,
    message: String,
    alert: bool,
}

/// Sends single plaintext notification emails through an authenticated relay
pub struct Mailer {
    user: String,
    secret: String,
    relay: String,
    /// Remembered unit-file path, for re-resolving recipient sections
    unit: Option<PathBuf>,
    pending: Pending,
}

impl Mailer {
    /// Creates a mailer from literal credentials
    pub fn new(user: &str, secret: &str, relay: &str) -> Mailer {
        Mailer {
            user: user.to_string(),
            secret: secret.to_string(),
            relay: relay.to_string(),
            unit: None,
            pending: Pending::default(),
        }
    }

    /// Creates a mailer from the `user`, `pass` and `smtp` keys of a unit
    /// file, remembering the path for later recipient-section lookups
    ///
    /// Fails open: keys the file does not provide become empty strings, and
    /// an empty secret makes every later [`send`][Mailer::send] return
    /// `false`.
    pub fn from_unit<P: AsRef<Path>>(path: P, sections: &[&str]) -> Mailer {
        let unit = Unit::load(&path, sections);

        Mailer {
            user: unit.get("user").to_string(),
            secret: unit.get("pass").to_string(),
            relay: unit.get("smtp").to_string(),
            unit: Some(path.as_ref().to_path_buf()),
            pending: Pending::default(),
        }
    }

    /// Sets the alert flag for the next send
    ///
    /// An alert send prefixes the subject with `ALERT: ` and defaults the
    /// body to empty instead of a timestamp. The flag is consumed by the
    /// post-send reset.
    pub fn alert(&mut self) -> &mut Mailer {
        self.pending.alert = true;
        self
    }

    /// Replaces the pending recipients with the given list, verbatim
    pub fn recipients<I, S>(&mut self, addresses: I) -> &mut Mailer
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.to = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Appends the lines of a newline-delimited file to the pending
    /// recipients
    ///
    /// Open and read errors are swallowed: the helper never fails visibly,
    /// `send` later rejects an empty recipient list.
    pub fn recipients_from_file<P: AsRef<Path>>(&mut self, path: P) -> &mut Mailer {
        if let Ok(file) = File::open(path) {
            for line in BufReader::new(file).lines() {
                match line {
                    Ok(line) => self.pending.to.push(line),
                    Err(_) => break,
                }
            }
        }
        self
    }

    /// Replaces the pending recipients with the comma-separated `mail` key
    /// of a unit-file section
    ///
    /// Without a section this is a no-op. Without an explicit `path` the
    /// remembered unit-file path from [`from_unit`][Mailer::from_unit] is
    /// used.
    pub fn recipients_from_section(
        &mut self,
        path: Option<&Path>,
        section: Option<&str>,
    ) -> &mut Mailer {
        let section = match section {
            Some(section) => section,
            None => return self,
        };

        let unit = match path.or(self.unit.as_deref()) {
            Some(path) => Unit::load(path, &[section]),
            None => Unit::default(),
        };

        self.pending.to = unit
            .get("mail")
            .split(',')
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Current pending recipients
    pub fn pending_recipients(&self) -> &[String] {
        &self.pending.to
    }

    /// Current pending subject
    pub fn pending_subject(&self) -> &str {
        &self.pending.subject
    }

    /// Current pending message body
    pub fn pending_message(&self) -> &str {
        &self.pending.message
    }

    /// Tells whether the alert flag is set
    pub fn is_alert(&self) -> bool {
        self.pending.alert
    }

    /// Resolves recipients, subject and body, then submits the message to
    /// the configured relay on the submission port
    ///
    /// Returns `true` iff the relay accepted the message. Every failure mode
    /// collapses to `false`; the pending message is cleared on every path.
    pub fn send(
        &mut self,
        to: impl Into<Recipients>,
        subject: impl Into<Subject>,
        message: impl Into<Body>,
    ) -> bool {
        if self.secret.is_empty() {
            return false;
        }

        let transport = SmtpTransport::relay(&self.relay)
            .credentials(Credentials::new(self.user.clone(), self.secret.clone()))
            .build();

        self.send_with(&transport, to, subject, message)
    }

    /// Same as [`send`][Mailer::send], delivering through the given
    /// transport instead of the configured relay
    pub fn send_with<T>(
        &mut self,
        transport: &T,
        to: impl Into<Recipients>,
        subject: impl Into<Subject>,
        message: impl Into<Body>,
    ) -> bool
    where
        T: Transport,
        T::Error: Into<BoxError>,
    {
        match self.try_send_with(transport, to.into(), subject.into(), message.into()) {
            Ok(()) => true,
            Err(err) => {
                debug!("send failed: {err}");
                false
            }
        }
    }

    /// Structured-error core of `send_with`
    ///
    /// The pending message is cleared before returning on every path except
    /// the missing-credentials precondition, which rejects before touching
    /// it.
    fn try_send_with<T>(
        &mut self,
        transport: &T,
        to: Recipients,
        subject: Subject,
        message: Body,
    ) -> Result<(), Error>
    where
        T: Transport,
        T::Error: Into<BoxError>,
    {
        if self.secret.is_empty() {
            return Err(Error::MissingCredentials);
        }

        let outcome = match self.resolve(to, subject, message) {
            Ok((envelope, email)) => transport
                .send_raw(&envelope, email.as_bytes())
                .map(drop)
                .map_err(|err| Error::Transport(err.into())),
            Err(err) => Err(err),
        };

        self.reset();
        outcome
    }

    /// Normalizes the inputs into the pending message and assembles the wire
    /// envelope
    fn resolve(
        &mut self,
        to: Recipients,
        subject: Subject,
        message: Body,
    ) -> Result<(Envelope, String), Error> {
        match to {
            // recipients were populated externally through the helpers
            Recipients::Preset => {}
            Recipients::List(list) => {
                self.pending.to = list;
            }
            Recipients::Raw(raw) => match RawRecipients::classify(&raw) {
                RawRecipients::Addresses => {
                    self.pending.to = raw.split(',').map(str::to_string).collect();
                }
                RawRecipients::FilePath => {
                    self.recipients_from_file(&raw);
                }
                RawRecipients::Section => {
                    self.recipients_from_section(None, Some(raw.as_str()));
                }
            },
        }

        self.pending.to = self
            .pending
            .to
            .iter()
            .map(|address| address.trim().to_string())
            .filter(|address| !address.is_empty())
            .collect();
        if self.pending.to.is_empty() {
            return Err(Error::NoRecipients);
        }

        self.pending.subject = match subject {
            Subject::Text(text) => text,
            Subject::Default => format!("{}: message", crate::localhost_hostname()),
        };
        if self.pending.alert {
            self.pending.subject = format!("ALERT: {}", self.pending.subject);
        }

        self.pending.message = match message {
            Body::Text(text) => text,
            Body::Lines(lines) => lines.join(NEWLINE),
            // alerts carry no default filler body
            Body::Default if self.pending.alert => String::new(),
            Body::Default => utc_timestamp(),
        };

        let email = format!(
            "To: {to}{nl}Subject: {subject} {timestamp}{nl}{body}{nl}",
            to = self.pending.to.join(","),
            nl = NEWLINE,
            subject = self.pending.subject,
            timestamp = utc_timestamp(),
            body = self.pending.message,
        );
        let envelope = Envelope::new(self.user.clone(), self.pending.to.clone())?;

        Ok((envelope, email))
    }

    fn reset(&mut self) {
        self.pending = Pending::default();
    }
}

/// Current UTC time, truncated to seconds precision (19 characters)
fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod test {
    use std::{env, fs, path::PathBuf};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transport::stub::StubTransport;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!("relaynote-mailer-{}-{name}", std::process::id()))
    }

    #[test]
    fn missing_secret_fails_without_touching_pending() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "", "relay.x.com");
        mailer.recipients(["ops@x.com"]);

        let result = mailer.try_send_with(
            &transport,
            Recipients::Preset,
            Subject::from("S"),
            Body::from("M"),
        );

        assert!(matches!(result, Err(Error::MissingCredentials)));
        assert_eq!(mailer.pending_recipients(), ["ops@x.com".to_string()]);
        assert!(transport.messages().is_empty());
    }

    #[test]
    fn empty_recipients_fail_and_reset() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        let result = mailer.try_send_with(
            &transport,
            Recipients::Preset,
            Subject::from("S"),
            Body::from("M"),
        );

        assert!(matches!(result, Err(Error::NoRecipients)));
        assert!(mailer.pending_recipients().is_empty());
        assert!(transport.messages().is_empty());
    }

    #[test]
    fn transport_failure_surfaces_as_transport_error() {
        let transport = StubTransport::new_error();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        let result = mailer.try_send_with(
            &transport,
            Recipients::from("ops@x.com"),
            Subject::from("S"),
            Body::from("M"),
        );

        assert!(matches!(result, Err(Error::Transport(_))));
        // the attempt still reached the transport and still reset the state
        assert_eq!(transport.messages().len(), 1);
        assert!(mailer.pending_recipients().is_empty());
    }

    #[test]
    fn raw_addresses_are_split_and_trimmed() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        assert!(mailer.send_with(
            &transport,
            "alice@x.com, bob@x.com",
            Subject::Default,
            Body::Default,
        ));

        let (envelope, _) = transport.messages().remove(0);
        assert_eq!(
            envelope.to(),
            ["alice@x.com".to_string(), "bob@x.com".to_string()]
        );
    }

    #[test]
    fn nonexistent_recipient_file_fails_the_send() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        let path = temp_path("nonexistent").display().to_string();
        let result = mailer.try_send_with(
            &transport,
            Recipients::from(path),
            Subject::from("S"),
            Body::from("M"),
        );

        assert!(matches!(result, Err(Error::NoRecipients)));
        assert!(transport.messages().is_empty());
    }

    #[test]
    fn recipients_from_file_appends_in_order() {
        let path = temp_path("list");
        fs::write(&path, "alice@x.com\nbob@x.com\n").unwrap();

        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");
        mailer.recipients(["first@x.com"]);
        mailer.recipients_from_file(&path);

        assert_eq!(
            mailer.pending_recipients(),
            [
                "first@x.com".to_string(),
                "alice@x.com".to_string(),
                "bob@x.com".to_string()
            ]
        );
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn section_without_key_is_noop() {
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");
        mailer.recipients(["kept@x.com"]);
        mailer.recipients_from_section(None, None);

        assert_eq!(mailer.pending_recipients(), ["kept@x.com".to_string()]);
    }

    #[test]
    fn section_resolves_mail_key_from_unit_file() {
        let path = temp_path("unit");
        fs::write(&path, "[oncall]\nmail=alice@x.com,bob@x.com\n").unwrap();

        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");
        mailer.recipients_from_section(Some(path.as_path()), Some("oncall"));

        assert_eq!(
            mailer.pending_recipients(),
            ["alice@x.com".to_string(), "bob@x.com".to_string()]
        );
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn alert_prefixes_subject_and_empties_default_body() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        assert!(mailer.alert().send_with(
            &transport,
            "ops@x.com",
            Subject::Default,
            Body::Default
        ));
        assert!(!mailer.is_alert());

        let (_, message) = transport.messages().remove(0);
        let expected = format!("ALERT: {}: message", crate::localhost_hostname());
        assert!(
            message.contains(&format!("Subject: {expected} ")),
            "unexpected message: {message:?}"
        );
        // header line, empty body line, trailing terminator
        assert!(message.ends_with("\r\n\r\n"), "unexpected message: {message:?}");
    }

    #[test]
    fn default_body_is_truncated_utc_timestamp() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        assert!(mailer.send_with(&transport, "ops@x.com", Subject::from("S"), Body::Default));

        let (_, message) = transport.messages().remove(0);
        let body = message
            .split(NEWLINE)
            .nth(2)
            .expect("missing body line");
        assert_eq!(body.len(), 19);
        assert_eq!(&body[4..5], "-");
        assert_eq!(&body[10..11], "T");
    }

    #[test]
    fn body_lines_join_with_crlf() {
        let transport = StubTransport::new_ok();
        let mut mailer = Mailer::new("robot@x.com", "secret", "relay.x.com");

        assert!(mailer.send_with(
            &transport,
            "ops@x.com",
            Subject::from("S"),
            vec!["line one".to_string(), "line two".to_string()],
        ));

        let (_, message) = transport.messages().remove(0);
        assert!(message.contains("line one\r\nline two\r\n"));
    }

    #[test]
    fn timestamp_is_19_chars() {
        assert_eq!(utc_timestamp().len(), 19);
    }
}
