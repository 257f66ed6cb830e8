//! Tagged input shapes accepted by [`Mailer::send`][crate::Mailer::send]
//!
//! The send entry point accepts several unrelated shapes per parameter. Each
//! parameter is an explicit variant type rather than a trait object, so the
//! dispatch rules stay visible at the call site and testable on their own.

use std::path::MAIN_SEPARATOR;

/// Recipient input accepted by `send`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Recipients {
    /// Recipients were already populated through the mailer helpers
    Preset,
    /// A ready address list, used verbatim
    List(Vec<String>),
    /// A raw string, classified by content (see [`RawRecipients`])
    Raw(String),
}

impl From<Vec<String>> for Recipients {
    fn from(list: Vec<String>) -> Self {
        Recipients::List(list)
    }
}

impl From<&str> for Recipients {
    fn from(raw: &str) -> Self {
        Recipients::Raw(raw.to_string())
    }
}

impl From<String> for Recipients {
    fn from(raw: String) -> Self {
        Recipients::Raw(raw)
    }
}

/// Subject input accepted by `send`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Subject {
    /// Use the `<hostname>: message` default
    Default,
    /// Use the given subject verbatim
    Text(String),
}

impl From<&str> for Subject {
    fn from(text: &str) -> Self {
        Subject::Text(text.to_string())
    }
}

impl From<String> for Subject {
    fn from(text: String) -> Self {
        Subject::Text(text)
    }
}

/// Body input accepted by `send`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Body {
    /// Default body: a UTC timestamp, or empty when the alert flag is set
    Default,
    /// Use the given body verbatim
    Text(String),
    /// Join the given lines with CRLF
    Lines(Vec<String>),
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Vec<String>> for Body {
    fn from(lines: Vec<String>) -> Self {
        Body::Lines(lines)
    }
}

/// Classification of a [`Recipients::Raw`] string
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum RawRecipients {
    /// One or more comma-separated literal addresses
    Addresses,
    /// Path to a newline-delimited recipient file
    FilePath,
    /// Name of a unit-file section holding a `mail` key
    Section,
}

impl RawRecipients {
    /// Classifies a raw recipient string by content
    ///
    /// An `@` anywhere wins over a path separator, so address lists may hold
    /// local parts that look like paths.
    pub fn classify(raw: &str) -> RawRecipients {
        if raw.contains('@') {
            RawRecipients::Addresses
        } else if raw.contains(MAIN_SEPARATOR) {
            RawRecipients::FilePath
        } else {
            RawRecipients::Section
        }
    }
}
