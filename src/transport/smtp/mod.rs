//! The SMTP transport submits the finished message to an authenticated
//! relay over a plain TCP connection, the delivery path behind
//! [`Mailer::send`][crate::Mailer::send].
//!
//! The client speaks the minimal submission dialogue this crate needs:
//! `EHLO`, `AUTH PLAIN` when credentials are configured, `MAIL FROM`, one
//! `RCPT TO` per recipient, `DATA` with dot-stuffing, `QUIT`. Any reply
//! outside the 2xx/3xx range fails the submission.

use std::{
    error::Error as StdError,
    fmt::{self, Debug, Display, Formatter},
    io::{self, BufRead, BufReader, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use nom::{bytes::complete::take, character::complete::one_of, combinator::map_res, IResult};
use tracing::debug;

use crate::{transport::Transport, Envelope};

/// Default mail submission port
pub const SUBMISSION_PORT: u16 = 587;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// SMTP submission failure
#[derive(Debug)]
pub enum Error {
    /// Connection or network failure
    Io(io::Error),
    /// A relay reply that does not follow the `NNN text` line format
    InvalidReply(String),
    /// The relay rejected a command
    Rejected {
        /// Three-digit reply code
        code: u16,
        /// Reply text, multiline replies joined with spaces
        message: String,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "network error: {err}"),
            Error::InvalidReply(line) => write!(f, "unparseable relay reply: {line:?}"),
            Error::Rejected { code, message } => write!(f, "relay rejected command: {code} {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Relay account credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    secret: String,
}

impl Credentials {
    /// Creates credentials from a username and secret
    pub fn new(user: String, secret: String) -> Credentials {
        Credentials { user, secret }
    }
}

// the secret must not leak into logs
impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("secret", &"***")
            .finish()
    }
}

/// A complete relay reply: the final three-digit code and one text entry
/// per reply line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    /// Returns the three-digit reply code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the text of each reply line, codes stripped
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Sends emails to a fixed relay using the SMTP protocol
#[derive(Clone, Debug)]
pub struct SmtpTransport {
    info: SmtpInfo,
}

impl SmtpTransport {
    /// Creates a builder for a transport submitting to the given relay on
    /// the standard submission port
    pub fn relay(server: &str) -> SmtpTransportBuilder {
        SmtpTransportBuilder {
            info: SmtpInfo {
                server: server.to_string(),
                port: SUBMISSION_PORT,
                timeout: Some(DEFAULT_TIMEOUT),
                hello_name: crate::localhost_hostname(),
                credentials: None,
            },
        }
    }
}

impl Transport for SmtpTransport {
    type Ok = Reply;
    type Error = Error;

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Reply, Error> {
        let mut conn = SmtpConnection::open(&self.info)?;
        conn.handshake(&self.info.hello_name)?;
        if let Some(credentials) = &self.info.credentials {
            conn.auth_plain(credentials)?;
        }
        let reply = conn.submit(envelope, email)?;
        // the message is queued at this point, a failed QUIT is harmless
        let _ = conn.quit();
        Ok(reply)
    }
}

/// Builder for an [`SmtpTransport`]
#[derive(Clone, Debug)]
pub struct SmtpTransportBuilder {
    info: SmtpInfo,
}

impl SmtpTransportBuilder {
    /// Sets the credentials announced with `AUTH PLAIN`
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.info.credentials = Some(credentials);
        self
    }

    /// Sets the relay port
    pub fn port(mut self, port: u16) -> Self {
        self.info.port = port;
        self
    }

    /// Sets the connection and I/O timeout, `None` to block indefinitely
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info.timeout = timeout;
        self
    }

    /// Sets the name announced in `EHLO`
    pub fn hello_name(mut self, name: String) -> Self {
        self.info.hello_name = name;
        self
    }

    /// Builds the transport
    pub fn build(self) -> SmtpTransport {
        SmtpTransport { info: self.info }
    }
}

#[derive(Clone, Debug)]
struct SmtpInfo {
    server: String,
    port: u16,
    timeout: Option<Duration>,
    hello_name: String,
    credentials: Option<Credentials>,
}

struct SmtpConnection<S: Read + Write> {
    stream: BufReader<S>,
}

impl SmtpConnection<TcpStream> {
    fn open(info: &SmtpInfo) -> Result<SmtpConnection<TcpStream>, Error> {
        let stream = match info.timeout {
            None => TcpStream::connect((info.server.as_str(), info.port)).map_err(Error::Io)?,
            Some(timeout) => {
                let addrs = (info.server.as_str(), info.port)
                    .to_socket_addrs()
                    .map_err(Error::Io)?;
                let mut last_error = None;
                let mut connected = None;
                for addr in addrs {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_error = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(Error::Io(last_error.unwrap_or_else(|| {
                            io::Error::new(io::ErrorKind::NotFound, "relay address did not resolve")
                        })))
                    }
                }
            }
        };
        stream.set_read_timeout(info.timeout).map_err(Error::Io)?;
        stream.set_write_timeout(info.timeout).map_err(Error::Io)?;
        Ok(SmtpConnection {
            stream: BufReader::new(stream),
        })
    }
}

impl<S: Read + Write> SmtpConnection<S> {
    /// Consumes the greeting and introduces the client
    fn handshake(&mut self, hello_name: &str) -> Result<(), Error> {
        self.read_reply()?;
        self.command(&format!("EHLO {hello_name}"))?;
        Ok(())
    }

    fn auth_plain(&mut self, credentials: &Credentials) -> Result<Reply, Error> {
        let identity = format!("\0{}\0{}", credentials.user, credentials.secret);
        debug!("C: AUTH PLAIN <credentials>");
        self.send_line(&format!("AUTH PLAIN {}", STANDARD.encode(identity)))?;
        self.read_reply()
    }

    fn submit(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Reply, Error> {
        self.command(&format!("MAIL FROM:<{}>", envelope.from()))?;
        for forward in envelope.to() {
            self.command(&format!("RCPT TO:<{forward}>"))?;
        }
        self.command("DATA")?;
        let stuffed = dot_stuff(email);
        self.stream
            .get_mut()
            .write_all(&stuffed)
            .map_err(Error::Io)?;
        debug!("C: {} bytes of message data", stuffed.len());
        self.command(".")
    }

    fn quit(&mut self) -> Result<Reply, Error> {
        self.command("QUIT")
    }

    fn command(&mut self, line: &str) -> Result<Reply, Error> {
        debug!("C: {line}");
        self.send_line(line)?;
        self.read_reply()
    }

    fn send_line(&mut self, line: &str) -> Result<(), Error> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).map_err(Error::Io)?;
        stream.write_all(b"\r\n").map_err(Error::Io)?;
        stream.flush().map_err(Error::Io)
    }

    fn read_reply(&mut self) -> Result<Reply, Error> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let read = self.stream.read_line(&mut line).map_err(Error::Io)?;
            if read == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "relay closed the connection mid-reply",
                )));
            }
            debug!("S: {}", line.trim_end());
            let (code, last, text) = match reply_line(&line) {
                Ok((_, parts)) => parts,
                Err(_) => return Err(Error::InvalidReply(line.trim_end().to_string())),
            };
            lines.push(text.to_string());
            if last {
                if (200..400).contains(&code) {
                    return Ok(Reply { code, lines });
                }
                return Err(Error::Rejected {
                    code,
                    message: lines.join(" "),
                });
            }
        }
    }
}

/// Splits one reply line into its code, last-line marker and text
fn reply_line(line: &str) -> IResult<&str, (u16, bool, &str)> {
    let (rest, code) = map_res(take(3usize), |digits: &str| digits.parse::<u16>())(line)?;
    let (text, separator) = one_of("- ")(rest)?;
    Ok(("", (code, separator == ' ', text.trim_end())))
}

/// Doubles leading dots and guarantees a trailing CRLF so the message body
/// cannot terminate the `DATA` phase early
fn dot_stuff(email: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(email.len() + 2);
    let mut at_line_start = true;
    for &byte in email {
        if at_line_start && byte == b'.' {
            out.push(b'.');
        }
        out.push(byte);
        at_line_start = byte == b'\n';
    }
    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out
}
