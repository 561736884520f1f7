//! `[scheme://][user[:pass]@]host[:port][/path]` parsing into a [`Server`].

use super::{ANONYMOUS_PASS, ANONYMOUS_USER, LogonType, Server};
use crate::protocol::{self, ServerProtocol};
use crate::server_path::ServerPath;
use crate::server_type::ServerType;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("No host given, please enter a host.")]
    NoHost,
    #[error(
        "Invalid protocol specified. Valid protocols are:\nftp:// for normal FTP with optional encryption,\nsftp:// for SSH file transfer protocol,\nftps:// for FTP over TLS (implicit),\nftpes:// for FTP over TLS (explicit)."
    )]
    InvalidProtocol(String),
    #[error("Invalid username given.")]
    InvalidUser,
    #[error("Host starts with '[' but no closing bracket found.")]
    UnclosedBracket,
    #[error("Invalid host, after closing bracket only colon and port may follow.")]
    TrailingAfterBracket,
    #[error("Invalid port given. The port has to be a value from 1 to 65535.")]
    InvalidPort,
}

/// Strict decimal port: digits only, value 1 to 65535. Leading zeros are allowed.
fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = text.trim_start_matches('0');
    if digits.is_empty() || digits.len() > 5 {
        return None;
    }
    digits.parse::<u16>().ok()
}

impl Server {
    /// Parse a URL typed by a user into this descriptor. `port`, `user` and `pass` are the
    /// values of separate input fields; the URL overrides them where it carries its own. A port
    /// of 0 means "not given". Returns the path component, empty if there was none or it did not
    /// parse.
    ///
    /// The descriptor is only modified when parsing succeeds.
    #[instrument(level = "debug", skip(self, pass))]
    pub fn parse_url(
        &mut self,
        host: &str,
        port: u32,
        user: &str,
        pass: &str,
    ) -> Result<ServerPath, Error> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::NoHost);
        }
        let mut protocol = self.protocol;
        let mut rest = host;
        if let Some((scheme, after)) = host.split_once("://") {
            let scheme = scheme.to_lowercase();
            protocol = protocol::get_protocol_from_prefix(&scheme);
            if protocol == ServerProtocol::Unknown {
                tracing::debug!("unknown scheme {scheme:?}");
                return Err(Error::InvalidProtocol(scheme));
            }
            rest = after;
        }

        let mut user = user.to_string();
        let mut pass = pass.to_string();
        // a password may contain '@', host and port never do: credentials end at the last '@'
        // before the first '/'
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at) = rest[..authority_end].rfind('@') {
            let credentials = &rest[..at];
            rest = &rest[at + 1..];
            let name = match credentials.split_once(':') {
                Some((name, password)) => {
                    pass = password.to_string();
                    name
                }
                None => credentials,
            };
            user = name.trim().to_string();
            if user.is_empty() {
                return Err(Error::InvalidUser);
            }
        } else {
            user = user.trim().to_string();
            if user.is_empty() && !self.logon_type.prompts_for_user() {
                user = ANONYMOUS_USER.to_string();
                pass = ANONYMOUS_PASS.to_string();
            }
        }

        let mut path = ServerPath::new();
        if let Some(slash) = rest.find('/') {
            let raw_path = &rest[slash..];
            path = ServerPath::parse(raw_path, ServerType::Default).unwrap_or_else(|error| {
                tracing::debug!("ignoring unparsable path {raw_path:?}: {error}");
                ServerPath::new()
            });
            rest = &rest[..slash];
        }

        let port_start = if rest.starts_with('[') {
            let close = rest.find(']').ok_or(Error::UnclosedBracket)?;
            match rest.as_bytes().get(close + 1) {
                None => None,
                Some(b':') => Some(close + 1),
                Some(_) => return Err(Error::TrailingAfterBracket),
            }
        } else {
            rest.find(':')
        };
        let port = match port_start {
            Some(0) => return Err(Error::NoHost),
            Some(colon) => {
                let port = parse_port(&rest[colon + 1..]).ok_or(Error::InvalidPort)?;
                rest = &rest[..colon];
                port
            }
            None if port == 0 => protocol::get_default_port(protocol),
            None => u16::try_from(port).map_err(|_| Error::InvalidPort)?,
        };

        let host = rest.trim();
        if host.is_empty() {
            return Err(Error::NoHost);
        }
        let host = host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(host);

        self.protocol = protocol;
        self.server_type = ServerType::Default;
        self.host = host.to_string();
        self.port = port;
        self.account.clear();
        if !self.logon_type.prompts_for_user() {
            self.logon_type = if user.is_empty()
                || (user == ANONYMOUS_USER && (pass.is_empty() || pass == ANONYMOUS_PASS))
            {
                LogonType::Anonymous
            } else {
                LogonType::Normal
            };
        }
        self.user = user;
        self.pass = pass;
        if self.protocol == ServerProtocol::Unknown {
            self.protocol = protocol::get_protocol_from_port(port, false);
        }
        if !protocol::supports_post_login_commands(self.protocol) {
            self.post_login_commands.clear();
        }
        Ok(path)
    }

    /// Like [`Server::parse_url`] with the port as typed into a text field. Blank means "not
    /// given".
    pub fn parse_url_str_port(
        &mut self,
        host: &str,
        port: &str,
        user: &str,
        pass: &str,
    ) -> Result<ServerPath, Error> {
        let port = port.trim();
        let port = if port.is_empty() {
            0
        } else {
            parse_port(port).ok_or(Error::InvalidPort)?
        };
        self.parse_url(host, port.into(), user, pass)
    }
}
