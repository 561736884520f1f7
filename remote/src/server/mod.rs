//! Server descriptor: connection identity, protocol and credentials.
//!
//! Every mutator enforces its own invariant and reports a violation as an error, leaving the
//! descriptor unchanged.

pub mod url;

use crate::protocol::{self, ServerProtocol};
use crate::server_type::ServerType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::IntoEnumIterator;

pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASS: &str = "anonymous@example.com";

/// Largest accepted timezone offset, in minutes either way.
pub const MAX_TIMEZONE_OFFSET: i32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("host must not be empty")]
    EmptyHost,
    #[error("invalid port {0}, the port has to be a value from 1 to 65535")]
    InvalidPort(u32),
    #[error("an account can only be set for the account logon type")]
    AccountNotAllowed,
    #[error("user name must not be empty with logon type {0}")]
    EmptyUser(LogonType),
    #[error("timezone offset of {0} minutes is out of range")]
    TimezoneOffset(i32),
    #[error("custom encoding must not be empty")]
    EmptyEncoding,
    #[error("{0} does not support post-login commands")]
    PostLoginCommands(ServerProtocol),
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogonType {
    #[default]
    Anonymous,
    Normal,
    Ask,
    Interactive,
    Account,
}

impl LogonType {
    /// Display name shown in site manager choices.
    pub fn name(self) -> &'static str {
        match self {
            LogonType::Anonymous => "Anonymous",
            LogonType::Normal => "Normal",
            LogonType::Ask => "Ask for password",
            LogonType::Interactive => "Interactive",
            LogonType::Account => "Account",
        }
    }

    /// Inverse of [`LogonType::name`]; unknown names map to `Anonymous`.
    pub fn from_name(name: &str) -> Self {
        Self::iter()
            .find(|logon_type| logon_type.name() == name)
            .unwrap_or_default()
    }

    /// The user name is entered or confirmed at connect time.
    fn prompts_for_user(self) -> bool {
        matches!(self, LogonType::Ask | LogonType::Interactive)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PasvMode {
    #[default]
    Default,
    Active,
    Passive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharsetEncoding {
    #[default]
    Auto,
    Utf8,
    Custom(String),
}

/// A remote server and how to log on to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "ServerRecord", try_from = "ServerRecord")]
pub struct Server {
    protocol: ServerProtocol,
    server_type: ServerType,
    host: String,
    port: u16,
    logon_type: LogonType,
    user: String,
    pass: String,
    account: String,
    timezone_offset: i32,
    pasv_mode: PasvMode,
    max_connections: u32,
    encoding: CharsetEncoding,
    post_login_commands: Vec<String>,
    bypass_proxy: bool,
    name: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            protocol: ServerProtocol::Unknown,
            server_type: ServerType::Default,
            host: String::new(),
            port: 21,
            logon_type: LogonType::Anonymous,
            user: String::new(),
            pass: String::new(),
            account: String::new(),
            timezone_offset: 0,
            pasv_mode: PasvMode::Default,
            max_connections: 0,
            encoding: CharsetEncoding::Auto,
            post_login_commands: Vec::new(),
            bypass_proxy: false,
            name: String::new(),
        }
    }
}

fn checked_port(port: u32) -> Result<u16, Error> {
    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(Error::InvalidPort(port))
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_protocol(&self) -> ServerProtocol {
        self.protocol
    }

    /// Switching to a protocol without post-login command support drops the commands.
    pub fn set_protocol(&mut self, protocol: ServerProtocol) {
        self.protocol = protocol;
        if !protocol::supports_post_login_commands(protocol) {
            self.post_login_commands.clear();
        }
    }

    pub fn get_type(&self) -> ServerType {
        self.server_type
    }

    pub fn set_type(&mut self, server_type: ServerType) {
        self.server_type = server_type;
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// Set host and port. A bracketed IPv6 literal is stored without its brackets. An unknown
    /// protocol is derived from the port.
    pub fn set_host(&mut self, host: &str, port: u32) -> Result<(), Error> {
        if host.is_empty() {
            return Err(Error::EmptyHost);
        }
        let port = checked_port(port)?;
        let host = host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .filter(|inner| inner.contains(':'))
            .unwrap_or(host);
        self.host = host.to_string();
        self.port = port;
        if self.protocol == ServerProtocol::Unknown {
            self.protocol = protocol::get_protocol_from_port(port, false);
        }
        Ok(())
    }

    pub fn set_port(&mut self, port: u32) -> Result<(), Error> {
        self.port = checked_port(port)?;
        Ok(())
    }

    pub fn get_logon_type(&self) -> LogonType {
        self.logon_type
    }

    pub fn set_logon_type(&mut self, logon_type: LogonType) {
        self.logon_type = logon_type;
    }

    /// Stored user, or the anonymous user for anonymous logons.
    pub fn get_user(&self) -> &str {
        match self.logon_type {
            LogonType::Anonymous => ANONYMOUS_USER,
            _ => &self.user,
        }
    }

    /// Stored password, or the anonymous placeholder for anonymous logons.
    pub fn get_pass(&self) -> &str {
        match self.logon_type {
            LogonType::Anonymous => ANONYMOUS_PASS,
            _ => &self.pass,
        }
    }

    pub fn get_account(&self) -> &str {
        match self.logon_type {
            LogonType::Account => &self.account,
            _ => "",
        }
    }

    /// Store credentials. Anonymous logons ignore them. An empty user is only accepted when the
    /// user is prompted for at connect time, and then discards the password.
    pub fn set_user(&mut self, user: &str, pass: &str) -> Result<(), Error> {
        if self.logon_type == LogonType::Anonymous {
            return Ok(());
        }
        if user.is_empty() {
            if !self.logon_type.prompts_for_user() {
                return Err(Error::EmptyUser(self.logon_type));
            }
            self.pass.clear();
        } else {
            self.pass = pass.to_string();
        }
        self.user = user.to_string();
        Ok(())
    }

    pub fn set_account(&mut self, account: &str) -> Result<(), Error> {
        if self.logon_type != LogonType::Account {
            return Err(Error::AccountNotAllowed);
        }
        self.account = account.to_string();
        Ok(())
    }

    /// Offset of the server's listing times from UTC, in minutes.
    pub fn get_timezone_offset(&self) -> i32 {
        self.timezone_offset
    }

    pub fn set_timezone_offset(&mut self, minutes: i32) -> Result<(), Error> {
        if !(-MAX_TIMEZONE_OFFSET..=MAX_TIMEZONE_OFFSET).contains(&minutes) {
            return Err(Error::TimezoneOffset(minutes));
        }
        self.timezone_offset = minutes;
        Ok(())
    }

    pub fn get_pasv_mode(&self) -> PasvMode {
        self.pasv_mode
    }

    pub fn set_pasv_mode(&mut self, pasv_mode: PasvMode) {
        self.pasv_mode = pasv_mode;
    }

    /// Limit on simultaneous connections, 0 means the global default.
    pub fn get_max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn set_max_connections(&mut self, max_connections: u32) {
        self.max_connections = max_connections;
    }

    pub fn get_encoding(&self) -> &CharsetEncoding {
        &self.encoding
    }

    /// Name of the custom charset, empty unless the encoding is custom.
    pub fn get_custom_encoding(&self) -> &str {
        match &self.encoding {
            CharsetEncoding::Custom(name) => name,
            _ => "",
        }
    }

    pub fn set_encoding(&mut self, encoding: CharsetEncoding) -> Result<(), Error> {
        if matches!(&encoding, CharsetEncoding::Custom(name) if name.is_empty()) {
            return Err(Error::EmptyEncoding);
        }
        self.encoding = encoding;
        Ok(())
    }

    pub fn set_custom_encoding(&mut self, name: &str) -> Result<(), Error> {
        self.set_encoding(CharsetEncoding::Custom(name.to_string()))
    }

    pub fn get_post_login_commands(&self) -> &[String] {
        &self.post_login_commands
    }

    /// Fails, and drops any stored commands, if the protocol cannot run them.
    pub fn set_post_login_commands(&mut self, commands: Vec<String>) -> Result<(), Error> {
        if !protocol::supports_post_login_commands(self.protocol) {
            self.post_login_commands.clear();
            return Err(Error::PostLoginCommands(self.protocol));
        }
        self.post_login_commands = commands;
        Ok(())
    }

    pub fn get_bypass_proxy(&self) -> bool {
        self.bypass_proxy
    }

    pub fn set_bypass_proxy(&mut self, bypass_proxy: bool) {
        self.bypass_proxy = bypass_proxy;
    }

    /// Site manager display name.
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Host with brackets around IPv6 literals and the port unless it is the protocol default.
    pub fn format_host(&self, always_omit_port: bool) -> String {
        let mut host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if !always_omit_port && self.port != protocol::get_default_port(self.protocol) {
            host.push(':');
            host.push_str(&self.port.to_string());
        }
        host
    }

    /// `[scheme://][user@]host[:port]`, the scheme shown when requested, when the protocol always
    /// shows it or when the port is not the default.
    pub fn format_server(&self, always_include_prefix: bool) -> String {
        let mut server = self.format_host(false);
        if self.logon_type != LogonType::Anonymous {
            server = format!("{}@{}", self.get_user(), server);
        }
        let info = self.protocol.info();
        if !info.prefix.is_empty()
            && (always_include_prefix || info.always_show_prefix || self.port != info.default_port)
        {
            server = format!("{}://{}", info.prefix, server);
        }
        server
    }

    /// Equality ignoring the password.
    pub fn equals_no_pass(&self, other: &Server) -> bool {
        self.cmp_impl(other, false) == Ordering::Equal
    }

    fn cmp_impl(&self, other: &Server, compare_pass: bool) -> Ordering {
        let identity = self
            .protocol
            .cmp(&other.protocol)
            .then(self.server_type.cmp(&other.server_type))
            .then_with(|| self.host.cmp(&other.host))
            .then(self.port.cmp(&other.port))
            .then(self.logon_type.cmp(&other.logon_type));
        if identity.is_ne() {
            return identity;
        }
        let credentials = match self.logon_type {
            LogonType::Anonymous => Ordering::Equal,
            LogonType::Normal if compare_pass => self
                .user
                .cmp(&other.user)
                .then_with(|| self.pass.cmp(&other.pass)),
            LogonType::Account => {
                let user = self.user.cmp(&other.user);
                let pass = if compare_pass {
                    self.pass.cmp(&other.pass)
                } else {
                    Ordering::Equal
                };
                user.then(pass)
                    .then_with(|| self.account.cmp(&other.account))
            }
            _ => self.user.cmp(&other.user),
        };
        credentials
            .then(self.timezone_offset.cmp(&other.timezone_offset))
            .then(self.pasv_mode.cmp(&other.pasv_mode))
            .then_with(|| self.encoding.cmp(&other.encoding))
            .then(self.bypass_proxy.cmp(&other.bypass_proxy))
            .then_with(|| self.post_login_commands.cmp(&other.post_login_commands))
    }
}

impl PartialEq for Server {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Server {}

impl PartialOrd for Server {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Server {
    /// Credentials only take part where the logon type uses them. Connection limit and display
    /// name never do.
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_impl(other, true)
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_server(false))
    }
}

/// Persisted form of a [`Server`]. Restoring one re-applies every setter, so a record edited by
/// hand cannot smuggle in a descriptor that breaks its invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub protocol: ServerProtocol,
    #[serde(default)]
    pub server_type: ServerType,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub logon_type: LogonType,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub timezone_offset: i32,
    #[serde(default)]
    pub pasv_mode: PasvMode,
    #[serde(default)]
    pub max_connections: u32,
    #[serde(default)]
    pub encoding: CharsetEncoding,
    #[serde(default)]
    pub post_login_commands: Vec<String>,
    #[serde(default)]
    pub bypass_proxy: bool,
    #[serde(default)]
    pub name: String,
}

impl From<Server> for ServerRecord {
    fn from(server: Server) -> Self {
        Self {
            protocol: server.protocol,
            server_type: server.server_type,
            host: server.host,
            port: server.port,
            logon_type: server.logon_type,
            user: server.user,
            pass: server.pass,
            account: server.account,
            timezone_offset: server.timezone_offset,
            pasv_mode: server.pasv_mode,
            max_connections: server.max_connections,
            encoding: server.encoding,
            post_login_commands: server.post_login_commands,
            bypass_proxy: server.bypass_proxy,
            name: server.name,
        }
    }
}

impl TryFrom<ServerRecord> for Server {
    type Error = Error;

    fn try_from(record: ServerRecord) -> Result<Self, Self::Error> {
        let mut server = Server::new();
        if record.host.is_empty() {
            server.set_port(record.port.into())?;
        } else {
            server.set_host(&record.host, record.port.into())?;
        }
        server.set_protocol(record.protocol);
        server.set_type(record.server_type);
        server.set_logon_type(record.logon_type);
        if !record.user.is_empty() {
            server.set_user(&record.user, &record.pass)?;
        }
        if record.logon_type == LogonType::Account {
            server.set_account(&record.account)?;
        }
        server.set_timezone_offset(record.timezone_offset)?;
        server.set_pasv_mode(record.pasv_mode);
        server.set_max_connections(record.max_connections);
        server.set_encoding(record.encoding)?;
        if protocol::supports_post_login_commands(server.protocol) {
            server.set_post_login_commands(record.post_login_commands)?;
        }
        server.set_bypass_proxy(record.bypass_proxy);
        server.set_name(&record.name);
        Ok(server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal(user: &str, pass: &str) -> Server {
        let mut server = Server::new();
        server.set_host("example.com", 21).unwrap();
        server.set_logon_type(LogonType::Normal);
        server.set_user(user, pass).unwrap();
        server
    }

    #[test]
    fn test_defaults() {
        let server = Server::new();
        assert_eq!(server.get_protocol(), ServerProtocol::Unknown);
        assert_eq!(server.get_type(), ServerType::Default);
        assert_eq!(server.get_port(), 21);
        assert_eq!(server.get_logon_type(), LogonType::Anonymous);
    }

    #[test]
    fn test_anonymous_credentials() {
        let mut server = normal("bob", "secret");
        server.set_logon_type(LogonType::Anonymous);
        assert_eq!(server.get_user(), "anonymous");
        assert_eq!(server.get_pass(), "anonymous@example.com");
        // ignored while anonymous
        server.set_user("alice", "other").unwrap();
        server.set_logon_type(LogonType::Normal);
        assert_eq!(server.get_user(), "bob");
        assert_eq!(server.get_pass(), "secret");
    }

    #[test]
    fn test_set_user() {
        let mut server = normal("bob", "secret");
        assert_eq!(
            server.set_user("", "x"),
            Err(Error::EmptyUser(LogonType::Normal))
        );
        assert_eq!(server.get_user(), "bob");
        server.set_logon_type(LogonType::Ask);
        server.set_user("", "x").unwrap();
        assert_eq!(server.get_user(), "");
        assert_eq!(server.get_pass(), "");
    }

    #[test]
    fn test_account_only_for_account_logon() {
        let mut server = normal("bob", "secret");
        assert_eq!(server.set_account("acct"), Err(Error::AccountNotAllowed));
        server.set_logon_type(LogonType::Account);
        server.set_account("acct").unwrap();
        assert_eq!(server.get_account(), "acct");
        server.set_logon_type(LogonType::Normal);
        assert_eq!(server.get_account(), "");
    }

    #[test]
    fn test_set_host() {
        let mut server = Server::new();
        assert_eq!(server.set_host("", 21), Err(Error::EmptyHost));
        assert_eq!(server.set_host("h", 0), Err(Error::InvalidPort(0)));
        assert_eq!(server.set_host("h", 65536), Err(Error::InvalidPort(65536)));
        server.set_host("[::1]", 22).unwrap();
        assert_eq!(server.get_host(), "::1");
        assert_eq!(server.get_protocol(), ServerProtocol::Sftp);
        // the protocol is only derived once
        server.set_host("other", 990).unwrap();
        assert_eq!(server.get_protocol(), ServerProtocol::Sftp);
        assert_eq!(server.format_host(false), "other:990");
        assert_eq!(server.format_host(true), "other");
    }

    #[test]
    fn test_post_login_commands() {
        let mut server = Server::new();
        server.set_protocol(ServerProtocol::Ftp);
        server
            .set_post_login_commands(vec!["SITE UMASK 022".to_string()])
            .unwrap();
        assert_eq!(server.get_post_login_commands(), ["SITE UMASK 022"]);
        server.set_protocol(ServerProtocol::Ftpes);
        assert_eq!(server.get_post_login_commands().len(), 1);
        server.set_protocol(ServerProtocol::Sftp);
        assert!(server.get_post_login_commands().is_empty());
        assert_eq!(
            server.set_post_login_commands(vec!["x".to_string()]),
            Err(Error::PostLoginCommands(ServerProtocol::Sftp))
        );
    }

    #[test]
    fn test_timezone_and_encoding() {
        let mut server = Server::new();
        server.set_timezone_offset(-1440).unwrap();
        assert_eq!(server.set_timezone_offset(1441), Err(Error::TimezoneOffset(1441)));
        assert_eq!(server.get_timezone_offset(), -1440);
        assert_eq!(server.set_custom_encoding(""), Err(Error::EmptyEncoding));
        assert_eq!(server.get_custom_encoding(), "");
        server.set_custom_encoding("ISO-8859-1").unwrap();
        assert_eq!(server.get_custom_encoding(), "ISO-8859-1");
        server.set_encoding(CharsetEncoding::Utf8).unwrap();
        assert_eq!(server.get_custom_encoding(), "");
    }

    #[test]
    fn test_equality() {
        let mut a = normal("bob", "one");
        let b = normal("bob", "two");
        assert_ne!(a, b);
        assert!(a.equals_no_pass(&b));
        assert!(!a.equals_no_pass(&normal("alice", "one")));
        // limits and names never matter
        let mut c = normal("bob", "one");
        c.set_max_connections(5);
        c.set_name("work");
        assert_eq!(a, c);
        a.set_logon_type(LogonType::Anonymous);
        let mut d = normal("alice", "x");
        d.set_logon_type(LogonType::Anonymous);
        assert_eq!(a, d);
        d.set_bypass_proxy(true);
        assert_ne!(a, d);
    }

    #[test]
    fn test_ordering() {
        let mut ftp = normal("bob", "x");
        ftp.set_protocol(ServerProtocol::Ftp);
        let mut sftp = normal("bob", "x");
        sftp.set_protocol(ServerProtocol::Sftp);
        assert!(ftp < sftp);
        let mut low = ftp.clone();
        low.set_port(20).unwrap();
        assert!(low < ftp);
        let mut servers = vec![sftp.clone(), ftp.clone(), low.clone()];
        servers.sort();
        assert_eq!(servers, vec![low, ftp, sftp]);
    }

    #[test]
    fn test_format_server() {
        let mut server = Server::new();
        server.set_host("example.com", 21).unwrap();
        assert_eq!(server.get_protocol(), ServerProtocol::Ftp);
        assert_eq!(server.format_server(false), "example.com");
        assert_eq!(server.format_server(true), "ftp://example.com");
        server.set_port(2121).unwrap();
        assert_eq!(server.format_server(false), "ftp://example.com:2121");
        server.set_protocol(ServerProtocol::Sftp);
        server.set_port(22).unwrap();
        server.set_logon_type(LogonType::Normal);
        server.set_user("bob", "pw").unwrap();
        assert_eq!(server.to_string(), "sftp://bob@example.com");
        server.set_host("fe80::1", 22).unwrap();
        assert_eq!(server.format_server(false), "sftp://bob@[fe80::1]");
    }

    #[test]
    fn test_logon_type_names() {
        for logon_type in LogonType::iter() {
            assert_eq!(LogonType::from_name(logon_type.name()), logon_type);
        }
        assert_eq!(LogonType::from_name("bogus"), LogonType::Anonymous);
        assert_eq!(LogonType::from_name("Ask for password"), LogonType::Ask);
    }

    #[test]
    fn test_record_round_trip() {
        let mut server = normal("bob", "pw");
        server.set_protocol(ServerProtocol::Ftpes);
        server.set_type(ServerType::Vms);
        server.set_timezone_offset(60).unwrap();
        server.set_custom_encoding("CP1252").unwrap();
        server
            .set_post_login_commands(vec!["SITE X".to_string()])
            .unwrap();
        server.set_max_connections(3);
        server.set_name("archive");
        let json = serde_json::to_string(&server).unwrap();
        let back: Server = serde_json::from_str(&json).unwrap();
        assert_eq!(back, server);
        assert_eq!(back.get_name(), "archive");
        assert_eq!(back.get_max_connections(), 3);
    }

    #[test]
    fn test_record_enforces_invariants() {
        let json = r#"{
            "protocol": "sftp",
            "host": "example.com",
            "port": 22,
            "logon_type": "normal",
            "user": "bob",
            "account": "ignored",
            "post_login_commands": ["SITE X"]
        }"#;
        let server: Server = serde_json::from_str(json).unwrap();
        assert!(server.get_post_login_commands().is_empty());
        assert_eq!(server.get_account(), "");
        assert_eq!(server.get_user(), "bob");

        let bad_port = r#"{"protocol": "ftp", "host": "h", "port": 0}"#;
        assert!(serde_json::from_str::<Server>(bad_port).is_err());
        let bad_timezone = r#"{"protocol": "ftp", "host": "h", "port": 21, "timezone_offset": 5000}"#;
        assert!(serde_json::from_str::<Server>(bad_timezone).is_err());
    }
}
