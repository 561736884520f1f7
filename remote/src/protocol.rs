//! Registry of the protocols a [`Server`](crate::Server) can speak.
//!
//! The table is plain data terminated by an `Unknown` sentinel; every lookup is a linear scan.

use serde::{Deserialize, Serialize};

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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ServerProtocol {
    #[default]
    Unknown,
    Ftp,
    Sftp,
    Http,
    Ftps,
    Ftpes,
    Https,
    InsecureFtp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub protocol: ServerProtocol,
    /// URL scheme
    pub prefix: &'static str,
    /// the scheme is part of the formatted server even on the default port
    pub always_show_prefix: bool,
    pub default_port: u16,
    pub name: &'static str,
    pub supports_post_login_commands: bool,
}

const fn entry(
    protocol: ServerProtocol,
    prefix: &'static str,
    always_show_prefix: bool,
    default_port: u16,
    name: &'static str,
    supports_post_login_commands: bool,
) -> ProtocolInfo {
    ProtocolInfo {
        protocol,
        prefix,
        always_show_prefix,
        default_port,
        name,
        supports_post_login_commands,
    }
}

/// Registered protocols in lookup order. The last entry is the `Unknown` sentinel.
pub static PROTOCOLS: [ProtocolInfo; 8] = [
    entry(
        ServerProtocol::Ftp,
        "ftp",
        false,
        21,
        "FTP - File Transfer Protocol with optional encryption",
        true,
    ),
    entry(
        ServerProtocol::Sftp,
        "sftp",
        true,
        22,
        "SFTP - SSH File Transfer Protocol",
        false,
    ),
    entry(
        ServerProtocol::Http,
        "http",
        true,
        80,
        "HTTP - Hypertext Transfer Protocol",
        false,
    ),
    entry(
        ServerProtocol::Https,
        "https",
        true,
        443,
        "HTTPS - HTTP over TLS",
        false,
    ),
    entry(
        ServerProtocol::Ftps,
        "ftps",
        true,
        990,
        "FTPS - FTP over implicit TLS",
        true,
    ),
    entry(
        ServerProtocol::Ftpes,
        "ftpes",
        true,
        21,
        "FTPES - FTP over explicit TLS",
        true,
    ),
    entry(
        ServerProtocol::InsecureFtp,
        "insecure-ftp",
        false,
        21,
        "FTP - Insecure File Transfer Protocol",
        true,
    ),
    entry(ServerProtocol::Unknown, "", false, 21, "", false),
];

impl ServerProtocol {
    /// Registry entry for this protocol.
    pub fn info(self) -> &'static ProtocolInfo {
        let index = match self {
            ServerProtocol::Ftp => 0,
            ServerProtocol::Sftp => 1,
            ServerProtocol::Http => 2,
            ServerProtocol::Https => 3,
            ServerProtocol::Ftps => 4,
            ServerProtocol::Ftpes => 5,
            ServerProtocol::InsecureFtp => 6,
            ServerProtocol::Unknown => 7,
        };
        &PROTOCOLS[index]
    }
}

/// Registered protocols, sentinel excluded.
pub fn protocols() -> impl Iterator<Item = &'static ProtocolInfo> {
    PROTOCOLS
        .iter()
        .take_while(|info| info.protocol != ServerProtocol::Unknown)
}

fn find(predicate: impl Fn(&ProtocolInfo) -> bool) -> &'static ProtocolInfo {
    protocols()
        .find(|info| predicate(info))
        .unwrap_or(ServerProtocol::Unknown.info())
}

pub fn get_protocol_info(protocol: ServerProtocol) -> &'static ProtocolInfo {
    find(|info| info.protocol == protocol)
}

pub fn get_default_port(protocol: ServerProtocol) -> u16 {
    get_protocol_info(protocol).default_port
}

/// Protocol for a URL scheme. Matching ignores case and an optional `fz_` marker.
pub fn get_protocol_from_prefix(prefix: &str) -> ServerProtocol {
    let prefix = prefix.to_lowercase();
    let prefix = prefix.strip_prefix("fz_").unwrap_or(&prefix);
    find(|info| info.prefix == prefix).protocol
}

pub fn get_prefix_from_protocol(protocol: ServerProtocol) -> &'static str {
    get_protocol_info(protocol).prefix
}

/// First registered protocol using `port` by default. Without a match this is `Unknown` when
/// `default_only` is set, else FTP.
pub fn get_protocol_from_port(port: u16, default_only: bool) -> ServerProtocol {
    match find(|info| info.default_port == port).protocol {
        ServerProtocol::Unknown if !default_only => ServerProtocol::Ftp,
        protocol => protocol,
    }
}

pub fn get_protocol_name(protocol: ServerProtocol) -> &'static str {
    get_protocol_info(protocol).name
}

pub fn get_protocol_from_name(name: &str) -> ServerProtocol {
    find(|info| info.name == name).protocol
}

pub fn supports_post_login_commands(protocol: ServerProtocol) -> bool {
    get_protocol_info(protocol).supports_post_login_commands
}

pub fn always_show_prefix(protocol: ServerProtocol) -> bool {
    get_protocol_info(protocol).always_show_prefix
}
