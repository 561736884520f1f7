//! Remote filesystem grammars.
//!
//! Every server speaks one of a closed set of path dialects. The differences between them are
//! captured as data in [`Traits`]; the parsers and formatters in [`crate::server_path`] are driven
//! by this table and only branch per type where a dialect needs its own lexing.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

/// Path grammar spoken by a remote server.
///
/// `Default` means "not detected yet": a path parsed with it pins a concrete grammar on first
/// successful parse.
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
    strum::EnumCount,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ServerType {
    #[default]
    Default,
    Unix,
    Vms,
    Dos,
    Mvs,
    VxWorks,
    Zvm,
    HpNonStop,
    DosVirtual,
    Cygwin,
}

/// Where a grammar places the path prefix relative to the segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    /// prefix is written before the segments (VMS device, VxWorks volume, Cygwin UNC marker)
    Leading,
    /// prefix is written after the segments (MVS trailing qualifier dot)
    Suffix,
}

/// Static description of one path grammar.
#[derive(Debug)]
pub struct Traits {
    /// separator characters, the first one is used when formatting
    pub separators: &'static [char],
    /// a path with zero segments (the root) is valid
    pub has_root: bool,
    pub left_enclosure: Option<char>,
    pub right_enclosure: Option<char>,
    /// file names are written inside the enclosure (MVS)
    pub filename_inside_enclosure: bool,
    pub prefix_mode: PrefixMode,
    /// character escaping a literal separator inside a segment (VMS `^`)
    pub separator_escape: Option<char>,
    /// `.` and `..` segments mean "self" and "parent"
    pub has_dots: bool,
    /// a separator is written between a leading prefix and the first segment (Cygwin `//`)
    pub separator_after_prefix: bool,
}

impl Traits {
    pub fn is_separator(&self, c: char) -> bool {
        self.separators.contains(&c)
    }
    pub fn separator(&self) -> char {
        self.separators[0]
    }
}

const UNIX: Traits = Traits {
    separators: &['/'],
    has_root: true,
    left_enclosure: None,
    right_enclosure: None,
    filename_inside_enclosure: false,
    prefix_mode: PrefixMode::Leading,
    separator_escape: None,
    has_dots: true,
    separator_after_prefix: false,
};

const VMS: Traits = Traits {
    separators: &['.'],
    has_root: false,
    left_enclosure: Some('['),
    right_enclosure: Some(']'),
    filename_inside_enclosure: false,
    prefix_mode: PrefixMode::Leading,
    separator_escape: Some('^'),
    has_dots: false,
    separator_after_prefix: false,
};

const DOS: Traits = Traits {
    separators: &['\\', '/'],
    has_root: false,
    ..UNIX
};

const MVS: Traits = Traits {
    separators: &['.'],
    has_root: false,
    left_enclosure: Some('\''),
    right_enclosure: Some('\''),
    filename_inside_enclosure: true,
    prefix_mode: PrefixMode::Suffix,
    separator_escape: None,
    has_dots: false,
    separator_after_prefix: false,
};

const VXWORKS: Traits = Traits {
    has_root: false,
    ..UNIX
};

const ZVM: Traits = Traits {
    has_root: false,
    ..UNIX
};

const HPNONSTOP: Traits = Traits {
    separators: &['.'],
    has_root: false,
    has_dots: false,
    ..UNIX
};

const DOS_VIRTUAL: Traits = Traits {
    separators: &['\\'],
    ..UNIX
};

const CYGWIN: Traits = Traits {
    separator_after_prefix: true,
    ..UNIX
};

impl ServerType {
    /// Grammar description for this server type.
    pub const fn traits(self) -> &'static Traits {
        match self {
            ServerType::Default | ServerType::Unix => &UNIX,
            ServerType::Zvm => &ZVM,
            ServerType::Vms => &VMS,
            ServerType::Dos => &DOS,
            ServerType::Mvs => &MVS,
            ServerType::VxWorks => &VXWORKS,
            ServerType::HpNonStop => &HPNONSTOP,
            ServerType::DosVirtual => &DOS_VIRTUAL,
            ServerType::Cygwin => &CYGWIN,
        }
    }

    /// Stable numeric index, used by the safe-path format.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Self::COUNT {
            return None;
        }
        Self::iter().nth(index)
    }

    /// Display name shown in site manager choices.
    pub fn name(self) -> &'static str {
        match self {
            ServerType::Default => "Default (Autodetect)",
            ServerType::Unix => "Unix",
            ServerType::Vms => "VMS",
            ServerType::Dos => "DOS",
            ServerType::Mvs => "MVS, OS/390, z/OS",
            ServerType::VxWorks => "VxWorks",
            ServerType::Zvm => "z/VM",
            ServerType::HpNonStop => "HP NonStop",
            ServerType::DosVirtual => "DOS-like with virtual paths",
            ServerType::Cygwin => "Cygwin",
        }
    }

    /// Inverse of [`ServerType::name`]; unknown names map to `Default`.
    pub fn from_name(name: &str) -> Self {
        Self::iter()
            .find(|server_type| server_type.name() == name)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for server_type in ServerType::iter() {
            assert_eq!(ServerType::from_name(server_type.name()), server_type);
        }
        assert_eq!(ServerType::from_name("no such grammar"), ServerType::Default);
    }

    #[test]
    fn index_round_trip() {
        for server_type in ServerType::iter() {
            assert_eq!(ServerType::from_index(server_type.index()), Some(server_type));
        }
        assert_eq!(ServerType::from_index(ServerType::COUNT), None);
        assert_eq!(ServerType::Unix.index(), 1);
        assert_eq!(ServerType::Cygwin.index(), 9);
    }

    #[test]
    fn parse_identifiers() {
        assert_eq!("vms".parse::<ServerType>().unwrap(), ServerType::Vms);
        assert_eq!("MVS".parse::<ServerType>().unwrap(), ServerType::Mvs);
        assert_eq!("dosvirtual".parse::<ServerType>().unwrap(), ServerType::DosVirtual);
        assert!("plan9".parse::<ServerType>().is_err());
        assert_eq!(ServerType::HpNonStop.to_string(), "hpnonstop");
    }

    #[test]
    fn traits_table() {
        assert!(ServerType::Unix.traits().has_root);
        assert!(!ServerType::Vms.traits().has_root);
        assert_eq!(ServerType::Vms.traits().separator_escape, Some('^'));
        assert_eq!(ServerType::Mvs.traits().prefix_mode, PrefixMode::Suffix);
        assert!(ServerType::Dos.traits().is_separator('/'));
        assert!(ServerType::Dos.traits().is_separator('\\'));
        assert_eq!(ServerType::Dos.traits().separator(), '\\');
        assert!(ServerType::Cygwin.traits().separator_after_prefix);
        assert!(!ServerType::HpNonStop.traits().has_dots);
    }

    #[test]
    fn rooted_grammars() {
        let rooted: Vec<ServerType> = ServerType::iter()
            .filter(|server_type| server_type.traits().has_root)
            .collect();
        assert_eq!(
            rooted,
            [
                ServerType::Default,
                ServerType::Unix,
                ServerType::DosVirtual,
                ServerType::Cygwin
            ]
        );
        assert_eq!(ServerType::Zvm.traits().separators, ['/']);
        assert!(ServerType::Zvm.traits().has_dots);
    }
}
