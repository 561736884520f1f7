//! Canonical absolute paths on the local filesystem.
//!
//! A non-empty [`LocalPath`] is always absolute, uses the flavor's separator, ends with a
//! separator and contains no `.`/`..` segments or repeated separators. Windows paths may also be
//! the drive list `\`, a drive path `C:\...` or a UNC path `\\server\share\...`.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// `GetLastError` code for a removable drive without media.
const ERROR_NOT_READY: i32 = 21;

/// Path syntax to canonicalize against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flavor {
    Posix,
    Windows,
}

impl Flavor {
    /// Flavor of the host platform.
    pub const fn native() -> Self {
        if cfg!(windows) {
            Flavor::Windows
        } else {
            Flavor::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            Flavor::Posix => '/',
            Flavor::Windows => '\\',
        }
    }

    pub fn is_separator(self, c: char) -> bool {
        match self {
            Flavor::Posix => c == '/',
            Flavor::Windows => c == '\\' || c == '/',
        }
    }

    /// Separators below this index belong to the root (`C:\`) and are never scanned.
    fn parent_floor(self) -> usize {
        match self {
            Flavor::Posix => 0,
            Flavor::Windows => 2,
        }
    }
}

impl Default for Flavor {
    fn default() -> Self {
        Self::native()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("empty path")]
    Empty,
    #[error("'{0}' is not an absolute path")]
    NotAbsolute(String),
    #[error("malformed UNC path '{0}'")]
    Unc(String),
    #[error("invalid drive in '{0}'")]
    Drive(String),
    #[error("'{0}' cannot be used as a path segment")]
    InvalidSegment(String),
    #[error("operation requires a non-empty path")]
    EmptyPath,
    #[error("'{0}' does not exist or cannot be accessed.")]
    NotFound(String),
    #[error("'{0}' is not a directory.")]
    NotADirectory(String),
    #[error("Cannot access {0}, no media inserted or drive not ready.")]
    DriveNotReady(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Separator,
    Dot,
    DotDot,
    Segment,
}

/// Write the root of a Windows path to `out` and return the remainder, or `None` for the drive
/// list.
fn windows_root<'a>(raw: &'a str, out: &mut String) -> Result<Option<&'a str>, Error> {
    let is_separator = |c| Flavor::Windows.is_separator(c);
    let Some(after) = raw.strip_prefix(is_separator) else {
        return drive_root(raw, raw, out).map(Some);
    };
    if after.is_empty() {
        return Ok(None);
    }
    let after = after
        .strip_prefix(is_separator)
        .ok_or_else(|| Error::Unc(raw.to_string()))?;
    let unc = match after.strip_prefix("?\\") {
        Some(extended) => match extended.get(..4) {
            Some(marker) if marker.eq_ignore_ascii_case("UNC\\") => &extended[4..],
            _ => return drive_root(raw, extended, out).map(Some),
        },
        None => after,
    };
    let server_end = unc
        .find(|c| Flavor::Windows.is_separator(c))
        .unwrap_or(unc.len());
    out.push_str("\\\\");
    out.push_str(&unc[..server_end]);
    out.push('\\');
    if out.len() <= 3 {
        return Err(Error::Unc(raw.to_string()));
    }
    Ok(Some(&unc[server_end..]))
}

fn drive_root<'a>(raw: &str, input: &'a str, out: &mut String) -> Result<&'a str, Error> {
    let mut chars = input.chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => letter,
        _ => return Err(Error::Drive(raw.to_string())),
    };
    let rest = &input[2..];
    if !(rest.is_empty() || rest.starts_with(|c| Flavor::Windows.is_separator(c))) {
        return Err(Error::Drive(raw.to_string()));
    }
    out.push(letter);
    out.push(':');
    out.push('\\');
    Ok(rest)
}

/// Single pass over `raw` collapsing repeated separators and resolving dot segments. `..` never
/// removes the root. With `want_file` a trailing component without separator is returned
/// separately instead of becoming a directory.
fn canonicalize(
    raw: &str,
    flavor: Flavor,
    want_file: bool,
) -> Result<(String, Option<String>), Error> {
    if raw.is_empty() {
        return Err(Error::Empty);
    }
    let separator = flavor.separator();
    let mut out = String::with_capacity(raw.len() + 1);
    let rest = match flavor {
        Flavor::Posix => {
            let rest = raw
                .strip_prefix('/')
                .ok_or_else(|| Error::NotAbsolute(raw.to_string()))?;
            out.push('/');
            rest
        }
        Flavor::Windows => match windows_root(raw, &mut out)? {
            Some(rest) => rest,
            None => return Ok((separator.to_string(), None)),
        },
    };

    // start offsets of the segments in `out`, the first one is just past the root
    let mut segments = vec![out.len()];
    let mut last = Last::Separator;
    for c in rest.chars() {
        if flavor.is_separator(c) {
            match last {
                Last::Separator => {}
                Last::Dot => out.truncate(segments[segments.len() - 1]),
                Last::DotDot => {
                    if segments.len() > 1 {
                        segments.pop();
                    }
                    out.truncate(segments[segments.len() - 1]);
                }
                Last::Segment => {
                    out.push(separator);
                    segments.push(out.len());
                }
            }
            last = Last::Separator;
            continue;
        }
        last = match (c, last) {
            ('.', Last::Separator) => Last::Dot,
            ('.', Last::Dot) => Last::DotDot,
            _ => Last::Segment,
        };
        out.push(c);
    }

    let current = segments[segments.len() - 1];
    let mut file = None;
    match last {
        Last::Separator => {}
        Last::Dot => out.truncate(current),
        Last::DotDot => {
            if segments.len() > 1 {
                segments.pop();
            }
            out.truncate(segments[segments.len() - 1]);
        }
        Last::Segment if want_file => {
            file = Some(out[current..].to_string());
            out.truncate(current);
        }
        Last::Segment => out.push(separator),
    }
    Ok((out, file))
}

fn lowercase(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

/// An absolute local directory in canonical form, or empty.
#[derive(Debug, Clone, Default)]
pub struct LocalPath {
    path: String,
    flavor: Flavor,
}

impl LocalPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flavor(flavor: Flavor) -> Self {
        Self {
            path: String::new(),
            flavor,
        }
    }

    /// Canonicalize `raw` with the host flavor.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Self::parse_with_flavor(raw, Flavor::native())
    }

    pub fn parse_with_flavor(raw: &str, flavor: Flavor) -> Result<Self, Error> {
        let mut path = Self::with_flavor(flavor);
        path.set_path(raw)?;
        Ok(path)
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn get_path(&self) -> &str {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn clear(&mut self) {
        self.path.clear();
    }

    /// Replace the value with the canonical form of `raw`. On failure the path is left empty.
    pub fn set_path(&mut self, raw: &str) -> Result<(), Error> {
        self.set_path_impl(raw, false).map(|_| ())
    }

    /// Like [`LocalPath::set_path`], returning a trailing component that does not end in a
    /// separator as a file name instead of keeping it as a directory.
    pub fn set_path_with_file(&mut self, raw: &str) -> Result<Option<String>, Error> {
        self.set_path_impl(raw, true)
    }

    fn set_path_impl(&mut self, raw: &str, want_file: bool) -> Result<Option<String>, Error> {
        match canonicalize(raw, self.flavor, want_file) {
            Ok((path, file)) => {
                self.path = path;
                Ok(file)
            }
            Err(error) => {
                tracing::debug!("rejected local path {raw:?}: {error}");
                self.path.clear();
                Err(error)
            }
        }
    }

    fn is_drive_list(&self) -> bool {
        self.flavor == Flavor::Windows && self.path == "\\"
    }

    fn is_drive_root(&self) -> bool {
        self.flavor == Flavor::Windows && self.path.len() == 3 && !self.path.starts_with('\\')
    }

    /// Index of the separator ending the parent, scanning back from the second to last char.
    fn parent_end(&self) -> Option<usize> {
        let len = self.path.len();
        if len < 2 {
            return None;
        }
        let floor = self.flavor.parent_floor();
        self.path
            .char_indices()
            .rev()
            .skip(1)
            .take_while(|(index, _)| *index >= floor)
            .find(|(_, c)| *c == self.flavor.separator())
            .map(|(index, _)| index)
    }

    /// `C:` of a drive path or `\\server\share` of a UNC path, without the trailing separator.
    fn windows_root_prefix(&self) -> Option<&str> {
        if self.path.get(1..2) == Some(":") {
            return Some(&self.path[..2]);
        }
        let unc = self.path.strip_prefix("\\\\")?;
        let server_end = unc.find('\\')? + 2;
        let share_end = self.path[server_end + 1..]
            .find('\\')
            .map_or(server_end, |pos| pos + server_end + 1);
        Some(&self.path[..share_end])
    }

    pub fn has_parent(&self) -> bool {
        self.parent_end().is_some()
    }

    /// Like [`LocalPath::has_parent`], but a Windows drive root has the drive list as parent.
    pub fn has_logical_parent(&self) -> bool {
        self.is_drive_root() || self.has_parent()
    }

    pub fn get_parent(&self) -> LocalPath {
        let mut parent = self.clone();
        if parent.make_parent().is_none() {
            parent.clear();
        }
        parent
    }

    /// Step up to the logical parent, returning the removed segment.
    pub fn make_parent(&mut self) -> Option<String> {
        if self.is_drive_root() {
            let drive = self.path[..2].to_string();
            self.path = self.flavor.separator().to_string();
            return Some(drive);
        }
        let end = self.parent_end()?;
        let removed = self.path[end + 1..self.path.len() - 1].to_string();
        self.path.truncate(end + 1);
        Some(removed)
    }

    /// Name of the innermost directory, `None` if there is no parent.
    pub fn get_last_segment(&self) -> Option<&str> {
        if !self.has_parent() {
            return None;
        }
        let len = self.path.len();
        let start = self.path[..len - 1].rfind(self.flavor.separator())?;
        Some(&self.path[start + 1..len - 1])
    }

    /// Drive list and bare UNC servers cannot hold files.
    pub fn is_writeable(&self) -> bool {
        if self.path.is_empty() || self.is_drive_list() {
            return false;
        }
        match self.path.strip_prefix("\\\\") {
            Some(unc) if self.flavor == Flavor::Windows => unc
                .find('\\')
                .is_some_and(|server_end| server_end + 1 < unc.len()),
            _ => true,
        }
    }

    /// True if `other` is a strict ancestor of this path.
    pub fn is_subdir_of(&self, other: &LocalPath) -> bool {
        if self.flavor != other.flavor
            || other.path.is_empty()
            || other.path.len() >= self.path.len()
        {
            return false;
        }
        match self.flavor {
            Flavor::Posix => self.path.starts_with(&other.path),
            Flavor::Windows => {
                let mut own = lowercase(&self.path);
                lowercase(&other.path).all(|c| own.next() == Some(c))
            }
        }
    }

    pub fn is_parent_of(&self, other: &LocalPath) -> bool {
        other.is_subdir_of(self)
    }

    /// Navigate to `new_path`: absolute, relative to the current drive or UNC share (`\dir` on
    /// Windows) or relative to the current directory. On failure the value is left unchanged.
    pub fn change_path(&mut self, new_path: &str) -> Result<(), Error> {
        if new_path.is_empty() {
            return Err(Error::Empty);
        }
        let candidate = match self.flavor {
            Flavor::Windows => {
                let mut chars = new_path.chars();
                let first = chars.next().filter(|c| Flavor::Windows.is_separator(*c));
                let second = chars.next();
                let unc =
                    first.is_some() && second.is_some_and(|c| Flavor::Windows.is_separator(c));
                if new_path == "\\" || new_path == "/" || unc || second == Some(':') {
                    new_path.to_string()
                } else if self.path.is_empty() {
                    return Err(Error::EmptyPath);
                } else if let Some(root) = first.and_then(|_| self.windows_root_prefix()) {
                    format!("{root}{new_path}")
                } else {
                    format!("{}{}", self.path, new_path)
                }
            }
            Flavor::Posix => {
                if new_path.starts_with('/') {
                    new_path.to_string()
                } else if self.path.is_empty() {
                    return Err(Error::EmptyPath);
                } else {
                    format!("{}{}", self.path, new_path)
                }
            }
        };
        let candidate = if candidate == "/" && self.flavor == Flavor::Windows {
            "\\".to_string()
        } else {
            candidate
        };
        let (path, _) = canonicalize(&candidate, self.flavor, false)?;
        self.path = path;
        Ok(())
    }

    /// Append one directory name. Names containing separators or consisting of dots are
    /// rejected; an empty name is ignored.
    pub fn add_segment(&mut self, segment: &str) -> Result<(), Error> {
        if self.path.is_empty() {
            return Err(Error::EmptyPath);
        }
        if segment.is_empty() {
            return Ok(());
        }
        if segment == "."
            || segment == ".."
            || segment.contains(|c| self.flavor.is_separator(c))
        {
            return Err(Error::InvalidSegment(segment.to_string()));
        }
        self.path.push_str(segment);
        self.path.push(self.flavor.separator());
        Ok(())
    }

    /// Check that the path names an accessible directory. This is the only operation touching
    /// the filesystem.
    pub fn exists(&self) -> Result<(), Error> {
        if self.path.is_empty() {
            return Err(Error::EmptyPath);
        }
        if self.is_drive_list() {
            return Ok(());
        }
        let keep_separator = match self.flavor {
            Flavor::Posix => 1,
            Flavor::Windows => 3,
        };
        let path = if self.path.len() > keep_separator {
            &self.path[..self.path.len() - 1]
        } else {
            self.path.as_str()
        };
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(Error::NotADirectory(path.to_string())),
            Err(error) => {
                tracing::debug!("cannot stat {path:?}: {error}");
                if cfg!(windows)
                    && !self.path.starts_with('\\')
                    && error.raw_os_error() == Some(ERROR_NOT_READY)
                {
                    Err(Error::DriveNotReady(self.path[..3].to_string()))
                } else {
                    Err(Error::NotFound(path.to_string()))
                }
            }
        }
    }
}

impl PartialEq for LocalPath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LocalPath {}

impl Hash for LocalPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flavor.hash(state);
        match self.flavor {
            Flavor::Posix => self.path.hash(state),
            Flavor::Windows => lowercase(&self.path).for_each(|c| c.hash(state)),
        }
    }
}

impl PartialOrd for LocalPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalPath {
    /// Windows paths compare case-insensitively.
    fn cmp(&self, other: &Self) -> Ordering {
        self.flavor
            .cmp(&other.flavor)
            .then_with(|| match self.flavor {
                Flavor::Posix => self.path.cmp(&other.path),
                Flavor::Windows => lowercase(&self.path).cmp(lowercase(&other.path)),
            })
    }
}

impl std::fmt::Display for LocalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

impl std::str::FromStr for LocalPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
