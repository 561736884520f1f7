//! Remote paths in any of the supported server grammars.
//!
//! A [`ServerPath`] is a grammar tag plus shared, copy-on-write path data. Cloning is cheap; the
//! first mutation of a clone forks its own copy, so a change never shows through another value.

mod grammar;
pub mod safe;

use crate::server_type::{PrefixMode, ServerType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("empty path")]
    Empty,
    #[error("relative path '{0}' cannot be applied to an empty path")]
    Relative(String),
    #[error("unbalanced enclosure in '{0}'")]
    Enclosure(String),
    #[error("malformed path '{0}'")]
    Malformed(String),
    #[error("'{0}' does not end in a file name")]
    NoFilename(String),
    #[error("path would go above the root")]
    AboveRoot,
    #[error("path has no segments")]
    NoSegments,
    #[error("invalid file name '{0}'")]
    InvalidFilename(String),
    #[error("operation requires a non-empty path")]
    EmptyPath,
    #[error("server type is already fixed to {0}")]
    TypeFixed(ServerType),
    #[error("invalid safe path: {0}")]
    SafePath(&'static str),
}

/// Segments (outermost first) and the grammar-specific prefix. A prefix is never `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct PathData {
    prefix: Option<String>,
    segments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ServerPath {
    server_type: ServerType,
    data: Option<Arc<PathData>>,
}

fn lowercase(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn cmp_no_case(a: &str, b: &str) -> Ordering {
    lowercase(a).cmp(lowercase(b))
}

fn eq_str(a: &str, b: &str, no_case: bool) -> bool {
    if no_case {
        cmp_no_case(a, b) == Ordering::Equal
    } else {
        a == b
    }
}

impl ServerPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty path that will parse with the given grammar.
    pub fn with_type(server_type: ServerType) -> Self {
        Self {
            server_type,
            data: None,
        }
    }

    /// Parse a directory path. With [`ServerType::Default`] the grammar is detected from `raw`.
    pub fn parse(raw: &str, server_type: ServerType) -> Result<Self, Error> {
        let mut path = Self::with_type(server_type);
        path.set_path(raw)?;
        Ok(path)
    }

    /// Parse a path naming a file, returning the directory and the file name.
    pub fn parse_file(raw: &str, server_type: ServerType) -> Result<(Self, String), Error> {
        let mut path = Self::with_type(server_type);
        let file = path.set_file_path(raw)?;
        Ok((path, file))
    }

    /// `parent` navigated to `subdir`, or an empty path of the parent's grammar if that fails.
    pub fn from_parent(parent: &ServerPath, subdir: &str) -> Self {
        let mut path = parent.clone();
        if path.change_path(subdir).is_err() {
            path.clear();
        }
        path
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Drop the path data; the grammar tag is kept.
    pub fn clear(&mut self) {
        self.data = None;
    }

    pub fn get_type(&self) -> ServerType {
        self.server_type
    }

    /// Change the grammar. Only allowed while the path is empty or still undetected.
    pub fn set_type(&mut self, server_type: ServerType) -> Result<(), Error> {
        if !self.is_empty() && self.server_type != ServerType::Default {
            return Err(Error::TypeFixed(self.server_type));
        }
        self.server_type = server_type;
        Ok(())
    }

    /// Replace the value with `raw`. On failure the path is left empty.
    pub fn set_path(&mut self, raw: &str) -> Result<(), Error> {
        self.set_path_impl(raw, false).map(|_| ())
    }

    /// Like [`ServerPath::set_path`], splitting off and returning the trailing file name.
    pub fn set_file_path(&mut self, raw: &str) -> Result<String, Error> {
        self.set_path_impl(raw, true).map(Option::unwrap_or_default)
    }

    fn set_path_impl(&mut self, raw: &str, is_file: bool) -> Result<Option<String>, Error> {
        let server_type = self.resolve_type(raw, is_file, true);
        match grammar::change_path(server_type, None, raw, is_file) {
            Ok(parsed) => {
                self.server_type = server_type;
                self.data = Some(Arc::new(parsed.data));
                Ok(parsed.file)
            }
            Err(error) => {
                tracing::debug!("cannot parse {raw:?} as {server_type:?} path: {error}");
                self.data = None;
                Err(error)
            }
        }
    }

    fn resolve_type(&self, raw: &str, is_file: bool, fresh: bool) -> ServerType {
        if self.server_type != ServerType::Default || !(fresh || self.is_empty()) {
            return self.server_type;
        }
        let detected = grammar::detect(raw, is_file);
        tracing::trace!("detected {detected:?} grammar for {raw:?}");
        detected
    }

    /// Navigate to `subdir`, absolute or relative to the current value. On failure the value is
    /// left unchanged.
    pub fn change_path(&mut self, subdir: &str) -> Result<(), Error> {
        self.change_path_impl(subdir, false).map(|_| ())
    }

    /// Navigate to the directory of `subdir` and return its file name.
    pub fn change_file_path(&mut self, subdir: &str) -> Result<String, Error> {
        self.change_path_impl(subdir, true).map(Option::unwrap_or_default)
    }

    fn change_path_impl(&mut self, subdir: &str, is_file: bool) -> Result<Option<String>, Error> {
        let server_type = self.resolve_type(subdir, is_file, false);
        let parsed = grammar::change_path(server_type, self.data.as_deref(), subdir, is_file)?;
        self.server_type = server_type;
        self.data = Some(Arc::new(parsed.data));
        Ok(parsed.file)
    }

    /// Canonical text of the path in its grammar.
    pub fn get_path(&self) -> String {
        let Some(data) = &self.data else {
            return String::new();
        };
        let traits = self.server_type.traits();
        let separator = traits.separator();
        let prefix = data.prefix.as_deref();
        let mut path = String::new();
        if traits.prefix_mode == PrefixMode::Leading {
            path.push_str(prefix.unwrap_or_default());
        }
        if let Some(left) = traits.left_enclosure {
            path.push(left);
        }
        if data.segments.is_empty()
            && (!traits.has_root || prefix.is_none() || traits.separator_after_prefix)
        {
            path.push(separator);
        }
        // z/VM has no root but its paths are still written with a leading separator
        let leading = self.server_type == ServerType::Zvm
            || (traits.has_root && (prefix.is_none() || traits.separator_after_prefix));
        for (index, segment) in data.segments.iter().enumerate() {
            if index > 0 || leading {
                path.push(separator);
            }
            match traits.separator_escape {
                Some(escape) => {
                    for c in segment.chars() {
                        if traits.is_separator(c) {
                            path.push(escape);
                        }
                        path.push(c);
                    }
                }
                None => path.push_str(segment),
            }
        }
        if traits.prefix_mode == PrefixMode::Suffix {
            path.push_str(prefix.unwrap_or_default());
        }
        if let Some(right) = traits.right_enclosure {
            path.push(right);
        }
        // a bare drive needs its trailing backslash
        if self.server_type == ServerType::Dos && data.segments.len() == 1 {
            path.push(separator);
        }
        path
    }

    /// Full name of `filename` inside this directory. With `omit_path` the bare file name is
    /// returned wherever the grammar allows addressing it relative to the working directory.
    pub fn format_filename(&self, filename: &str, omit_path: bool) -> String {
        let Some(data) = &self.data else {
            return filename.to_string();
        };
        if filename.is_empty() {
            return String::new();
        }
        let traits = self.server_type.traits();
        if omit_path
            && (traits.prefix_mode == PrefixMode::Leading || data.prefix.as_deref() == Some("."))
        {
            return filename.to_string();
        }
        let mut path = self.get_path();
        let mut closing = None;
        if traits.filename_inside_enclosure {
            closing = traits.right_enclosure;
            path.pop();
        }
        if traits.left_enclosure.is_none() && !path.ends_with(|c| traits.is_separator(c)) {
            path.push(traits.separator());
        }
        if traits.prefix_mode == PrefixMode::Suffix && data.prefix.is_none() {
            path.push('(');
            path.push_str(filename);
            path.push(')');
        } else {
            path.push_str(filename);
        }
        if let Some(closing) = closing {
            path.push(closing);
        }
        path
    }

    pub fn has_parent(&self) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        if self.server_type.traits().has_root {
            !data.segments.is_empty()
        } else {
            data.segments.len() > 1
        }
    }

    /// Parent directory, or an empty path of the same grammar if there is none.
    pub fn get_parent(&self) -> ServerPath {
        let mut parent = self.clone();
        if parent.make_parent().is_none() {
            parent.clear();
        }
        parent
    }

    /// Step up one level in place, returning the removed segment.
    pub fn make_parent(&mut self) -> Option<String> {
        if !self.has_parent() {
            return None;
        }
        let is_mvs = self.server_type == ServerType::Mvs;
        let data = self.data.as_mut().map(Arc::make_mut)?;
        let removed = data.segments.pop();
        if is_mvs {
            data.prefix = Some(".".to_string());
        }
        removed
    }

    /// Innermost segment, if the path has a parent to strip it from.
    pub fn get_last_segment(&self) -> Option<&str> {
        if !self.has_parent() {
            return None;
        }
        self.segments().last().map(String::as_str)
    }

    /// Append a segment verbatim; no separator or dot handling is applied.
    pub fn add_segment(&mut self, segment: &str) -> Result<(), Error> {
        if segment.is_empty() {
            return Err(Error::InvalidFilename(String::new()));
        }
        let data = self
            .data
            .as_mut()
            .map(Arc::make_mut)
            .ok_or(Error::EmptyPath)?;
        data.segments.push(segment.to_string());
        Ok(())
    }

    pub fn segments(&self) -> &[String] {
        self.data
            .as_deref()
            .map(|data| data.segments.as_slice())
            .unwrap_or_default()
    }

    pub fn segment_count(&self) -> usize {
        self.segments().len()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.data.as_deref().and_then(|data| data.prefix.as_deref())
    }

    /// True if `other` is a strict ancestor of this path.
    pub fn is_subdir_of(&self, other: &ServerPath, no_case: bool) -> bool {
        let (Some(data), Some(other_data)) = (&self.data, &other.data) else {
            return false;
        };
        if self.server_type != other.server_type {
            return false;
        }
        match self.server_type.traits().prefix_mode {
            PrefixMode::Leading => match (&data.prefix, &other_data.prefix) {
                (None, None) => {}
                (Some(a), Some(b)) if eq_str(a, b, no_case) => {}
                _ => return false,
            },
            // a dataset without the trailing qualifier marker has no children
            PrefixMode::Suffix => {
                if other_data.prefix.is_none() {
                    return false;
                }
            }
        }
        if data.segments.len() <= other_data.segments.len() {
            return false;
        }
        other_data
            .segments
            .iter()
            .zip(&data.segments)
            .all(|(a, b)| eq_str(a, b, no_case))
    }

    pub fn is_parent_of(&self, other: &ServerPath, no_case: bool) -> bool {
        other.is_subdir_of(self, no_case)
    }

    /// Deepest directory containing both paths, or an empty path if they share none.
    pub fn get_common_parent(&self, other: &ServerPath) -> ServerPath {
        if self == other {
            return self.clone();
        }
        let (Some(data), Some(other_data)) = (&self.data, &other.data) else {
            return ServerPath::new();
        };
        let traits = self.server_type.traits();
        if self.server_type != other.server_type
            || (traits.prefix_mode == PrefixMode::Leading && data.prefix != other_data.prefix)
        {
            return ServerPath::new();
        }
        if !self.has_parent() {
            return if other.is_subdir_of(self, false) {
                self.clone()
            } else {
                ServerPath::new()
            };
        }
        if !other.has_parent() {
            return if self.is_subdir_of(other, false) {
                other.clone()
            } else {
                ServerPath::new()
            };
        }

        let mut last = data.segments.len();
        let mut other_last = other_data.segments.len();
        let prefix = match traits.prefix_mode {
            PrefixMode::Leading => data.prefix.clone(),
            PrefixMode::Suffix => {
                // the last segment of a dataset is a file, not a directory
                if data.prefix.is_none() {
                    last -= 1;
                }
                if other_data.prefix.is_none() {
                    other_last -= 1;
                }
                self.get_parent().prefix().map(str::to_string)
            }
        };
        let segments: Vec<String> = data.segments[..last]
            .iter()
            .zip(&other_data.segments[..other_last])
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.clone())
            .collect();
        if segments.is_empty() && !traits.has_root {
            return ServerPath::new();
        }
        ServerPath {
            server_type: self.server_type,
            data: Some(Arc::new(PathData { prefix, segments })),
        }
    }

    /// Case-insensitive ordering by prefix, grammar, segment count and segment text.
    pub fn cmp_no_case(&self, other: &ServerPath) -> Ordering {
        let (data, other_data) = match (&self.data, &other.data) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(data), Some(other_data)) => (data, other_data),
        };
        let prefix = match (&data.prefix, &other_data.prefix) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => cmp_no_case(a, b),
        };
        prefix
            .then(self.server_type.cmp(&other.server_type))
            .then(data.segments.len().cmp(&other_data.segments.len()))
            .then_with(|| {
                data.segments
                    .iter()
                    .zip(&other_data.segments)
                    .map(|(a, b)| cmp_no_case(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// Length-prefixed serialization, see [`safe`]. Empty for an empty path.
    pub fn get_safe_path(&self) -> String {
        match &self.data {
            Some(data) => safe::encode(self.server_type, data),
            None => String::new(),
        }
    }

    /// Restore a value produced by [`ServerPath::get_safe_path`]. An empty string yields an
    /// empty path; malformed input leaves the path empty and fails.
    pub fn set_safe_path(&mut self, input: &str) -> Result<(), Error> {
        self.data = None;
        if input.is_empty() {
            return Ok(());
        }
        match safe::decode(input) {
            Ok((server_type, data)) => {
                self.server_type = server_type;
                self.data = data.map(Arc::new);
                Ok(())
            }
            Err(error) => {
                tracing::debug!("rejected safe path {input:?}: {error}");
                Err(error)
            }
        }
    }
}

impl PartialOrd for ServerPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerPath {
    /// Empty paths sort first. Otherwise by prefix (absent sorts as empty), grammar, segments.
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.data, &other.data) {
            (None, None) => self.server_type.cmp(&other.server_type),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(data), Some(other_data)) => {
                let prefix = data.prefix.as_deref().unwrap_or_default();
                let other_prefix = other_data.prefix.as_deref().unwrap_or_default();
                prefix
                    .cmp(other_prefix)
                    .then(self.server_type.cmp(&other.server_type))
                    .then_with(|| data.segments.cmp(&other_data.segments))
            }
        }
    }
}

impl std::fmt::Display for ServerPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.get_path())
    }
}

impl std::str::FromStr for ServerPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, ServerType::Default)
    }
}

impl From<ServerPath> for String {
    fn from(path: ServerPath) -> Self {
        path.get_safe_path()
    }
}

impl TryFrom<String> for ServerPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut path = ServerPath::new();
        path.set_safe_path(&value)?;
        Ok(path)
    }
}
