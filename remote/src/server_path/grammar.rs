//! Per-grammar lexing of raw path strings into segments and prefix.
//!
//! Most grammars share one generic tokenizer; VMS, DOS, MVS, HP NonStop, VxWorks and Cygwin need
//! their own handling of enclosures, drive letters and prefixes.

use super::{Error, PathData};
use crate::server_type::{ServerType, Traits};

/// Quote character some MVS servers wrap their PWD replies in.
const MVS_DOUBLE_QUOTE: char = '\u{dc}';

/// Result of applying a raw path to an existing value.
#[derive(Debug)]
pub(super) struct Parsed {
    pub data: PathData,
    pub file: Option<String>,
}

/// Guess the grammar of `raw` from its lexical shape. Checks run in a fixed order and the first
/// match wins; anything unrecognized is treated as Unix.
pub(super) fn detect(raw: &str, is_file: bool) -> ServerType {
    if let Some(open) = raw.find(":[") {
        let close = raw.rfind(']');
        return match close {
            Some(close) if close == raw.len() - 1 && !is_file => ServerType::Vms,
            Some(close) if is_file && close > open => ServerType::Vms,
            _ => ServerType::Unix,
        };
    }
    let bytes = raw.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return ServerType::Dos;
    }
    let mut chars = raw.chars();
    let first = chars.next();
    if matches!(first, Some(MVS_DOUBLE_QUOTE | '\'')) && first == chars.next_back() {
        return ServerType::Mvs;
    }
    let volume_end = raw
        .strip_prefix(':')
        .and_then(|rest| rest.find(':'))
        .filter(|&pos| pos > 0)
        .map(|pos| pos + 1);
    if volume_end.is_some_and(|colon| raw.find('/').is_none_or(|slash| slash > colon)) {
        return ServerType::VxWorks;
    }
    if raw.starts_with('\\') {
        return ServerType::DosVirtual;
    }
    ServerType::Unix
}

/// Apply `subdir` to `current` (or to nothing, for a fresh parse) using the grammar of
/// `server_type`. When `is_file` is set the trailing component is split off and returned.
pub(super) fn change_path(
    server_type: ServerType,
    current: Option<&PathData>,
    subdir: &str,
    is_file: bool,
) -> Result<Parsed, Error> {
    let traits = server_type.traits();
    if subdir.is_empty() {
        return match current {
            Some(data) if !is_file => Ok(Parsed {
                data: data.clone(),
                file: None,
            }),
            _ => Err(Error::Empty),
        };
    }
    let was_empty = current.is_none();
    let mut data = current.cloned().unwrap_or_default();
    let file = match server_type {
        ServerType::Vms => vms(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::Dos => dos(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::Mvs => mvs(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::HpNonStop => hp_nonstop(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::VxWorks => vxworks(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::Cygwin => cygwin(traits, &mut data, subdir, is_file, was_empty)?,
        ServerType::Default | ServerType::Unix | ServerType::Zvm | ServerType::DosVirtual => {
            generic(traits, &mut data, subdir, is_file, was_empty)?
        }
    };
    if !traits.has_root && data.segments.is_empty() {
        return Err(Error::NoSegments);
    }
    if let Some(file) = file
        .as_ref()
        .filter(|file| file.is_empty() || (traits.has_dots && (*file == "." || *file == "..")))
    {
        return Err(Error::InvalidFilename(file.clone()));
    }
    Ok(Parsed { data, file })
}

/// Split `input` on the grammar's separators and append the pieces to `segments`. Empty pieces
/// collapse, `.`/`..` resolve when the grammar has dots and an escaped separator joins two
/// pieces into one segment.
pub(super) fn segmentize(
    traits: &Traits,
    input: &str,
    segments: &mut Vec<String>,
) -> Result<(), Error> {
    let pieces: Vec<&str> = input.split(|c| traits.is_separator(c)).collect();
    let last = pieces.len() - 1;
    let mut append = false;
    for (index, piece) in pieces.into_iter().enumerate() {
        if piece.is_empty() {
            continue;
        }
        if traits.has_dots {
            if piece == "." {
                continue;
            }
            if piece == ".." {
                if segments.pop().is_none() {
                    return Err(Error::AboveRoot);
                }
                continue;
            }
        }
        let mut segment = piece.to_string();
        let append_next = traits
            .separator_escape
            .is_some_and(|escape| index < last && segment.ends_with(escape));
        if append_next {
            segment.pop();
            segment.push(traits.separator());
        }
        match segments.last_mut() {
            Some(previous) if append => previous.push_str(&segment),
            _ => segments.push(segment),
        }
        append = append_next;
    }
    Ok(())
}

/// Split the trailing file name off `dir`.
fn extract_file<'a>(traits: &Traits, dir: &'a str) -> Result<(&'a str, String), Error> {
    match dir.rfind(|c| traits.is_separator(c)) {
        Some(pos) if pos + 1 == dir.len() => Err(Error::NoFilename(dir.to_string())),
        // separators are ASCII, so pos + 1 is a char boundary
        Some(pos) => Ok((&dir[..=pos], dir[pos + 1..].to_string())),
        None => Ok(("", dir.to_string())),
    }
}

fn split_file<'a>(
    traits: &Traits,
    dir: &'a str,
    is_file: bool,
) -> Result<(&'a str, Option<String>), Error> {
    if is_file {
        let (dir, file) = extract_file(traits, dir)?;
        Ok((dir, Some(file)))
    } else {
        Ok((dir, None))
    }
}

fn generic(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    if dir.starts_with(traits.separator()) {
        data.segments.clear();
    } else if was_empty {
        return Err(Error::Relative(dir.to_string()));
    }
    let (dir, file) = split_file(traits, dir, is_file)?;
    segmentize(traits, dir, &mut data.segments)?;
    Ok(file)
}

fn vms(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    let (Some(left), Some(right)) = (traits.left_enclosure, traits.right_enclosure) else {
        return generic(traits, data, dir, is_file, was_empty);
    };
    let Some(open) = dir.find(left) else {
        if dir.contains(right) {
            return Err(Error::Enclosure(dir.to_string()));
        }
        if was_empty {
            return Err(Error::Relative(dir.to_string()));
        }
        if is_file {
            return Ok(Some(dir.to_string()));
        }
        segmentize(traits, dir, &mut data.segments)?;
        return Ok(None);
    };
    let close = dir
        .rfind(right)
        .filter(|&close| close > open + 1)
        .ok_or_else(|| Error::Enclosure(dir.to_string()))?;
    let enclosure_is_last = close == dir.len() - 1;
    if is_file == enclosure_is_last {
        return Err(Error::Malformed(dir.to_string()));
    }
    let file = is_file.then(|| dir[close + 1..].to_string());
    data.prefix = (open > 0).then(|| dir[..open].to_string());
    data.segments.clear();
    segmentize(traits, &dir[open + 1..close], &mut data.segments)?;
    Ok(file)
}

fn dos(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    let first_separator = dir
        .find(|c| traits.is_separator(c))
        .unwrap_or(dir.len());
    let drive_absolute = dir
        .find(':')
        .is_some_and(|colon| colon > 0 && colon + 1 == first_separator);
    let mut dir = dir;
    if drive_absolute {
        data.segments.clear();
    } else if dir.starts_with(|c| traits.is_separator(c)) {
        // relative to the drive root of the current path
        let Some(drive) = data.segments.first().cloned() else {
            return Err(Error::Relative(dir.to_string()));
        };
        data.segments = vec![drive];
        dir = &dir[1..];
    } else if was_empty {
        return Err(Error::Relative(dir.to_string()));
    }
    let (dir, file) = split_file(traits, dir, is_file)?;
    segmentize(traits, dir, &mut data.segments)?;
    Ok(file)
}

fn mvs(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    let (Some(left), Some(right)) = (traits.left_enclosure, traits.right_enclosure) else {
        return generic(traits, data, dir, is_file, was_empty);
    };
    let mut dir = dir.trim_matches(MVS_DOUBLE_QUOTE);
    if dir.is_empty() {
        return Err(Error::Empty);
    }
    let absolute = if let Some(inner) = dir.strip_prefix(left) {
        dir = inner
            .strip_suffix(right)
            .ok_or_else(|| Error::Enclosure(dir.to_string()))?;
        true
    } else if dir.ends_with(right) {
        return Err(Error::Enclosure(dir.to_string()));
    } else {
        // an unquoted name on an empty path is a fully qualified dataset name
        was_empty
    };
    if absolute {
        data.segments.clear();
        data.prefix = None;
    }

    if let Some(rest) = dir.strip_suffix(')') {
        // partitioned dataset member: DATASET(MEMBER)
        if !is_file {
            return Err(Error::Malformed(dir.to_string()));
        }
        let open = rest
            .find('(')
            .ok_or_else(|| Error::Enclosure(dir.to_string()))?;
        let member = &rest[open + 1..];
        let dataset = &rest[..open];
        if !absolute && data.prefix.is_none() && !dataset.is_empty() {
            return Err(Error::Malformed(dir.to_string()));
        }
        data.prefix = None;
        segmentize(traits, dataset, &mut data.segments)?;
        return Ok(Some(member.to_string()));
    }

    if !absolute && data.prefix.is_none() {
        // current value is a partitioned dataset, only plain member names fit inside
        if dir.contains('.') || !is_file {
            return Err(Error::Malformed(dir.to_string()));
        }
        return Ok(Some(dir.to_string()));
    }

    if is_file {
        let (dir, file) = extract_file(traits, dir)?;
        data.prefix = Some(".".to_string());
        segmentize(traits, dir, &mut data.segments)?;
        Ok(Some(file))
    } else {
        data.prefix = dir.ends_with('.').then(|| ".".to_string());
        segmentize(traits, dir, &mut data.segments)?;
        Ok(None)
    }
}

fn hp_nonstop(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    if dir.starts_with('\\') {
        data.segments.clear();
    } else if was_empty {
        return Err(Error::Relative(dir.to_string()));
    }
    let (dir, file) = split_file(traits, dir, is_file)?;
    segmentize(traits, dir, &mut data.segments)?;
    Ok(file)
}

fn vxworks(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    let mut dir = dir;
    if let Some(rest) = dir.strip_prefix(':') {
        // volume prefix of the form :name:
        let colon = rest
            .find(':')
            .filter(|&pos| pos > 0)
            .ok_or_else(|| Error::Malformed(dir.to_string()))?;
        data.prefix = Some(dir[..colon + 2].to_string());
        dir = &rest[colon + 1..];
        data.segments.clear();
    } else if was_empty {
        return Err(Error::Relative(dir.to_string()));
    }
    let (dir, file) = split_file(traits, dir, is_file)?;
    segmentize(traits, dir, &mut data.segments)?;
    Ok(file)
}

fn cygwin(
    traits: &Traits,
    data: &mut PathData,
    dir: &str,
    is_file: bool,
    was_empty: bool,
) -> Result<Option<String>, Error> {
    let separator = traits.separator();
    let mut dir = dir;
    if dir.starts_with(separator) {
        data.segments.clear();
        data.prefix = None;
    } else if was_empty {
        return Err(Error::Relative(dir.to_string()));
    }
    let mut leading = dir.chars();
    if leading.next() == Some(separator) && leading.next() == Some(separator) {
        // //server/share
        data.prefix = Some(separator.to_string());
        dir = &dir[1..];
    }
    let (dir, file) = split_file(traits, dir, is_file)?;
    segmentize(traits, dir, &mut data.segments)?;
    Ok(file)
}
