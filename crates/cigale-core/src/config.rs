//! Line-level rewriting of the external program's `pcigale.ini`.
//!
//! The file is treated as an ordered list of lines. A parameter is located by
//! the line that starts with its key, first without indentation, then with
//! two and four spaces (the nesting depths of module sections). Only the
//! located line is replaced; every other line is written back byte for byte.

use crate::domain::{CigaleError, CigaleResult, ParamMap, ParamValue};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const INDENT_LEVELS: [&str; 3] = ["", "  ", "    "];

/// Rewrites the lines for every key in `params` and writes the file back.
///
/// Nothing is written when any key is missing or ambiguous.
pub fn patch_file(path: impl AsRef<Path>, params: &ParamMap) -> CigaleResult<()> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| CigaleError::io(path, source))?;
    let patched = patch_text(&source, params)?;
    fs::write(path, patched).map_err(|source| CigaleError::io(path, source))
}

pub fn patch_text(source: &str, params: &ParamMap) -> CigaleResult<String> {
    let mut lines: Vec<String> = source.split_inclusive('\n').map(str::to_string).collect();

    for (key, value) in params.iter() {
        let (index, prefix) = locate_key(&lines, key)?;
        let line = render_line(prefix, key, value);
        debug!(key, line = index + 1, value = %value, "patched config parameter");
        lines[index] = line;
    }

    Ok(lines.concat())
}

pub fn render_line(prefix: &str, key: &str, value: &ParamValue) -> String {
    format!("{}{} = {}\n", prefix, key, value.render())
}

fn locate_key(lines: &[String], key: &str) -> CigaleResult<(usize, &'static str)> {
    if key.is_empty() {
        return Err(CigaleError::InvalidArgument(
            "config parameter keys must not be empty".to_string(),
        ));
    }

    for prefix in INDENT_LEVELS {
        let matches = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| {
                line.strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(key))
            })
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        match matches.as_slice() {
            [] => continue,
            [index] => return Ok((*index, prefix)),
            _ => {
                return Err(CigaleError::DuplicateKey {
                    key: key.to_string(),
                    lines: matches.iter().map(|index| index + 1).collect(),
                });
            }
        }
    }

    Err(CigaleError::KeyNotFound {
        key: key.to_string(),
    })
}
