use crate::domain::{CigaleError, CigaleResult};
use std::fs;
use std::path::Path;

/// `%.{precision}f` formatting.
pub fn format_fixed_f64(value: f64, precision: usize) -> String {
    format!("{value:.precision$}", precision = precision)
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Writes a text file with canonical line endings, creating parent directories.
pub fn write_text_artifact(path: &Path, content: &str) -> CigaleResult<()> {
    ensure_parent_dir(path)?;
    fs::write(path, normalize_text_artifact(content)).map_err(|source| CigaleError::io(path, source))
}

pub fn ensure_parent_dir(path: &Path) -> CigaleResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            fs::create_dir_all(parent).map_err(|source| CigaleError::io(parent, source))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_parent_dir, format_fixed_f64, normalize_text_artifact, write_text_artifact};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fixed_precision_formatting_matches_printf() {
        assert_eq!(format_fixed_f64(0.1, 6), "0.100000");
        assert_eq!(format_fixed_f64(1.25, 15), "1.250000000000000");
        assert_eq!(format_fixed_f64(-3.0, 0), "-3");
    }

    #[test]
    fn normalize_text_artifact_uses_canonical_line_endings() {
        let normalized = normalize_text_artifact("alpha\r\nbeta\rgamma");
        assert_eq!(normalized, "alpha\nbeta\ngamma\n");
    }

    #[test]
    fn text_writes_create_missing_directories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("nested/dir/flux.dat");

        write_text_artifact(&path, "line 1\r\nline 2").expect("write should succeed");
        assert_eq!(
            fs::read(&path).expect("artifact should be readable"),
            b"line 1\nline 2\n"
        );
    }

    #[test]
    fn bare_file_names_need_no_parent() {
        ensure_parent_dir(std::path::Path::new("models.fits")).expect("no parent to create");
    }
}
