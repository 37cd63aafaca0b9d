use crate::errors::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

const MARKER_SUFFIX: &str = ".log";
const LOCK_SUFFIX: &str = ".lock";
const TOKENIZER_FILE: &str = "tokenizer.json";
const TOKENIZER_JSON_ERR: &str = "tokenizer json not found at";

/// Sidecar whose presence records a completed run: `<output>.log`.
pub fn marker_path(output: &Path) -> PathBuf {
    with_suffix(output, MARKER_SUFFIX)
}

pub fn lock_path(output: &Path) -> PathBuf {
    with_suffix(output, LOCK_SUFFIX)
}

/// Accept either a `tokenizer.json` file or a directory holding one.
pub fn resolve_tokenizer_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(TOKENIZER_FILE)
    } else {
        path.to_path_buf()
    }
}

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    let path = resolve_tokenizer_path(path);
    ensure_file(&path, TOKENIZER_JSON_ERR)?;
    Tokenizer::from_file(&path).map_err(Error::from)
}

pub fn save_tokenizer_json(tok: &Tokenizer, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    tok.save(path, true).map_err(Error::from)
}

/// Write the marker through a temporary file so a reader never observes a
/// half-written marker.
pub fn write_marker(path: &Path, lines: &[String]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = with_suffix(path, ".tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(lines.join("\n").as_bytes())?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_marker(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.lines().map(str::to_owned).collect())
}

pub fn remove_marker(path: &Path) -> Result<bool> {
    if path.is_file() {
        fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn ensure_file(path: &Path, context: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Validation(format!("{context} {}", path.display())))
    }
}
