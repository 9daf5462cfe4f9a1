// Reading user input from files and stdin.
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "csv", "json", "html", "htm", "pdf"];

pub fn is_supported(path: &Path) -> bool {
    extension(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

fn read_text_file(p: &Path) -> Result<String> {
    let mut s = String::new();
    let mut f = File::open(p)?;
    f.read_to_string(&mut s)?;
    Ok(s)
}

pub fn read_file_content(path: &Path) -> Result<String> {
    let ext = extension(path).unwrap_or_default();
    match ext.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| Error::Pdf(e.to_string())),
        _ if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => read_text_file(path),
        _ => Err(Error::UnsupportedFormat(if ext.is_empty() {
            format!("{} has no extension", path.display())
        } else {
            ext
        })),
    }
}

pub fn read_stdin() -> Result<String> {
    let mut s = String::new();
    std::io::stdin().read_to_string(&mut s)?;
    Ok(s)
}
