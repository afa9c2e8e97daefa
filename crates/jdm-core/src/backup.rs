use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::FileOptions;

// Zip snapshot of a document next to it (non-destructive):
// `<stem>_<YYYYmmdd-HHMMSS>.zip` holding the file under its own name.
pub fn zip_backup_document(path: &Path) -> io::Result<PathBuf> {
    if !path.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a file"));
    }
    let parent = path.parent().unwrap_or(Path::new("."));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    let entry = path.file_name().and_then(|s| s.to_str()).unwrap_or("document.json");
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let dest = unused_name(parent, stem, &ts.to_string());

    let data = fs::read(path)?;
    let file = fs::File::create(&dest)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    zip.start_file(entry, options)?;
    zip.write_all(&data)?;
    zip.finish()?;
    Ok(dest)
}

// Two commits within the same second must not overwrite each other's snapshot.
fn unused_name(dir: &Path, stem: &str, ts: &str) -> PathBuf {
    let first = dir.join(format!("{}_{}.zip", stem, ts));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{}_{}-{}.zip", stem, ts, n)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
