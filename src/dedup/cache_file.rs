use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Reads a newline-delimited URL list; a missing file is an empty list
pub fn read_url_file(path: &Path) -> io::Result<HashSet<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Replaces a URL list file with the given URLs, sorted
///
/// The list is written to a sibling file first and renamed over the old one, so
/// an interrupted write leaves the previous list intact.
pub fn write_url_file(path: &Path, urls: &HashSet<String>) -> io::Result<()> {
    let mut sorted: Vec<&String> = urls.iter().collect();
    sorted.sort();

    let tmp_path = path.with_extension("txt.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        for url in sorted {
            writeln!(file, "{}", url)?;
        }
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}
