use std::path::{Path, PathBuf};

use tokio::{
    fs::{self, File},
    io::{self, AsyncBufReadExt, Lines},
};

/// The extension of pre-tokenized record files
pub static RECORD_EXTENSION: &str = "jsonl";

/// Read a file from the given path into a list of strings
pub async fn read_file(path: &Path) -> io::Result<Vec<String>> {
    let mut r = file_reader(path).await?;
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

async fn file_reader(path: &Path) -> io::Result<Lines<io::BufReader<File>>> {
    let f = File::open(path).await?;

    Ok(io::BufReader::new(f).lines())
}

/// List the record files for a path: the path itself if it is a file, or every record file
/// directly inside it, sorted by file name
pub async fn record_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    if !fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut entries = fs::read_dir(path).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file = entry.path();

        if file.extension().is_some_and(|ext| ext == RECORD_EXTENSION) && file.is_file() {
            files.push(file);
        }
    }

    files.sort();

    Ok(files)
}
