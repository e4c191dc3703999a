//! Where the CLI keeps its files.
//!
//! Everything lives in one data directory: the table state database and
//! the log. The log is appended to across runs and moved aside to
//! `tablekit.log.1` once it outgrows [`MAX_LOG_BYTES`].

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use directories::ProjectDirs;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "tablekit";
const APPLICATION: &str = "tablekit";

const STATE_DB: &str = "state.db";
const LOG_FILE: &str = "tablekit.log";

/// Size after which the log is moved aside.
pub const MAX_LOG_BYTES: u64 = 1024 * 1024;

/// Get the data directory.
///
/// - Linux: `$XDG_DATA_HOME/tablekit` or `~/.local/share/tablekit`
/// - macOS: `~/Library/Application Support/dev.tablekit.tablekit`
/// - Windows: `C:\Users\<User>\AppData\Roaming\tablekit\tablekit\data`
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|dirs| dirs.data_dir().to_path_buf())
}

/// Returns the state database path, creating its directory.
pub fn state_db() -> io::Result<Option<PathBuf>> {
    let Some(dir) = data_dir() else {
        return Ok(None);
    };
    fs::create_dir_all(&dir)?;
    Ok(Some(dir.join(STATE_DB)))
}

/// Opens the log for appending, creating the data directory.
pub fn open_log() -> io::Result<Option<(PathBuf, File)>> {
    let Some(dir) = data_dir() else {
        return Ok(None);
    };
    open_log_in(&dir).map(Some)
}

fn open_log_in(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);
    let oversized = fs::metadata(&path).is_ok_and(|meta| meta.len() > MAX_LOG_BYTES);
    if oversized {
        fs::rename(&path, dir.join(format!("{}.1", LOG_FILE)))?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tablekit-paths-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_log_appends_across_runs() {
        let dir = scratch("append");
        let (path, mut file) = open_log_in(&dir).unwrap();
        writeln!(file, "first").unwrap();
        drop(file);

        let (_, mut file) = open_log_in(&dir).unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert!(!dir.join("tablekit.log.1").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_oversized_log_is_moved_aside() {
        let dir = scratch("rotate");
        fs::create_dir_all(&dir).unwrap();
        let big = vec![b'x'; MAX_LOG_BYTES as usize + 1];
        fs::write(dir.join("tablekit.log"), &big).unwrap();

        let (path, _) = open_log_in(&dir).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(fs::metadata(dir.join("tablekit.log.1")).unwrap().len(), big.len() as u64);
        fs::remove_dir_all(&dir).unwrap();
    }
}
