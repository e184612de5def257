//! Moving finished configs out of the way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Move `file` into `dir`, creating `dir` if needed.
///
/// `create_dir_all` tolerates concurrent creation of the same directory, so
/// every worker can call this without coordination. An existing file of the
/// same name in `dir` is never replaced: the move fails with `AlreadyExists`
/// and `file` stays where it is. Falls back to copy and delete across
/// filesystems.
pub fn relocate(file: &Path, dir: &Path) -> io::Result<PathBuf> {
    let name = file.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", file.display()),
        )
    })?;
    fs::create_dir_all(dir)?;
    let destination = dir.join(name);

    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }

    if fs::rename(file, &destination).is_ok() {
        return Ok(destination);
    }

    copy_then_delete(file, &destination, |source| fs::remove_file(source))?;
    Ok(destination)
}

/// Copy `file` to `destination`, verify the size, then remove the source.
///
/// The copy is removed again when verification fails or the source cannot
/// be removed.
fn copy_then_delete(
    file: &Path,
    destination: &Path,
    remove_source: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<()> {
    let source_size = fs::metadata(file)?.len();
    let mut source = fs::File::open(file)?;
    let mut copy = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;
    let copied = io::copy(&mut source, &mut copy).and_then(|_| copy.sync_all());
    drop(copy);
    if let Err(e) = copied {
        let _ = fs::remove_file(destination);
        return Err(e);
    }

    let copied_size = fs::metadata(destination)?.len();
    if copied_size != source_size {
        let _ = fs::remove_file(destination);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "Copy verification failed: source {} bytes, dest {} bytes",
                source_size, copied_size
            ),
        ));
    }

    if let Err(e) = remove_source(file) {
        let _ = fs::remove_file(destination);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn moves_file_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("run_out_subtree_1.txt");
        fs::write(&file, "[Input]\n").unwrap();
        let finished = temp.path().join("finished");

        let destination = relocate(&file, &finished).unwrap();

        assert!(!file.exists());
        assert_eq!(destination, finished.join("run_out_subtree_1.txt"));
        assert_eq!(fs::read_to_string(destination).unwrap(), "[Input]\n");
    }

    #[test]
    fn missing_source_fails_and_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let finished = temp.path().join("finished");
        assert!(relocate(&temp.path().join("absent.txt"), &finished).is_err());
        assert!(!finished.join("absent.txt").exists());
    }

    #[test]
    fn concurrent_moves_share_one_directory() {
        let temp = TempDir::new().unwrap();
        let finished = temp.path().join("finished");
        let files: Vec<PathBuf> = (0..8)
            .map(|i| {
                let path = temp.path().join(format!("run_out_subtree_{i}.txt"));
                fs::write(&path, "x").unwrap();
                path
            })
            .collect();

        let handles: Vec<_> = files
            .iter()
            .cloned()
            .map(|file| {
                let finished = finished.clone();
                thread::spawn(move || relocate(&file, &finished))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(fs::read_dir(&finished).unwrap().count(), 8);
    }

    #[test]
    fn existing_destination_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let finished = temp.path().join("finished");
        fs::create_dir_all(&finished).unwrap();
        fs::write(finished.join("run_out_subtree_1.txt"), "first").unwrap();
        let file = temp.path().join("run_out_subtree_1.txt");
        fs::write(&file, "second").unwrap();

        let err = relocate(&file, &finished).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&file).unwrap(), "second");
        assert_eq!(
            fs::read_to_string(finished.join("run_out_subtree_1.txt")).unwrap(),
            "first"
        );
    }

    #[test]
    fn copy_fallback_moves_contents() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("run_out_subtree_2.txt");
        fs::write(&file, "[Input]\n").unwrap();
        let destination = temp.path().join("copy.txt");

        copy_then_delete(&file, &destination, |source| fs::remove_file(source)).unwrap();

        assert!(!file.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "[Input]\n");
    }

    #[test]
    fn undeletable_source_removes_the_copy() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("run_out_subtree_3.txt");
        fs::write(&file, "[Input]\n").unwrap();
        let destination = temp.path().join("copy.txt");

        let err = copy_then_delete(&file, &destination, |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(file.exists());
        assert!(!destination.exists());
    }
}
