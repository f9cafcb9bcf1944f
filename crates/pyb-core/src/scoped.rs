use std::io;
use std::path::Path;

use tracing::warn;

/// Runs `f` with a fresh temporary directory that is removed before returning.
///
/// The directory is closed explicitly on both the success and the error path;
/// dropping the `TempDir` covers unwinding.
pub fn with_temporary_directory<T, E, F>(prefix: &str, f: F) -> Result<T, E>
where
    E: From<io::Error>,
    F: FnOnce(&Path) -> Result<T, E>,
{
    let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
    let result = f(dir.path());
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        warn!(path = %path.display(), %err, "failed to remove temporary directory");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn directory_is_removed_after_success() {
        let seen = RefCell::new(None::<PathBuf>);
        let value = with_temporary_directory::<_, io::Error, _>("pyb-test-", |dir| {
            fs::write(dir.join("artifact.whl"), b"wheel")?;
            *seen.borrow_mut() = Some(dir.to_path_buf());
            Ok(42)
        })
        .unwrap();
        assert_eq!(value, 42);
        let dir = seen.into_inner().expect("closure ran");
        assert!(!dir.exists());
    }

    #[test]
    fn directory_is_removed_after_failure() {
        let mut seen = None;
        let result: Result<(), io::Error> = with_temporary_directory("pyb-test-", |dir| {
            fs::create_dir_all(dir.join("nested"))?;
            seen = Some(dir.to_path_buf());
            Err(io::Error::new(io::ErrorKind::Other, "build failed"))
        });
        assert_eq!(result.unwrap_err().to_string(), "build failed");
        let dir = seen.expect("closure ran");
        assert!(!dir.exists());
    }
}
