//! Object sink boundary and a local-directory implementation

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Destination for serialized datasets: bytes stored under a key.
pub trait ObjectSink: Send + Sync {
    fn put(&self, key: &str, body: &[u8]) -> io::Result<()>;
}

/// Writes objects as files below a root directory, atomically via tmp→rename
#[derive(Debug, Clone)]
pub struct LocalObjectSink {
    root: PathBuf,
}

impl LocalObjectSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path below the root, rejecting escapes
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid object key: {key:?}"),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectSink for LocalObjectSink {
    fn put(&self, key: &str, body: &[u8]) -> io::Result<()> {
        let final_path = self.resolve(key)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if let Err(e) = write_then_rename(&tmp_path, &final_path, body) {
            // Partial tmp files must not outlive a failed put
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        log::info!("Wrote {} bytes to {}", body.len(), final_path.display());
        Ok(())
    }
}

fn write_then_rename(tmp_path: &Path, final_path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(body)?;
    file.sync_all()?;
    fs::rename(tmp_path, final_path)
}

/// In-memory sink for tests
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::io;
    use std::sync::Mutex;

    use super::ObjectSink;

    #[derive(Default)]
    pub struct MemorySink {
        objects: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn objects(&self) -> Vec<(String, Vec<u8>)> {
            self.objects.lock().unwrap().clone()
        }
    }

    impl ObjectSink for MemorySink {
        fn put(&self, key: &str, body: &[u8]) -> io::Result<()> {
            self.objects
                .lock()
                .unwrap()
                .push((key.to_string(), body.to_vec()));
            Ok(())
        }
    }
}
