pub mod mocks;

#[allow(unused_imports)]
pub use mocks::CountingBackend;

use vignette_storage::FilesystemBackend;

/// Filesystem backend rooted in a fresh temp dir. Keep the guard alive for the test.
#[allow(dead_code)]
pub async fn filesystem_backend() -> (FilesystemBackend, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let backend = FilesystemBackend::new(dir.path()).await.unwrap();
    (backend, dir)
}
