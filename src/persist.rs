//! Writing issued certificates and keys to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cert::IssuedCertificate;
use crate::error::{CertgenError, Result};
use crate::key::KeyPair;

/// Mode of certificate files.
pub const CERT_FILE_MODE: u32 = 0o644;
/// Mode of private key files.
pub const KEY_FILE_MODE: u32 = 0o600;

/// The two PEM documents produced by one issuance.
pub struct Artifact {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl Artifact {
    pub fn new(issued: &IssuedCertificate, key: &KeyPair) -> Result<Self> {
        Ok(Self {
            certificate_pem: issued.to_pem(),
            private_key_pem: key.to_pkcs8_pem()?,
        })
    }
}

/// Paths an [`Artifact`] was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

/// Makes sure `dir` exists, is a directory and accepts new files.
///
/// Missing directories are created with their parents. Writability is probed
/// with a uniquely named temporary file, so concurrent checks of the same
/// directory do not trip over each other.
pub fn ensure_writable_directory(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(CertgenError::io(
                dir,
                std::io::Error::other("path exists but is not a directory"),
            ));
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|e| CertgenError::io(dir, e))?;
            tracing::debug!(dir = %dir.display(), "created output directory");
        }
        Err(e) => return Err(CertgenError::io(dir, e)),
    }

    let probe = tempfile::Builder::new()
        .prefix(".certgen-probe")
        .tempfile_in(dir)
        .map_err(|e| CertgenError::io(dir, e))?;
    probe.close().map_err(|e| CertgenError::io(dir, e))
}

/// Writes `<stem>.crt` (0644) and `<stem>.key` (0600) into `dir`.
///
/// Both writes run concurrently and are joined before returning. If either
/// fails the call fails; a file that was written is left in place.
pub fn write_artifacts(dir: &Path, stem: &str, artifact: &Artifact) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths {
        certificate: dir.join(format!("{stem}.crt")),
        private_key: dir.join(format!("{stem}.key")),
    };

    let (cert_result, key_result) = std::thread::scope(|scope| {
        let cert = scope.spawn(|| {
            write_file(
                &paths.certificate,
                artifact.certificate_pem.as_bytes(),
                CERT_FILE_MODE,
            )
        });
        let key = scope.spawn(|| {
            write_file(
                &paths.private_key,
                artifact.private_key_pem.as_bytes(),
                KEY_FILE_MODE,
            )
        });
        (join(cert), join(key))
    });
    cert_result?;
    key_result?;

    tracing::info!(
        cert = %paths.certificate.display(),
        key = %paths.private_key.display(),
        "saved certificate and private key"
    );
    Ok(paths)
}

fn join(handle: std::thread::ScopedJoinHandle<'_, Result<()>>) -> Result<()> {
    handle.join().unwrap_or_else(|_| {
        Err(CertgenError::io(
            "",
            std::io::Error::other("writer thread panicked"),
        ))
    })
}

/// Writes a certificate PEM with mode 0644.
pub fn write_certificate(path: &Path, pem: &str) -> Result<()> {
    write_file(path, pem.as_bytes(), CERT_FILE_MODE)?;
    tracing::info!(cert = %path.display(), "saved certificate");
    Ok(())
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let mut file = create_file_with_mode(path, mode).map_err(|e| CertgenError::io(path, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| CertgenError::io(path, e))
}

fn create_file_with_mode(path: &Path, mode: u32) -> std::io::Result<fs::File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(mode)
            .open(path)?;
        // An existing file keeps its old mode on open.
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        Ok(file)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
    }
}
