// ============================================================
// Layer 4 — Dataset Download
// ============================================================
// Fetches the CIFAR-10 binary archive and unpacks it.
// The archive is streamed straight through gunzip and untar
// into a staging directory next to the destination:
//
//   dest/.cifar-download.partial/cifar-10-batches-bin/...
//        │  archive fully unpacked
//        ▼  rename
//   dest/cifar-10-batches-bin/...
//
// The batches directory only appears once every file is on
// disk; a failed or interrupted download leaves nothing behind
// that the loader would mistake for a complete dataset.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::{fs, io::Read, path::Path};

pub const ARCHIVE_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";

const STAGING_DIR: &str = ".cifar-download.partial";

/// Download `url` and install its `top_dir` into `dest`.
pub fn fetch_and_unpack(url: &str, dest: &Path, top_dir: &str) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Cannot create '{}'", dest.display()))?;

    tracing::info!("Downloading CIFAR-10 from {url}");

    // The archive is ~160 MB, well past reqwest's default timeout
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request to {url} failed"))?
        .error_for_status()?;

    install(response, dest, top_dir)?;
    tracing::info!("CIFAR-10 extracted to '{}'", dest.join(top_dir).display());
    Ok(())
}

/// Unpack a .tar.gz stream into a staging directory, then move
/// its `top_dir` to `dest/top_dir`. The staging directory is
/// removed whether or not this succeeds.
pub fn install<R: Read>(reader: R, dest: &Path, top_dir: &str) -> Result<()> {
    let staging = dest.join(STAGING_DIR);
    // Leftovers of an earlier interrupted run
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("Cannot clear '{}'", staging.display()))?;
    }

    let result = unpack(reader, &staging).and_then(|()| {
        let unpacked = staging.join(top_dir);
        if !unpacked.is_dir() {
            bail!("archive has no '{top_dir}' directory");
        }
        let target = dest.join(top_dir);
        fs::rename(&unpacked, &target)
            .with_context(|| format!("Cannot move dataset into '{}'", target.display()))
    });

    if let Err(e) = fs::remove_dir_all(&staging) {
        tracing::warn!("Could not remove '{}': {e}", staging.display());
    }
    result
}

/// Unpack a gzip-compressed tar stream into `dest`.
fn unpack<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive
        .unpack(dest)
        .with_context(|| format!("Cannot unpack archive into '{}'", dest.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::path::PathBuf;

    const TOP: &str = "cifar-10-batches-bin";

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("cifar-bench-download-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        for (path, payload) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(payload.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *payload).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_install_moves_top_dir_into_place() {
        let dest = scratch("install");
        let gz = archive(&[
            ("cifar-10-batches-bin/test_batch.bin", b"batch bytes"),
            ("cifar-10-batches-bin/batches.meta.txt", b"airplane"),
        ]);

        install(gz.as_slice(), &dest, TOP).unwrap();

        let written = fs::read(dest.join(TOP).join("test_batch.bin")).unwrap();
        assert_eq!(written, b"batch bytes");
        assert!(!dest.join(STAGING_DIR).exists());

        fs::remove_dir_all(&dest).ok();
    }

    #[test]
    fn test_garbage_leaves_nothing_behind() {
        let dest = scratch("garbage");
        assert!(install(&b"definitely not gzip"[..], &dest, TOP).is_err());
        assert!(!dest.join(TOP).exists());
        assert!(!dest.join(STAGING_DIR).exists());
        fs::remove_dir_all(&dest).ok();
    }

    #[test]
    fn test_truncated_archive_is_not_installed() {
        let dest = scratch("truncated");
        let gz = archive(&[
            ("cifar-10-batches-bin/data_batch_1.bin", &[7u8; 4096]),
            ("cifar-10-batches-bin/data_batch_2.bin", &[8u8; 4096]),
        ]);
        let cut = &gz[..gz.len() / 2];

        assert!(install(cut, &dest, TOP).is_err());
        assert!(!dest.join(TOP).exists());
        assert!(!dest.join(STAGING_DIR).exists());
        fs::remove_dir_all(&dest).ok();
    }

    #[test]
    fn test_archive_without_top_dir_is_rejected() {
        let dest = scratch("no-top");
        let gz = archive(&[("something-else/file.bin", b"x")]);

        let err = install(gz.as_slice(), &dest, TOP).unwrap_err().to_string();
        assert!(err.contains(TOP));
        assert!(!dest.join(TOP).exists());
        assert!(!dest.join(STAGING_DIR).exists());
        fs::remove_dir_all(&dest).ok();
    }

    #[test]
    fn test_stale_staging_dir_is_replaced() {
        let dest = scratch("stale");
        fs::create_dir_all(dest.join(STAGING_DIR).join(TOP)).unwrap();
        fs::write(dest.join(STAGING_DIR).join(TOP).join("old.bin"), b"old").unwrap();

        let gz = archive(&[("cifar-10-batches-bin/test_batch.bin", b"new")]);
        install(gz.as_slice(), &dest, TOP).unwrap();

        assert!(dest.join(TOP).join("test_batch.bin").exists());
        assert!(!dest.join(TOP).join("old.bin").exists());
        fs::remove_dir_all(&dest).ok();
    }
}
