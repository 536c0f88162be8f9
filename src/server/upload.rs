//! Uploaded packages.

use crate::{error::ErrorKind, utils::print_warning};
use anyhow::{bail, Context, Result};
use bytes::Buf;
use futures::{pin_mut, TryStreamExt};
use log::debug;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;
use warp::multipart::FormData;

/// Name of the form field with the package.
pub const UPLOAD_FIELD: &str = "apk";

/// Package uploaded through the web form.
///
/// The package is stored with a unique name in the uploads folder, and the file is removed when
/// the upload is dropped, whatever the outcome of the analysis was.
#[derive(Debug)]
pub struct Upload {
    path: PathBuf,
    file_name: String,
}

impl Upload {
    /// Receives the package in the given form, storing it in the given folder.
    ///
    /// Fails without storing anything if the form has no package or if the uploaded file does
    /// not have an `.apk` extension.
    pub async fn receive<P: AsRef<Path>>(form: FormData, folder: P) -> Result<Self> {
        let folder = folder.as_ref();
        pin_mut!(form);

        while let Some(part) = form
            .try_next()
            .await
            .context("could not read the uploaded form")?
        {
            if part.name() != UPLOAD_FIELD {
                continue;
            }

            let file_name = part.filename().unwrap_or_default().to_owned();
            if !has_apk_extension(&file_name) {
                bail!(ErrorKind::InvalidUpload {
                    message: format!("`{}` is not an .apk file", file_name),
                });
            }

            tokio::fs::create_dir_all(folder).await.with_context(|| {
                format!("could not create the uploads folder {}", folder.display())
            })?;

            // The guard exists before the first byte is written, so partial files are removed.
            let upload = Self {
                path: folder.join(format!("{}.apk", Uuid::new_v4())),
                file_name,
            };
            let mut file = File::create(&upload.path)
                .await
                .with_context(|| format!("could not create {}", upload.path.display()))?;

            let stream = part.stream();
            pin_mut!(stream);
            while let Some(mut buf) = stream
                .try_next()
                .await
                .context("could not receive the uploaded package")?
            {
                while buf.has_remaining() {
                    let chunk = buf.chunk();
                    let len = chunk.len();
                    file.write_all(chunk)
                        .await
                        .with_context(|| format!("could not write {}", upload.path.display()))?;
                    buf.advance(len);
                }
            }
            file.flush()
                .await
                .with_context(|| format!("could not write {}", upload.path.display()))?;

            debug!(
                "received {} as {}",
                upload.file_name,
                upload.path.display()
            );
            return Ok(upload);
        }

        bail!(ErrorKind::InvalidUpload {
            message: format!("the form has no `{}` file", UPLOAD_FIELD),
        })
    }

    /// Gets the path of the stored package.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the name of the file as uploaded by the user.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed {}", self.path.display()),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => print_warning(format!(
                "could not remove the uploaded package {}: {}",
                self.path.display(),
                e
            )),
        }
    }
}

/// Checks if the file name has an `.apk` extension, ignoring case.
pub fn has_apk_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("apk"))
        && Path::new(file_name).file_stem().is_some()
}
