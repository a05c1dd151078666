//! Loading whole files from disk

use std::path::Path;

use crate::config::{Configuration, Notification};
use crate::element::Element;
use crate::error::LoadError;

/// Read the whole file at `path` into memory and parse it as a `T`
pub fn parse_file<T: Element>(
    path: impl AsRef<Path>,
    configuration: &Configuration,
) -> Result<T, LoadError> {
    parse_file_with(path, configuration, None)
}

/// Like [`parse_file`], forwarding warnings to `notify`
pub fn parse_file_with<T: Element>(
    path: impl AsRef<Path>,
    configuration: &Configuration,
    mut notify: Option<&mut dyn FnMut(&Notification)>,
) -> Result<T, LoadError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {} bytes from {}", data.len(), path.display());

    let mut forward = |notification: &Notification| {
        if let Some(notify) = notify.as_deref_mut() {
            notify(notification);
        }
    };
    Ok(crate::parse(&data, configuration, Some(&mut forward))?)
}
