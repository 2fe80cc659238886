//! Backend selection
//!
//! Picks one strategy at startup; callers only ever see the trait.

use crate::config::Settings;
use crate::error::AppError;
use crate::source::scan::LogScanBackend;
use crate::source::store::StoreBackend;
use crate::source::{BackendKind, BoxedBackend, LogLayout};

pub(crate) fn select_backend(settings: &Settings) -> Result<BoxedBackend, AppError> {
    let backend: BoxedBackend = match settings.backend {
        BackendKind::Scan => Box::new(LogScanBackend::new(LogLayout::from_root(&settings.data_dir))),
        BackendKind::Store => {
            let path = settings
                .store_path
                .clone()
                .ok_or(AppError::StorePathMissing)?;
            Box::new(StoreBackend::new(path))
        }
    };
    tracing::info!(backend = backend.name(), "selected usage backend");
    Ok(backend)
}
