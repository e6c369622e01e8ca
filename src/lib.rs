//! Shotpad: screenshot capture, annotation, and a local image history.

pub mod app;
pub mod capture;
pub mod clipboard;
mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod handoff;
pub mod history;
pub mod logging;
pub mod notification;
pub mod raster;
pub mod render;
pub mod state;
pub mod storage;

pub use error::{AppError, AppResult};

/// Boots the coordinator on the default file-backed stores; thin binaries
/// call this and exit on error.
pub fn run() -> AppResult<()> {
    logging::init();
    tracing::info!("starting shotpad");

    let mut app = app::App::with_default_backends()?;
    app.start()?;

    tracing::info!("startup complete with state={:?}", app.state());
    Ok(())
}
