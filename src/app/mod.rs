//! Application coordinator wiring capture, handoff, editing, and history.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::capture::{CaptureArtifact, ScreenshotBackend};
use crate::clipboard::ClipboardBackend;
use crate::config;
use crate::editor::EditorSession;
use crate::error::{AppError, AppResult};
use crate::geometry::PixelSize;
use crate::handoff::{HandoffChannel, HandoffPayload};
use crate::history::{self, HistoryRecord, HistorySort, HistoryStore, NewHistoryRecord};
use crate::notification;
use crate::raster;
use crate::render::SoftwareRenderer;
use crate::state::{AppEvent, AppState, StateMachine};
use crate::storage::{DownloadSink, JsonFileStore, KeyValueStore};

/// Ties a capture request to the moment it was issued; results delivered
/// after a newer request are dropped instead of reopening the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTicket {
    generation: u64,
}

pub struct App<S: KeyValueStore> {
    state: StateMachine,
    history: HistoryStore<S>,
    handoff: HandoffChannel<S>,
    downloads: DownloadSink,
    renderer: SoftwareRenderer,
    canvas_bounds: PixelSize,
    capture_generation: u64,
}

impl App<JsonFileStore> {
    pub fn with_default_backends() -> AppResult<Self> {
        let config = config::load_app_config();
        let store = match &config.data_dir {
            Some(dir) => JsonFileStore::with_root(dir.clone()),
            None => JsonFileStore::with_default_root()?,
        };
        let downloads = match &config.pictures_dir {
            Some(dir) => DownloadSink::with_dir(dir.clone()),
            None => DownloadSink::with_default_dir()?,
        };
        Ok(Self::with_backends(store, downloads, config.canvas_bounds()))
    }
}

impl<S: KeyValueStore + Clone> App<S> {
    pub fn with_backends(store: S, downloads: DownloadSink, canvas_bounds: PixelSize) -> Self {
        Self {
            state: StateMachine::new(),
            history: HistoryStore::new(store.clone()),
            handoff: HandoffChannel::new(store),
            downloads,
            renderer: SoftwareRenderer::new(),
            canvas_bounds,
            capture_generation: 0,
        }
    }

    pub fn start(&mut self) -> AppResult<AppState> {
        Ok(self.state.transition(AppEvent::Start)?)
    }

    pub fn state(&self) -> AppState {
        self.state.state()
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Validates an uploaded image and stages it for the editor.
    pub fn upload_image(&mut self, file_name: &str, bytes: &[u8]) -> AppResult<()> {
        let image = notify_err(
            raster::decode_image_bytes(bytes),
            "could not load the selected image",
        )?;
        let data_url = notify_err(
            raster::data_url_from_bytes(bytes),
            "could not load the selected image",
        )?;
        notify_err(
            self.handoff.stash(&HandoffPayload {
                image_data: data_url,
                file_name: file_name.to_string(),
                timestamp: epoch_millis(),
            }),
            "opening the editor failed",
        )?;
        self.state.transition(AppEvent::OpenEditor)?;

        tracing::info!(
            file_name,
            width = image.width(),
            height = image.height(),
            "staged uploaded image for editing"
        );
        Ok(())
    }

    pub fn begin_screenshot(&mut self) -> CaptureTicket {
        self.capture_generation += 1;
        CaptureTicket {
            generation: self.capture_generation,
        }
    }

    /// Stages a finished capture. Returns `Ok(false)` when the ticket no
    /// longer matches the newest capture request.
    pub fn finish_screenshot(
        &mut self,
        ticket: CaptureTicket,
        artifact: CaptureArtifact,
    ) -> AppResult<bool> {
        if ticket.generation != self.capture_generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.capture_generation,
                "dropping stale capture result"
            );
            return Ok(false);
        }
        notify_err(
            self.handoff.stash(&HandoffPayload {
                image_data: artifact.data_url,
                file_name: artifact.file_name,
                timestamp: artifact.created_at,
            }),
            "opening the editor failed",
        )?;
        self.state.transition(AppEvent::OpenEditor)?;
        Ok(true)
    }

    pub fn take_screenshot<B: ScreenshotBackend>(&mut self, backend: &B) -> AppResult<bool> {
        let ticket = self.begin_screenshot();
        let artifact = notify_err(backend.capture(), "screenshot capture failed")?;
        self.finish_screenshot(ticket, artifact)
    }

    /// Consumes the staged handoff, if any, and opens an editing session.
    pub fn open_editor_session(&mut self) -> AppResult<Option<EditorSession>> {
        let Some(payload) = self.handoff.take() else {
            return Ok(None);
        };
        let session = notify_err(
            EditorSession::from_data_url(
                &payload.image_data,
                Some(payload.file_name),
                self.canvas_bounds,
            ),
            "could not load the selected image",
        )?;
        Ok(Some(session))
    }

    pub fn close_editor(&mut self) -> AppResult<()> {
        self.state.transition(AppEvent::CloseEditor)?;
        Ok(())
    }

    pub fn open_history(&mut self) -> AppResult<Vec<HistoryRecord>> {
        self.state.transition(AppEvent::OpenHistory)?;
        Ok(self.history.list())
    }

    pub fn close_history(&mut self) -> AppResult<()> {
        self.state.transition(AppEvent::CloseHistory)?;
        Ok(())
    }

    pub fn gallery(&self, term: &str, sort: HistorySort) -> Vec<HistoryRecord> {
        history::query_records(&self.history.list(), term, sort)
    }

    /// Stages a stored record for another editing pass. Returns `Ok(false)`
    /// when the record no longer exists.
    pub fn reedit_record(&mut self, id: &str) -> AppResult<bool> {
        let Some(record) = self.history.get(id) else {
            tracing::warn!(id, "history record missing; cannot re-edit");
            return Ok(false);
        };
        notify_err(
            self.handoff.stash(&HandoffPayload {
                image_data: record.data_url,
                file_name: record.name,
                timestamp: epoch_millis(),
            }),
            "opening the editor failed",
        )?;
        self.state.transition(AppEvent::OpenEditor)?;
        Ok(true)
    }

    pub fn save_export(&self, session: &EditorSession) -> AppResult<HistoryRecord> {
        let data_url = notify_err(
            session.export_data_url(&self.renderer),
            "exporting the image failed",
        )?;
        let record = notify_err(
            self.history.save(NewHistoryRecord {
                name: session.export_file_name(),
                data_url,
                dimensions: session.native_size(),
            }),
            "saving to history failed",
        )?;
        notification::send("image saved to history");
        Ok(record)
    }

    pub fn download_export(&self, session: &EditorSession) -> AppResult<PathBuf> {
        let png = notify_err(
            session.export_raster(&self.renderer),
            "exporting the image failed",
        )?;
        let path = notify_err(
            self.downloads.write_png(&session.export_file_name(), &png),
            "download failed",
        )?;
        notification::send("image downloaded");
        Ok(path)
    }

    /// Writes a stored record straight to the downloads directory.
    pub fn download_record(&self, id: &str) -> AppResult<Option<PathBuf>> {
        let Some(record) = self.history.get(id) else {
            return Ok(None);
        };
        let bytes = notify_err(raster::data_url_payload(&record.data_url), "download failed")?;
        let path = notify_err(
            self.downloads.write_png(&record.name, &bytes),
            "download failed",
        )?;
        Ok(Some(path))
    }

    pub fn copy_export<C: ClipboardBackend>(
        &self,
        session: &EditorSession,
        clipboard: &C,
    ) -> AppResult<bool> {
        let copied = notify_err(
            session.copy_to_clipboard(&self.renderer, clipboard),
            "copying the image failed",
        )?;
        if copied {
            notification::send("image copied to clipboard");
        } else {
            notification::send("clipboard is not available on this host");
        }
        Ok(copied)
    }

    pub fn delete_record(&self, id: &str) -> AppResult<()> {
        notify_err(self.history.delete(id), "deleting the image failed")?;
        Ok(())
    }
}

/// Sends a failure notice before handing the error back to the caller.
fn notify_err<T, E: Into<AppError>>(result: Result<T, E>, notice: &str) -> AppResult<T> {
    result.map_err(|err| {
        notification::send(notice);
        err.into()
    })
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
