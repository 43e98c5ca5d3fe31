// File picker module
// Asks the desktop's native file dialog for a path, optionally on a background thread

use crate::collection::IMAGE_EXTENSIONS;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

const IMAGE_FILTER_NAME: &str = "Image Files";

/// Source of user-chosen paths; `None` means the user cancelled
pub trait FilePicker: Send + Sync {
    fn pick_file(&self) -> Option<PathBuf>;
    fn pick_folder(&self) -> Option<PathBuf>;
}

/// What a pick is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    File,
    Folder,
}

/// Whether the menu waits for the dialog or polls it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickMode {
    #[default]
    Blocking,
    Background,
}

/// Native open dialog through rfd
///
/// A cancelled dialog is final: no other dialog is tried afterwards.
#[derive(Debug, Default)]
pub struct DialogPicker;

impl DialogPicker {
    fn file_dialog() -> rfd::FileDialog {
        let dialog = rfd::FileDialog::new().set_title("Open Image File");
        match home_dir() {
            Some(home) => dialog.set_directory(home),
            None => dialog,
        }
    }
}

impl FilePicker for DialogPicker {
    fn pick_file(&self) -> Option<PathBuf> {
        let picked = Self::file_dialog()
            .add_filter(IMAGE_FILTER_NAME, IMAGE_EXTENSIONS)
            .pick_file();
        debug!("File dialog returned {:?}", picked);
        picked
    }

    fn pick_folder(&self) -> Option<PathBuf> {
        let picked = Self::file_dialog().set_title("Open Folder").pick_folder();
        debug!("Folder dialog returned {:?}", picked);
        picked
    }
}

/// Directory the dialog opens in
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// A pick running on a background thread
///
/// The result is handed over through a channel and can be taken exactly once.
pub struct PendingPick {
    kind: PickKind,
    receiver: Receiver<Option<PathBuf>>,
}

impl PendingPick {
    pub fn spawn(picker: Arc<dyn FilePicker>, kind: PickKind) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = match kind {
                PickKind::File => picker.pick_file(),
                PickKind::Folder => picker.pick_folder(),
            };
            // The receiver may already be gone if the viewer exited
            let _ = tx.send(result);
        });
        info!("Started background {:?} pick", kind);
        Self { kind, receiver: rx }
    }

    pub fn kind(&self) -> PickKind {
        self.kind
    }

    /// Non-blocking check; `Some` once the dialog has finished
    pub fn poll(&self) -> Option<Option<PathBuf>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Background {:?} pick ended without a result", self.kind);
                Some(None)
            }
        }
    }

    /// Block until the dialog has finished
    pub fn wait(self) -> Option<PathBuf> {
        self.receiver.recv().unwrap_or(None)
    }
}
