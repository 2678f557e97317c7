use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

pub mod api;
pub mod config;
pub mod driver;
pub mod error;
pub mod ffmpeg;
pub mod init;
pub mod poll;
pub mod storyboard;

pub use error::PipelineError;

/// Receives each progress line already tagged, e.g. `[OK] Done: Horror/final_60s.mp4`.
pub type ProgressLogHook = Arc<Mutex<dyn Fn(&str) + Send + Sync + 'static>>;

static LOG_HOOK: Lazy<Mutex<Option<ProgressLogHook>>> = Lazy::new(|| Mutex::new(None));

/// Mirror every progress line to `hook` in addition to stderr. Pass `None` to detach.
///
/// One hook is shared by the whole process; a hook installed while a run is
/// in flight sees only the lines logged after it was set.
pub fn set_log_hook(hook: Option<ProgressLogHook>) {
    if let Ok(mut guard) = LOG_HOOK.lock() {
        *guard = hook;
    }
}

/// Progress lines go to stderr so stdout stays free; the hook gets the same text.
pub(crate) fn logv(tag: &str, message: &str) {
    let line = format!("[{}] {}", tag, message);
    eprintln!("{}", line);

    let Ok(guard) = LOG_HOOK.lock() else {
        return;
    };
    if let Some(callback) = guard.as_ref().and_then(|hook| hook.lock().ok()) {
        callback(&line);
    }
}

/// Step banners and status changes.
pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

/// A step finished.
pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

/// Recoverable trouble, such as a failed remote delete.
pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}
