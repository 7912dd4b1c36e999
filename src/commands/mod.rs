pub mod coach;
pub mod export;
pub mod plans;
pub mod settings;
pub mod stats;
pub mod trades;

pub use coach::*;
pub use export::*;
pub use plans::*;
pub use settings::*;
pub use stats::*;
pub use trades::*;

use tauri::AppHandle;

use crate::error::JournalError;

/// Show a desktop notification for a failed command and return the error text.
/// Validation errors are returned without a notification; the form shows them.
pub(crate) fn notify_failure(app: &AppHandle, title: &str, err: JournalError) -> String {
    use tauri_plugin_notification::NotificationExt;

    if err.is_user_input() {
        log::warn!("{}: {}", title, err);
        return err.to_string();
    }

    log::error!("{}: {}", title, err);
    if let Err(e) = app
        .notification()
        .builder()
        .title(title)
        .body(err.user_message())
        .show()
    {
        log::warn!("Failed to send notification: {}", e);
    }
    err.to_string()
}
