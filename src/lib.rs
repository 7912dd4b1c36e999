pub mod coach;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod plans;
pub mod repository;
pub mod stats;
pub mod validation;

#[cfg(feature = "desktop")]
mod commands;

pub use config::{AppConfig, AppState};
pub use error::{JournalError, JournalResult};

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::Manager;

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_fs::init())
        .setup(|app| {
            let app_dir = app.path().app_data_dir()?;

            let state = match AppState::initialize(&app_dir) {
                Ok(state) => state,
                Err(e) => {
                    log::error!("Startup failed: {:#}", e);
                    log::error!(
                        "Database backups are kept in {}; restore the newest one over {} to recover",
                        app_dir.join("backups").display(),
                        config::DATABASE_FILE
                    );
                    return Err(e.into());
                }
            };

            commands::spawn_stats_forwarder(app.handle().clone(), &state);
            if let Err(e) = state.stats.refresh() {
                log::warn!("Initial stats refresh failed: {}", e);
            }
            app.manage(state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_settings,
            commands::update_settings,
            commands::get_trades,
            commands::get_trade,
            commands::create_trade,
            commands::update_trade,
            commands::delete_trade,
            commands::get_plan_by_date,
            commands::list_plans,
            commands::save_plan,
            commands::update_plan,
            commands::delete_plan,
            commands::get_stats_view,
            commands::refresh_stats,
            commands::set_stats_date_range,
            commands::set_stats_symbol,
            commands::set_stats_setup_type,
            commands::set_stats_asset_type,
            commands::compute_statistics,
            commands::export_trades_csv,
            commands::export_statistics_csv,
            commands::export_statistics_pdf,
            commands::export_all_data,
            commands::import_all_data,
            commands::save_coach_api_key,
            commands::delete_coach_api_key,
            commands::has_coach_api_key,
            commands::generate_coaching,
            commands::get_coaching_notes,
        ])
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { .. } = event {
                window.state::<AppState>().stats.close();
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
