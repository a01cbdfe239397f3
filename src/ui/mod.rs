//! GUI implementation with egui/eframe
//!
//! The window mirrors the controller's state and forwards user actions to it.

mod app;
mod components;
mod state;
mod theme;

pub use app::VoicebotApp;
pub use components::{HistorySidebar, InputBar, MessageList};
pub use state::{AppState, WAIT_FOR_REPLY};
pub use theme::Theme;

use crate::integration::ControllerHandle;

/// Run the interview assistant window until it is closed
pub fn run(handle: ControllerHandle) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("Interview Assistant"),
        ..Default::default()
    };

    eframe::run_native(
        "Voicebot",
        options,
        Box::new(|cc| Ok(Box::new(VoicebotApp::new(cc, handle)))),
    )
}
