//! Main application struct and eframe integration

use crate::integration::ControllerHandle;
use crate::ui::components::{HistorySidebar, InputBar, MessageList};
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, CentralPanel, RichText, SidePanel, TopBottomPanel};
use std::time::Duration;
use tracing::info;

/// How often to look for controller events while idle
const IDLE_REPAINT: Duration = Duration::from_millis(250);

/// Main interview assistant window
pub struct VoicebotApp {
    state: AppState,
    theme: Theme,
}

impl VoicebotApp {
    pub fn new(cc: &eframe::CreationContext<'_>, handle: ControllerHandle) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        Self {
            state: AppState::with_handle(handle),
            theme,
        }
    }

    /// App around an existing state, leaving the egui style untouched
    pub fn with_state(state: AppState) -> Self {
        Self {
            state,
            theme: Theme::dark(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Draw the whole window; split out of `update` so it can run headless
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.state.poll_events();

        self.show_header(ctx);
        self.show_sidebar(ctx);
        self.show_input_area(ctx);
        self.show_content(ctx);

        if self.state.is_busy() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(IDLE_REPAINT);
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Interview Assistant")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let (status, color) = if self.state.shut_down {
                            ("Session ended", self.theme.error)
                        } else if self.state.listening {
                            ("Listening", self.theme.listening)
                        } else if self.state.reply_pending {
                            ("Thinking", self.theme.warning)
                        } else if self.state.speaking {
                            ("Speaking", self.theme.success)
                        } else {
                            ("Ready", self.theme.text_muted)
                        };
                        ui.label(RichText::new(status).size(13.0).color(color));

                        if !self.state.voice_output_available {
                            ui.label(
                                RichText::new("Text only")
                                    .size(12.0)
                                    .color(self.theme.text_muted),
                            );
                        }
                    });
                });
            });
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        SidePanel::left("history")
            .resizable(true)
            .default_width(220.0)
            .min_width(160.0)
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(self.theme.spacing_sm))
            .show(ctx, |ui| {
                HistorySidebar::new(&mut self.state, &self.theme).show(ui);
            });
    }

    fn show_input_area(&mut self, ctx: &egui::Context) {
        TopBottomPanel::bottom("input_area")
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                InputBar::new(&mut self.state, &self.theme).show(ui);
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.bg_primary).inner_margin(self.theme.spacing))
            .show(ctx, |ui| {
                MessageList::new(&self.state, &self.theme).show(ui);
            });
    }
}

impl eframe::App for VoicebotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // Ends the session: capture and speech stop, the interview is archived
        info!("Window closed, ending session");
        self.state.shutdown();
    }
}
