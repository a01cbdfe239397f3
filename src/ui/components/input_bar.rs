//! Input bar component
//!
//! Microphone, text input, send and stop controls.

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Key, RichText, Vec2};

/// Input bar for typed and spoken questions
pub struct InputBar<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> InputBar<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        if let Some(notice) = &self.state.notice {
            ui.label(
                RichText::new(notice)
                    .size(12.0)
                    .color(self.theme.warning),
            );
            ui.add_space(self.theme.spacing_sm / 2.0);
        }

        egui::Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    self.show_mic_button(ui);
                    self.show_text_input(ui);
                    self.show_send_button(ui);
                    self.show_stop_button(ui);
                });
            });
    }

    fn show_mic_button(&mut self, ui: &mut egui::Ui) {
        let available = self.state.voice_input_available;
        let listening = self.state.listening;

        let (icon, color) = if listening {
            ("🎙", self.theme.listening)
        } else {
            ("🎤", self.theme.text_secondary)
        };

        let mut button = egui::Button::new(RichText::new(icon).size(20.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);
        if listening {
            button = button.fill(self.theme.listening.gamma_multiply(0.2));
        }

        let enabled = available && !listening;
        let response = ui.add_enabled(enabled, button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, "Start listening")
        });

        let clicked = response.clicked();
        let tooltip = match (available, listening) {
            (false, _) => "Voice input is not available",
            (true, true) => "Listening...",
            (true, false) => "Ask by voice",
        };
        response.on_hover_text(tooltip).on_disabled_hover_text(tooltip);

        if clicked {
            self.state.start_listening();
        }

        if listening {
            ui.ctx().request_repaint();
        }
    }

    fn show_text_input(&mut self, ui: &mut egui::Ui) {
        let enabled = !self.state.listening;

        // Leave room for the send and stop buttons
        let width = (ui.available_width() - 2.0 * (40.0 + self.theme.spacing_sm)).max(80.0);

        let hint = if self.state.is_viewing_history() {
            "Type to return to the current interview..."
        } else {
            "Ask the candidate a question..."
        };

        let text_edit = egui::TextEdit::singleline(&mut self.state.input_text)
            .id(egui::Id::new("message_input"))
            .hint_text(hint)
            .desired_width(width)
            .font(egui::TextStyle::Body)
            .margin(egui::Margin::symmetric(12.0, 8.0));

        let response = ui.add_enabled(enabled, text_edit);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::TextEdit, enabled, "Message input")
        });

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            self.state.send_message();
            response.request_focus();
        }
    }

    fn show_send_button(&mut self, ui: &mut egui::Ui) {
        let can_send = !self.state.input_text.trim().is_empty()
            && !self.state.reply_pending
            && !self.state.listening;

        let fill = if can_send {
            self.theme.primary
        } else {
            self.theme.bg_tertiary
        };

        let button = egui::Button::new(RichText::new("➤").size(18.0).color(egui::Color32::WHITE))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding)
            .fill(fill);

        let response = ui.add_enabled(can_send, button);
        response.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, can_send, "Send message")
        });

        if response.clicked() {
            self.state.send_message();
        }
        response.on_hover_text("Send (Enter)");
    }

    fn show_stop_button(&mut self, ui: &mut egui::Ui) {
        let busy = self.state.is_busy();

        let color = if busy {
            self.theme.error
        } else {
            self.theme.text_muted
        };
        let button = egui::Button::new(RichText::new("⏹").size(18.0).color(color))
            .min_size(Vec2::splat(40.0))
            .rounding(self.theme.button_rounding);

        let response = ui.add_enabled(busy, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, busy, "Stop"));

        if response.clicked() {
            self.state.stop();
        }
        response.on_hover_text("Interrupt capture and speech");
    }
}
