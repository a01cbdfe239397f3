//! Message list component
//!
//! Displays the live conversation, or an archived interview, as a transcript.

use crate::messages::{Message, Sender};
use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, Align, RichText};

/// Transcript of one conversation
pub struct MessageList<'a> {
    state: &'a AppState,
    theme: &'a Theme,
}

impl<'a> MessageList<'a> {
    pub fn new(state: &'a AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let messages = self.state.displayed_messages();
        let live = !self.state.is_viewing_history();

        egui::ScrollArea::vertical()
            .id_salt("transcript")
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                ui.add_space(self.theme.spacing);

                if messages.is_empty() && live {
                    self.show_empty_state(ui);
                }

                for message in messages {
                    self.show_message(ui, message);
                    ui.add_space(self.theme.spacing_sm);
                }

                if live && self.state.reply_pending {
                    self.show_thinking(ui);
                }

                ui.add_space(self.theme.spacing);
            });
    }

    fn show_empty_state(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(self.theme.spacing_lg * 3.0);
            ui.label(
                RichText::new("Interview the candidate")
                    .size(22.0)
                    .color(self.theme.text_primary),
            );
            ui.add_space(self.theme.spacing_sm);
            ui.label(
                RichText::new("Type a question below or press the microphone to ask it aloud.")
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_message(&self, ui: &mut egui::Ui, message: &Message) {
        match message.sender {
            Sender::System => self.show_status(ui, message),
            Sender::User | Sender::Bot => self.show_bubble(ui, message),
        }
    }

    fn show_status(&self, ui: &mut egui::Ui, message: &Message) {
        ui.vertical_centered(|ui| {
            let response = ui.label(
                RichText::new(&message.text)
                    .size(12.0)
                    .italics()
                    .color(self.theme.text_muted),
            );
            let label = format!("Status: {}", message.text);
            response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label));
        });
    }

    fn show_bubble(&self, ui: &mut egui::Ui, message: &Message) {
        let is_user = message.sender == Sender::User;
        let (align, name, fill, a11y_prefix) = if is_user {
            (Align::RIGHT, "You", self.theme.user_bubble, "User message")
        } else {
            (Align::LEFT, "Candidate", self.theme.bot_bubble, "Bot reply")
        };

        ui.with_layout(egui::Layout::top_down(align), |ui| {
            ui.label(RichText::new(name).size(12.0).color(self.theme.text_muted));
            ui.add_space(2.0);

            let max_width = ui.available_width() * 0.75;
            egui::Frame::none()
                .fill(fill)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    ui.set_max_width(max_width);
                    let response = ui.label(
                        RichText::new(&message.text).color(self.theme.bubble_text(is_user)),
                    );
                    let label = format!("{}: {}", a11y_prefix, message.text);
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                    });
                });

            ui.label(
                RichText::new(message.timestamp.format("%H:%M").to_string())
                    .size(10.0)
                    .color(self.theme.text_muted),
            );
        });
    }

    fn show_thinking(&self, ui: &mut egui::Ui) {
        ui.with_layout(egui::Layout::top_down(Align::LEFT), |ui| {
            egui::Frame::none()
                .fill(self.theme.bot_bubble)
                .rounding(self.theme.bubble_rounding)
                .inner_margin(egui::Margin::symmetric(12.0, 8.0))
                .show(ui, |ui| {
                    let t = ui.ctx().input(|i| i.time);
                    let alpha = ((t * 3.0).sin() * 0.35 + 0.65) as f32;
                    let response = ui.label(
                        RichText::new("Thinking...")
                            .italics()
                            .color(self.theme.text_muted.gamma_multiply(alpha)),
                    );
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Bot is thinking")
                    });
                });
        });

        ui.ctx().request_repaint();
    }
}
