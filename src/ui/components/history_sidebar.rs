//! Sidebar listing past interviews

use crate::ui::state::AppState;
use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct HistorySidebar<'a> {
    state: &'a mut AppState,
    theme: &'a Theme,
}

impl<'a> HistorySidebar<'a> {
    pub fn new(state: &'a mut AppState, theme: &'a Theme) -> Self {
        Self { state, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        ui.label(
            RichText::new("Interviews")
                .size(16.0)
                .strong()
                .color(self.theme.text_primary),
        );
        ui.add_space(self.theme.spacing_sm);

        let new_interview = ui.add_sized(
            [ui.available_width(), 32.0],
            egui::Button::new("New interview").rounding(self.theme.button_rounding),
        );
        new_interview.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "New interview")
        });
        if new_interview.clicked() {
            self.state.new_interview();
        }

        ui.add_space(self.theme.spacing_sm);
        ui.separator();

        let mut selection = self.state.selected_history;

        let current = ui.selectable_label(selection.is_none(), "Current interview");
        current.widget_info(|| {
            egui::WidgetInfo::labeled(egui::WidgetType::SelectableLabel, true, "Current interview")
        });
        if current.clicked() {
            selection = None;
        }

        egui::ScrollArea::vertical()
            .id_salt("history")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if self.state.history.is_empty() {
                    ui.label(
                        RichText::new("Finished interviews appear here.")
                            .size(12.0)
                            .color(self.theme.text_muted),
                    );
                }

                // Newest first
                for conversation in self.state.history.iter().rev() {
                    let title = conversation.title();
                    let selected = selection == Some(conversation.id);
                    let response = ui.selectable_label(selected, &title);
                    let label = format!("Interview: {}", title);
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::SelectableLabel, true, &label)
                    });
                    if response.clicked() {
                        selection = Some(conversation.id);
                    }
                }
            });

        if selection != self.state.selected_history {
            self.state.select_history(selection);
        }
    }
}
