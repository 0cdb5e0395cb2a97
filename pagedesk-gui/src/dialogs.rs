use std::path::PathBuf;

use eframe::egui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    fn title(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Notice",
        }
    }
}

/// Blocking notification with a single OK button.
pub struct NoticeDialog {
    severity: Severity,
    message: String,
}

impl NoticeDialog {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    /// Returns true when the dialog was dismissed.
    pub fn show(&self, ctx: &egui::Context) -> bool {
        let mut dismissed = false;
        egui::Window::new(self.severity.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&self.message);
                ui.add_space(12.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });
        dismissed
    }
}

/// Yes/no confirmation before deleting a page.
pub struct ConfirmDeleteDialog {
    pub page: usize,
}

pub enum ConfirmOutcome {
    Pending,
    Confirmed,
    Cancelled,
}

impl ConfirmDeleteDialog {
    pub fn show(&self, ctx: &egui::Context) -> ConfirmOutcome {
        let mut outcome = ConfirmOutcome::Pending;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Delete page {}?", self.page + 1));
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        outcome = ConfirmOutcome::Cancelled;
                    }
                    if ui.button("Delete").clicked() {
                        outcome = ConfirmOutcome::Confirmed;
                    }
                });
            });
        outcome
    }
}

/// Merge tool: an ordered list of source files plus reorder controls.
#[derive(Default)]
pub struct MergeDialog {
    files: Vec<PathBuf>,
    selected: Option<usize>,
}

pub enum MergeOutcome {
    Pending,
    Closed,
    /// The user confirmed the list; the caller picks the destination.
    Merge(Vec<PathBuf>),
}

impl MergeDialog {
    pub fn show(&mut self, ctx: &egui::Context) -> MergeOutcome {
        let mut outcome = MergeOutcome::Pending;
        let mut open = true;

        egui::Window::new("Merge PDFs")
            .collapsible(false)
            .resizable(true)
            .default_size([520.0, 320.0])
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        egui::ScrollArea::vertical()
                            .auto_shrink([false, true])
                            .max_height(220.0)
                            .show(ui, |ui| {
                                ui.set_min_width(320.0);
                                for (index, file) in self.files.iter().enumerate() {
                                    let name = file
                                        .file_name()
                                        .map(|name| name.to_string_lossy().into_owned())
                                        .unwrap_or_else(|| file.display().to_string());
                                    if ui
                                        .selectable_label(self.selected == Some(index), name)
                                        .clicked()
                                    {
                                        self.selected = Some(index);
                                    }
                                }
                                if self.files.is_empty() {
                                    ui.weak("Add at least two PDF files to merge");
                                }
                            });
                    });

                    ui.vertical(|ui| {
                        if ui.button("Add Files").clicked() {
                            let picked = rfd::FileDialog::new()
                                .add_filter("PDF Files", &["pdf"])
                                .pick_files();
                            if let Some(paths) = picked {
                                self.files.extend(paths);
                            }
                        }
                        if ui.button("Remove").clicked() {
                            if let Some(index) = self.selected {
                                if index < self.files.len() {
                                    self.files.remove(index);
                                }
                                self.selected = None;
                            }
                        }
                        ui.add_space(10.0);
                        if ui.button("Move Up").clicked() {
                            if let Some(index) = self.selected {
                                if index > 0 {
                                    self.files.swap(index, index - 1);
                                    self.selected = Some(index - 1);
                                }
                            }
                        }
                        if ui.button("Move Down").clicked() {
                            if let Some(index) = self.selected {
                                if index + 1 < self.files.len() {
                                    self.files.swap(index, index + 1);
                                    self.selected = Some(index + 1);
                                }
                            }
                        }
                        ui.add_space(20.0);
                        if ui
                            .add_enabled(self.files.len() >= 2, egui::Button::new("Merge Now"))
                            .clicked()
                        {
                            outcome = MergeOutcome::Merge(self.files.clone());
                        }
                    });
                });
            });

        if !open {
            outcome = MergeOutcome::Closed;
        }
        outcome
    }
}

/// Split tool: a page-range expression extracted into a new file.
pub struct SplitDialog {
    file_name: String,
    total_pages: usize,
    pub expression: String,
}

pub enum SplitOutcome {
    Pending,
    Closed,
    /// The user confirmed the expression; the caller picks the destination.
    Extract(String),
}

impl SplitDialog {
    pub fn new(file_name: String, total_pages: usize) -> Self {
        Self {
            file_name,
            total_pages,
            expression: String::new(),
        }
    }

    pub fn show(&mut self, ctx: &egui::Context) -> SplitOutcome {
        let mut outcome = SplitOutcome::Pending;
        let mut open = true;

        egui::Window::new("Split PDF")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.strong(format!("Split file: {}", self.file_name));
                ui.weak(format!("Total pages: {}", self.total_pages));
                ui.add_space(12.0);

                ui.label("Page range:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.expression)
                        .hint_text("1-5, 8, 10-12")
                        .desired_width(240.0),
                );
                ui.weak("Example: 1-5, 8, 10-12");
                ui.add_space(12.0);

                if ui
                    .add_enabled(
                        !self.expression.trim().is_empty(),
                        egui::Button::new("Extract & Save"),
                    )
                    .clicked()
                {
                    outcome = SplitOutcome::Extract(self.expression.clone());
                }
            });

        if !open {
            outcome = SplitOutcome::Closed;
        }
        outcome
    }
}
