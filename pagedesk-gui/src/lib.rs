//! egui front end: toolbar, page sidebar, scrollable canvas, and the tool
//! dialogs, all funneling into the core session as commands.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use pagedesk_core::{Command, DocumentEngine, LayoutMode, MoveDirection, Session};
use tracing::warn;

mod dialogs;

pub use dialogs::{
    ConfirmDeleteDialog, ConfirmOutcome, MergeDialog, MergeOutcome, NoticeDialog, SplitDialog,
    SplitOutcome,
};

/// UI intents gathered while drawing a frame and handled afterwards, so the
/// widget closures never fight the session over borrows.
enum UiAction {
    Command(Command),
    OpenFile,
    SaveAs,
    OpenMergeDialog,
    OpenSplitDialog,
    MergeFiles(Vec<PathBuf>),
    SplitExpression(String),
    ConfirmDelete(usize),
    JumpToEntry,
    ToggleSidebar,
}

/// Restartable quiet-period timer behind the fit-width-on-resize behavior. A
/// newer resize cancels the pending deadline and starts a fresh one.
struct FitDebounce {
    last_size: Option<egui::Vec2>,
    deadline: Option<Instant>,
}

enum DebouncePoll {
    Idle,
    Waiting(Duration),
    Fire,
}

impl FitDebounce {
    fn new() -> Self {
        Self {
            last_size: None,
            deadline: None,
        }
    }

    fn observe(&mut self, size: egui::Vec2, quiet: Duration) {
        if self.last_size != Some(size) {
            let was_sized = self.last_size.is_some();
            self.last_size = Some(size);
            if was_sized {
                self.deadline = Some(Instant::now() + quiet);
            }
        }
    }

    fn poll(&mut self) -> DebouncePoll {
        let Some(deadline) = self.deadline else {
            return DebouncePoll::Idle;
        };
        let now = Instant::now();
        if now >= deadline {
            self.deadline = None;
            DebouncePoll::Fire
        } else {
            DebouncePoll::Waiting(deadline - now)
        }
    }
}

pub struct ViewerApp {
    engine: Box<dyn DocumentEngine>,
    session: Session,
    textures: HashMap<usize, egui::TextureHandle>,
    page_entry: String,
    hand_mode: bool,
    sidebar_visible: bool,
    scroll_sidebar_to_current: bool,
    pending_pan: Option<egui::Vec2>,
    last_canvas_size: egui::Vec2,
    fit_debounce: FitDebounce,
    notice: Option<NoticeDialog>,
    confirm_delete: Option<ConfirmDeleteDialog>,
    merge_dialog: Option<MergeDialog>,
    split_dialog: Option<SplitDialog>,
}

impl ViewerApp {
    pub fn new(engine: Box<dyn DocumentEngine>, session: Session) -> Self {
        Self {
            engine,
            session,
            textures: HashMap::new(),
            page_entry: "0".to_owned(),
            hand_mode: false,
            sidebar_visible: true,
            scroll_sidebar_to_current: false,
            pending_pan: None,
            last_canvas_size: egui::Vec2::ZERO,
            fit_debounce: FitDebounce::new(),
            notice: None,
            confirm_delete: None,
            merge_dialog: None,
            split_dialog: None,
        }
    }

    /// Opens a file at startup, optionally jumping to a 0-based page.
    pub fn open_file_at(&mut self, ctx: &egui::Context, path: PathBuf, page: Option<usize>) {
        self.open_path(ctx, path);
        if let Some(page) = page {
            if let Err(err) = self.session.apply(Command::GotoPage { page }) {
                self.notice = Some(NoticeDialog::warning(format!("{err:#}")));
            }
        }
    }

    fn open_path(&mut self, ctx: &egui::Context, path: PathBuf) {
        match self.session.open_with(self.engine.as_ref(), path) {
            Ok(()) => {
                self.textures.clear();
                self.scroll_sidebar_to_current = true;
                if let Some(doc) = self.session.document() {
                    self.page_entry = (doc.current_page + 1).to_string();
                }
                self.update_title(ctx);
            }
            Err(err) => {
                self.notice = Some(NoticeDialog::error(format!("{err:#}")));
            }
        }
    }

    fn update_title(&self, ctx: &egui::Context) {
        let title = match self.session.document() {
            Some(doc) => {
                let name = doc
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| doc.path.display().to_string());
                format!("Pagedesk - {name}")
            }
            None => "Pagedesk".to_owned(),
        };
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let modifiers = ctx.input(|i| i.modifiers);
        let cmd_or_ctrl = modifiers.command || modifiers.ctrl;

        ctx.input(|i| {
            if cmd_or_ctrl && i.key_pressed(egui::Key::O) {
                actions.push(UiAction::OpenFile);
            }
            if cmd_or_ctrl && i.key_pressed(egui::Key::S) {
                actions.push(UiAction::SaveAs);
            }
            if cmd_or_ctrl && i.key_pressed(egui::Key::Equals) {
                actions.push(UiAction::Command(Command::ZoomIn));
            }
            if cmd_or_ctrl && i.key_pressed(egui::Key::Minus) {
                actions.push(UiAction::Command(Command::ZoomOut));
            }
            if i.key_pressed(egui::Key::Escape) {
                self.dismiss_topmost_dialog();
            }
        });

        // Ctrl+wheel and pinch zoom arrive as a multiplicative factor.
        if self.session.is_open() {
            let factor = ctx.input(|i| i.zoom_delta());
            if factor > 1.01 {
                actions.push(UiAction::Command(Command::ZoomIn));
            } else if factor < 0.99 {
                actions.push(UiAction::Command(Command::ZoomOut));
            }
        }
    }

    fn dismiss_topmost_dialog(&mut self) {
        if self.notice.is_some() {
            self.notice = None;
        } else if self.confirm_delete.is_some() {
            self.confirm_delete = None;
        } else if self.split_dialog.is_some() {
            self.split_dialog = None;
        } else if self.merge_dialog.is_some() {
            self.merge_dialog = None;
        }
    }

    fn process_resize(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let quiet = Duration::from_millis(self.session.config().resize_debounce_ms);
        self.fit_debounce.observe(ctx.screen_rect().size(), quiet);
        match self.fit_debounce.poll() {
            DebouncePoll::Fire => actions.push(UiAction::Command(Command::FitWidth {
                available_width: self.last_canvas_size.x,
            })),
            DebouncePoll::Waiting(remaining) => ctx.request_repaint_after(remaining),
            DebouncePoll::Idle => {}
        }
    }

    fn draw_toolbar(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        struct Snapshot {
            zoom: f32,
            layout_mode: LayoutMode,
            text_only: bool,
            page_count: usize,
            current_page: usize,
        }
        let snapshot = self.session.document().map(|doc| Snapshot {
            zoom: doc.zoom,
            layout_mode: doc.layout_mode,
            text_only: doc.text_only,
            page_count: doc.page_count(),
            current_page: doc.current_page,
        });

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("☰").clicked() {
                    actions.push(UiAction::ToggleSidebar);
                }
                if ui.button("📂 Open").clicked() {
                    actions.push(UiAction::OpenFile);
                }
                if ui.button("💾 Save As").clicked() {
                    actions.push(UiAction::SaveAs);
                }
                ui.separator();
                if ui.button("Merge").clicked() {
                    actions.push(UiAction::OpenMergeDialog);
                }
                if ui.button("Split").clicked() {
                    actions.push(UiAction::OpenSplitDialog);
                }
                ui.separator();

                if ui
                    .selectable_label(self.hand_mode, "✋")
                    .on_hover_text("Hand tool: drag to pan")
                    .clicked()
                {
                    self.hand_mode = !self.hand_mode;
                }

                ui.add_enabled_ui(snapshot.is_some(), |ui| {
                    if let Some(snap) = &snapshot {
                        let mut mode = snap.layout_mode;
                        egui::ComboBox::from_id_salt("layout_mode")
                            .selected_text(match mode {
                                LayoutMode::Single => "Single Column",
                                LayoutMode::Double => "Two Columns",
                            })
                            .width(120.0)
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut mode, LayoutMode::Single, "Single Column");
                                ui.selectable_value(&mut mode, LayoutMode::Double, "Two Columns");
                            });
                        if mode != snap.layout_mode {
                            actions.push(UiAction::Command(Command::SetLayoutMode(mode)));
                        }

                        let mut text_only = snap.text_only;
                        if ui.checkbox(&mut text_only, "Txt Only").changed() {
                            actions.push(UiAction::Command(Command::ToggleTextOnly));
                        }

                        if ui.button("Fit").clicked() {
                            actions.push(UiAction::Command(Command::FitWidth {
                                available_width: self.last_canvas_size.x,
                            }));
                        }
                        if ui.button("−").clicked() {
                            actions.push(UiAction::Command(Command::ZoomOut));
                        }
                        ui.label(format!("{:.0}%", snap.zoom * 100.0));
                        if ui.button("+").clicked() {
                            actions.push(UiAction::Command(Command::ZoomIn));
                        }
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match &snapshot {
                        Some(snap) => {
                            ui.label(format!("/ {}", snap.page_count));
                            let response = ui.add(
                                egui::TextEdit::singleline(&mut self.page_entry)
                                    .desired_width(44.0)
                                    .horizontal_align(egui::Align::Center),
                            );
                            if response.lost_focus()
                                && ui.input(|i| i.key_pressed(egui::Key::Enter))
                            {
                                actions.push(UiAction::JumpToEntry);
                            }
                            if !response.has_focus() {
                                self.page_entry = (snap.current_page + 1).to_string();
                            }
                            ui.label("Page:");
                        }
                        None => {
                            ui.label("/ 0");
                            ui.label("Page:");
                        }
                    }
                });
            });
        });
    }

    fn draw_sidebar(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let snapshot = self
            .session
            .document()
            .map(|doc| (doc.page_count(), doc.current_page));

        egui::SidePanel::left("pages")
            .resizable(true)
            .default_width(180.0)
            .show_animated(ctx, self.sidebar_visible, |ui| {
                ui.heading("Pages");
                ui.separator();

                let Some((page_count, current_page)) = snapshot else {
                    ui.weak("No document loaded");
                    return;
                };

                ui.horizontal(|ui| {
                    if ui.button("▲").on_hover_text("Move page up").clicked() {
                        actions.push(UiAction::Command(Command::MoveCurrentPage {
                            direction: MoveDirection::Up,
                        }));
                    }
                    if ui.button("▼").on_hover_text("Move page down").clicked() {
                        actions.push(UiAction::Command(Command::MoveCurrentPage {
                            direction: MoveDirection::Down,
                        }));
                    }
                    if ui.button("⟳").on_hover_text("Rotate page").clicked() {
                        actions.push(UiAction::Command(Command::RotateCurrentPage));
                    }
                    if ui.button("🗑").on_hover_text("Delete page").clicked() {
                        actions.push(UiAction::ConfirmDelete(current_page));
                    }
                });
                ui.separator();

                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for page in 0..page_count {
                            let selected = page == current_page;
                            let response =
                                ui.selectable_label(selected, format!("Page {}", page + 1));
                            if response.clicked() {
                                actions.push(UiAction::Command(Command::GotoPage { page }));
                            }
                            if selected && self.scroll_sidebar_to_current {
                                response.scroll_to_me(Some(egui::Align::Center));
                            }
                        }
                    });
                self.scroll_sidebar_to_current = false;
            });
    }

    fn draw_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.session.is_open() {
                ui.centered_and_justified(|ui| {
                    ui.heading("Open a PDF to get started");
                });
                return;
            }
            self.last_canvas_size = ui.available_size();

            let mut scroll_area = egui::ScrollArea::both().auto_shrink([false, false]);
            if let Some(pan) = self.pending_pan.take() {
                scroll_area = scroll_area
                    .horizontal_scroll_offset(pan.x.max(0.0))
                    .vertical_scroll_offset(pan.y.max(0.0));
            }
            if let Some(target) = self
                .session
                .document_mut()
                .and_then(|doc| doc.take_pending_scroll())
            {
                scroll_area = scroll_area.vertical_scroll_offset(target);
            }

            let mut drag_delta = None;
            let output = scroll_area.show_viewport(ui, |ui, viewport| {
                let Some(doc) = self.session.document_mut() else {
                    return;
                };
                ui.set_min_size(egui::vec2(doc.layout.width, doc.layout.height));
                let origin = ui.min_rect().min;

                doc.update_scroll(viewport.min.y, viewport.height());

                let outcome = doc.reconcile();
                if outcome.cache_cleared {
                    self.textures.clear();
                }
                for page in outcome.evicted {
                    self.textures.remove(&page);
                }
                for (page, image) in outcome.rendered {
                    let size = [image.width as usize, image.height as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &image.pixels);
                    let handle = ctx.load_texture(
                        format!("page_{page}"),
                        color_image,
                        egui::TextureOptions::LINEAR,
                    );
                    self.textures.insert(page, handle);
                }

                let response = ui.interact(
                    ui.max_rect(),
                    ui.id().with("canvas"),
                    egui::Sense::click_and_drag(),
                );
                if self.hand_mode {
                    if response.hovered() {
                        ctx.set_cursor_icon(egui::CursorIcon::Grab);
                    }
                    if response.dragged() {
                        ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
                        drag_delta = Some(response.drag_delta());
                    }
                }

                let painter = ui.painter();
                for (index, rect) in doc.layout.rects.iter().enumerate() {
                    let page_rect = egui::Rect::from_min_size(
                        origin + egui::vec2(rect.x, rect.y),
                        egui::vec2(rect.width, rect.height),
                    );
                    if !ui.is_rect_visible(page_rect) {
                        continue;
                    }

                    painter.rect_filled(
                        page_rect.translate(egui::vec2(8.0, 8.0)),
                        egui::CornerRadius::ZERO,
                        egui::Color32::from_black_alpha(120),
                    );
                    painter.rect_filled(page_rect, egui::CornerRadius::ZERO, egui::Color32::WHITE);
                    painter.rect_stroke(
                        page_rect,
                        egui::CornerRadius::ZERO,
                        egui::Stroke::new(1.0, egui::Color32::from_gray(60)),
                        egui::StrokeKind::Outside,
                    );
                    painter.text(
                        page_rect.min + egui::vec2(-10.0, 10.0),
                        egui::Align2::RIGHT_TOP,
                        (index + 1).to_string(),
                        egui::FontId::proportional(12.0),
                        ui.visuals().weak_text_color(),
                    );

                    if let Some(texture) = self.textures.get(&index) {
                        painter.image(
                            texture.id(),
                            page_rect,
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                    }
                }
            });

            if let Some(delta) = drag_delta {
                self.pending_pan = Some(output.state.offset - delta);
                ctx.request_repaint();
            }
        });
    }

    fn draw_dialogs(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        if let Some(notice) = self.notice.take() {
            if !notice.show(ctx) {
                self.notice = Some(notice);
            }
        }

        if let Some(confirm) = self.confirm_delete.take() {
            match confirm.show(ctx) {
                ConfirmOutcome::Pending => self.confirm_delete = Some(confirm),
                ConfirmOutcome::Confirmed => {
                    actions.push(UiAction::Command(Command::DeletePage { page: confirm.page }));
                }
                ConfirmOutcome::Cancelled => {}
            }
        }

        if let Some(mut dialog) = self.merge_dialog.take() {
            match dialog.show(ctx) {
                MergeOutcome::Pending => self.merge_dialog = Some(dialog),
                MergeOutcome::Closed => {}
                MergeOutcome::Merge(files) => {
                    // Keep the dialog open; a successful merge closes it.
                    self.merge_dialog = Some(dialog);
                    actions.push(UiAction::MergeFiles(files));
                }
            }
        }

        if let Some(mut dialog) = self.split_dialog.take() {
            match dialog.show(ctx) {
                SplitOutcome::Pending => self.split_dialog = Some(dialog),
                SplitOutcome::Closed => {}
                SplitOutcome::Extract(expression) => {
                    self.split_dialog = Some(dialog);
                    actions.push(UiAction::SplitExpression(expression));
                }
            }
        }
    }

    fn handle_action(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::Command(command) => {
                let refocus_sidebar = matches!(
                    command,
                    Command::GotoPage { .. }
                        | Command::MoveCurrentPage { .. }
                        | Command::DeletePage { .. }
                );
                if let Err(err) = self.session.apply(command) {
                    self.notice = Some(NoticeDialog::error(format!("{err:#}")));
                } else if refocus_sidebar {
                    self.scroll_sidebar_to_current = true;
                }
            }
            UiAction::OpenFile => {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("PDF Files", &["pdf"])
                    .pick_file()
                {
                    self.open_path(ctx, path);
                }
            }
            UiAction::SaveAs => {
                if !self.session.is_open() {
                    return;
                }
                let Some(path) = rfd::FileDialog::new()
                    .add_filter("PDF Files", &["pdf"])
                    .set_file_name("document.pdf")
                    .save_file()
                else {
                    return;
                };
                match self.session.save_as(&path) {
                    Ok(()) => self.notice = Some(NoticeDialog::info("PDF saved successfully")),
                    Err(err) => self.notice = Some(NoticeDialog::error(format!("{err:#}"))),
                }
            }
            UiAction::OpenMergeDialog => {
                self.merge_dialog = Some(MergeDialog::default());
            }
            UiAction::OpenSplitDialog => match self.session.document() {
                Some(doc) => {
                    let name = doc
                        .path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| doc.path.display().to_string());
                    self.split_dialog = Some(SplitDialog::new(name, doc.page_count()));
                }
                None => {
                    self.notice = Some(NoticeDialog::warning("Open a PDF first."));
                }
            },
            UiAction::MergeFiles(files) => {
                let Some(destination) = rfd::FileDialog::new()
                    .add_filter("PDF Files", &["pdf"])
                    .set_file_name("merged.pdf")
                    .save_file()
                else {
                    return;
                };
                match self.session.merge_with(self.engine.as_ref(), &files, &destination) {
                    Ok(()) => {
                        self.merge_dialog = None;
                        self.notice = Some(NoticeDialog::info("PDFs merged successfully"));
                    }
                    Err(err) => self.notice = Some(NoticeDialog::error(format!("{err:#}"))),
                }
            }
            UiAction::SplitExpression(expression) => {
                let Some(destination) = rfd::FileDialog::new()
                    .add_filter("PDF Files", &["pdf"])
                    .set_file_name("extracted.pdf")
                    .save_file()
                else {
                    return;
                };
                match self.session.split_to(&expression, &destination) {
                    Ok(pages) => {
                        self.split_dialog = None;
                        self.notice = Some(NoticeDialog::info(format!(
                            "Extracted {pages} pages successfully"
                        )));
                    }
                    Err(err) => self.notice = Some(NoticeDialog::error(format!("{err:#}"))),
                }
            }
            UiAction::ConfirmDelete(page) => {
                self.confirm_delete = Some(ConfirmDeleteDialog { page });
            }
            UiAction::JumpToEntry => {
                let Ok(number) = self.page_entry.trim().parse::<usize>() else {
                    return;
                };
                let Some(page_count) = self.session.document().map(|doc| doc.page_count()) else {
                    return;
                };
                if number == 0 || number > page_count {
                    self.notice = Some(NoticeDialog::warning(format!(
                        "Page must be between 1 and {page_count}"
                    )));
                } else {
                    self.handle_action(ctx, UiAction::Command(Command::GotoPage { page: number - 1 }));
                }
            }
            UiAction::ToggleSidebar => {
                self.sidebar_visible = !self.sidebar_visible;
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut actions = Vec::new();

        self.handle_shortcuts(ctx, &mut actions);
        self.process_resize(ctx, &mut actions);
        self.draw_toolbar(ctx, &mut actions);
        self.draw_sidebar(ctx, &mut actions);
        self.draw_canvas(ctx);
        self.draw_dialogs(ctx, &mut actions);

        for action in actions {
            self.handle_action(ctx, action);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            if let Err(err) = self.session.persist() {
                warn!(?err, "failed to persist reading history");
            }
        }
    }
}
