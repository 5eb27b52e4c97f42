//! Application shell: the panels, the canvas, and the plumbing that
//! connects the draw machine, the store, the viewport, and the REST
//! client.
//!
//! All network work runs on worker threads and reports back as
//! [`AppEvent`]s over a channel drained at the top of each frame, so
//! the UI thread never blocks and every failure arrives as a value.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use crate::api::ApiClient;
use crate::draw::DrawState;
use crate::keys::{self, Action};
use crate::model::{Annotation, Dataset, LabeledImage, Split};
use crate::render;
use crate::store::AnnotationStore;
use crate::upload::{self, UploadEvent};
use crate::viewport::{self, Viewport};

/// Results crossing back from worker threads. Errors are already
/// stringified so events stay `Send` and cheap to route.
enum AppEvent {
    Dataset(Result<Dataset, String>),
    Images(Result<Vec<LabeledImage>, String>),
    Annotations {
        image_id: i64,
        result: Result<Vec<Annotation>, String>,
    },
    ImagePixels {
        image_id: i64,
        result: Result<image::RgbaImage, String>,
    },
    Committed(Result<Annotation, String>),
    Removed {
        image_id: i64,
        annotation_id: i64,
        result: Result<(), String>,
    },
    SplitUpdated {
        image_id: i64,
        split: Split,
        result: Result<(), String>,
    },
    ImageDeleted {
        image_id: i64,
        result: Result<(), String>,
    },
}

/// Interactions gathered from the panel closures, applied once the
/// frame's layout is done.
#[derive(Default)]
struct UiCommands {
    select_image: Option<usize>,
    nav_delta: isize,
    upload_files: Option<Vec<PathBuf>>,
    split_change: Option<(i64, Split)>,
    delete_image: Option<i64>,
    remove_annotation: Option<i64>,
    chosen_class: Option<String>,
    cancel_pending: bool,
}

pub struct WeldAnnotateApp {
    api: Arc<ApiClient>,
    dataset_id: i64,
    dataset: Option<Dataset>,
    images: Vec<LabeledImage>,
    current: Option<usize>,

    store: AnnotationStore,
    draw: DrawState,
    viewport: Viewport,

    status: Option<String>,

    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    upload_rx: Option<Receiver<UploadEvent>>,
    upload_progress: Option<(usize, usize)>,
}

impl WeldAnnotateApp {
    pub fn new(cc: &eframe::CreationContext<'_>, server: String, dataset_id: i64) -> Self {
        let (events_tx, events_rx) = channel();
        let app = Self {
            api: Arc::new(ApiClient::new(server)),
            dataset_id,
            dataset: None,
            images: Vec::new(),
            current: None,
            store: AnnotationStore::new(),
            draw: DrawState::new(),
            viewport: Viewport::new(),
            status: None,
            events_tx,
            events_rx,
            upload_rx: None,
            upload_progress: None,
        };
        app.refresh_dataset(&cc.egui_ctx);
        app.refresh_images(&cc.egui_ctx);
        app
    }

    /// Run one API call on a worker thread and route its event back.
    fn spawn_task(
        &self,
        ctx: &egui::Context,
        job: impl FnOnce(&ApiClient) -> AppEvent + Send + 'static,
    ) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let event = job(&api);
            let _ = tx.send(event);
            ctx.request_repaint();
        });
    }

    fn refresh_dataset(&self, ctx: &egui::Context) {
        let id = self.dataset_id;
        self.spawn_task(ctx, move |api| {
            AppEvent::Dataset(api.get_dataset(id).map_err(|e| e.to_string()))
        });
    }

    fn refresh_images(&self, ctx: &egui::Context) {
        let id = self.dataset_id;
        self.spawn_task(ctx, move |api| {
            AppEvent::Images(api.list_images(id).map_err(|e| e.to_string()))
        });
    }

    fn select_image(&mut self, ctx: &egui::Context, index: usize) {
        let Some(image) = self.images.get(index) else {
            return;
        };
        let image_id = image.id;
        let url = image.image_url.clone();

        self.current = Some(index);
        self.draw.reset();
        self.store.begin_load(image_id);
        self.viewport.begin_load(image_id);

        self.spawn_task(ctx, move |api| AppEvent::Annotations {
            image_id,
            result: api.list_annotations(image_id).map_err(|e| e.to_string()),
        });
        let url_job = url;
        self.spawn_task(ctx, move |api| AppEvent::ImagePixels {
            image_id,
            result: api
                .fetch_image_bytes(&url_job)
                .map_err(|e| e.to_string())
                .and_then(|bytes| viewport::decode_image(&bytes)),
        });
    }

    /// Step through the image list with wrap-around. No-op on an empty
    /// list; with no selection yet, starts at the first image.
    fn navigate(&mut self, ctx: &egui::Context, delta: isize) {
        if self.images.is_empty() {
            return;
        }
        let next = match self.current {
            Some(idx) => {
                let len = self.images.len() as isize;
                ((idx as isize + delta).rem_euclid(len)) as usize
            }
            None => 0,
        };
        self.select_image(ctx, next);
    }

    fn commit_with_class(&mut self, ctx: &egui::Context, class_name: &str) {
        let Some(idx) = self.current else { return };
        let image_id = self.images[idx].id;
        let Some(boxn) = self.draw.pending_box() else {
            return;
        };
        if let Some(payload) = self.store.begin_commit(image_id, class_name, boxn) {
            self.spawn_task(ctx, move |api| {
                AppEvent::Committed(api.create_annotation(&payload).map_err(|e| e.to_string()))
            });
        }
    }

    fn delete_last_annotation(&mut self, ctx: &egui::Context) {
        if let Some(id) = self.store.begin_remove_last() {
            self.remove_annotation(ctx, id);
        }
    }

    fn remove_annotation(&mut self, ctx: &egui::Context, annotation_id: i64) {
        let Some(idx) = self.current else { return };
        let image_id = self.images[idx].id;
        self.spawn_task(ctx, move |api| AppEvent::Removed {
            image_id,
            annotation_id,
            result: api.delete_annotation(annotation_id).map_err(|e| e.to_string()),
        });
    }

    fn start_upload(&mut self, ctx: &egui::Context, files: Vec<PathBuf>) {
        let files = upload::filter_image_files(files);
        if files.is_empty() {
            self.status = Some("no image files in the selection".to_string());
            return;
        }
        if self.upload_rx.is_some() {
            self.status = Some("an upload is already running".to_string());
            return;
        }

        let (tx, rx) = channel();
        self.upload_rx = Some(rx);
        self.upload_progress = Some((0, files.len()));
        log::info!("uploading {} images", files.len());

        let api = Arc::clone(&self.api);
        let dataset_id = self.dataset_id;
        let ctx = ctx.clone();
        thread::spawn(move || {
            upload::run_batch_upload(&*api, dataset_id, &files, |event| {
                let _ = tx.send(event);
                ctx.request_repaint();
            });
        });
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Dataset(Ok(dataset)) => {
                log::info!(
                    "dataset {} '{}' loaded with {} classes",
                    dataset.id,
                    dataset.name,
                    dataset.classes.len()
                );
                self.dataset = Some(dataset);
            }
            AppEvent::Dataset(Err(err)) => {
                self.status = Some(format!("failed to load dataset: {err}"));
            }
            AppEvent::Images(Ok(list)) => {
                let selected_id = self.current.map(|i| self.images[i].id);
                self.images = list;
                self.current =
                    selected_id.and_then(|id| self.images.iter().position(|img| img.id == id));
                if selected_id.is_some() && self.current.is_none() {
                    // The open image vanished from the refreshed list.
                    self.store.clear();
                    self.viewport = Viewport::new();
                    self.draw.reset();
                }
            }
            AppEvent::Images(Err(err)) => {
                self.status = Some(format!("failed to load images: {err}"));
            }
            AppEvent::Annotations { image_id, result } => {
                if let Some(err) = self.store.finish_load(image_id, result) {
                    self.status = Some(err);
                }
            }
            AppEvent::ImagePixels { image_id, result } => {
                self.viewport.finish_load(image_id, result);
            }
            AppEvent::Committed(result) => match self.store.finish_commit(result) {
                Ok(()) => {
                    self.draw.complete();
                    self.status = None;
                    let committed_image = self.store.annotations().last().map(|a| a.image);
                    if let Some(image_id) = committed_image {
                        self.bump_count(image_id, 1);
                    }
                }
                Err(err) => {
                    // The pending box stays on screen for retry or cancel.
                    self.status = Some(err);
                }
            },
            AppEvent::Removed {
                image_id,
                annotation_id,
                result,
            } => match self.store.finish_remove(annotation_id, result) {
                Ok(()) => self.bump_count(image_id, -1),
                Err(err) => self.status = Some(err),
            },
            AppEvent::SplitUpdated {
                image_id,
                split,
                result,
            } => match result {
                Ok(()) => {
                    if let Some(img) = self.images.iter_mut().find(|i| i.id == image_id) {
                        img.split = split;
                    }
                }
                Err(err) => self.status = Some(format!("failed to update split: {err}")),
            },
            AppEvent::ImageDeleted { image_id, result } => match result {
                Ok(()) => {
                    let selected_id = self.current.map(|i| self.images[i].id);
                    if selected_id == Some(image_id) {
                        self.store.clear();
                        self.viewport = Viewport::new();
                        self.draw.reset();
                    }
                    self.images.retain(|img| img.id != image_id);
                    // Re-resolve the selection by id; removal shifts indices.
                    self.current = selected_id
                        .filter(|&id| id != image_id)
                        .and_then(|id| self.images.iter().position(|img| img.id == id));
                    self.status = Some("image deleted".to_string());
                }
                Err(err) => self.status = Some(format!("failed to delete image: {err}")),
            },
        }
    }

    fn bump_count(&mut self, image_id: i64, delta: i64) {
        if let Some(img) = self.images.iter_mut().find(|i| i.id == image_id) {
            img.annotation_count = (img.annotation_count as i64 + delta).max(0) as u32;
        }
    }

    fn drain_upload_events(&mut self, ctx: &egui::Context) {
        let events: Vec<UploadEvent> = match &self.upload_rx {
            Some(rx) => std::iter::from_fn(|| rx.try_recv().ok()).collect(),
            None => return,
        };
        for event in events {
            match event {
                UploadEvent::Progress { uploaded, total } => {
                    self.upload_progress = Some((uploaded, total));
                }
                UploadEvent::Done(report) => {
                    log::info!("batch upload finished: {}", report.summary());
                    for err in &report.errors {
                        log::warn!("upload error: {err}");
                    }
                    self.status = Some(report.summary());
                    self.upload_progress = None;
                    self.upload_rx = None;
                    // Stale selections cannot be re-submitted; the next
                    // upload starts from a fresh picker.
                    self.refresh_images(ctx);
                }
            }
        }
    }

    fn apply_keyboard(&mut self, ctx: &egui::Context, commands: &mut UiCommands) {
        let pending = self.draw.is_pending();
        let actions = ctx.input(|i| keys::pressed_actions(i, pending));
        for action in actions {
            match action {
                Action::PrevImage => commands.nav_delta = -1,
                Action::NextImage => commands.nav_delta = 1,
                Action::CancelPending => commands.cancel_pending = true,
                Action::DeleteLast => self.delete_last_annotation(ctx),
                Action::QuickSelect(n) => {
                    // Digits past the class list are no-ops.
                    let class = self
                        .dataset
                        .as_ref()
                        .and_then(|d| d.classes.get(n - 1))
                        .map(|c| c.name.clone());
                    if let Some(name) = class {
                        commands.chosen_class = Some(name);
                    }
                }
            }
        }
    }

    // ---- panels ----

    fn top_panel(&mut self, ctx: &egui::Context, commands: &mut UiCommands) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let dataset_name = self
                    .dataset
                    .as_ref()
                    .map(|d| d.name.clone())
                    .unwrap_or_else(|| format!("dataset {}", self.dataset_id));
                ui.strong(dataset_name);
                ui.separator();

                let can_navigate = !self.images.is_empty() && !self.draw.is_pending();
                if ui.add_enabled(can_navigate, egui::Button::new("< Prev")).clicked() {
                    commands.nav_delta = -1;
                }
                if ui.add_enabled(can_navigate, egui::Button::new("Next >")).clicked() {
                    commands.nav_delta = 1;
                }

                if let Some(idx) = self.current {
                    let image = &self.images[idx];
                    ui.label(&image.filename);

                    let mut split = image.split;
                    egui::ComboBox::from_id_salt("split")
                        .selected_text(split.label())
                        .show_ui(ui, |ui| {
                            for s in Split::ALL {
                                ui.selectable_value(&mut split, s, s.label());
                            }
                        });
                    if split != image.split {
                        commands.split_change = Some((image.id, split));
                    }

                    if ui.button("Delete image").clicked() {
                        let confirmed = rfd::MessageDialog::new()
                            .set_title("Delete image")
                            .set_description("Delete this image and all its annotations?")
                            .set_buttons(rfd::MessageButtons::YesNo)
                            .show()
                            == rfd::MessageDialogResult::Yes;
                        if confirmed {
                            commands.delete_image = Some(image.id);
                        }
                    }
                }

                ui.separator();
                let uploading = self.upload_rx.is_some();
                if ui
                    .add_enabled(!uploading, egui::Button::new("Upload files..."))
                    .clicked()
                {
                    if let Some(files) = rfd::FileDialog::new()
                        .add_filter("images", &["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff"])
                        .pick_files()
                    {
                        commands.upload_files = Some(files);
                    }
                }
                if ui
                    .add_enabled(!uploading, egui::Button::new("Upload folder..."))
                    .clicked()
                {
                    if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                        commands.upload_files = Some(list_folder_files(&folder));
                    }
                }
            });
        });
    }

    fn image_list_panel(&mut self, ctx: &egui::Context, commands: &mut UiCommands) {
        egui::SidePanel::left("images")
            .default_width(230.0)
            .show(ctx, |ui| {
                ui.label(format!("Images ({})", self.images.len()));
                if let Some(dataset) = &self.dataset {
                    ui.label(format!(
                        "splits {}/{}/{}",
                        dataset.train_split, dataset.valid_split, dataset.test_split
                    ));
                }
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (idx, image) in self.images.iter().enumerate() {
                        let selected = self.current == Some(idx);
                        let text = format!(
                            "{}  [{}] ({})",
                            image.filename,
                            image.split.label(),
                            image.annotation_count
                        );
                        if ui.selectable_label(selected, text).clicked() {
                            commands.select_image = Some(idx);
                        }
                    }
                });
            });
    }

    fn status_panel(&mut self, ctx: &egui::Context, commands: &mut UiCommands) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            if let Some((uploaded, total)) = self.upload_progress {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("uploading {uploaded}/{total} images..."));
                });
            }
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::from_rgb(250, 160, 60), status);
            }

            let annotations = self.store.annotations();
            if !annotations.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    ui.label(format!("Annotations ({}):", annotations.len()));
                    for ann in annotations {
                        let color = self
                            .dataset
                            .as_ref()
                            .and_then(|d| d.class_by_name(&ann.class_name))
                            .map(|c| c.color32())
                            .unwrap_or(egui::Color32::GRAY);
                        ui.colored_label(color, &ann.class_name);
                        if ui.small_button("x").clicked() {
                            commands.remove_annotation = Some(ann.id);
                        }
                    }
                });
            }
        });
    }

    fn class_picker(&mut self, ctx: &egui::Context, commands: &mut UiCommands) {
        if !self.draw.is_pending() {
            return;
        }
        let committing = self.store.commit_in_flight();
        egui::Window::new("Assign defect class")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 48.0))
            .show(ctx, |ui| {
                match self.dataset.as_ref() {
                    Some(dataset) if !dataset.classes.is_empty() => {
                        for (i, cls) in dataset.classes.iter().enumerate() {
                            let label = if i < 9 {
                                format!("[{}] {}", i + 1, cls.display_name)
                            } else {
                                cls.display_name.clone()
                            };
                            let button = egui::Button::new(
                                egui::RichText::new(label).color(egui::Color32::WHITE),
                            )
                            .fill(cls.color32());
                            let mut response = ui.add_enabled(!committing, button);
                            if !cls.description.is_empty() {
                                response = response.on_hover_text(&cls.description);
                            }
                            if response.clicked() {
                                commands.chosen_class = Some(cls.name.clone());
                            }
                        }
                    }
                    _ => {
                        ui.label("no classes assigned to this dataset");
                    }
                }
                ui.separator();
                if committing {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("saving...");
                    });
                }
                if ui
                    .add_enabled(!committing, egui::Button::new("Cancel (Esc)"))
                    .clicked()
                {
                    commands.cancel_pending = true;
                }
            });
    }

    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = self.viewport.error() {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(egui::Color32::LIGHT_RED, format!("image failed to load: {err}"));
                });
                return;
            }
            if self.current.is_none() {
                ui.centered_and_justified(|ui| {
                    ui.label("Select an image to start annotating");
                });
                return;
            }
            if self.viewport.is_loading() {
                ui.centered_and_justified(|ui| {
                    ui.spinner();
                });
                return;
            }
            let avail = ui.available_size();
            let Some(canvas_size) = self.viewport.canvas_size(avail) else {
                return;
            };

            let (response, painter) =
                ui.allocate_painter(avail, egui::Sense::click_and_drag());
            let outer = response.rect;
            painter.rect_filled(outer, 0.0, egui::Color32::from_gray(40));
            let canvas = egui::Rect::from_center_size(outer.center(), canvas_size);

            // Pointer handling in canvas-local pixels; drags are clamped
            // to the canvas so normalized boxes stay inside [0, 1].
            if response.drag_started_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    if canvas.contains(pos) {
                        self.draw.pointer_down(pos - canvas.min.to_vec2());
                    }
                }
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                if let Some(pos) = response.interact_pointer_pos() {
                    let clamped = pos.clamp(canvas.min, canvas.max);
                    self.draw.pointer_moved(clamped - canvas.min.to_vec2());
                }
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                self.draw.pointer_up(canvas.width(), canvas.height());
            }

            let texture = self.viewport.texture(ctx);
            render::paint_scene(
                &painter,
                canvas,
                texture,
                self.store.annotations(),
                self.dataset.as_ref(),
                &self.draw,
            );
        });
    }

    fn apply_commands(&mut self, ctx: &egui::Context, commands: UiCommands) {
        if commands.cancel_pending && !self.store.commit_in_flight() {
            self.draw.cancel();
        }
        if let Some(name) = commands.chosen_class {
            self.commit_with_class(ctx, &name);
        }
        if let Some(idx) = commands.select_image {
            if !self.draw.is_pending() {
                self.select_image(ctx, idx);
            }
        }
        if commands.nav_delta != 0 && !self.draw.is_pending() {
            self.navigate(ctx, commands.nav_delta);
        }
        if let Some((image_id, split)) = commands.split_change {
            self.spawn_task(ctx, move |api| AppEvent::SplitUpdated {
                image_id,
                split,
                result: api.update_split(image_id, split).map_err(|e| e.to_string()),
            });
        }
        if let Some(image_id) = commands.delete_image {
            self.spawn_task(ctx, move |api| AppEvent::ImageDeleted {
                image_id,
                result: api.delete_image(image_id).map_err(|e| e.to_string()),
            });
        }
        if let Some(id) = commands.remove_annotation {
            if self.store.begin_remove(id).is_some() {
                self.remove_annotation(ctx, id);
            }
        }
        if let Some(files) = commands.upload_files {
            self.start_upload(ctx, files);
        }
    }
}

impl eframe::App for WeldAnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let events: Vec<AppEvent> =
            std::iter::from_fn(|| self.events_rx.try_recv().ok()).collect();
        for event in events {
            self.apply_event(event);
        }
        self.drain_upload_events(ctx);

        let mut commands = UiCommands::default();

        // Files dropped anywhere on the window feed the upload pipeline.
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            commands.upload_files = Some(dropped);
        }

        self.apply_keyboard(ctx, &mut commands);

        self.top_panel(ctx, &mut commands);
        self.image_list_panel(ctx, &mut commands);
        self.status_panel(ctx, &mut commands);
        self.class_picker(ctx, &mut commands);
        self.canvas_panel(ctx);

        self.apply_commands(ctx, commands);
    }
}

/// Files directly inside a picked folder; subdirectories are skipped,
/// non-images fall out in the pipeline's filter.
fn list_folder_files(folder: &std::path::Path) -> Vec<PathBuf> {
    match std::fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(err) => {
            log::warn!("could not read folder {}: {err}", folder.display());
            Vec::new()
        }
    }
}
