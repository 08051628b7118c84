// main.rs — desktop viewer: menus, status bar, drag/zoom and background exports

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // no console window in release

mod renderer;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{error, info, warn};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use panoview::collage::{cube_grid, CubeFaces};
use panoview::config::{CompareKind, Config, LayoutKind};
use panoview::reproject::aligned_output_path;
use panoview::{
    plan, render_tiles, reproject_chunked, CancelToken, CompareMode, JobOutcome, Orientation,
    Panorama, Progress, Slot, TileSpec, ViewSpec, ViewerSession,
};
use renderer::Renderer;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

enum Message {
    Loaded {
        slot: Slot,
        path: PathBuf,
        result: panoview::Result<Panorama>,
    },
    JobFinished(String),
}

struct Job {
    label: &'static str,
    cancel: CancelToken,
    progress: Progress,
}

impl Job {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            cancel: CancelToken::new(),
            progress: Progress::new(),
        }
    }
}

/// Inputs of the last rendered background frame.
#[derive(Debug, Clone, PartialEq)]
struct FrameKey {
    view: ViewSpec,
    mode: CompareMode,
    a: Option<Orientation>,
    b: Option<Orientation>,
    generation: u64,
}

fn slot_index(slot: Slot) -> usize {
    match slot {
        Slot::A => 0,
        Slot::B => 1,
    }
}

struct App {
    config: Config,
    session: ViewerSession,
    paths: [Option<PathBuf>; 2],
    compare: CompareKind,
    blend_alpha: f32,
    split: Option<u32>,
    /// Bumped whenever a source is replaced or swapped.
    generation: u64,
    frame_key: Option<FrameKey>,
    frame: Option<egui::TextureHandle>,
    job: Option<Job>,
    status: Option<String>,
    loading: usize,
    show_fps: bool,
    show_orientation: bool,
    is_fullscreen: bool,
    quit: bool,
    tx: Sender<Message>,
}

impl App {
    fn new(config: Config, tx: Sender<Message>) -> Self {
        let config = config.sanitized();
        let session = ViewerSession::new(config.fov, config.fov_range());
        let blend_alpha = match config.compare_mode() {
            Ok(_) => config.blend_alpha,
            Err(e) => {
                warn!("{e}; using 0.5");
                0.5
            }
        };
        Self {
            compare: config.mode,
            split: config.split_boundary,
            blend_alpha,
            session,
            config,
            paths: [None, None],
            generation: 0,
            frame_key: None,
            frame: None,
            job: None,
            status: None,
            loading: 0,
            show_fps: false,
            show_orientation: false,
            is_fullscreen: false,
            quit: false,
            tx,
        }
    }

    fn compare_mode(&self) -> CompareMode {
        match self.compare {
            CompareKind::A => CompareMode::A,
            CompareKind::B => CompareMode::B,
            CompareKind::Blend => CompareMode::Blend {
                alpha: self.blend_alpha,
            },
            CompareKind::Split => CompareMode::Split {
                boundary: self.split,
            },
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Loaded { slot, path, result } => {
                self.loading = self.loading.saturating_sub(1);
                match result {
                    Ok(panorama) => {
                        let (w, h) = panorama.dimensions();
                        self.session.set_source(slot, panorama);
                        self.status = Some(format!("{slot:?}: {} ({w}x{h})", path.display()));
                        self.paths[slot_index(slot)] = Some(path);
                        self.generation += 1;
                    }
                    Err(e) => {
                        error!("{e}");
                        self.status = Some(e.to_string());
                    }
                }
            }
            Message::JobFinished(text) => {
                info!("{text}");
                self.job = None;
                self.status = Some(text);
            }
        }
    }

    fn open_dialog(&mut self, slot: Slot) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.load(slot, path);
        }
    }

    fn load(&mut self, slot: Slot, path: PathBuf) {
        self.loading += 1;
        start_load_image(slot, path, self.tx.clone());
    }

    fn swap_sources(&mut self) {
        self.session.swap_sources();
        self.paths.swap(0, 1);
        self.generation += 1;
    }

    /// Re-renders the background frame when anything it depends on changed.
    fn update_frame(&mut self, ctx: &egui::Context, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.session.mode = self.compare_mode();
        let key = FrameKey {
            view: self.session.view_spec(width, height),
            mode: self.session.mode,
            a: self.session.orientation(Slot::A),
            b: self.session.orientation(Slot::B),
            generation: self.generation,
        };
        if self.frame_key.as_ref() == Some(&key) {
            return;
        }
        self.frame_key = Some(key);

        let Some(image) = self.session.frame(width, height) else {
            self.frame = None;
            return;
        };
        let size = [image.width() as usize, image.height() as usize];
        let color = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        match &mut self.frame {
            Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
            None => {
                self.frame =
                    Some(ctx.load_texture("panorama_frame", color, egui::TextureOptions::LINEAR))
            }
        }
    }

    fn paint_frame(&self, ctx: &egui::Context) {
        if let Some(texture) = &self.frame {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            ctx.layer_painter(egui::LayerId::background()).image(
                texture.id(),
                ctx.screen_rect(),
                uv,
                egui::Color32::WHITE,
            );
        }
    }

    fn export_aligned(&mut self) {
        if self.job.is_some() {
            return;
        }
        let sources: Vec<(Panorama, Orientation, PathBuf)> = [Slot::A, Slot::B]
            .into_iter()
            .filter_map(|slot| {
                let source = self.session.source(slot)?;
                let path = self.paths[slot_index(slot)].as_deref()?;
                Some((
                    source.panorama.clone(),
                    source.orientation,
                    aligned_output_path(path),
                ))
            })
            .collect();
        if sources.is_empty() {
            self.status = Some("Nothing to export".to_string());
            return;
        }

        let job = Job::new("Exporting aligned");
        let (cancel, progress) = (job.cancel.clone(), job.progress.clone());
        let chunk_rows = self.config.chunk_rows;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let text = run_aligned_export(sources, chunk_rows, &cancel, &progress);
            finish(&tx, text);
        });
        self.job = Some(job);
    }

    fn export_tiles(&mut self) {
        if self.job.is_some() {
            return;
        }
        let Some(source) = self
            .session
            .source(Slot::A)
            .or_else(|| self.session.source(Slot::B))
        else {
            self.status = Some("Nothing to export".to_string());
            return;
        };
        let tiles = match self
            .config
            .plan_request()
            .and_then(|(layout, params)| plan(layout, &params))
        {
            Ok(tiles) => tiles,
            Err(e) => {
                error!("{e}");
                self.status = Some(e.to_string());
                return;
            }
        };
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };

        let job = Job::new("Exporting tiles");
        let export = TileExport {
            panorama: source.panorama.clone(),
            orientation: source.orientation,
            tiles,
            dir,
            chunk_rows: self.config.chunk_rows,
            collage: self.config.layout == LayoutKind::Cubemap,
        };
        let (cancel, progress) = (job.cancel.clone(), job.progress.clone());
        let tx = self.tx.clone();
        thread::spawn(move || {
            let text = export.run(&cancel, &progress);
            finish(&tx, text);
        });
        self.job = Some(job);
    }
}

fn finish(tx: &Sender<Message>, text: String) {
    if tx.send(Message::JobFinished(text)).is_err() {
        warn!("viewer closed before the export finished");
    }
}

fn run_aligned_export(
    sources: Vec<(Panorama, Orientation, PathBuf)>,
    chunk_rows: u32,
    cancel: &CancelToken,
    progress: &Progress,
) -> String {
    let mut written = Vec::new();
    for (panorama, orientation, out) in sources {
        match reproject_chunked(&orientation, &panorama, chunk_rows, cancel, progress) {
            JobOutcome::Completed(image) => {
                if let Err(e) = image.save(&out) {
                    return format!("Export failed: {}: {e}", out.display());
                }
                written.push(out.display().to_string());
            }
            JobOutcome::Cancelled => return "Export cancelled".to_string(),
        }
    }
    format!("Wrote {}", written.join(", "))
}

struct TileExport {
    panorama: Panorama,
    orientation: Orientation,
    tiles: Vec<TileSpec>,
    dir: PathBuf,
    chunk_rows: u32,
    collage: bool,
}

impl TileExport {
    fn run(self, cancel: &CancelToken, progress: &Progress) -> String {
        // Tiles are cut from the levelled source.
        let source = if self.orientation.is_identity() {
            self.panorama
        } else {
            let levelled = match reproject_chunked(
                &self.orientation,
                &self.panorama,
                self.chunk_rows,
                cancel,
                progress,
            ) {
                JobOutcome::Completed(image) => image,
                JobOutcome::Cancelled => return "Tile export cancelled".to_string(),
            };
            match Panorama::new(levelled) {
                Ok(p) => p,
                Err(e) => return format!("Tile export failed: {e}"),
            }
        };

        let rendered = match render_tiles(&source, &self.tiles, cancel, progress) {
            JobOutcome::Completed(rendered) => rendered,
            JobOutcome::Cancelled => return "Tile export cancelled".to_string(),
        };
        for tile in &rendered {
            let path = self.dir.join(format!("{}.png", tile.name));
            if let Err(e) = tile.image.save(&path) {
                return format!("Tile export failed: {}: {e}", path.display());
            }
        }
        if self.collage {
            match CubeFaces::from_tiles(&rendered).and_then(|faces| cube_grid(&faces, 0)) {
                Ok(sheet) => {
                    let path = self.dir.join("cube_grid.png");
                    if let Err(e) = sheet.save(&path) {
                        warn!("could not write {}: {e}", path.display());
                    }
                }
                Err(e) => warn!("{e}"),
            }
        }
        format!("Wrote {} tiles to {}", rendered.len(), self.dir.display())
    }
}

fn main() {
    env_logger::init();

    let config = match Config::discover(None) {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; using defaults");
            Config::default()
        }
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title("Panoview")
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(e) => {
            error!("could not create window: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone())) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let (tx, rx): (Sender<Message>, Receiver<Message>) = channel();
    let mut app = App::new(config, tx);
    for (slot, path) in [Slot::A, Slot::B].into_iter().zip(std::env::args_os().skip(1)) {
        app.load(slot, PathBuf::from(path));
    }

    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;

    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        while let Ok(message) = rx.try_recv() {
            app.handle_message(message);
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => app.open_dialog(Slot::A),
                                Some(VirtualKeyCode::B) => app.open_dialog(Slot::B),
                                Some(VirtualKeyCode::F11) => {
                                    toggle_fullscreen(&mut app, &window);
                                }
                                Some(VirtualKeyCode::Escape) => {
                                    if let Some(job) = &app.job {
                                        job.cancel.cancel();
                                    }
                                }
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if !mouse_pressed {
                                last_mouse_pos = None;
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                app.session.drag(
                                    position.x - last_pos.x,
                                    position.y - last_pos.y,
                                    renderer.size.width,
                                    renderer.size.height,
                                );
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y as f64,
                            MouseScrollDelta::PixelDelta(pos) => pos.y / 20.0,
                        };
                        app.session.zoom(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        let slot = if app.session.source(Slot::A).is_some()
                            && app.session.source(Slot::B).is_none()
                        {
                            Slot::B
                        } else {
                            Slot::A
                        };
                        app.load(slot, path);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                app.update_frame(&renderer.egui_ctx, renderer.size.width, renderer.size.height);

                let render_result = renderer.render_with_ui(&window, |ctx| {
                    app.paint_frame(ctx);
                    draw_ui(ctx, &mut app, &window, fps);
                });

                if app.quit {
                    *control_flow = ControlFlow::Exit;
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => error!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn start_load_image(slot: Slot, path: PathBuf, tx: Sender<Message>) {
    thread::spawn(move || {
        info!("loading {} into {slot:?}", path.display());
        let result = Panorama::open(&path);
        if tx.send(Message::Loaded { slot, path, result }).is_err() {
            warn!("viewer closed before the image arrived");
        }
    });
}

fn toggle_fullscreen(app: &mut App, window: &winit::window::Window) {
    app.is_fullscreen = !app.is_fullscreen;
    if app.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn file_label(path: Option<&Path>) -> String {
    path.and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(none)".to_string())
}

fn orientation_sliders(ui: &mut egui::Ui, app: &mut App, slot: Slot) {
    let Some(o) = app.session.orientation(slot) else {
        ui.label(format!("{slot:?}: no image"));
        return;
    };
    ui.label(format!(
        "{slot:?}: {}",
        file_label(app.paths[slot_index(slot)].as_deref())
    ));
    let (mut pitch, mut yaw, mut roll) = (o.pitch(), o.yaw(), o.roll());
    let mut next = o;
    if ui
        .add(egui::Slider::new(&mut pitch, -180.0..=180.0).text("Pitch"))
        .changed()
    {
        next = next.with_pitch(pitch);
    }
    if ui
        .add(egui::Slider::new(&mut yaw, -180.0..=180.0).text("Yaw"))
        .changed()
    {
        next = next.with_yaw(yaw);
    }
    if ui
        .add(egui::Slider::new(&mut roll, -180.0..=180.0).text("Roll"))
        .changed()
    {
        next = next.with_roll(roll);
    }
    if next != o {
        app.session.set_orientation(slot, next);
    }
    if ui.button("Level").clicked() {
        app.session.set_orientation(slot, Orientation::IDENTITY);
    }
}

fn draw_ui(ctx: &egui::Context, app: &mut App, window: &winit::window::Window, fps: f32) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open image A…").clicked() {
                    ui.close_menu();
                    app.open_dialog(Slot::A);
                }
                if ui.button("Open image B…").clicked() {
                    ui.close_menu();
                    app.open_dialog(Slot::B);
                }
                ui.separator();
                let idle = app.job.is_none();
                if ui
                    .add_enabled(idle, egui::Button::new("Export aligned"))
                    .clicked()
                {
                    ui.close_menu();
                    app.export_aligned();
                }
                if ui
                    .add_enabled(idle, egui::Button::new("Export tiles…"))
                    .clicked()
                {
                    ui.close_menu();
                    app.export_tiles();
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    app.quit = true;
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset view").clicked() {
                    app.session.reset_view();
                    ui.close_menu();
                }
                let label = if app.is_fullscreen {
                    "Exit fullscreen"
                } else {
                    "Fullscreen"
                };
                if ui.button(label).clicked() {
                    toggle_fullscreen(app, window);
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button("Input sensitivity", |ui| {
                    ui.add(
                        egui::Slider::new(&mut app.session.sensitivity_scale, 0.1..=5.0)
                            .text("×"),
                    );
                    if ui.button("Reset to 1.0").clicked() {
                        app.session.sensitivity_scale = 1.0;
                    }
                });

                ui.separator();
                ui.checkbox(&mut app.show_orientation, "Orientation panel");
                ui.checkbox(&mut app.show_fps, "Show FPS");
            });

            ui.menu_button("Compare", |ui| {
                ui.radio_value(&mut app.compare, CompareKind::A, "Image A");
                ui.radio_value(&mut app.compare, CompareKind::B, "Image B");
                ui.radio_value(&mut app.compare, CompareKind::Blend, "Blend");
                ui.radio_value(&mut app.compare, CompareKind::Split, "Split");
                ui.separator();
                ui.add(egui::Slider::new(&mut app.blend_alpha, 0.0..=1.0).text("Alpha"));
                let width = app.frame_key.as_ref().map_or(0, |k| k.view.width);
                let mut boundary = app.split.unwrap_or(width / 2);
                if ui
                    .add(egui::Slider::new(&mut boundary, 0..=width).text("Split"))
                    .changed()
                {
                    app.split = Some(boundary);
                }
                if ui.button("Split at centre").clicked() {
                    app.split = None;
                }
                ui.separator();
                if ui.button("Swap A/B").clicked() {
                    app.swap_sources();
                    ui.close_menu();
                }
            });
        });
    });

    let mut show_orientation = app.show_orientation;
    egui::Window::new("Orientation")
        .open(&mut show_orientation)
        .resizable(false)
        .show(ctx, |ui| {
            orientation_sliders(ui, app, Slot::A);
            ui.separator();
            orientation_sliders(ui, app, Slot::B);
        });
    app.show_orientation = show_orientation;

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if app.loading > 0 {
                ui.label(egui::RichText::new("Loading…").color(egui::Color32::YELLOW));
                ui.label("|");
            }
            if let Some(job) = &app.job {
                ui.label(job.label);
                ui.add(egui::ProgressBar::new(job.progress.fraction()).desired_width(120.0));
                if ui.button("Cancel").clicked() {
                    job.cancel.cancel();
                }
                ui.label("|");
            }

            ui.label(format!("Mode: {:?}", app.compare));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", app.session.fov));
            ui.label("|");
            ui.label(format!("Yaw: {:.1}°", app.session.camera.yaw()));
            ui.label("|");
            ui.label(format!("Pitch: {:.1}°", app.session.camera.pitch()));

            if app.show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {fps:.1}")).color(egui::Color32::GREEN));
            }
            if let Some(status) = &app.status {
                ui.label("|");
                ui.label(status.as_str());
            }
        });
    });
}
