//! Image marker - the component surface the host drives
//!
//! Owns the active sample, the loaded source image and brush, the stroke
//! state machine and the compositor. Everything runs on the caller's task:
//! pointer events are handled to completion one at a time, and image decodes
//! report back through a channel the host drains with [`ImageMarker::next_load`],
//! [`ImageMarker::poll_loads`] or [`ImageMarker::settle`].

use crate::brush::Brush;
use crate::config::{CropMode, MarkerConfig};
use crate::dataset::{Feature, Sample};
use crate::file::{url_for_log, ImageLoader, LoadError, LoadKind, LoadedImage};
use crate::input::{paint_gate, CoordinateMapper, InputController, PointerEvent, StrokeAction};
use crate::render::Compositor;
use image::RgbaImage;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[cfg(test)]
mod tests;

/// Notifications for the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MarkerEvent {
    /// The raster of `feature` changed and may be persisted
    DataUpdated { feature: usize },
    SourceReady { width: u32, height: u32 },
    BrushReady { url: String, width: u32, height: u32 },
    LoadFailed {
        kind: LoadKind,
        url: String,
        message: String,
    },
}

/// Whether a state change should redraw the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    Silent,
    #[default]
    Redraw,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: u64,
    url: String,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct LoadCompletion {
    kind: LoadKind,
    ticket: u64,
    result: Result<LoadedImage, LoadError>,
}

pub struct ImageMarker {
    config: MarkerConfig,
    loader: ImageLoader,
    sample: Option<Sample>,
    active_feature: Option<usize>,
    source: Option<LoadedImage>,
    brush: Option<Brush>,
    /// Outstanding loads; non-empty means busy
    pending: HashMap<LoadKind, PendingLoad>,
    next_ticket: u64,
    completions_tx: mpsc::UnboundedSender<LoadCompletion>,
    completions_rx: mpsc::UnboundedReceiver<LoadCompletion>,
    /// CSS size of the canvas element, if it differs from its pixel size
    display_size: Option<(f32, f32)>,
    controller: InputController,
    compositor: Compositor,
    events: VecDeque<MarkerEvent>,
}

impl ImageMarker {
    /// Create the component and start loading the configured brush.
    ///
    /// Loads are spawned on the current Tokio runtime; without one they fail
    /// with a `LoadFailed` event.
    pub fn new(config: MarkerConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let brush_url = config.brush_url.clone();

        let mut marker = Self {
            loader: ImageLoader::new(config.asset_root.clone()),
            config,
            sample: None,
            active_feature: None,
            source: None,
            brush: None,
            pending: HashMap::new(),
            next_ticket: 1,
            completions_tx,
            completions_rx,
            display_size: None,
            controller: InputController::new(),
            compositor: Compositor::new(),
            events: VecDeque::new(),
        };
        marker.set_brush(brush_url);
        marker
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    // === Host configuration ===

    /// Attach the visible canvas and draw the current state
    pub fn attach_canvas(&mut self) {
        let (width, height) = self.canvas_size();
        self.compositor.attach(width, height);
        self.render();
    }

    pub fn detach_canvas(&mut self) {
        self.compositor.detach();
    }

    /// Size the canvas is displayed at. Zero or non-finite sizes are ignored.
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.display_size = Some((width, height));
        } else {
            tracing::warn!("Ignoring display size {}x{}", width, height);
        }
    }

    /// Drop a CSS size override; the canvas is shown at its pixel size
    pub fn reset_display_size(&mut self) {
        self.display_size = None;
    }

    pub fn set_crop_mode(&mut self, mode: CropMode) {
        if mode != CropMode::None {
            tracing::debug!("Crop mode {:?} accepted; images render at native size", mode);
        }
        self.config.crop_mode = mode;
    }

    /// Show a new sample and start decoding its source image.
    ///
    /// Any open stroke is released and the active feature is reset. The
    /// previous sample is handed back for persistence.
    pub fn set_sample(&mut self, sample: Sample) -> Option<Sample> {
        self.controller.cancel();
        self.source = None;
        self.active_feature = None;

        let url = sample.file().to_string();
        let previous = self.sample.replace(sample);
        self.start_load(LoadKind::Source, url);
        previous
    }

    /// Point painting at another feature of the current sample.
    ///
    /// An out-of-range index clears the selection. The raster of a heatmap
    /// feature is brought to the source image size when one is loaded.
    pub fn set_active_feature(&mut self, index: Option<usize>, refresh: Refresh) {
        let feature_count = self.sample.as_ref().map_or(0, |s| s.features().len());
        let index = match index {
            Some(i) if i >= feature_count => {
                tracing::warn!("Feature {} out of range ({} features)", i, feature_count);
                None
            }
            other => other,
        };

        if index != self.active_feature {
            self.controller.cancel();
        }
        self.active_feature = index;

        if let Some(source) = &self.source {
            let (width, height) = (source.width(), source.height());
            if let Some(raster) = self.active_feature_mut().and_then(Feature::heatmap_mut) {
                raster.ensure_size(width, height);
            }
        }

        if refresh == Refresh::Redraw {
            self.render();
        }
    }

    /// Select another stamp image. Painting is disabled until it decodes.
    pub fn set_brush(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.brush = None;
        self.config.brush_url = url.clone();
        self.start_load(LoadKind::Brush, url);
    }

    // === State ===

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether a load of `kind` is outstanding
    pub fn is_loading(&self, kind: LoadKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn sample(&self) -> Option<&Sample> {
        self.sample.as_ref()
    }

    pub fn active_feature_index(&self) -> Option<usize> {
        self.active_feature
    }

    pub fn active_feature(&self) -> Option<&Feature> {
        let index = self.active_feature?;
        self.sample.as_ref()?.feature(index)
    }

    fn active_feature_mut(&mut self) -> Option<&mut Feature> {
        let index = self.active_feature?;
        self.sample.as_mut()?.feature_mut(index)
    }

    pub fn source_image(&self) -> Option<&RgbaImage> {
        self.source.as_ref().map(|source| source.image.as_ref())
    }

    pub fn brush(&self) -> Option<&Brush> {
        self.brush.as_ref()
    }

    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.compositor.canvas()
    }

    pub fn controller(&self) -> &InputController {
        &self.controller
    }

    /// Pixel size of the canvas: the source image once loaded
    pub fn canvas_size(&self) -> (u32, u32) {
        match &self.source {
            Some(source) => (source.width(), source.height()),
            None => (self.config.canvas_width, self.config.canvas_height),
        }
    }

    fn mapper(&self) -> Option<CoordinateMapper> {
        let (width, height) = self.canvas_size();
        let (width, height) = (width as f32, height as f32);
        let (display_width, display_height) = self.display_size.unwrap_or((width, height));
        CoordinateMapper::new(width, height, display_width, display_height)
    }

    // === Loading ===

    fn start_load(&mut self, kind: LoadKind, url: String) {
        if let Some(previous) = self.pending.remove(&kind) {
            previous.task.abort();
            tracing::debug!(
                "{:?} load {} superseded ({})",
                kind,
                previous.ticket,
                url_for_log(&previous.url)
            );
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_load(kind, url, e.to_string());
                return;
            }
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        tracing::debug!("{:?} load {} started ({})", kind, ticket, url_for_log(&url));

        let loader = self.loader.clone();
        let tx = self.completions_tx.clone();
        let task_url = url.clone();
        let task = handle.spawn(async move {
            let result = loader.load(&task_url).await;
            // The receiver only goes away with the marker itself
            let _ = tx.send(LoadCompletion {
                kind,
                ticket,
                result,
            });
        });

        self.pending.insert(kind, PendingLoad { ticket, url, task });
    }

    fn fail_load(&mut self, kind: LoadKind, url: String, message: String) {
        tracing::warn!("{:?} load failed ({}): {}", kind, url_for_log(&url), message);
        self.events.push_back(MarkerEvent::LoadFailed { kind, url, message });
    }

    /// Apply a completion. Returns its kind unless it was stale.
    fn complete_load(&mut self, completion: LoadCompletion) -> Option<LoadKind> {
        let kind = completion.kind;
        match self.pending.get(&kind) {
            Some(pending) if pending.ticket == completion.ticket => {}
            _ => {
                tracing::trace!("Discarding stale {:?} load {}", kind, completion.ticket);
                return None;
            }
        }
        let pending = self.pending.remove(&kind)?;

        match completion.result {
            Ok(loaded) => match kind {
                LoadKind::Source => self.source_loaded(loaded),
                LoadKind::Brush => self.brush_loaded(loaded),
            },
            Err(e) => self.fail_load(kind, pending.url, e.to_string()),
        }
        Some(kind)
    }

    fn source_loaded(&mut self, loaded: LoadedImage) {
        let (width, height) = (loaded.width(), loaded.height());
        self.source = Some(loaded);
        self.compositor.resize(width, height);
        if let Some(sample) = self.sample.as_mut() {
            sample.fit_heatmaps(width, height);
        }
        self.events.push_back(MarkerEvent::SourceReady { width, height });
        self.render();
    }

    fn brush_loaded(&mut self, loaded: LoadedImage) {
        let brush = Brush::new(loaded.url, loaded.image);
        self.events.push_back(MarkerEvent::BrushReady {
            url: brush.url().to_string(),
            width: brush.width(),
            height: brush.height(),
        });
        self.brush = Some(brush);
    }

    /// Wait for the next load to finish and apply it.
    /// Returns `None` straight away when nothing is loading.
    pub async fn next_load(&mut self) -> Option<LoadKind> {
        while self.is_busy() {
            let completion = self.completions_rx.recv().await?;
            if let Some(kind) = self.complete_load(completion) {
                return Some(kind);
            }
        }
        None
    }

    /// Apply every load that has already finished, without waiting
    pub fn poll_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.complete_load(completion).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until no load is outstanding
    pub async fn settle(&mut self) {
        while self.next_load().await.is_some() {}
    }

    // === Pointer input ===

    pub fn handle_pointer(&mut self, event: PointerEvent) -> StrokeAction {
        match event {
            PointerEvent::Down {
                offset_x,
                offset_y,
                page_x,
                page_y,
            } => self.pointer_down((offset_x, offset_y), (page_x, page_y)),
            PointerEvent::Move { page_x, page_y } => self.pointer_move((page_x, page_y)),
            PointerEvent::Up { .. } => self.pointer_up(),
        }
    }

    pub fn pointer_down(&mut self, offset: (f32, f32), page: (f32, f32)) -> StrokeAction {
        let busy = self.is_busy();
        let mapper = self.mapper();
        let feature = match (self.sample.as_mut(), self.active_feature) {
            (Some(sample), Some(index)) => sample.feature_mut(index),
            _ => None,
        };
        let gate = paint_gate(busy, feature, self.brush.as_ref(), mapper);
        let action = self.controller.pointer_down(offset, page, gate);
        self.after_stroke(action);
        action
    }

    pub fn pointer_move(&mut self, page: (f32, f32)) -> StrokeAction {
        if !self.controller.is_painting() {
            return StrokeAction::Ignored;
        }
        let busy = self.is_busy();
        let mapper = self.mapper();
        let feature = match (self.sample.as_mut(), self.active_feature) {
            (Some(sample), Some(index)) => sample.feature_mut(index),
            _ => None,
        };
        let gate = paint_gate(busy, feature, self.brush.as_ref(), mapper);
        let action = self.controller.pointer_move(page, gate);
        self.after_stroke(action);
        action
    }

    pub fn pointer_up(&mut self) -> StrokeAction {
        self.controller.pointer_up()
    }

    fn after_stroke(&mut self, action: StrokeAction) {
        match action {
            StrokeAction::Started { .. } | StrokeAction::Continued { .. } => {
                if action.mutated() {
                    if let Some(feature) = self.active_feature {
                        self.events.push_back(MarkerEvent::DataUpdated { feature });
                    }
                }
                self.render();
            }
            StrokeAction::Ignored | StrokeAction::Refused(_) | StrokeAction::Ended { .. } => {}
        }
    }

    // === Actions ===

    /// Wipe the active heatmap and redraw
    pub fn clear(&mut self) {
        let Some(index) = self.active_feature else {
            return;
        };
        let Some(raster) = self.active_feature_mut().and_then(Feature::heatmap_mut) else {
            return;
        };
        raster.clear();
        self.events.push_back(MarkerEvent::DataUpdated { feature: index });
        self.render();
    }

    /// Redraw the canvas: source image, then the active heatmap
    pub fn render(&mut self) {
        let source = self.source.as_ref().map(|source| source.image.as_ref());
        let overlay = self
            .active_feature
            .and_then(|index| self.sample.as_ref()?.feature(index))
            .and_then(Feature::heatmap);
        self.compositor.render(source, overlay);
    }

    /// Move queued events into `out`
    pub fn drain_events(&mut self, out: &mut Vec<MarkerEvent>) -> usize {
        let count = self.events.len();
        out.extend(self.events.drain(..));
        count
    }

    /// Release the open stroke and outstanding loads, detach the canvas.
    /// The sample stays available for the host to persist.
    pub fn teardown(&mut self) {
        self.controller.cancel();
        for (kind, pending) in self.pending.drain() {
            pending.task.abort();
            tracing::debug!("{:?} load {} aborted on teardown", kind, pending.ticket);
        }
        self.compositor.detach();
    }

    /// Hand back the current sample, leaving the marker empty
    pub fn take_sample(&mut self) -> Option<Sample> {
        self.controller.cancel();
        self.active_feature = None;
        self.sample.take()
    }
}

impl Drop for ImageMarker {
    fn drop(&mut self) {
        self.controller.cancel();
        for pending in self.pending.values() {
            pending.task.abort();
        }
    }
}
