#![allow(clippy::unwrap_used)]
use super::*;
use crate::dataset::FeatureTemplate;
use crate::file::png_data_url;
use crate::input::Refusal;
use image::Rgba;
use std::collections::BTreeSet;
use std::sync::Arc;

const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

fn solid_url(width: u32, height: u32, color: Rgba<u8>) -> String {
    png_data_url(&RgbaImage::from_pixel(width, height, color)).unwrap()
}

fn config_with_brush(size: u32) -> MarkerConfig {
    MarkerConfig {
        brush_url: solid_url(size, size, GREEN),
        ..Default::default()
    }
}

/// Marker with a loaded `width` x `height` source, a 10x10 brush, the canvas
/// attached and feature 0 active
async fn ready_marker(width: u32, height: u32, templates: &[FeatureTemplate]) -> ImageMarker {
    let mut marker = ImageMarker::new(config_with_brush(10));
    marker.attach_canvas();
    marker.set_sample(Sample::from_templates(
        solid_url(width, height, BLUE),
        templates,
    ));
    marker.settle().await;
    marker.set_active_feature(Some(0), Refresh::Redraw);
    assert!(!marker.is_busy());
    marker
}

fn coverage(marker: &ImageMarker, feature: usize) -> BTreeSet<(u32, u32)> {
    marker
        .sample()
        .and_then(|sample| sample.feature(feature))
        .and_then(Feature::heatmap)
        .map(|raster| raster.coverage().into_iter().collect())
        .unwrap_or_default()
}

fn rect(x: std::ops::Range<u32>, y: std::ops::Range<u32>) -> BTreeSet<(u32, u32)> {
    x.flat_map(|px| y.clone().map(move |py| (px, py))).collect()
}

fn drain(marker: &mut ImageMarker) -> Vec<MarkerEvent> {
    let mut events = Vec::new();
    marker.drain_events(&mut events);
    events
}

#[tokio::test]
async fn test_loads_report_ready_events() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;

    let events = drain(&mut marker);
    assert!(events.contains(&MarkerEvent::SourceReady {
        width: 100,
        height: 100
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, MarkerEvent::BrushReady { width: 10, height: 10, .. })));

    assert_eq!(marker.canvas_size(), (100, 100));
    assert_eq!(marker.canvas().unwrap().dimensions(), (100, 100));
    let raster = marker.active_feature().and_then(Feature::heatmap).unwrap();
    assert_eq!(raster.dimensions(), (100, 100));
}

#[tokio::test]
async fn test_stroke_fills_gap_between_points() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;

    let down = marker.handle_pointer(PointerEvent::down_at(20.0, 20.0));
    assert!(matches!(down, StrokeAction::Started { stamps: 1, .. }));
    assert_eq!(coverage(&marker, 0), rect(15..25, 15..25));

    let moved = marker.handle_pointer(PointerEvent::move_to(40.0, 20.0));
    assert!(matches!(moved, StrokeAction::Continued { stamps: 5, .. }));
    assert_eq!(coverage(&marker, 0), rect(15..45, 15..25));

    let up = marker.handle_pointer(PointerEvent::up_at(40.0, 20.0));
    assert!(matches!(up, StrokeAction::Ended { .. }));
    assert!(!marker.controller().is_painting());

    // Moves after release paint nothing
    assert_eq!(
        marker.handle_pointer(PointerEvent::move_to(80.0, 80.0)),
        StrokeAction::Ignored
    );
    assert_eq!(coverage(&marker, 0), rect(15..45, 15..25));

    // The overlay reaches the visible canvas
    let canvas = marker.canvas().unwrap();
    assert_eq!(*canvas.get_pixel(30, 20), GREEN);
    assert_eq!(*canvas.get_pixel(60, 60), BLUE);
}

#[tokio::test]
async fn test_data_updated_on_each_painting_event() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    drain(&mut marker);

    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    marker.pointer_move((30.0, 20.0));
    marker.pointer_up();

    let events = drain(&mut marker);
    assert_eq!(
        events,
        vec![
            MarkerEvent::DataUpdated { feature: 0 },
            MarkerEvent::DataUpdated { feature: 0 },
        ]
    );
}

#[tokio::test]
async fn test_pointer_down_while_busy_leaves_raster_untouched() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    let brush_url = marker.config().brush_url.clone();
    marker.set_brush(brush_url);
    assert!(marker.is_busy());
    assert!(marker.is_loading(LoadKind::Brush));

    let action = marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    assert_eq!(action, StrokeAction::Refused(Refusal::Busy));
    assert!(coverage(&marker, 0).is_empty());
    assert!(!marker.controller().is_painting());

    marker.settle().await;
    assert!(matches!(
        marker.pointer_down((20.0, 20.0), (20.0, 20.0)),
        StrokeAction::Started { .. }
    ));
}

#[tokio::test]
async fn test_moves_while_busy_are_dropped() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    let brush_url = marker.config().brush_url.clone();
    marker.set_brush(brush_url);

    assert_eq!(
        marker.pointer_move((40.0, 20.0)),
        StrokeAction::Refused(Refusal::Busy)
    );
    assert_eq!(coverage(&marker, 0), rect(15..25, 15..25));
    assert!(marker.controller().is_painting());
}

#[tokio::test]
async fn test_display_scaling() {
    let mut marker = ready_marker(200, 100, &[FeatureTemplate::heatmap()]).await;
    marker.set_display_size(100.0, 50.0);

    // Canvas sits at (100, 100) on the page
    marker.pointer_down((10.0, 10.0), (110.0, 110.0));
    assert_eq!(coverage(&marker, 0), rect(15..25, 15..25));

    // (120, 110) on the page is (20, 10) on the canvas, (40, 20) in the image
    marker.pointer_move((120.0, 110.0));
    assert_eq!(coverage(&marker, 0), rect(15..45, 15..25));
}

#[tokio::test]
async fn test_invalid_display_size_is_ignored() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.set_display_size(0.0, 50.0);
    marker.set_display_size(f32::NAN, 50.0);

    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    assert_eq!(coverage(&marker, 0), rect(15..25, 15..25));
}

#[tokio::test]
async fn test_switching_feature_keeps_painting() {
    let templates = [FeatureTemplate::heatmap(), FeatureTemplate::heatmap()];
    let mut marker = ready_marker(100, 100, &templates).await;

    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    marker.pointer_up();

    marker.set_active_feature(Some(1), Refresh::Redraw);
    assert!(coverage(&marker, 1).is_empty());
    assert_eq!(*marker.canvas().unwrap().get_pixel(20, 20), BLUE);

    marker.pointer_down((70.0, 70.0), (70.0, 70.0));
    marker.pointer_up();

    marker.set_active_feature(Some(0), Refresh::Redraw);
    assert_eq!(coverage(&marker, 0), rect(15..25, 15..25));
    assert_eq!(coverage(&marker, 1), rect(65..75, 65..75));
    assert_eq!(*marker.canvas().unwrap().get_pixel(20, 20), GREEN);
}

#[tokio::test]
async fn test_switching_feature_cancels_stroke() {
    let templates = [FeatureTemplate::heatmap(), FeatureTemplate::heatmap()];
    let mut marker = ready_marker(100, 100, &templates).await;

    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    marker.set_active_feature(Some(1), Refresh::Silent);
    assert!(!marker.controller().is_painting());

    assert_eq!(marker.pointer_move((40.0, 20.0)), StrokeAction::Ignored);
    assert!(coverage(&marker, 1).is_empty());
}

#[tokio::test]
async fn test_silent_feature_change_skips_redraw() {
    let templates = [FeatureTemplate::heatmap(), FeatureTemplate::heatmap()];
    let mut marker = ready_marker(100, 100, &templates).await;
    let frames = marker.compositor.frames();

    marker.set_active_feature(Some(1), Refresh::Silent);
    assert_eq!(marker.compositor.frames(), frames);

    marker.set_active_feature(Some(0), Refresh::Redraw);
    assert_eq!(marker.compositor.frames(), frames + 1);
}

#[tokio::test]
async fn test_non_heatmap_and_missing_features_refuse() {
    let templates = [FeatureTemplate::heatmap(), FeatureTemplate::new("bbox")];
    let mut marker = ready_marker(100, 100, &templates).await;

    marker.set_active_feature(Some(1), Refresh::Redraw);
    assert_eq!(
        marker.pointer_down((20.0, 20.0), (20.0, 20.0)),
        StrokeAction::Refused(Refusal::NotHeatmap)
    );

    marker.set_active_feature(Some(7), Refresh::Redraw);
    assert_eq!(marker.active_feature_index(), None);
    assert_eq!(
        marker.pointer_down((20.0, 20.0), (20.0, 20.0)),
        StrokeAction::Refused(Refusal::NoActiveFeature)
    );
}

#[tokio::test]
async fn test_set_sample_returns_previous_and_cancels_stroke() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.pointer_down((20.0, 20.0), (20.0, 20.0));

    let next = Sample::from_templates(solid_url(50, 40, BLUE), &[FeatureTemplate::heatmap()]);
    let previous = marker.set_sample(next).unwrap();

    assert!(!marker.controller().is_painting());
    assert_eq!(marker.active_feature_index(), None);
    assert!(marker.source_image().is_none());
    let painted = previous.feature(0).and_then(Feature::heatmap).unwrap();
    assert_eq!(painted.coverage().len(), 100);

    marker.settle().await;
    assert_eq!(marker.canvas_size(), (50, 40));
    marker.set_active_feature(Some(0), Refresh::Redraw);
    let raster = marker.active_feature().and_then(Feature::heatmap).unwrap();
    assert_eq!(raster.dimensions(), (50, 40));
    assert!(raster.coverage().is_empty());
}

#[tokio::test]
async fn test_raster_unallocated_until_source_loads() {
    let mut marker = ImageMarker::new(config_with_brush(10));
    marker.set_sample(Sample::from_templates(
        solid_url(30, 30, BLUE),
        &[FeatureTemplate::heatmap()],
    ));
    marker.set_active_feature(Some(0), Refresh::Silent);

    assert_eq!(
        marker.pointer_down((5.0, 5.0), (5.0, 5.0)),
        StrokeAction::Refused(Refusal::Busy)
    );

    marker.settle().await;
    let raster = marker.active_feature().and_then(Feature::heatmap).unwrap();
    assert_eq!(raster.dimensions(), (30, 30));
}

#[tokio::test]
async fn test_stale_completion_is_discarded() {
    let mut marker = ImageMarker::new(config_with_brush(10));
    marker.settle().await;

    marker.set_sample(Sample::from_templates(
        solid_url(20, 10, BLUE),
        &[FeatureTemplate::heatmap()],
    ));
    let ticket = marker.pending[&LoadKind::Source].ticket;

    marker
        .completions_tx
        .send(LoadCompletion {
            kind: LoadKind::Source,
            ticket: ticket - 1,
            result: Ok(LoadedImage {
                url: "stale.png".to_string(),
                image: Arc::new(RgbaImage::new(99, 99)),
            }),
        })
        .unwrap();

    assert_eq!(marker.poll_loads(), 0);
    assert!(marker.source_image().is_none());
    assert!(marker.is_loading(LoadKind::Source));

    marker.settle().await;
    assert_eq!(marker.canvas_size(), (20, 10));
}

#[tokio::test]
async fn test_superseded_sample_load_is_dropped() {
    let mut marker = ImageMarker::new(config_with_brush(10));
    marker.settle().await;

    marker.set_sample(Sample::from_templates(solid_url(20, 10, BLUE), &[]));
    marker.set_sample(Sample::from_templates(solid_url(8, 6, BLUE), &[]));
    marker.settle().await;

    assert_eq!(marker.canvas_size(), (8, 6));
    let ready: Vec<_> = drain(&mut marker)
        .into_iter()
        .filter(|e| matches!(e, MarkerEvent::SourceReady { .. }))
        .collect();
    assert_eq!(
        ready,
        vec![MarkerEvent::SourceReady {
            width: 8,
            height: 6
        }]
    );
}

#[tokio::test]
async fn test_load_failure_clears_busy() {
    let dir = tempfile::tempdir().unwrap();
    let mut marker = ImageMarker::new(MarkerConfig {
        asset_root: dir.path().to_path_buf(),
        brush_url: "missing.png".to_string(),
        ..Default::default()
    });
    assert!(marker.is_busy());

    marker.settle().await;
    assert!(!marker.is_busy());
    assert!(marker.brush().is_none());

    let events = drain(&mut marker);
    assert!(matches!(
        events.as_slice(),
        [MarkerEvent::LoadFailed { kind: LoadKind::Brush, url, .. }] if url == "missing.png"
    ));
}

#[tokio::test]
async fn test_missing_brush_refuses_painting() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.set_brush("data:image/png;base64,aGVsbG8=");
    marker.settle().await;

    assert!(marker.brush().is_none());
    assert_eq!(
        marker.pointer_down((20.0, 20.0), (20.0, 20.0)),
        StrokeAction::Refused(Refusal::NoBrush)
    );
}

#[tokio::test]
async fn test_brush_change_sets_stroke_spacing() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.set_brush(solid_url(4, 4, GREEN));
    marker.settle().await;

    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    // Step of 2px over 20px
    assert!(matches!(
        marker.pointer_move((40.0, 20.0)),
        StrokeAction::Continued { stamps, .. } if stamps >= 11
    ));
    assert_eq!(coverage(&marker, 0), rect(18..42, 18..22));
}

#[tokio::test]
async fn test_clear_wipes_active_raster() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    marker.pointer_up();
    drain(&mut marker);

    marker.clear();
    assert!(coverage(&marker, 0).is_empty());
    assert_eq!(drain(&mut marker), vec![MarkerEvent::DataUpdated { feature: 0 }]);
    assert_eq!(*marker.canvas().unwrap().get_pixel(20, 20), BLUE);
}

#[tokio::test]
async fn test_teardown_releases_stroke_and_loads() {
    let mut marker = ready_marker(100, 100, &[FeatureTemplate::heatmap()]).await;
    marker.pointer_down((20.0, 20.0), (20.0, 20.0));
    marker.set_brush(solid_url(4, 4, GREEN));

    marker.teardown();
    assert!(!marker.controller().is_painting());
    assert!(!marker.is_busy());
    assert!(marker.canvas().is_none());

    // Painted data survives for persistence
    let sample = marker.take_sample().unwrap();
    let record = sample.feature(0).unwrap().to_record().unwrap();
    assert!(record.heatmap_png().is_some());
}

#[test]
fn test_no_runtime_reports_load_failure() {
    let mut marker = ImageMarker::new(config_with_brush(10));
    assert!(!marker.is_busy());
    assert!(matches!(
        drain(&mut marker).as_slice(),
        [MarkerEvent::LoadFailed {
            kind: LoadKind::Brush,
            ..
        }]
    ));
}

#[test]
fn test_event_serialization() {
    let json = serde_json::to_string(&MarkerEvent::DataUpdated { feature: 2 }).unwrap();
    assert_eq!(json, r#"{"event":"data-updated","feature":2}"#);

    let json = serde_json::to_string(&MarkerEvent::LoadFailed {
        kind: LoadKind::Source,
        url: "a.png".to_string(),
        message: "gone".to_string(),
    })
    .unwrap();
    assert_eq!(
        json,
        r#"{"event":"load-failed","kind":"source","url":"a.png","message":"gone"}"#
    );
}
