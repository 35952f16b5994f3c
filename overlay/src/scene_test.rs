#![allow(clippy::float_cmp)]

use super::*;
use crate::circle::circle_template;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn raster() -> Raster {
    Raster { width: 4, height: 6, pixels: vec![0; 4 * 6 * 4] }
}

fn add_image(scene: &MemoryScene) -> DrawableId {
    let raster = raster();
    scene
        .add_image(ImageDrawable {
            raster: &raster,
            offset: Offset { x: 2, y: 3 },
            position: MapPoint::new(0.0, 0.0),
            hidden: false,
            priority: 100,
        })
        .unwrap()
}

fn add_ring(scene: &MemoryScene) -> DrawableId {
    scene
        .add_polygon(PolygonDrawable {
            outline: circle_template(),
            style: PolygonStyle::accuracy_ring(),
            position: MapPoint::default(),
            hidden: true,
            priority: 99,
        })
        .unwrap()
}

// --- Registration ---

#[test]
fn add_image_copies_raster_size() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let state = scene.drawable(id).unwrap();
    assert_eq!(state.kind, DrawableKind::Image);
    assert_eq!((state.width, state.height), (4, 6));
    assert_eq!(state.offset, Offset { x: 2, y: 3 });
    assert_eq!(state.scale, 1.0);
    assert_eq!(state.rotation, 0.0);
}

#[test]
fn add_polygon_rejects_degenerate_outline() {
    let scene = MemoryScene::new(1.0);
    let err = scene
        .add_polygon(PolygonDrawable {
            outline: vec![MapPoint::default(); 2],
            style: PolygonStyle::accuracy_ring(),
            position: MapPoint::default(),
            hidden: false,
            priority: 0,
        })
        .unwrap_err();
    assert!(matches!(err, OverlayError::Scene(_)));
}

#[test]
fn refused_scene_logs_nothing() {
    let scene = MemoryScene::new(1.0);
    scene.refuse_new_drawables(true);
    let raster = raster();
    let result = scene.add_image(ImageDrawable {
        raster: &raster,
        offset: Offset::default(),
        position: MapPoint::default(),
        hidden: false,
        priority: 0,
    });
    assert!(result.is_err());
    assert!(scene.ops().is_empty());
}

#[test]
fn drawables_sorted_by_priority() {
    let scene = MemoryScene::new(1.0);
    let image = add_image(&scene);
    let ring = add_ring(&scene);
    let order: Vec<DrawableId> = scene.drawables().iter().map(|d| d.id).collect();
    assert_eq!(order, vec![ring, image]);
}

#[test]
fn remove_is_reported_once() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    assert!(scene.remove(id));
    assert!(!scene.remove(id));
    assert!(scene.is_empty());
}

// --- Immediate changes ---

#[test]
fn set_applies_and_logs() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    scene.set(id, Property::Rotation(-45.0));
    assert_eq!(scene.drawable(id).unwrap().rotation, -45.0);
    assert_eq!(scene.ops().last(), Some(&SceneOp::Set(PropertyChange { id, property: Property::Rotation(-45.0) })));
}

#[test]
fn set_on_unknown_drawable_is_ignored() {
    let scene = MemoryScene::new(1.0);
    scene.set(Uuid::new_v4(), Property::Hidden(true));
    assert!(scene.ops().is_empty());
}

// --- Animation ---

#[test]
fn animate_does_not_jump() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(1.0, Easing::Linear);
    batch.push(id, Property::Position(MapPoint::new(10.0, 20.0)));
    scene.animate(batch);
    assert_eq!(scene.drawable(id).unwrap().position, MapPoint::new(0.0, 0.0));
    assert_eq!(scene.in_flight(), 1);
    assert_eq!(scene.animation_count(), 1);
}

#[test]
fn advance_interpolates_linearly() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(2.0, Easing::Linear);
    batch.push(id, Property::Position(MapPoint::new(10.0, 20.0)));
    batch.push(id, Property::Scale(3.0));
    scene.animate(batch);

    scene.advance(0.5);
    let state = scene.drawable(id).unwrap();
    assert!(approx_eq(state.position.x, 2.5));
    assert!(approx_eq(state.position.y, 5.0));
    assert!(approx_eq(state.scale, 1.5));

    scene.advance(1.5);
    let state = scene.drawable(id).unwrap();
    assert_eq!(state.position, MapPoint::new(10.0, 20.0));
    assert_eq!(state.scale, 3.0);
    assert_eq!(scene.in_flight(), 0);
}

#[test]
fn batch_changes_move_in_lock_step() {
    let scene = MemoryScene::new(1.0);
    let a = add_image(&scene);
    let b = add_image(&scene);
    let mut batch = AnimationBatch::new(1.0, Easing::Linear);
    batch.push(a, Property::Position(MapPoint::new(100.0, 0.0)));
    batch.push(b, Property::Position(MapPoint::new(100.0, 0.0)));
    scene.animate(batch);

    scene.advance(0.3);
    assert_eq!(scene.drawable(a).unwrap().position, scene.drawable(b).unwrap().position);
}

#[test]
fn new_batch_starts_from_mid_flight_value() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut first = AnimationBatch::new(1.0, Easing::Linear);
    first.push(id, Property::Position(MapPoint::new(100.0, 0.0)));
    scene.animate(first);
    scene.advance(0.5);

    let mut second = AnimationBatch::new(1.0, Easing::Linear);
    second.push(id, Property::Position(MapPoint::new(0.0, 0.0)));
    scene.animate(second);
    assert_eq!(scene.in_flight(), 1);

    scene.advance(0.5);
    assert!(approx_eq(scene.drawable(id).unwrap().position.x, 25.0));
}

#[test]
fn zero_duration_batch_applies_immediately() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(0.0, Easing::Linear);
    batch.push(id, Property::Rotation(90.0));
    scene.animate(batch);
    assert_eq!(scene.drawable(id).unwrap().rotation, 90.0);
    assert_eq!(scene.in_flight(), 0);
}

#[test]
fn hidden_in_batch_is_not_interpolated() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(1.0, Easing::Linear);
    batch.push(id, Property::Hidden(true));
    scene.animate(batch);
    assert!(scene.drawable(id).unwrap().hidden);
    assert_eq!(scene.in_flight(), 0);
}

#[test]
fn set_cancels_running_track_for_same_property() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(1.0, Easing::Linear);
    batch.push(id, Property::Scale(5.0));
    scene.animate(batch);
    scene.set(id, Property::Scale(2.0));
    scene.settle();
    assert_eq!(scene.drawable(id).unwrap().scale, 2.0);
}

#[test]
fn settle_reaches_targets() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(10.0, Easing::EaseInOut);
    batch.push(id, Property::Rotation(-90.0));
    scene.animate(batch);
    scene.settle();
    assert_eq!(scene.drawable(id).unwrap().rotation, -90.0);
    assert_eq!(scene.in_flight(), 0);
}

#[test]
fn remove_drops_running_tracks() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut batch = AnimationBatch::new(1.0, Easing::Linear);
    batch.push(id, Property::Scale(5.0));
    scene.animate(batch);
    scene.remove(id);
    assert_eq!(scene.in_flight(), 0);
}

#[test]
fn last_animation_returns_latest_batch() {
    let scene = MemoryScene::new(1.0);
    let id = add_image(&scene);
    let mut first = AnimationBatch::new(1.0, Easing::Linear);
    first.push(id, Property::Scale(2.0));
    scene.animate(first);
    let mut second = AnimationBatch::new(1.0, Easing::Linear);
    second.push(id, Property::Scale(4.0));
    scene.animate(second.clone());
    assert_eq!(scene.last_animation(), Some(second));
}

// --- Easing ---

#[test]
fn easing_endpoints_are_fixed() {
    for easing in [Easing::Linear, Easing::EaseInOut] {
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(1.0), 1.0);
    }
}

#[test]
fn ease_in_out_is_symmetric_at_midpoint() {
    assert!(approx_eq(Easing::EaseInOut.apply(0.5), 0.5));
    assert!(Easing::EaseInOut.apply(0.25) < 0.25);
}

#[test]
fn easing_clamps_progress() {
    assert_eq!(Easing::Linear.apply(2.0), 1.0);
    assert_eq!(Easing::Linear.apply(-1.0), 0.0);
}

// --- Log serialization ---

#[test]
fn scene_op_serializes_with_tag() {
    let id = Uuid::nil();
    let op = SceneOp::Set(PropertyChange { id, property: Property::Scale(0.5) });
    let json = serde_json::to_value(&op).unwrap();
    assert_eq!(json["op"], "set");
    assert_eq!(json["property"]["kind"], "scale");
    assert_eq!(json["property"]["value"], 0.5);
}

#[test]
fn scene_delegates_projection() {
    let scene = MemoryScene::centered_on(GeoPoint::new(60.0, 0.0), 1.0);
    let expected = WebMercator::with_reference_lat(60.0).meters_to_map_units(10.0, 1.0);
    assert_eq!(scene.meters_to_map_units(10.0, 1.0), expected);
}
