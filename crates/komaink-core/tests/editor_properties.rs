//! End-to-end behaviour of the editor through its public command surface.

use komaink_core::elements::{ImageStyle, PanelStyle, Transform};
use komaink_core::{
    DropPayload, Editor, EditorConfig, Element, ElementId, ElementPatch, GestureOutcome, Key, Modifiers,
    PlacementError, PointerButton, SequentialIds, ToolKind, ViewTransform, Viewport,
};
use kurbo::{Point, Rect, Size};
use std::collections::HashSet;
use uuid::Uuid;

fn editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EditorConfig {
        rng_seed: Some(7),
        ..EditorConfig::default()
    };
    Editor::with_id_generator(config, Box::new(SequentialIds::new())).unwrap()
}

fn panel_xywh(x: f64, y: f64, w: f64, h: f64) -> Element {
    Element::panel(Uuid::nil(), Rect::new(x, y, x + w, y + h), PanelStyle::default())
}

fn drag(editor: &mut Editor, from: Point, to: Point) -> GestureOutcome {
    editor.pointer_down(from, PointerButton::Primary, Modifiers::NONE);
    editor.pointer_move(to, Modifiers::NONE);
    editor.pointer_up(to, PointerButton::Primary, Modifiers::NONE)
}

fn draw_panel(editor: &mut Editor, x: f64, y: f64, w: f64, h: f64) -> GestureOutcome {
    editor.set_active_tool(ToolKind::Panel);
    drag(editor, Point::new(x, y), Point::new(x + w, y + h))
}

fn image_count(editor: &Editor) -> usize {
    editor.elements().iter().filter(|e| e.is_image()).count()
}

#[test]
fn count_tracks_adds_and_removes_with_unique_ids() {
    let mut editor = editor();
    let mut live = Vec::new();
    for i in 0..12 {
        live.push(editor.add_element(panel_xywh(i as f64 * 30.0, 0.0, 25.0, 25.0)));
    }
    // A duplicate id on insert is reassigned
    let mut clash = panel_xywh(0.0, 500.0, 40.0, 40.0);
    clash.id = live[0];
    live.push(editor.add_element(clash));

    for id in live.drain(..5) {
        assert!(editor.remove_element(id));
    }
    // Stale ids are no-ops
    assert!(!editor.remove_element(Uuid::from_u128(u128::MAX)));

    assert_eq!(editor.elements().len(), 13 - 5);
    let ids: HashSet<ElementId> = editor.elements().iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), editor.elements().len());
}

#[test]
fn undo_and_redo_restore_exact_states() {
    let mut editor = editor();
    let id = editor.add_element(panel_xywh(0.0, 0.0, 200.0, 150.0));
    let before = editor.elements().to_vec();

    assert!(editor.update_element(id, &ElementPatch::new().position(40.0, 60.0).size(220.0, 180.0)));
    let after = editor.elements().to_vec();

    assert!(editor.undo());
    assert_eq!(editor.elements(), before.as_slice());
    assert!(editor.redo());
    assert_eq!(editor.elements(), after.as_slice());

    editor.remove_element(id);
    assert!(editor.undo());
    assert_eq!(editor.elements(), after.as_slice());
}

#[test]
fn removing_selected_element_prunes_selection() {
    let mut editor = editor();
    let a = editor.add_element(panel_xywh(0.0, 0.0, 200.0, 150.0));
    let b = editor.add_element(panel_xywh(300.0, 0.0, 200.0, 150.0));
    editor.select(a);
    assert!(editor.remove_element(a));
    assert!(!editor.selection().contains(&a));
    assert!(editor.store().contains(b));
}

#[test]
fn overlapping_panel_is_rejected() {
    let mut editor = editor();
    assert!(matches!(draw_panel(&mut editor, 0.0, 0.0, 200.0, 150.0), GestureOutcome::Created(_)));
    assert_eq!(editor.elements().len(), 1);

    let outcome = draw_panel(&mut editor, 100.0, 50.0, 200.0, 150.0);
    assert!(matches!(outcome, GestureOutcome::Rejected(PlacementError::Overlap { .. })));
    assert_eq!(editor.elements().len(), 1);
    assert!(editor.preview_rect().is_none());

    let GestureOutcome::Created(id) = draw_panel(&mut editor, 300.0, 0.0, 200.0, 150.0) else {
        panic!("non-overlapping panel should be created");
    };
    assert_eq!(editor.elements().len(), 2);
    assert_eq!(editor.store().get(id).map(|e| e.bounds()), Some(Rect::new(300.0, 0.0, 500.0, 150.0)));
}

#[test]
fn image_drop_outside_panels_adds_nothing() {
    let mut editor = editor();
    editor.add_element(panel_xywh(100.0, 100.0, 300.0, 200.0));
    let payload = DropPayload::new("gallery/hero.png", 640, 480);

    assert_eq!(editor.drop_image(&payload, Point::new(50.0, 50.0)), Err(PlacementError::OutsidePanel));
    // On the edge is not strictly inside
    assert_eq!(editor.drop_image(&payload, Point::new(100.0, 150.0)), Err(PlacementError::OutsidePanel));
    assert_eq!(image_count(&editor), 0);
}

#[test]
fn image_drop_replaces_hosted_image_and_fits_panel() {
    let mut editor = editor();
    let panel = editor.add_element(panel_xywh(100.0, 100.0, 300.0, 200.0));
    let first = editor
        .drop_image(&DropPayload::new("gallery/a.png", 640, 480), Point::new(200.0, 200.0))
        .unwrap();
    assert_eq!(image_count(&editor), 1);

    let second = editor
        .drop_image(&DropPayload::new("gallery/b.png", 320, 320), Point::new(350.0, 250.0))
        .unwrap();
    assert_eq!(image_count(&editor), 1);
    assert!(!editor.store().contains(first));

    let image = editor.store().get(second).unwrap();
    let Transform { x, y, width, height, .. } = image.transform;
    assert_eq!((x, y, width, height), (100.0, 100.0, 300.0, 200.0));
    assert_eq!(image.parent_panel_id(), Some(panel));
    assert_eq!(editor.associations().image_for(panel), Some(second));
    assert_eq!(editor.selection(), &[second]);

    // The whole replacement is one undo step
    assert!(editor.undo());
    assert!(editor.store().contains(first));
    assert!(!editor.store().contains(second));
}

#[test]
fn hosting_panel_fill_goes_transparent() {
    let mut editor = editor();
    let panel = editor.add_element(panel_xywh(100.0, 100.0, 300.0, 200.0));
    editor
        .drop_image(&DropPayload::new("gallery/a.png", 10, 10), Point::new(200.0, 200.0))
        .unwrap();
    let style = editor.store().get(panel).and_then(|e| e.as_panel()).unwrap();
    assert!(style.is_hosting());
    assert!(style.fill_opacity < 0.1);
    assert!(style.effective_fill().a < 26);
}

#[test]
fn overlapping_image_is_associated_by_coverage() {
    let mut editor = editor();
    let panel = editor.add_element(panel_xywh(0.0, 0.0, 200.0, 200.0));
    // Half of this image lies inside the panel
    let image = editor.add_element(Element::image(
        Uuid::nil(),
        Rect::new(100.0, 0.0, 300.0, 200.0),
        ImageStyle::default(),
    ));
    assert_eq!(editor.associations().image_for(panel), Some(image));

    editor.update_element(image, &ElementPatch::new().position(900.0, 900.0));
    assert_eq!(editor.associations().image_for(panel), None);
}

#[test]
fn view_transform_round_trips() {
    let viewport = Viewport::new(Size::new(1440.0, 900.0), Size::new(1200.0, 1600.0));
    let pans = [(0.0, 0.0), (-350.5, 120.25), (9000.0, -4200.0)];
    let scales = [0.25, 0.5, 1.0, 1.7, 4.0];
    let points = [Point::new(0.0, 0.0), Point::new(600.0, 800.0), Point::new(-30.0, 1750.5)];
    for (pan_x, pan_y) in pans {
        for scale in scales {
            let mut view = ViewTransform::new();
            view.set_pan(pan_x, pan_y);
            view.set_scale(scale);
            for p in points {
                let back = view.container_to_logical(view.logical_to_container(p, &viewport), &viewport);
                assert!((back.x - p.x).abs() < 1e-9, "{:?} -> {:?}", p, back);
                assert!((back.y - p.y).abs() < 1e-9, "{:?} -> {:?}", p, back);
            }
        }
    }
}

#[test]
fn zoom_requests_clamp() {
    let mut editor = editor();
    editor.set_zoom(1000.0);
    assert!((editor.view().zoom_percent() - 400.0).abs() < 1e-9);
    editor.set_zoom(-50.0);
    assert!((editor.view().zoom_percent() - 25.0).abs() < 1e-9);
}

#[test]
fn select_then_delete_empties_selection() {
    let mut editor = editor();
    let id = editor.add_element(panel_xywh(0.0, 0.0, 200.0, 150.0));
    editor.set_active_tool(ToolKind::Select);
    editor.pointer_down(Point::new(50.0, 50.0), PointerButton::Primary, Modifiers::NONE);
    editor.pointer_up(Point::new(50.0, 50.0), PointerButton::Primary, Modifiers::NONE);
    assert_eq!(editor.selection(), &[id]);

    editor.key_down(&Key::Delete, Modifiers::NONE);
    assert!(!editor.store().contains(id));
    assert!(editor.selection().is_empty());
}

#[test]
fn tool_switch_cancels_drag_without_history() {
    let mut editor = editor();
    let id = editor.add_element(panel_xywh(0.0, 0.0, 200.0, 150.0));
    let undo_len = editor.store().history().undo_len();

    editor.pointer_down(Point::new(50.0, 50.0), PointerButton::Primary, Modifiers::NONE);
    editor.pointer_move(Point::new(400.0, 400.0), Modifiers::NONE);
    editor.set_active_tool(ToolKind::Text);

    assert_eq!(editor.store().get(id).map(|e| e.bounds()), Some(Rect::new(0.0, 0.0, 200.0, 150.0)));
    assert_eq!(editor.store().history().undo_len(), undo_len);
}

#[test]
fn armed_bubble_places_on_next_click() {
    let mut editor = editor();
    editor.arm_bubble_placement(komaink_core::BubbleType::Thought);
    assert_eq!(editor.active_tool(), ToolKind::Select);

    let outcome = editor.pointer_down(Point::new(600.0, 600.0), PointerButton::Primary, Modifiers::NONE);
    assert!(matches!(outcome, GestureOutcome::Created(_)));
    editor.pointer_up(Point::new(600.0, 600.0), PointerButton::Primary, Modifiers::NONE);
    let bubble = editor.elements().iter().find(|e| e.is_dialogue()).unwrap();
    assert_eq!(bubble.bounds().center(), Point::new(600.0, 600.0));
    assert!(editor.tools().armed_bubble().is_none());
}

#[test]
fn history_is_capped() {
    let mut editor = editor();
    let id = editor.add_element(panel_xywh(0.0, 0.0, 50.0, 50.0));
    for i in 0..80 {
        editor.update_element(id, &ElementPatch::new().position(i as f64, 0.0));
    }
    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, 50);
    assert!(!editor.undo());
}
