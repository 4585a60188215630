//! Renderer driven by a live editor.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageFormat, Rgba, RgbaImage};
use komaink_core::elements::{ImageStyle, PanelStyle};
use komaink_core::{DropPayload, Editor, EditorConfig, Element, ElementPatch, Layer, SequentialIds, ToolKind};
use komaink_render::{ImageState, RenderContext, SceneRenderer};
use kurbo::{Point, Rect};
use std::io::Cursor;
use std::time::Duration;
use uuid::Uuid;

const DECODE_TIMEOUT: Duration = Duration::from_secs(10);

fn editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    Editor::with_id_generator(EditorConfig::default(), Box::new(SequentialIds::new())).unwrap()
}

fn renderer(editor: &Editor) -> SceneRenderer {
    SceneRenderer::new(editor.config().document_size()).unwrap()
}

fn red_png_url() -> String {
    let img = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn image_element(url: String, rect: Rect) -> Element {
    let style = ImageStyle {
        url,
        original_width: 8,
        original_height: 8,
        ..ImageStyle::default()
    };
    Element::image(Uuid::nil(), rect, style)
}

#[test]
fn unchanged_snapshot_skips_reconcile() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    editor.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));

    let stats = renderer.sync(&RenderContext::from_editor(&editor)).unwrap();
    assert_eq!(stats.created, 1);
    assert!(renderer.sync(&RenderContext::from_editor(&editor)).is_none());

    // Selection changes redraw the overlay without touching the scene
    let id = editor.elements()[0].id;
    editor.select(id);
    let redraws = renderer.overlay().redraws();
    assert!(renderer.sync(&RenderContext::from_editor(&editor)).is_none());
    assert_eq!(renderer.overlay().redraws(), redraws + 1);
    assert_eq!(renderer.overlay().items().len(), 1);
}

#[test]
fn nodes_survive_edits_and_follow_removal() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    let a = editor.add_element(Element::panel(Uuid::nil(), Rect::new(0.0, 0.0, 200.0, 150.0), PanelStyle::default()));
    let b = editor.add_element(Element::panel(Uuid::nil(), Rect::new(300.0, 0.0, 500.0, 150.0), PanelStyle::default()));
    renderer.sync(&RenderContext::from_editor(&editor));

    editor.update_element(b, &ElementPatch::new().position(320.0, 10.0));
    let stats = renderer.sync(&RenderContext::from_editor(&editor)).unwrap();
    assert_eq!((stats.created, stats.updated, stats.unchanged, stats.removed), (0, 1, 1, 0));
    assert_eq!(renderer.scene().get(a).map(|n| n.version()), Some(0));

    editor.remove_element(a);
    let stats = renderer.sync(&RenderContext::from_editor(&editor)).unwrap();
    assert_eq!(stats.removed, 1);
    assert!(renderer.scene().get(a).is_none());

    editor.undo();
    let stats = renderer.sync(&RenderContext::from_editor(&editor)).unwrap();
    assert_eq!(stats.created, 1);
    assert_eq!(renderer.scene().layer(Layer::Panels).len(), 2);
}

#[test]
fn image_swaps_in_after_decode() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    let id = editor.add_element(image_element(red_png_url(), Rect::new(10.0, 10.0, 110.0, 60.0)));

    renderer.sync(&RenderContext::from_editor(&editor));
    assert!(renderer.scene().get(id).and_then(|n| n.image_state()).is_some());
    // The first sync may already have collected a fast decode
    renderer.wait_for_decodes(DECODE_TIMEOUT);
    assert_eq!(renderer.pending_decodes(), 0);

    match renderer.scene().get(id).and_then(|n| n.image_state()) {
        Some(ImageState::Ready(image)) => assert_eq!((image.width(), image.height()), (100, 50)),
        other => panic!("expected decoded bitmap, got {:?}", other),
    }

    let capture = renderer.capture();
    assert_eq!(capture.get_pixel(60, 35).0, [255, 0, 0, 255]);
}

#[test]
fn failed_decode_keeps_element_selectable() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    let id = editor.add_element(image_element("data:image/png;base64,bm90IGEgcG5n".to_string(), Rect::new(0.0, 0.0, 50.0, 50.0)));

    renderer.sync(&RenderContext::from_editor(&editor));
    renderer.wait_for_decodes(DECODE_TIMEOUT);
    assert!(renderer.scene().get(id).and_then(|n| n.image_state()).is_some_and(|s| s.is_error()));

    editor.set_active_tool(ToolKind::Select);
    editor.pointer_down(Point::new(25.0, 25.0), komaink_core::PointerButton::Primary, komaink_core::Modifiers::NONE);
    assert_eq!(editor.selection(), &[id]);
}

#[test]
fn decode_for_removed_node_is_discarded() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    let id = editor.add_element(image_element(red_png_url(), Rect::new(0.0, 0.0, 40.0, 40.0)));
    renderer.sync(&RenderContext::from_editor(&editor));

    editor.remove_element(id);
    renderer.sync(&RenderContext::from_editor(&editor));
    assert_eq!(renderer.wait_for_decodes(DECODE_TIMEOUT), 0);
    assert!(renderer.scene().get(id).is_none());
    assert_eq!(renderer.pending_decodes(), 0);
}

#[test]
fn dropped_image_shows_through_hosting_panel() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    editor.add_element(Element::panel(Uuid::nil(), Rect::new(100.0, 100.0, 400.0, 300.0), PanelStyle::default()));
    editor
        .drop_image(&DropPayload::new(red_png_url(), 8, 8), Point::new(200.0, 200.0))
        .unwrap();

    renderer.sync(&RenderContext::from_editor(&editor));
    renderer.wait_for_decodes(DECODE_TIMEOUT);
    let capture = renderer.capture();
    let [r, g, b, _] = capture.get_pixel(250, 200).0;
    // Near-transparent white fill over red
    assert!(r > 240 && g < 40 && b < 40, "got {:?}", (r, g, b));
}

#[test]
fn preview_rect_reaches_overlay() {
    let mut editor = editor();
    let mut renderer = renderer(&editor);
    editor.set_active_tool(ToolKind::Panel);
    editor.pointer_down(Point::new(10.0, 10.0), komaink_core::PointerButton::Primary, komaink_core::Modifiers::NONE);
    editor.pointer_move(Point::new(210.0, 160.0), komaink_core::Modifiers::NONE);

    renderer.sync(&RenderContext::from_editor(&editor));
    assert_eq!(renderer.overlay().preview(), Some(Rect::new(10.0, 10.0, 210.0, 160.0)));
    renderer.tick(0.3);
    renderer.render();
}
