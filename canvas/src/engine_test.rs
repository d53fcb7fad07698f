#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use super::*;
use crate::doc::{Mark, ShapeKind};
use crate::geometry::PageSize;

// =============================================================
// Helpers
// =============================================================

const W: f64 = 800.0;
const H: f64 = 600.0;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn approx_pt(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

fn unit_margin() -> EngineConfig {
    EngineConfig { margin_factor: 1.0, ..EngineConfig::default() }
}

fn document(sizes: &[(f64, f64)]) -> PageDocument {
    PageDocument::from_sizes(sizes.iter().map(|&(width, height)| PageSize { width, height }).collect()).unwrap()
}

/// A core with `pages` landscape pages fitted exactly into an 800x600 viewport.
fn core_with_pages(pages: usize) -> EngineCore {
    let mut core = EngineCore::with_config(unit_margin());
    core.set_viewport(W, H, 1.0);
    core.load_document(document(&vec![(W, H); pages]));
    core
}

fn has_action<F>(actions: &[Action], pred: F) -> bool
where
    F: Fn(&Action) -> bool,
{
    actions.iter().any(pred)
}

fn has_render_needed(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::RenderNeeded))
}

fn render_ticket(actions: &[Action]) -> Option<RenderTicket> {
    actions.iter().find_map(|a| match a {
        Action::RenderPage(t) => Some(*t),
        _ => None,
    })
}

fn drag(core: &mut EngineCore, points: &[(f64, f64)]) {
    let (first, rest) = points.split_first().unwrap();
    core.on_pointer_down(pt(first.0, first.1));
    for &(x, y) in rest {
        core.on_pointer_move(pt(x, y));
    }
    let last = points.last().unwrap();
    core.on_pointer_up(pt(last.0, last.1));
}

fn click(core: &mut EngineCore, x: f64, y: f64) -> Vec<Action> {
    core.on_pointer_down(pt(x, y));
    core.on_pointer_up(pt(x, y))
}

fn path_points(ann: &Annotation) -> Vec<Point> {
    match &ann.mark {
        Mark::Path { points, .. } => points.clone(),
        other => panic!("expected path, got {other:?}"),
    }
}

// =============================================================
// EngineCore: construction and defaults
// =============================================================

#[test]
fn core_default_tool_is_cursor() {
    let core = EngineCore::new();
    assert_eq!(core.tool(), Tool::Cursor);
}

#[test]
fn core_default_has_no_document() {
    let core = EngineCore::new();
    assert!(core.document.as_ref().is_none());
    assert_eq!(core.page_count(), 0);
    assert_eq!(core.current_page(), 1);
    assert!(core.annotations().is_empty());
    assert!(core.surface().is_empty());
    assert_eq!(core.revision(), 0);
}

#[test]
fn core_default_params_from_config() {
    let core = EngineCore::with_config(EngineConfig { default_color: "#000".into(), default_width: 7.0, ..Default::default() });
    assert_eq!(core.params(), &ToolParams { color: "#000".into(), width: 7.0 });
}

#[test]
fn pointer_before_load_is_ignored() {
    let mut core = EngineCore::new();
    core.set_viewport(W, H, 1.0);
    core.set_tool(Tool::Pen);
    assert!(core.on_pointer_down(pt(10.0, 10.0)).is_empty());
    assert!(core.store.is_empty());
}

#[test]
fn pointer_down_starts_annotation_only_for_drag_tools() {
    for tool in Tool::ALL {
        let mut core = core_with_pages(1);
        core.set_tool(tool);
        let actions = core.on_pointer_down(pt(400.0, 300.0));
        let stored = core.annotations().len();
        if tool.is_drag_tool() {
            assert_eq!(stored, 1, "{tool}");
            assert!(matches!(core.input, InputState::Drawing { page: 1 }), "{tool}");
            assert_eq!(actions, vec![Action::RenderNeeded], "{tool}");
        } else {
            assert_eq!(stored, 0, "{tool}");
        }
        if tool.is_click_tool() {
            assert!(matches!(core.input, InputState::Pressing { moved: false, .. }), "{tool}");
            assert!(actions.is_empty(), "{tool}");
        }
        if tool == Tool::Cursor {
            assert!(matches!(core.input, InputState::Idle));
            assert!(actions.is_empty());
        }
    }
}

#[test]
fn navigation_before_load_is_ignored() {
    let mut core = EngineCore::new();
    assert!(core.next_page().is_empty());
    assert!(core.go_to_page(1).is_empty());
    assert!(core.begin_page_render().is_none());
}

// =============================================================
// EngineConfig
// =============================================================

#[test]
fn config_defaults_match_consts() {
    let config = EngineConfig::default();
    assert_eq!(config.erase_threshold, 0.05);
    assert_eq!(config.highlighter_width, 15.0);
    assert_eq!(config.highlighter_color, "rgba(250, 204, 21, 0.5)");
    assert_eq!(config.default_color, "#EF4444");
    assert_eq!(config.margin_factor, 0.95);
}

#[test]
fn config_partial_json_fills_defaults() {
    let config: EngineConfig = serde_json::from_str(r#"{"erase_threshold":0.1}"#).unwrap();
    assert_eq!(config.erase_threshold, 0.1);
    assert_eq!(config.highlighter_width, 15.0);
    assert_eq!(config.click_slop_px, 4.0);
}

// =============================================================
// Loading
// =============================================================

#[test]
fn load_document_shows_first_page() {
    let mut core = EngineCore::with_config(unit_margin());
    core.set_viewport(W, H, 1.0);
    let actions = core.load_document(document(&[(W, H), (W, H)]));
    assert!(actions.contains(&Action::PageChanged(1)));
    assert!(has_render_needed(&actions));
    let ticket = render_ticket(&actions).unwrap();
    assert_eq!(ticket.page, 1);
    assert_eq!(ticket.surface, Surface::new(W, H, 1.0));
    assert_eq!(core.page_count(), 2);
}

#[test]
fn load_replaces_annotations_and_resets_page() {
    let mut core = core_with_pages(3);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.go_to_page(3);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);

    core.load_document(document(&[(W, H); 5]));
    assert_eq!(core.current_page(), 1);
    assert_eq!(core.page_count(), 5);
    assert!(core.store.is_empty());
}

#[test]
fn load_failure_leaves_state_intact() {
    let mut core = core_with_pages(3);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.go_to_page(2);
    let rev = core.revision();

    assert_eq!(core.load(b"not a pdf at all").unwrap_err(), LoadError::NotPdf);
    assert_eq!(core.load(&[]).unwrap_err(), LoadError::Empty);

    assert_eq!(core.current_page(), 2);
    assert_eq!(core.page_count(), 3);
    assert_eq!(core.revision(), rev);
    assert_eq!(core.store.page(1).len(), 1);
    assert_eq!(core.tool(), Tool::Pen);
}

#[test]
fn load_closes_pending_text_entry() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 100.0, 100.0);
    let actions = core.load_document(document(&[(W, H)]));
    assert!(actions.contains(&Action::TextEntryClosed));
    assert_eq!(&core.input, &InputState::Idle);
}

// =============================================================
// Pen and highlighter
// =============================================================

#[test]
fn pen_drag_creates_one_path() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    let down = core.on_pointer_down(pt(80.0, 60.0));
    assert!(has_render_needed(&down));
    let moved = core.on_pointer_move(pt(400.0, 300.0));
    assert!(has_render_needed(&moved));
    core.on_pointer_up(pt(400.0, 300.0));

    let anns = core.annotations();
    assert_eq!(anns.len(), 1);
    let points = path_points(&anns[0]);
    assert_eq!(points.len(), 2);
    assert!(approx_pt(points[0], pt(0.1, 0.1)));
    assert!(approx_pt(points[1], pt(0.5, 0.5)));
    assert_eq!(anns[0].color, "#EF4444");
    assert_eq!(anns[0].width, 3.0);
    assert_eq!(&core.input, &InputState::Idle);
}

#[test]
fn moves_after_pointer_up_do_not_extend() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.on_pointer_move(pt(300.0, 300.0));
    assert_eq!(path_points(&core.annotations()[0]).len(), 2);
}

#[test]
fn highlighter_uses_fixed_style() {
    let mut core = core_with_pages(1);
    core.set_params(ToolParams { color: "#00FF00".into(), width: 2.0 });
    core.set_tool(Tool::Highlighter);
    drag(&mut core, &[(10.0, 10.0), (50.0, 10.0)]);
    let ann = &core.annotations()[0];
    assert_eq!(ann.color, "rgba(250, 204, 21, 0.5)");
    assert_eq!(ann.width, 15.0);
    assert!(matches!(ann.mark, Mark::Path { highlighter: true, .. }));
}

#[test]
fn params_apply_only_to_new_annotations() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.set_params(ToolParams { color: "#3B82F6".into(), width: 8.0 });
    drag(&mut core, &[(30.0, 30.0), (40.0, 40.0)]);
    let anns = core.annotations();
    assert_eq!(anns[0].color, "#EF4444");
    assert_eq!(anns[0].width, 3.0);
    assert_eq!(anns[1].color, "#3B82F6");
    assert_eq!(anns[1].width, 8.0);
}

#[test]
fn cursor_tool_never_draws() {
    let mut core = core_with_pages(1);
    drag(&mut core, &[(10.0, 10.0), (200.0, 200.0)]);
    click(&mut core, 50.0, 50.0);
    assert!(core.store.is_empty());
}

#[test]
fn second_pointer_down_during_drag_is_ignored() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    core.on_pointer_down(pt(10.0, 10.0));
    assert!(core.on_pointer_down(pt(500.0, 500.0)).is_empty());
    assert_eq!(core.annotations().len(), 1);
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn rectangle_drag_moves_end_point() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Rectangle);
    drag(&mut core, &[(80.0, 60.0), (200.0, 200.0), (400.0, 300.0)]);
    let anns = core.annotations();
    assert_eq!(anns.len(), 1);
    let Mark::Shape { shape, start, end } = anns[0].mark else {
        panic!("expected shape");
    };
    assert_eq!(shape, ShapeKind::Rectangle);
    assert!(approx_pt(start, pt(0.1, 0.1)));
    assert!(approx_pt(end, pt(0.5, 0.5)));
}

#[test]
fn each_shape_tool_makes_its_kind() {
    for (tool, kind) in [
        (Tool::Rectangle, ShapeKind::Rectangle),
        (Tool::Circle, ShapeKind::Circle),
        (Tool::Arrow, ShapeKind::Arrow),
    ] {
        let mut core = core_with_pages(1);
        core.set_tool(tool);
        drag(&mut core, &[(10.0, 10.0), (100.0, 100.0)]);
        assert!(matches!(core.annotations()[0].mark, Mark::Shape { shape, .. } if shape == kind), "{tool}");
    }
}

#[test]
fn shape_click_leaves_degenerate_shape() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Circle);
    click(&mut core, 100.0, 100.0);
    let Mark::Shape { start, end, .. } = core.annotations()[0].mark else {
        panic!("expected shape");
    };
    assert_eq!(start, end);
}

// =============================================================
// Tool switching
// =============================================================

#[test]
fn set_tool_reports_change_and_cursor() {
    let mut core = core_with_pages(1);
    let actions = core.set_tool(Tool::Eraser);
    assert_eq!(actions, vec![Action::ToolChanged(Tool::Eraser), Action::SetCursor("cell".into())]);
    assert!(core.set_tool(Tool::Eraser).is_empty());
}

#[test]
fn tool_switch_mid_drag_keeps_committed_annotation() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    core.on_pointer_down(pt(10.0, 10.0));
    core.on_pointer_move(pt(20.0, 20.0));
    let before = core.annotations()[0].clone();

    core.set_tool(Tool::Rectangle);
    core.on_pointer_move(pt(300.0, 300.0));
    core.on_pointer_up(pt(300.0, 300.0));

    assert_eq!(core.annotations(), std::slice::from_ref(&before));
    assert_eq!(&core.input, &InputState::Idle);
}

#[test]
fn tool_switch_mid_shape_drag_keeps_shape() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Arrow);
    core.on_pointer_down(pt(10.0, 10.0));
    core.on_pointer_move(pt(100.0, 100.0));
    let before = core.annotations()[0].clone();
    core.set_tool(Tool::Pen);
    core.on_pointer_move(pt(700.0, 500.0));
    assert_eq!(core.annotations()[0], before);
}

// =============================================================
// Eraser
// =============================================================

#[test]
fn eraser_click_removes_nearby_stroke() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(400.0, 300.0), (480.0, 300.0)]);
    core.set_tool(Tool::Eraser);
    // 0.02 of the width away from the first point.
    let actions = click(&mut core, 416.0, 300.0);
    assert!(has_render_needed(&actions));
    assert!(core.annotations().is_empty());
}

#[test]
fn eraser_click_far_away_changes_nothing() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(400.0, 300.0), (400.0, 310.0)]);
    core.set_tool(Tool::Eraser);
    let rev = core.revision();
    // 0.10 of the width away from the nearest point.
    let actions = click(&mut core, 480.0, 300.0);
    assert!(actions.is_empty());
    assert_eq!(core.annotations().len(), 1);
    assert_eq!(core.revision(), rev);
}

#[test]
fn eraser_drag_is_not_a_click() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(400.0, 300.0), (410.0, 300.0)]);
    core.set_tool(Tool::Eraser);
    core.on_pointer_down(pt(400.0, 300.0));
    core.on_pointer_move(pt(450.0, 300.0));
    core.on_pointer_up(pt(400.0, 300.0));
    assert_eq!(core.annotations().len(), 1);
}

#[test]
fn eraser_jitter_within_slop_is_a_click() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(400.0, 300.0), (410.0, 300.0)]);
    core.set_tool(Tool::Eraser);
    core.on_pointer_down(pt(400.0, 300.0));
    core.on_pointer_move(pt(402.0, 301.0));
    core.on_pointer_up(pt(403.0, 300.0));
    assert!(core.annotations().is_empty());
}

#[test]
fn eraser_ignores_text_and_shapes() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Rectangle);
    drag(&mut core, &[(400.0, 300.0), (420.0, 320.0)]);
    core.set_tool(Tool::Text);
    click(&mut core, 400.0, 300.0);
    core.commit_text("label");
    core.set_tool(Tool::Eraser);
    click(&mut core, 400.0, 300.0);
    assert_eq!(core.annotations().len(), 2);
}

#[test]
fn erase_at_works_with_any_tool() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(100.0, 100.0), (110.0, 100.0)]);
    core.set_tool(Tool::Cursor);
    assert!(has_render_needed(&core.erase_at(pt(100.0, 100.0))));
    assert!(core.annotations().is_empty());
}

// =============================================================
// Text
// =============================================================

#[test]
fn text_click_requests_editor() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    let actions = click(&mut core, 200.0, 150.0);
    assert_eq!(
        actions,
        vec![Action::TextEntryRequested { at: pt(200.0, 150.0), font_px: 24.0, color: "#EF4444".into() }]
    );
    assert!(matches!(&core.input, InputState::TextEntry { page: 1, .. }));
    assert!(core.store.is_empty());
}

#[test]
fn text_commit_appends_trimmed_text_and_returns_to_cursor() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 200.0, 150.0);
    let actions = core.commit_text("  Q3 revenue \n");

    assert!(actions.contains(&Action::TextEntryClosed));
    assert!(has_render_needed(&actions));
    assert!(actions.contains(&Action::ToolChanged(Tool::Cursor)));
    assert!(actions.contains(&Action::SetCursor("default".into())));
    assert_eq!(core.tool(), Tool::Cursor);

    let anns = core.annotations();
    assert_eq!(anns.len(), 1);
    let Mark::Text { anchor, text, size } = &anns[0].mark else {
        panic!("expected text");
    };
    assert!(approx_pt(*anchor, pt(0.25, 0.25)));
    assert_eq!(text, "Q3 revenue");
    assert_eq!(*size, 0.04);
}

#[test]
fn empty_text_commit_is_discarded() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 200.0, 150.0);
    let actions = core.commit_text("   ");
    assert_eq!(actions, vec![Action::TextEntryClosed]);
    assert!(core.store.is_empty());
    assert_eq!(core.tool(), Tool::Text);
    assert_eq!(&core.input, &InputState::Idle);
}

#[test]
fn cancel_text_discards() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 200.0, 150.0);
    assert_eq!(core.cancel_text(), vec![Action::TextEntryClosed]);
    assert!(core.commit_text("late").is_empty());
    assert!(core.store.is_empty());
}

#[test]
fn commit_without_pending_entry_is_noop() {
    let mut core = core_with_pages(1);
    assert!(core.commit_text("hello").is_empty());
    assert!(core.cancel_text().is_empty());
    assert!(core.store.is_empty());
}

#[test]
fn tool_switch_discards_pending_text() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 200.0, 150.0);
    let actions = core.set_tool(Tool::Pen);
    assert!(actions.contains(&Action::TextEntryClosed));
    assert!(core.commit_text("orphan").is_empty());
    assert!(core.store.is_empty());
}

#[test]
fn pointer_down_while_editing_is_ignored() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 200.0, 150.0);
    assert!(click(&mut core, 500.0, 500.0).is_empty());
    core.commit_text("first");
    let Mark::Text { anchor, .. } = core.annotations()[0].mark else {
        panic!("expected text");
    };
    assert!(approx_pt(anchor, pt(0.25, 0.25)));
}

#[test]
fn text_font_follows_surface_height() {
    let mut core = EngineCore::with_config(unit_margin());
    core.set_viewport(1000.0, 1000.0, 2.0);
    core.load_document(document(&[(W, H)]));
    core.set_tool(Tool::Text);
    let actions = click(&mut core, 10.0, 10.0);
    // 800x600 page fits to 1000x750.
    assert!(matches!(&actions[0], Action::TextEntryRequested { font_px, .. } if *font_px == 30.0));
}

// =============================================================
// Laser
// =============================================================

#[test]
fn laser_tracks_pointer_without_touching_store() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Laser);
    let actions = core.on_pointer_move(pt(400.0, 300.0));
    assert!(has_render_needed(&actions));
    assert!(approx_pt(core.laser().unwrap(), pt(0.5, 0.5)));
    drag(&mut core, &[(10.0, 10.0), (500.0, 500.0)]);
    assert!(core.store.is_empty());
    assert_eq!(core.revision(), 0);
}

#[test]
fn laser_hidden_on_leave_and_tool_switch() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Laser);
    core.on_pointer_move(pt(100.0, 100.0));
    assert!(has_render_needed(&core.on_pointer_leave()));
    assert!(core.laser().is_none());
    assert!(core.on_pointer_leave().is_empty());

    core.on_pointer_move(pt(100.0, 100.0));
    let actions = core.set_tool(Tool::Pen);
    assert!(has_render_needed(&actions));
    assert!(core.laser().is_none());
}

#[test]
fn laser_not_shown_for_other_tools() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    core.on_pointer_move(pt(100.0, 100.0));
    assert!(core.laser().is_none());
}

// =============================================================
// Pointer leave
// =============================================================

#[test]
fn pointer_leave_ends_drag() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    core.on_pointer_down(pt(10.0, 10.0));
    core.on_pointer_move(pt(20.0, 20.0));
    core.on_pointer_leave();
    core.on_pointer_move(pt(30.0, 30.0));
    assert_eq!(path_points(&core.annotations()[0]).len(), 2);
    assert_eq!(&core.input, &InputState::Idle);
}

#[test]
fn pointer_leave_keeps_text_entry() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Text);
    click(&mut core, 100.0, 100.0);
    core.on_pointer_leave();
    assert!(matches!(&core.input, InputState::TextEntry { .. }));
}

// =============================================================
// Undo / clear
// =============================================================

#[test]
fn undo_removes_last_on_current_page_only() {
    let mut core = core_with_pages(2);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    drag(&mut core, &[(30.0, 30.0), (40.0, 40.0)]);
    let first = core.annotations()[0].id;
    core.go_to_page(2);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.go_to_page(1);

    assert!(has_render_needed(&core.undo()));
    assert_eq!(core.annotations().len(), 1);
    assert_eq!(core.annotations()[0].id, first);
    assert_eq!(core.store.page(2).len(), 1);
}

#[test]
fn undo_on_empty_page_is_silent() {
    let mut core = core_with_pages(1);
    assert!(core.undo().is_empty());
    assert!(core.clear().is_empty());
}

#[test]
fn undo_mid_drag_ends_gesture() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    let kept = core.annotations()[0].clone();
    core.on_pointer_down(pt(100.0, 100.0));
    core.undo();
    core.on_pointer_move(pt(200.0, 200.0));
    assert_eq!(core.annotations(), std::slice::from_ref(&kept));
}

#[test]
fn clear_empties_current_page_only() {
    let mut core = core_with_pages(2);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    core.go_to_page(2);
    drag(&mut core, &[(10.0, 10.0), (20.0, 20.0)]);
    drag(&mut core, &[(30.0, 30.0), (40.0, 40.0)]);
    assert!(has_render_needed(&core.clear()));
    assert!(core.annotations().is_empty());
    assert_eq!(core.store.page(1).len(), 1);
}

// =============================================================
// Navigation
// =============================================================

#[test]
fn go_to_page_reports_change_and_starts_render() {
    let mut core = core_with_pages(3);
    let actions = core.go_to_page(3);
    assert!(actions.contains(&Action::PageChanged(3)));
    assert!(has_render_needed(&actions));
    assert_eq!(render_ticket(&actions).unwrap().page, 3);
    assert_eq!(core.current_page(), 3);
}

#[test]
fn go_to_out_of_range_is_ignored() {
    let mut core = core_with_pages(3);
    assert!(core.go_to_page(0).is_empty());
    assert!(core.go_to_page(4).is_empty());
    assert!(core.go_to_page(1).is_empty());
    assert_eq!(core.current_page(), 1);
}

#[test]
fn prev_at_first_and_next_at_last_saturate() {
    let mut core = core_with_pages(2);
    assert!(core.prev_page().is_empty());
    assert_eq!(core.current_page(), 1);
    core.next_page();
    assert!(core.next_page().is_empty());
    assert_eq!(core.current_page(), 2);
}

#[test]
fn keyboard_navigation() {
    let mut core = core_with_pages(3);
    core.on_key("ArrowRight");
    core.on_key(" ");
    assert_eq!(core.current_page(), 3);
    core.on_key("ArrowLeft");
    assert_eq!(core.current_page(), 2);
    assert!(core.on_key("Escape").is_empty());
}

#[test]
fn keyboard_navigation_suspended_while_editing_text() {
    let mut core = core_with_pages(3);
    core.set_tool(Tool::Text);
    click(&mut core, 100.0, 100.0);
    assert!(core.on_key(" ").is_empty());
    assert_eq!(core.current_page(), 1);
}

#[test]
fn page_input_applies_or_reverts() {
    let mut core = core_with_pages(5);
    let (result, actions) = core.commit_page_input(" 4 ");
    assert_eq!(result, PageInput::Applied(4));
    assert!(actions.contains(&Action::PageChanged(4)));

    let (result, actions) = core.commit_page_input("nine");
    assert_eq!(result, PageInput::Reverted(4));
    assert!(actions.is_empty());

    let (result, actions) = core.commit_page_input("4");
    assert_eq!(result, PageInput::Applied(4));
    assert!(actions.is_empty());
}

#[test]
fn page_change_discards_text_entry_and_ends_drag() {
    let mut core = core_with_pages(2);
    core.set_tool(Tool::Text);
    click(&mut core, 100.0, 100.0);
    let actions = core.go_to_page(2);
    assert!(actions.contains(&Action::TextEntryClosed));
    assert!(core.commit_text("lost").is_empty());

    core.set_tool(Tool::Pen);
    core.on_pointer_down(pt(10.0, 10.0));
    core.go_to_page(1);
    core.on_pointer_move(pt(50.0, 50.0));
    assert_eq!(path_points(&core.store.page(2)[0]).len(), 1);
    assert!(core.annotations().is_empty());
}

// =============================================================
// Viewport
// =============================================================

#[test]
fn viewport_before_load_only_records_size() {
    let mut core = EngineCore::new();
    assert!(core.set_viewport(W, H, 2.0).is_empty());
    assert!(core.surface().is_empty());
}

#[test]
fn viewport_fits_page_with_margin() {
    let mut core = EngineCore::new();
    core.set_viewport(1000.0, 1000.0, 1.0);
    core.load_document(document(&[(100.0, 100.0)]));
    let s = core.surface();
    assert!((s.width - 950.0).abs() < 1e-9);
    assert!((s.height - 950.0).abs() < 1e-9);
}

#[test]
fn viewport_change_rerenders() {
    let mut core = core_with_pages(1);
    let actions = core.set_viewport(400.0, 300.0, 2.0);
    assert!(has_render_needed(&actions));
    let ticket = render_ticket(&actions).unwrap();
    assert_eq!(ticket.surface, Surface::new(400.0, 300.0, 2.0));
    assert!(core.set_viewport(400.0, 300.0, 2.0).is_empty());
}

#[test]
fn viewport_non_positive_dpr_treated_as_one() {
    let mut core = core_with_pages(1);
    core.set_viewport(W, H, 0.0);
    assert_eq!(core.surface().dpr, 1.0);
}

#[test]
fn surface_follows_each_page_size() {
    let mut core = EngineCore::with_config(unit_margin());
    core.set_viewport(W, H, 1.0);
    core.load_document(document(&[(W, H), (H, W)]));
    core.go_to_page(2);
    let s = core.surface();
    assert!((s.width - 450.0).abs() < 1e-9);
    assert!((s.height - 600.0).abs() < 1e-9);
}

#[test]
fn annotations_survive_resize() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    drag(&mut core, &[(400.0, 300.0), (600.0, 450.0)]);
    core.set_viewport(400.0, 300.0, 3.0);
    let points = path_points(&core.annotations()[0]);
    assert!(approx_pt(points[0], pt(0.5, 0.5)));
    // The same page point now maps to the smaller surface.
    assert!(approx_pt(core.surface().to_surface(points[1]), pt(300.0, 225.0)));
}

// =============================================================
// Page render tickets
// =============================================================

#[test]
fn newer_render_supersedes_older() {
    let mut core = core_with_pages(3);
    let first = render_ticket(&core.go_to_page(2)).unwrap();
    let second = render_ticket(&core.go_to_page(3)).unwrap();
    assert!(!core.renders.is_current(&first));
    assert_eq!(core.finish_page_render(&first, RenderOutcome::Rendered), RenderCompletion::Stale);
    assert_eq!(core.finish_page_render(&second, RenderOutcome::Rendered), RenderCompletion::Applied);
}

#[test]
fn resize_supersedes_page_render() {
    let mut core = core_with_pages(1);
    let ticket = core.begin_page_render().unwrap();
    core.set_viewport(500.0, 500.0, 1.0);
    assert_eq!(core.finish_page_render(&ticket, RenderOutcome::Rendered), RenderCompletion::Stale);
}

#[test]
fn cancelled_current_render_is_not_an_error() {
    let mut core = core_with_pages(1);
    let ticket = core.begin_page_render().unwrap();
    assert_eq!(core.finish_page_render(&ticket, RenderOutcome::Cancelled), RenderCompletion::Cancelled);
}

#[test]
fn page_change_cancels_attached_task() {
    use std::cell::Cell;
    use std::rc::Rc;

    struct Flag(Rc<Cell<bool>>);
    impl RenderTask for Flag {
        fn cancel(&mut self) {
            self.0.set(true);
        }
    }

    let mut core = core_with_pages(2);
    let ticket = core.begin_page_render().unwrap();
    let cancelled = Rc::new(Cell::new(false));
    assert!(core.attach_render_task(&ticket, Box::new(Flag(Rc::clone(&cancelled)))));
    core.go_to_page(2);
    assert!(cancelled.get());
}

// =============================================================
// Revision
// =============================================================

#[test]
fn revision_tracks_store_changes() {
    let mut core = core_with_pages(1);
    core.set_tool(Tool::Pen);
    let r0 = core.revision();
    core.on_pointer_down(pt(10.0, 10.0));
    let r1 = core.revision();
    core.on_pointer_move(pt(20.0, 20.0));
    let r2 = core.revision();
    core.on_pointer_up(pt(20.0, 20.0));
    assert!(r0 < r1 && r1 < r2);
    assert_eq!(core.revision(), r2);
    core.undo();
    assert!(core.revision() > r2);
}

// =============================================================
// End to end
// =============================================================

#[test]
fn each_page_shows_only_its_own_annotations() {
    let mut core = core_with_pages(3);

    core.set_tool(Tool::Pen);
    drag(&mut core, &[(80.0, 60.0), (160.0, 120.0), (240.0, 180.0)]);
    let stroke_id = core.annotations()[0].id;

    core.next_page();
    core.set_tool(Tool::Rectangle);
    drag(&mut core, &[(400.0, 300.0), (600.0, 450.0)]);
    let rect_id = core.annotations()[0].id;

    core.prev_page();
    let page1 = core.annotations();
    assert_eq!(page1.len(), 1);
    assert_eq!(page1[0].id, stroke_id);
    assert!(matches!(page1[0].mark, Mark::Path { .. }));

    core.go_to_page(2);
    let page2 = core.annotations();
    assert_eq!(page2.len(), 1);
    assert_eq!(page2[0].id, rect_id);
    assert!(matches!(page2[0].mark, Mark::Shape { shape: ShapeKind::Rectangle, .. }));

    core.go_to_page(3);
    assert!(core.annotations().is_empty());
}
