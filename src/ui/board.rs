use std::cell::RefCell;
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use gtk4 as gtk;
use gtk4::cairo;
use gtk4::glib;
use gtk4::pango;
use gtk4::prelude::*;
use libadwaita as adw;

use super::app::handle_tile_click;
use super::state::{AppState, TileWidgets};
use crate::game::{BoardSize, ImageId, TileId, TileStatus};

pub const CONTENT_MARGIN: i32 = 12;
pub const TILE_GAP: i32 = 6;
const FACE_BACK: &str = "back";
const FACE_FRONT: &str = "front";

fn rounded_rect(cr: &cairo::Context, width: f64, height: f64, radius: f64) {
    cr.new_sub_path();
    cr.arc(width - radius, radius, radius, -FRAC_PI_2, 0.0);
    cr.arc(width - radius, height - radius, radius, 0.0, FRAC_PI_2);
    cr.arc(radius, height - radius, radius, FRAC_PI_2, PI);
    cr.arc(radius, radius, radius, PI, PI + FRAC_PI_2);
    cr.close_path();
}

fn build_tile(state: &Rc<RefCell<AppState>>, id: TileId) -> TileWidgets {
    let back = gtk::DrawingArea::builder()
        .hexpand(true)
        .vexpand(true)
        .build();
    back.add_css_class("pairs-tile-back");

    let state_draw = state.clone();
    back.set_draw_func(move |_, cr, width, height| {
        let Ok(st) = state_draw.try_borrow() else {
            return;
        };
        let (r, g, b) = st.game.preferences().closed_color.rgb();
        drop(st);

        let (w, h) = (f64::from(width), f64::from(height));
        let min_dim = w.min(h);
        cr.set_antialias(cairo::Antialias::Best);
        rounded_rect(cr, w, h, min_dim * 0.12);
        cr.set_source_rgb(f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0);
        if cr.fill().is_err() {
            return;
        }

        let layout = pangocairo::functions::create_layout(cr);
        let mut font_desc = pango::FontDescription::new();
        font_desc.set_family("Cantarell, Noto Sans, sans");
        font_desc.set_weight(pango::Weight::Bold);
        font_desc.set_size((min_dim * 0.34 * f64::from(pango::SCALE)) as i32);
        layout.set_font_description(Some(&font_desc));
        layout.set_text("?");

        cr.set_source_rgba(1.0, 1.0, 1.0, 0.92);
        let (text_width, text_height) = layout.pixel_size();
        cr.move_to(
            (w - f64::from(text_width)) / 2.0,
            (h - f64::from(text_height)) / 2.0,
        );
        pangocairo::functions::show_layout(cr, &layout);
    });

    let picture = gtk::Picture::builder()
        .content_fit(gtk::ContentFit::Cover)
        .can_shrink(true)
        .hexpand(true)
        .vexpand(true)
        .build();
    picture.add_css_class("pairs-tile-face");

    let faces = gtk::Stack::new();
    faces.set_transition_type(gtk::StackTransitionType::RotateLeftRight);
    faces.set_transition_duration(220);
    faces.add_named(&back, Some(FACE_BACK));
    faces.add_named(&picture, Some(FACE_FRONT));
    faces.set_visible_child_name(FACE_BACK);

    let button = gtk::Button::builder()
        .css_classes(vec!["pairs-tile"])
        .hexpand(true)
        .vexpand(true)
        .child(&faces)
        .build();
    button.set_tooltip_text(Some(&format!("Tile {}", id.index() + 1)));

    let state_click = state.clone();
    button.connect_clicked(move |_| {
        handle_tile_click(&state_click, id);
    });

    TileWidgets {
        button,
        faces,
        back,
        picture,
    }
}

pub(super) fn build_board_grid(state: &Rc<RefCell<AppState>>, size: BoardSize) -> gtk::Grid {
    let grid = gtk::Grid::new();
    grid.add_css_class("pairs-board");
    grid.set_row_spacing(TILE_GAP as u32);
    grid.set_column_spacing(TILE_GAP as u32);
    grid.set_row_homogeneous(true);
    grid.set_column_homogeneous(true);
    grid.set_hexpand(true);
    grid.set_vexpand(true);

    let dimension = i32::from(size.dimension());
    let css_provider = state.borrow().dynamic_css_provider.clone();
    grid.connect_closure(
        "notify::width",
        false,
        glib::closure_local!(move |grid: gtk::Grid, _: glib::ParamSpec| {
            let width = grid.width();
            if width <= 0 {
                return;
            }
            let cell = (width - (dimension - 1) * TILE_GAP) / dimension;
            let radius = (f64::from(cell) * 0.12) as i32;
            if let Some(provider) = &css_provider {
                provider.load_from_string(&format!(".pairs-tile {{ border-radius: {radius}px; }}"));
            }
        }),
    );

    let mut tiles = Vec::with_capacity(size.tile_count());
    for index in 0..size.tile_count() {
        let widgets = build_tile(state, TileId(index));
        let frame = gtk::AspectFrame::builder()
            .ratio(1.0)
            .obey_child(false)
            .hexpand(true)
            .vexpand(true)
            .child(&widgets.button)
            .build();
        let (col, row) = (index as i32 % dimension, index as i32 / dimension);
        grid.attach(&frame, col, row, 1, 1);
        tiles.push(widgets);
    }
    state.borrow_mut().tiles = tiles;
    grid
}

/// Replaces whatever the board container shows with a fresh grid.
pub(super) fn rebuild_board(state: &Rc<RefCell<AppState>>, size: BoardSize) {
    let Some(container) = state.borrow().board_container.clone() else {
        return;
    };
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
    let grid = build_board_grid(state, size);
    let frame = gtk::AspectFrame::new(0.5, 0.5, 1.0, false);
    frame.set_hexpand(true);
    frame.set_vexpand(true);
    frame.set_child(Some(&grid));
    container.append(&frame);

    let st = state.borrow();
    for tile in st.game.board().tiles() {
        if let Some(texture) = st.textures.get(tile.image())
            && let Some(widgets) = st.tiles.get(tile.id().index())
        {
            widgets.picture.set_paintable(Some(texture));
        }
    }
}

pub(super) fn show_empty_board(state: &Rc<RefCell<AppState>>) {
    let Some(container) = state.borrow().board_container.clone() else {
        return;
    };
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
    state.borrow_mut().tiles.clear();

    let placeholder = adw::StatusPage::builder()
        .icon_name("view-grid-symbolic")
        .title("Pairs")
        .description("Press Start to deal a new board.")
        .hexpand(true)
        .vexpand(true)
        .build();
    container.append(&placeholder);
}

pub(super) fn update_tile(st: &AppState, tile: TileId, status: TileStatus) {
    let Some(widgets) = st.tiles.get(tile.index()) else {
        return;
    };
    widgets.button.remove_css_class("flipped");
    widgets.button.remove_css_class("matched");
    match status {
        TileStatus::Hidden => widgets.faces.set_visible_child_name(FACE_BACK),
        TileStatus::Flipped => {
            widgets.button.add_css_class("flipped");
            widgets.faces.set_visible_child_name(FACE_FRONT);
        }
        TileStatus::Matched => {
            widgets.button.add_css_class("matched");
            widgets.faces.set_visible_child_name(FACE_FRONT);
        }
    }
}

/// Puts a freshly loaded texture on every tile that shows `image`.
pub(super) fn apply_texture(st: &AppState, image: &ImageId) {
    let Some(texture) = st.textures.get(image) else {
        return;
    };
    for tile in st.game.board().tiles() {
        if tile.image() == image
            && let Some(widgets) = st.tiles.get(tile.id().index())
        {
            widgets.picture.set_paintable(Some(texture));
        }
    }
}

pub(super) fn redraw_backs(st: &AppState) {
    for widgets in &st.tiles {
        widgets.back.queue_draw();
    }
}
