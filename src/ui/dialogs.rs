use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;

use super::hud::format_mm_ss;
use crate::game::RoundSummary;

pub fn show_round_complete_dialog(
    parent: Option<&impl IsA<gtk::Widget>>,
    summary: &RoundSummary,
    shared: bool,
) -> adw::AlertDialog {
    let saved = if shared {
        "Your score was sent to the leaderboard."
    } else {
        "Set PAIRS_TOKEN and PAIRS_PLAYER_ID to share scores online."
    };
    let body = format!(
        "Board: {}\nMoves: {}\nTime: {}\nScore: {:.2}\n\n{saved}",
        summary.board_size.label(),
        summary.moves,
        format_mm_ss(summary.elapsed),
        summary.score,
    );
    let dialog = adw::AlertDialog::new(Some("All pairs found!"), Some(&body));
    dialog.add_response("close", "Close");
    dialog.add_response("again", "Play Again");
    dialog.set_response_appearance("again", adw::ResponseAppearance::Suggested);
    dialog.set_default_response(Some("again"));
    dialog.set_close_response("close");
    dialog.present(parent);
    dialog
}

pub fn show_about_dialog(app: &adw::Application) -> adw::AboutDialog {
    let dialog = adw::AboutDialog::builder()
        .application_name("Pairs")
        .application_icon("view-grid-symbolic")
        .version(env!("CARGO_PKG_VERSION"))
        .comments("Flip two tiles at a time and find every matching pair.")
        .license_type(gtk::License::MitX11)
        .build();
    dialog.present(app.active_window().as_ref());
    dialog
}
