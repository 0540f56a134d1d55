//! Memory pairs: flip two tiles, keep them if they match.
//!
//! [`game`] holds the headless core. [`services`] provides images, score
//! recording and preference storage. The GTK front end lives in `ui`
//! behind the `gui` feature.
pub mod config;
pub mod game;
pub mod services;

#[cfg(feature = "gui")]
pub mod ui;
