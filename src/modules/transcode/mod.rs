use axum::Router;
use axum::routing::post;
use crate::state::AppState;

pub mod config;
pub mod error;
pub mod events;
pub mod ffmpeg;
pub mod guard;
pub mod handler;
pub mod job;
pub mod notifier;
pub mod outcome;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
pub mod testing;

pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(handler::handle_event))
}
