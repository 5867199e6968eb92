//! Router assembly: CRUD for games/snakes/daemons/board configurations,
//! the game lifecycle actions, and one spectator websocket, all wired to
//! [`crate::manager::Manager`].

use axum::routing::{delete, get, post};

use crate::state::AppState;

mod board_configurations;
mod daemons;
mod games;
mod snakes;

pub fn routes(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/games", get(games::list_games).post(games::create_game))
        .route("/games/{id}", get(games::show_game))
        .route("/games/{id}/watch", get(games::watch_game))
        .route("/games/{id}/start", post(games::start_game))
        .route("/games/{id}/pause", post(games::pause_game))
        .route("/games/{id}/restart", post(games::restart_game))
        .route("/games/{id}/step", post(games::step_game))
        .route("/games/{id}/toggle-mode", post(games::toggle_game_mode))
        .route("/games/{id}/apply-daemon-update", post(games::apply_daemon_update))
        .route(
            "/games/{id}/snakes/{snake_id}",
            post(games::add_snake).delete(games::remove_snake),
        )
        .route("/snakes", get(snakes::list_snakes).post(snakes::create_snake))
        .route(
            "/snakes/{id}",
            get(snakes::get_snake).put(snakes::update_snake).delete(snakes::delete_snake),
        )
        .route("/daemons", get(daemons::list_daemons).post(daemons::create_daemon))
        .route("/daemons/{id}", delete(daemons::delete_daemon))
        .route(
            "/board-configurations",
            get(board_configurations::list_board_configurations)
                .post(board_configurations::create_board_configuration),
        )
        .route(
            "/board-configurations/{id}",
            delete(board_configurations::delete_board_configuration),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app_state)
}
