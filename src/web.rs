use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::AiPlayer;
use crate::board::{Board, GameError, Side};
use crate::controller::MatchConfig;
use crate::moves::Move;
use crate::player::Player;
use crate::square::{SIZE, Square};

#[derive(Clone)]
pub struct AppState {
    game: Arc<Mutex<WebGame>>,
}

/// A human playing one side against the engine
struct WebGame {
    board: Board,
    human: Side,
    engine: AiPlayer,
}

#[derive(Serialize, Deserialize)]
pub struct NewGameRequest {
    human_side: String,
    move_limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct MoveRequest {
    mv: String,
}

#[derive(Serialize)]
pub struct GameResponse {
    /// Rank 9 first, `-` for empty squares
    board: Vec<Vec<String>>,
    turn: String,
    legal_moves: Vec<Move>,
    game_over: bool,
    winner: Option<String>,
    move_count: usize,
    rendering: String,
    message: String,
}

impl WebGame {
    fn new(human: Side, move_limit: Option<usize>) -> Result<Self, GameError> {
        let mut board = Board::new();
        if let Some(limit) = move_limit {
            board.set_move_limit(limit)?;
        }
        Ok(WebGame {
            board,
            human,
            engine: AiPlayer::new("Tablut engine", human.opponent()),
        })
    }

    /// Winner, counting a spent move limit as a loss for the side to move
    fn outcome(&self) -> Option<Side> {
        self.board.winner().or_else(|| {
            self.board
                .move_limit_reached()
                .then(|| self.board.turn().opponent())
        })
    }

    fn is_over(&self) -> bool {
        self.board.game_over() || self.board.move_limit_reached()
    }

    fn summary(&self) -> String {
        match self.outcome() {
            Some(side) => format!("{} wins!", side),
            None => "Game over".to_string(),
        }
    }

    /// Let the engine move if it is its turn
    fn engine_reply(&mut self) -> String {
        if self.is_over() {
            return self.summary();
        }
        if self.board.turn() == self.human {
            return "Your turn!".to_string();
        }

        let message = match self.engine.request_move(&self.board) {
            Some(mv) => match self.board.make_move(mv) {
                Ok(()) => format!("Engine played: {}", mv),
                Err(e) => format!("Engine move {} rejected: {}", mv, e),
            },
            None => "Engine has no move".to_string(),
        };

        if self.is_over() {
            format!("{} {}", message, self.summary())
        } else {
            message
        }
    }

    fn response(&self, message: String) -> GameResponse {
        let board = (0..SIZE)
            .rev()
            .map(|row| {
                (0..SIZE)
                    .map(|col| {
                        Square::new(col, row)
                            .and_then(|square| self.board.get(square))
                            .map_or("-".to_string(), |piece| piece.symbol().to_string())
                    })
                    .collect()
            })
            .collect();

        let legal_moves = if !self.is_over() && self.board.turn() == self.human {
            self.board.legal_moves(self.human)
        } else {
            Vec::new()
        };

        GameResponse {
            board,
            turn: self.board.turn().to_string(),
            legal_moves,
            game_over: self.is_over(),
            winner: self.outcome().map(|side| side.to_string()),
            move_count: self.board.move_count(),
            rendering: self.board.render(true),
            message,
        }
    }
}

impl AppState {
    pub fn new() -> Result<Self, GameError> {
        let game = WebGame::new(Side::Black, MatchConfig::default().move_limit)?;
        Ok(AppState {
            game: Arc::new(Mutex::new(game)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebGame> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn string_to_side(s: &str) -> Side {
    match s.to_lowercase().as_str() {
        "white" => Side::White,
        "black" => Side::Black,
        _ => Side::Black,
    }
}

fn error_response(message: impl ToString) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": message.to_string()
        })),
    )
        .into_response()
}

#[axum::debug_handler]
async fn new_game(State(app_state): State<AppState>, Json(req): Json<NewGameRequest>) -> Response {
    let human = string_to_side(&req.human_side);
    let mut game = match WebGame::new(human, req.move_limit) {
        Ok(game) => game,
        Err(e) => return error_response(e),
    };
    info!(human = %human, move_limit = ?req.move_limit, "new web game");

    // The engine opens when the human plays white
    let message = game.engine_reply();

    let mut current = app_state.lock();
    *current = game;
    Json(current.response(message)).into_response()
}

#[axum::debug_handler]
async fn make_move(State(app_state): State<AppState>, Json(req): Json<MoveRequest>) -> Response {
    let mut game = app_state.lock();

    if game.is_over() {
        return error_response("Game is over");
    }
    if game.board.turn() != game.human {
        return error_response("Not your turn");
    }

    let mv: Move = match req.mv.parse() {
        Ok(mv) => mv,
        Err(e) => return error_response(e),
    };
    if let Err(e) = game.board.make_move(mv) {
        return error_response(e);
    }
    info!(%mv, "human move");

    let message = game.engine_reply();
    Json(game.response(message)).into_response()
}

#[axum::debug_handler]
async fn undo(State(app_state): State<AppState>) -> Response {
    let mut game = app_state.lock();

    // Take back the engine's reply along with the human move
    game.board.undo();
    if game.board.turn() != game.human {
        game.board.undo();
    }

    // Back at the start with the engine to open
    let message = if game.board.turn() != game.human {
        game.engine_reply()
    } else {
        "Move taken back".to_string()
    };
    Json(game.response(message)).into_response()
}

async fn game_state(State(app_state): State<AppState>) -> Json<GameResponse> {
    let game = app_state.lock();
    Json(game.response(String::new()))
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/new-game", post(new_game))
        .route("/api/move", post(make_move))
        .route("/api/undo", post(undo))
        .route("/api/game-state", get(game_state))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run_server(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(AppState::new()?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("web server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_initial_state_waits_for_human() {
        let app = router(AppState::new().unwrap());

        let (status, state) = call(&app, "GET", "/api/game-state", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["turn"], "Black");
        assert_eq!(state["move_count"], 0);
        assert_eq!(state["game_over"], false);
        assert_eq!(state["board"][0][3], "B");
        assert_eq!(state["board"][4][4], "K");
        assert!(!state["legal_moves"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_opens_when_human_is_white() {
        let app = router(AppState::new().unwrap());

        let (status, state) = call(
            &app,
            "POST",
            "/api/new-game",
            Some(json!({"human_side": "white", "move_limit": null})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["move_count"], 1);
        assert_eq!(state["turn"], "White");
        assert!(state["message"].as_str().unwrap().starts_with("Engine played"));
    }

    #[tokio::test]
    async fn test_human_move_gets_engine_reply_and_undo() {
        let app = router(AppState::new().unwrap());

        let (status, state) = call(&app, "POST", "/api/move", Some(json!({"mv": "h5-h6"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["move_count"], 2);
        assert_eq!(state["turn"], "Black");
        assert_eq!(state["board"][3][7], "B");

        let (status, state) = call(&app, "POST", "/api/undo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["move_count"], 0);
        assert_eq!(state["board"][4][7], "B");
    }

    #[tokio::test]
    async fn test_bad_moves_are_rejected() {
        let app = router(AppState::new().unwrap());

        let (status, body) = call(&app, "POST", "/api/move", Some(json!({"mv": "a5-c5"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Illegal move: a5-c5");

        let (status, _) = call(&app, "POST", "/api/move", Some(json!({"mv": "nonsense"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            "POST",
            "/api/new-game",
            Some(json!({"human_side": "black", "move_limit": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Move limit"));
    }
}
