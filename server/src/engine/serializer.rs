//! Wire serialization across the four dialects remote snakes and viewers
//! may speak.

use serde_json::{json, Value};

use super::board::{Board, Dialect};
use super::position::Position;
use super::snake::Snake;

/// "2018" wraps list payloads as `{data, object:"list"}`; every other
/// dialect passes the list through untouched.
fn wrap_list(items: Vec<Value>, dialect: Dialect) -> Value {
    if dialect == Dialect::V2018 {
        json!({ "data": items, "object": "list" })
    } else {
        Value::Array(items)
    }
}

/// "2017" renders coordinates as `[x, y]`; every other dialect keeps the
/// `{x, y}` object shape.
fn coordinate(pos: &Position, dialect: Dialect) -> Value {
    if dialect == Dialect::V2017 {
        json!([pos.x, pos.y])
    } else {
        json!({ "x": pos.x, "y": pos.y })
    }
}

pub fn snake_to_json(snake: &Snake, dialect: Dialect) -> Value {
    let body: Vec<Value> = snake.body.iter().map(|p| coordinate(p, dialect)).collect();
    let coords = wrap_list(body, dialect);

    match dialect {
        Dialect::V2017 => json!({
            "id": snake.id,
            "color": snake.color,
            "name": snake.name,
            "taunt": snake.taunt,
            "health_points": snake.health,
            "coords": coords,
        }),
        Dialect::V2018 => json!({
            "id": snake.id,
            "body": coords,
            "health": snake.health,
            "length": snake.length(),
            "name": snake.name,
            "object": "snake",
            "taunt": snake.taunt,
        }),
        Dialect::V2016 | Dialect::Client => json!({
            "id": snake.id,
            "color": snake.color,
            "coords": coords,
            "death": snake.death.as_ref().map(|d| json!({
                "turn": d.turn,
                "reason": d.reason.as_str(),
                "killer": d.killer_id,
            })),
            "error": snake.error,
            "name": snake.name,
            "goldCount": snake.gold,
            "health": snake.health,
            "kills": snake.kills,
            "score": snake.score,
            "taunt": snake.taunt,
        }),
    }
}

/// Full board snapshot in the requested dialect. Mirrors
/// `board.py: to_json`, including its deliberate double emission of
/// `dead_snakes`/`deadSnakes` for the "client" dialect.
pub fn board_to_json(board: &Board, dialect: Dialect) -> Value {
    let alive: Vec<&Snake> = board.snakes.iter().filter(|s| s.is_alive()).collect();
    let dead: Vec<&Snake> = board.snakes.iter().filter(|s| !s.is_alive()).collect();

    let alive_json: Vec<Value> = alive.iter().map(|s| snake_to_json(s, dialect)).collect();
    let dead_json: Vec<Value> = dead.iter().map(|s| snake_to_json(s, dialect)).collect();

    let food: Vec<Value> = board.food.iter().map(|f| coordinate(&f.position(), dialect)).collect();
    let walls: Vec<Value> = board.walls.iter().map(|w| coordinate(&w.position(), dialect)).collect();
    let gold: Vec<Value> = board.gold.iter().map(|g| coordinate(&g.position(), dialect)).collect();

    let mut out = json!({
        "width": board.width,
        "height": board.height,
        "snakes": wrap_list(alive_json, dialect),
        "food": wrap_list(food, dialect),
    });
    let map = out.as_object_mut().expect("board_to_json root is always an object");

    match dialect {
        Dialect::V2016 => {
            // legacy shape: walls included, dead snakes omitted entirely.
            map.insert("walls".to_string(), wrap_list(walls, dialect));
        }
        Dialect::V2017 => {
            map.insert("dead_snakes".to_string(), wrap_list(dead_json, dialect));
            map.insert("gold".to_string(), wrap_list(gold, dialect));
        }
        Dialect::V2018 => {
            map.insert("dead_snakes".to_string(), wrap_list(dead_json, dialect));
            map.insert("gold".to_string(), wrap_list(gold, dialect));
        }
        Dialect::Client => {
            map.insert("dead_snakes".to_string(), wrap_list(dead_json.clone(), dialect));
            map.insert("deadSnakes".to_string(), wrap_list(dead_json, dialect));
            map.insert("gold".to_string(), wrap_list(gold, dialect));
            map.insert("walls".to_string(), wrap_list(walls, dialect));
            map.insert(
                "teleporters".to_string(),
                wrap_list(
                    board
                        .teleporters
                        .iter()
                        .map(|t| json!({ "x": t.x, "y": t.y, "channel": t.channel }))
                        .collect(),
                    dialect,
                ),
            );
        }
    }

    out
}

/// Body of the `/move` request sent to a snake's remote endpoint.
pub fn move_request(
    board: &Board,
    game_id: &str,
    turn_number: u32,
    turn_limit: Option<u32>,
    snake: &Snake,
    dialect: Dialect,
) -> Value {
    let mut request = board_to_json(board, dialect);
    let map = request.as_object_mut().expect("move_request root is always an object");
    map.insert("turn".to_string(), json!(turn_number));

    match dialect {
        Dialect::V2017 => {
            map.insert("game_id".to_string(), json!(game_id));
            map.insert("you".to_string(), json!(snake.id));
        }
        Dialect::V2018 => {
            map.insert("id".to_string(), json!(snake.id));
            map.insert("you".to_string(), snake_to_json(snake, dialect));
        }
        Dialect::V2016 | Dialect::Client => {
            map.insert("gameId".to_string(), json!(game_id));
            map.insert("apiVersion".to_string(), json!(dialect_str(dialect)));
            if let Some(limit) = turn_limit {
                if limit != 0 {
                    map.insert(
                        "turnsRemaining".to_string(),
                        json!(limit.saturating_sub(turn_number)),
                    );
                }
            }
        }
    }

    request
}

/// Body of the `/start` request sent to a snake's remote endpoint.
pub fn start_request(game_id: &str, width: i32, height: i32, dialect: Dialect) -> Value {
    match dialect {
        Dialect::V2017 => json!({ "game_id": game_id, "width": width, "height": height }),
        Dialect::V2018 => json!({ "game_id": game_id }),
        Dialect::V2016 | Dialect::Client => json!({ "gameId": game_id }),
    }
}

fn dialect_str(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::V2016 => "2016",
        Dialect::V2017 => "2017",
        Dialect::V2018 => "2018",
        Dialect::Client => "client",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::snake::Snake;

    fn snake_with_body(id: &str, body: Vec<(i32, i32)>) -> Snake {
        let mut s = Snake::new(id, id, "http://example.test");
        s.body = body.into_iter().map(|(x, y)| Position::new(x, y)).collect();
        s
    }

    fn sample_board() -> Board {
        let alive = snake_with_body("alive", vec![(1, 1), (1, 2)]);
        let mut dead = snake_with_body("dead", vec![(3, 3)]);
        dead.kill(2, crate::engine::snake::DeathReason::Wall, None);
        Board {
            width: 10,
            height: 10,
            snakes: vec![alive.clone(), dead],
            food: vec![],
            gold: vec![],
            walls: vec![],
            teleporters: vec![],
            last_wall_spawn: None,
            last_gold_spawn: None,
            pin_tail: false,
        }
    }

    #[test]
    fn v2016_omits_dead_snakes_entirely() {
        let board = sample_board();
        let json = board_to_json(&board, Dialect::V2016);
        assert!(json.get("dead_snakes").is_none());
        assert!(json.get("deadSnakes").is_none());
        assert!(json.get("walls").is_some());
    }

    #[test]
    fn client_dialect_emits_both_dead_snake_keys() {
        let board = sample_board();
        let json = board_to_json(&board, Dialect::Client);
        assert_eq!(json["dead_snakes"].as_array().unwrap().len(), 1);
        assert_eq!(json["deadSnakes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn v2017_renders_coordinates_as_pairs() {
        let board = sample_board();
        let json = board_to_json(&board, Dialect::V2017);
        let snakes = json["snakes"].as_array().unwrap();
        let coords = snakes[0]["coords"].as_array().unwrap();
        assert!(coords[0].is_array());
    }

    #[test]
    fn v2018_wraps_lists_and_tags_snake_object() {
        let board = sample_board();
        let json = board_to_json(&board, Dialect::V2018);
        assert_eq!(json["snakes"]["object"], "list");
        let snakes = json["snakes"]["data"].as_array().unwrap();
        assert_eq!(snakes[0]["object"], "snake");
        assert_eq!(snakes[0]["length"], 2);
    }
}
