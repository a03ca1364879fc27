pub mod client;
pub mod matchup;

pub use client::{ClientError, PredictionBackend, PredictorClient};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::players::{PlayerSnapshot, Roster};
use crate::predictor::Surface;
use matchup::{build_features, MatchupView};

#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<Roster>,
    pub backend: Arc<dyn PredictionBackend>,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub player_1: String,
    pub player_2: String,
    pub surface: Surface,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardError {
    /// "validation" | "connection" | "unexpected"
    pub kind: String,
    pub message: String,
}

type HandlerError = (StatusCode, Json<DashboardError>);

fn reject(status: StatusCode, kind: &str, message: String) -> HandlerError {
    (
        status,
        Json(DashboardError {
            kind: kind.to_string(),
            message,
        }),
    )
}

fn find_player<'a>(roster: &'a Roster, name: &str) -> Result<&'a PlayerSnapshot, HandlerError> {
    roster.get(name).ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            "validation",
            format!("Unknown player '{}'", name),
        )
    })
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/players", get(players_handler))
        .route("/api/predict", post(predict_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve the dashboard HTML page, injecting the fallback flag.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = DASHBOARD_HTML.replace(
        r#"<body>"#,
        &format!(r#"<body data-fallback="{}">"#, state.roster.fallback),
    );
    Html(html)
}

/// GET /api/players
async fn players_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.roster.as_ref().clone())
}

/// POST /api/predict
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<MatchupView>, HandlerError> {
    let p1 = find_player(&state.roster, &req.player_1)?;
    let p2 = find_player(&state.roster, &req.player_2)?;
    if p1.name == p2.name {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "validation",
            "Player 1 and Player 2 must be different".into(),
        ));
    }

    let payload = build_features(p1, p2, req.surface);
    let response = state.backend.predict(&payload).await.map_err(|e| {
        warn!("Prediction request to {} failed: {}", state.backend.base_url(), e);
        match e {
            ClientError::Connection { .. } => reject(
                StatusCode::SERVICE_UNAVAILABLE,
                "connection",
                format!(
                    "Connection error: make sure the prediction API is running at {}",
                    state.backend.base_url()
                ),
            ),
            other => reject(
                StatusCode::BAD_GATEWAY,
                "unexpected",
                format!("An unexpected error occurred: {}", other),
            ),
        }
    })?;

    info!(
        "{} vs {} on {}: {} (p1={:.2})",
        p1.name, p2.name, req.surface, response.winner, response.probability_player_1
    );
    Ok(Json(MatchupView::new(p1, p2, payload, response)))
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>ATP Match Predictor</title>
<style>
  :root {
    --bg: #eef2f7;
    --card: #ffffff;
    --border: #d5dcea;
    --navy: #1a2a6c;
    --accent: #1cb5e0;
    --deep: #000851;
    --red: #d9344f;
    --text: #1f2533;
    --muted: #6b7590;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: linear-gradient(135deg, #f5f7fa 0%, #c3cfe2 100%); min-height: 100vh; color: var(--text); font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; }
  header { text-align: center; padding: 2rem 1rem 1rem; }
  header h1 { font-size: 2.6rem; font-weight: 800; color: var(--navy); letter-spacing: 2px; text-transform: uppercase; }
  header p { color: #4b6cb7; font-style: italic; margin-top: .3rem; }
  main { max-width: 1000px; margin: 0 auto; padding: 1rem 1.5rem 3rem; display: grid; gap: 1.5rem; }
  .banner { border-radius: 10px; padding: .8rem 1rem; font-size: .9rem; display: none; }
  .banner.warn { background: #fff4d6; border: 1px solid #f0c14b; }
  .banner.error { background: #fde4e8; border: 1px solid var(--red); color: var(--red); }
  .versus { display: grid; grid-template-columns: 1fr auto 1fr; gap: 1rem; align-items: center; }
  .vs { font-size: 2rem; font-weight: 800; color: #b8c0d4; }
  .card { background: var(--card); border: 1px solid var(--border); border-radius: 16px; padding: 1.4rem; box-shadow: 0 8px 32px rgba(31,38,135,.12); text-align: center; }
  .card h2 { font-size: .9rem; color: var(--muted); letter-spacing: .08em; text-transform: uppercase; margin-bottom: .8rem; }
  select { width: 100%; padding: .55rem; border-radius: 8px; border: 1px solid var(--border); font-size: .95rem; }
  .metrics { display: grid; grid-template-columns: 1fr 1fr; gap: .5rem; margin-top: 1rem; }
  .metric .label { color: var(--muted); font-size: .75rem; text-transform: uppercase; }
  .metric .value { color: var(--navy); font-size: 1.5rem; font-weight: 700; }
  .surfaces { display: flex; justify-content: center; gap: .6rem; }
  .surfaces button { border: 1px solid var(--border); background: var(--card); padding: .5rem 1.4rem; border-radius: 20px; cursor: pointer; font-size: .95rem; }
  .surfaces button.active { background: var(--navy); color: #fff; border-color: var(--navy); }
  #predict-btn { background: linear-gradient(90deg, var(--accent) 0%, var(--deep) 100%); color: #fff; border: none; padding: 1rem; border-radius: 50px; font-size: 1.1rem; font-weight: 700; cursor: pointer; }
  #predict-btn:disabled { opacity: .6; cursor: wait; }
  .result { display: none; background: linear-gradient(135deg, #0f2027 0%, #203a43 50%, #2c5364 100%); color: #fff; border-radius: 16px; padding: 1.8rem; text-align: center; }
  .result h1 { font-size: 2.6rem; margin: .3rem 0; }
  .bar { display: flex; height: 44px; border-radius: 10px; overflow: hidden; margin-top: 1.2rem; font-size: .85rem; font-weight: 600; }
  .bar div { display: flex; align-items: center; justify-content: center; white-space: nowrap; overflow: hidden; }
  #bar-p1 { background: var(--accent); }
  #bar-p2 { background: var(--deep); }
  details { background: var(--card); border-radius: 10px; padding: .8rem 1rem; display: none; }
  pre { font-size: .8rem; overflow-x: auto; margin-top: .5rem; background: #f4f6fb; padding: .6rem; border-radius: 6px; }
  footer { text-align: center; color: #99a; font-size: .8rem; padding-bottom: 1.5rem; }
</style>
</head>
<body>
<header>
  <h1>ATP Oracle</h1>
  <p>Match winner prediction</p>
</header>

<main>
  <div class="banner warn" id="fallback-banner">Player table unavailable: showing demo players.</div>

  <div class="versus">
    <div class="card">
      <h2>Player 1</h2>
      <select id="p1-select"></select>
      <div class="metrics">
        <div class="metric"><div class="label">ATP Rank</div><div class="value" id="p1-rank">–</div></div>
        <div class="metric"><div class="label">Points</div><div class="value" id="p1-points">–</div></div>
      </div>
    </div>
    <div class="vs">VS</div>
    <div class="card">
      <h2>Player 2</h2>
      <select id="p2-select"></select>
      <div class="metrics">
        <div class="metric"><div class="label">ATP Rank</div><div class="value" id="p2-rank">–</div></div>
        <div class="metric"><div class="label">Points</div><div class="value" id="p2-points">–</div></div>
      </div>
    </div>
  </div>

  <div class="card">
    <h2>Match Conditions</h2>
    <div class="surfaces" id="surfaces">
      <button data-surface="Hard" class="active">Hard</button>
      <button data-surface="Clay">Clay</button>
      <button data-surface="Grass">Grass</button>
    </div>
  </div>

  <button id="predict-btn">Generate Prediction</button>

  <div class="banner error" id="error-banner"></div>

  <div class="result" id="result">
    <div>Prediction</div>
    <h1 id="winner-name"></h1>
    <div id="loser-line"></div>
    <div class="bar"><div id="bar-p1"></div><div id="bar-p2"></div></div>
  </div>

  <details id="details">
    <summary>Model inputs &amp; JSON response</summary>
    <pre id="payload-json"></pre>
    <pre id="response-json"></pre>
  </details>
</main>

<footer>ATP Match Predictor</footer>

<script>
let players = [];
let surface = 'Hard';
const num = new Intl.NumberFormat('en-US');
const pct = v => (v*100).toFixed(1)+'%';
const byName = name => players.find(p => p.name === name);

function showPlayer(prefix, p) {
  document.getElementById(prefix+'-rank').textContent = p ? '#'+p.rank : '–';
  document.getElementById(prefix+'-points').textContent = p ? num.format(p.points) : '–';
}

// Names come straight from the match table: build options as DOM nodes, never markup.
function fillOptions(sel, list) {
  sel.replaceChildren(...list.map(p => new Option(p.country + ' ' + p.name, p.name)));
}

function fillOpponents() {
  const p1 = document.getElementById('p1-select').value;
  const sel = document.getElementById('p2-select');
  const prev = sel.value;
  const options = players.filter(p => p.name !== p1);
  fillOptions(sel, options);
  if (options.some(p => p.name === prev)) sel.value = prev;
  showPlayer('p2', byName(sel.value));
}

async function loadPlayers() {
  const r = await fetch('/api/players');
  if (!r.ok) return;
  const roster = await r.json();
  players = roster.players;
  const sel = document.getElementById('p1-select');
  fillOptions(sel, players);
  showPlayer('p1', byName(sel.value));
  fillOpponents();
}

function showError(message) {
  const el = document.getElementById('error-banner');
  el.textContent = message;
  el.style.display = message ? 'block' : 'none';
}

async function predict() {
  const btn = document.getElementById('predict-btn');
  btn.disabled = true;
  showError('');
  try {
    const r = await fetch('/api/predict', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({
        player_1: document.getElementById('p1-select').value,
        player_2: document.getElementById('p2-select').value,
        surface,
      }),
    });
    const body = await r.json();
    if (!r.ok) { showError(body.message || 'Prediction failed'); return; }
    document.getElementById('winner-name').textContent = body.winner_name;
    document.getElementById('loser-line').textContent = 'wins against ' + body.loser_name + ' (' + pct(body.winner_probability) + ')';
    const b1 = document.getElementById('bar-p1');
    const b2 = document.getElementById('bar-p2');
    b1.style.width = pct(body.player_1.probability);
    b2.style.width = pct(body.player_2.probability);
    b1.textContent = body.player_1.name + ': ' + pct(body.player_1.probability);
    b2.textContent = body.player_2.name + ': ' + pct(body.player_2.probability);
    document.getElementById('payload-json').textContent = JSON.stringify(body.payload, null, 2);
    document.getElementById('response-json').textContent = JSON.stringify(body.response, null, 2);
    document.getElementById('result').style.display = 'block';
    document.getElementById('details').style.display = 'block';
  } catch (e) {
    showError('Connection error: the dashboard server is not responding.');
  } finally {
    btn.disabled = false;
  }
}

document.getElementById('p1-select').addEventListener('change', e => {
  showPlayer('p1', byName(e.target.value));
  fillOpponents();
});
document.getElementById('p2-select').addEventListener('change', e => showPlayer('p2', byName(e.target.value)));
document.querySelectorAll('#surfaces button').forEach(btn => btn.addEventListener('click', () => {
  surface = btn.dataset.surface;
  document.querySelectorAll('#surfaces button').forEach(b => b.classList.toggle('active', b === btn));
}));
document.getElementById('predict-btn').addEventListener('click', predict);

// Set fallback banner from server-injected data attribute
document.getElementById('fallback-banner').style.display =
  document.body.dataset.fallback === 'true' ? 'block' : 'none';

loadPlayers();
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PredictionResponse;
    use crate::predictor::{MatchFeatures, Winner};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::response::Response;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Backend double that records requests and replays a canned outcome.
    struct FakeBackend {
        outcome: fn(&MatchFeatures) -> Result<PredictionResponse, ClientError>,
        seen: Mutex<Vec<MatchFeatures>>,
    }

    #[async_trait]
    impl PredictionBackend for FakeBackend {
        async fn predict(&self, features: &MatchFeatures) -> Result<PredictionResponse, ClientError> {
            self.seen.lock().unwrap().push(features.clone());
            (self.outcome)(features)
        }

        fn base_url(&self) -> &str {
            "http://fake:8000/"
        }
    }

    fn player(name: &str, rank: u32, points: u32) -> PlayerSnapshot {
        PlayerSnapshot {
            name: name.into(),
            rank,
            points,
            country: "🎾".into(),
        }
    }

    fn roster() -> Roster {
        Roster::from_snapshots(vec![
            player("Sinner J.", 1, 11180),
            player("Alcaraz C.", 3, 7300),
            player("Fritz T.", 12, 3505),
        ])
    }

    fn app(outcome: fn(&MatchFeatures) -> Result<PredictionResponse, ClientError>) -> (Router, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend {
            outcome,
            seen: Mutex::new(Vec::new()),
        });
        let router = router(AppState {
            roster: Arc::new(roster()),
            backend: backend.clone(),
        });
        (router, backend)
    }

    fn player_one_wins(features: &MatchFeatures) -> Result<PredictionResponse, ClientError> {
        Ok(PredictionResponse {
            winner: Winner::Player1,
            probability_player_1: 0.64,
            input_received: features.clone(),
        })
    }

    fn unreachable(_: &MatchFeatures) -> Result<PredictionResponse, ClientError> {
        Err(ClientError::Connection {
            url: "http://fake:8000/predict".into(),
            reason: "connection refused".into(),
        })
    }

    fn server_error(_: &MatchFeatures) -> Result<PredictionResponse, ClientError> {
        Err(ClientError::Status {
            status: 500,
            body: r#"{"detail":"model unavailable"}"#.into(),
        })
    }

    fn predict_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_players_listed_in_rank_order() {
        let (app, _) = app(player_one_wins);
        let resp = app
            .oneshot(Request::builder().uri("/api/players").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["fallback"], false);
        let names: Vec<&str> = body["players"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Sinner J.", "Alcaraz C.", "Fritz T."]);
    }

    #[tokio::test]
    async fn test_predict_sends_differentials_and_names_winner() {
        let (app, backend) = app(player_one_wins);
        let resp = app
            .oneshot(predict_request(serde_json::json!({
                "player_1": "Fritz T.",
                "player_2": "Alcaraz C.",
                "surface": "Grass"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let seen = backend.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![MatchFeatures::new(9, 3505 - 7300, Surface::Grass)]);

        let body = json_body(resp).await;
        assert_eq!(body["winner_name"], "Fritz T.");
        assert_eq!(body["loser_name"], "Alcaraz C.");
        assert_eq!(body["response"]["winner"], "Player 1");
        assert_eq!(body["payload"]["surface"], "Grass");
    }

    #[tokio::test]
    async fn test_connection_failure_is_distinct() {
        let (app, _) = app(unreachable);
        let resp = app
            .oneshot(predict_request(serde_json::json!({
                "player_1": "Sinner J.",
                "player_2": "Fritz T.",
                "surface": "Hard"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(resp).await;
        assert_eq!(body["kind"], "connection");
    }

    #[tokio::test]
    async fn test_service_error_is_unexpected() {
        let (app, _) = app(server_error);
        let resp = app
            .oneshot(predict_request(serde_json::json!({
                "player_1": "Sinner J.",
                "player_2": "Fritz T.",
                "surface": "Clay"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(resp).await;
        assert_eq!(body["kind"], "unexpected");
    }

    #[tokio::test]
    async fn test_unknown_or_same_player_rejected() {
        for (p1, p2) in [("Nobody", "Fritz T."), ("Sinner J.", "Sinner J.")] {
            let (app, backend) = app(player_one_wins);
            let resp = app
                .oneshot(predict_request(serde_json::json!({
                    "player_1": p1,
                    "player_2": p2,
                    "surface": "Hard"
                })))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert!(backend.seen.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_index_marks_fallback() {
        let backend = Arc::new(FakeBackend {
            outcome: player_one_wins,
            seen: Mutex::new(Vec::new()),
        });
        let app = router(AppState {
            roster: Arc::new(Roster::from_snapshots(Vec::new())),
            backend,
        });
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"<body data-fallback="true">"#));
        assert!(html.contains("document.body.dataset.fallback === 'true'"));
    }

    #[test]
    fn test_player_options_are_not_built_from_markup() {
        assert!(DASHBOARD_HTML.contains("new Option("));
        assert!(!DASHBOARD_HTML.contains("<option value="));
    }

    #[tokio::test]
    async fn test_names_with_markup_characters_resolve() {
        let backend = Arc::new(FakeBackend {
            outcome: player_one_wins,
            seen: Mutex::new(Vec::new()),
        });
        let app = router(AppState {
            roster: Arc::new(Roster::from_snapshots(vec![
                player(r#"O"Brien <Jr> & Co"#, 40, 900),
                player("Fritz T.", 12, 3505),
            ])),
            backend: backend.clone(),
        });
        let resp = app
            .oneshot(predict_request(serde_json::json!({
                "player_1": r#"O"Brien <Jr> & Co"#,
                "player_2": "Fritz T.",
                "surface": "Hard"
            })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["winner_name"], r#"O"Brien <Jr> & Co"#);
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }
}
