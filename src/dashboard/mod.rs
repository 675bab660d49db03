use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::db::Database;
use crate::leagues::League;

/// How many stored predictions `/api/predictions` returns.
const RECENT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub leagues: Vec<League>,
}

/// Build the Axum router for the read-only predictions API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/leagues", get(leagues_handler))
        .route("/api/predictions", get(predictions_handler))
        .route("/api/predictions/:fixture_id", get(prediction_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

/// GET /health
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .count()
        .map(|n| Json(json!({ "status": "ok", "predictions": n })))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/leagues
async fn leagues_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.leagues.clone())
}

/// GET /api/predictions
async fn predictions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .list_recent(RECENT_LIMIT)
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/predictions/:fixture_id
async fn prediction_handler(
    State(state): State<Arc<AppState>>,
    Path(fixture_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.db.get(fixture_id) {
        Ok(Some(p)) => Ok(Json(p)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            format!("No prediction for fixture {}", fixture_id),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Football Predictor</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .pill { display: inline-block; padding: .15rem .55rem; border-radius: 20px; font-size: .75rem; font-weight: 600; background: rgba(108,99,255,.2); color: var(--accent); }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .refresh-btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
</style>
</head>
<body>
<header>
  <h1>⚽ Football Predictor</h1>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span>
</header>
<main>
  <div class="panel">
    <div class="panel-header">Latest Predictions <button class="refresh-btn" onclick="loadAll()">↻ Refresh</button></div>
    <table>
      <thead><tr><th>Kickoff</th><th>League</th><th>Match</th><th>Pick</th><th>Score</th><th>H / D / A</th><th>O 2.5</th><th>BTTS</th><th>Confidence</th></tr></thead>
      <tbody id="predictions-tbody"><tr><td colspan="9" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>
<script>
const pct = v => v != null ? v.toFixed(1) + '%' : '–';
const esc = v => String(v ?? '').replace(/[&<>"']/g, c => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c]));
async function loadPredictions() {
  const r = await fetch('/api/predictions');
  if (!r.ok) return;
  const rows = await r.json();
  const tbody = document.getElementById('predictions-tbody');
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="9" class="empty">No predictions stored yet</td></tr>'; return; }
  tbody.innerHTML = rows.map(p => {
    const rep = p.report;
    const ou = rep.over_under['2.5'];
    const kickoff = p.kickoff ? new Date(p.kickoff).toLocaleString() : '–';
    return `<tr>
      <td>${esc(kickoff)}</td>
      <td>${esc(p.league)}</td>
      <td>${esc(p.home_team)} vs ${esc(p.away_team)}</td>
      <td><span class="pill">${esc(p.outcome)}</span></td>
      <td>${esc(p.score)}</td>
      <td>${pct(rep.probabilities.home)} / ${pct(rep.probabilities.draw)} / ${pct(rep.probabilities.away)}</td>
      <td>${ou ? (ou.prediction ? 'Over' : 'Under') + ' ' + pct(ou.probability) : '–'}</td>
      <td>${rep.btts ? (rep.btts.prediction ? 'Yes' : 'No') + ' ' + pct(rep.btts.probability) : '–'}</td>
      <td>${pct(p.confidence)}</td>
    </tr>`;
  }).join('');
}
async function loadAll() {
  await loadPredictions();
  document.getElementById('last-updated').textContent = 'Updated ' + new Date().toLocaleTimeString();
}
loadAll();
setInterval(loadAll, 60000);
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leagues;
    use crate::predictor::fixtures::{fixture, stats};
    use crate::predictor::{BasicModel, PredictionModel};
    use crate::report::PredictionReport;
    use serde_json::Value;

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn state(name: &str) -> AppState {
        let path = std::env::temp_dir().join(format!("dashboard-{}-{}.db", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        let db = Database::open(path.to_str().unwrap()).unwrap();
        let home = stats(1, 12, 20, 10, 4, 2, "WWDLW");
        let away = stats(2, 12, 14, 16, 2, 4, "LDWLL");
        let p = BasicModel.predict(&fixture(77, 1, 2), &home, &away, None);
        db.upsert_prediction(&PredictionReport::from(&p)).unwrap();
        AppState {
            db,
            leagues: leagues::all().to_vec(),
        }
    }

    #[tokio::test]
    async fn serves_predictions_api() {
        let base = serve(state("api")).await;
        let http = reqwest::Client::new();

        let health: Value = http.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["predictions"], 1);

        let leagues: Value = http.get(format!("{}/api/leagues", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(leagues.as_array().unwrap().len(), leagues::all().len());

        let list: Value = http.get(format!("{}/api/predictions", base)).send().await.unwrap().json().await.unwrap();
        assert_eq!(list[0]["fixture_id"], 77);

        let one = http.get(format!("{}/api/predictions/77", base)).send().await.unwrap();
        assert_eq!(one.status(), 200);
        let one: Value = one.json().await.unwrap();
        assert_eq!(one["report"]["match"]["home_team"], "Team 1");

        let missing = http.get(format!("{}/api/predictions/5", base)).send().await.unwrap();
        assert_eq!(missing.status(), 404);
    }

    #[tokio::test]
    async fn index_escapes_stored_text() {
        let base = serve(state("index")).await;
        let page = reqwest::get(format!("{}/", base)).await.unwrap().text().await.unwrap();
        assert!(page.contains("const esc"));
        assert!(page.contains("${esc(p.home_team)}"));
        assert!(!page.contains("${p.league}"));
    }
}
