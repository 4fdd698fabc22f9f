use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use harf::search::{SearchParams, SearchResults};
use harf::{AppState, HarfError, Letter};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Every route is a GET; bodies are never read.
const MAX_BODY_BYTES: usize = 4 * 1024;

// === Response types ===

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    corpus_verses: u64,
    selection: String,
    max_limit: usize,
    cached_verses: usize,
}

#[derive(Serialize)]
struct LettersResponse {
    letters: Vec<Letter>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: HarfError) -> ApiError {
    let status = if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else if e.is_infrastructure() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    if status != StatusCode::BAD_REQUEST {
        tracing::error!("Search failed: {}", e);
    }
    (status, Json(ErrorResponse { error: e.to_string() }))
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let corpus_verses = state.search_engine.verse_count().map_err(error_response)?;
    let settings = state.search_engine.settings();
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        corpus_verses,
        selection: settings.selection.to_string(),
        max_limit: settings.max_limit,
        cached_verses: state.search_engine.cache_stats().0,
    }))
}

async fn letters(State(state): State<Arc<AppState>>) -> Json<LettersResponse> {
    Json(LettersResponse {
        letters: state.search_engine.letters(),
    })
}

/// Malformed query strings get the same JSON error shape as invalid values.
fn query_params(query: Result<Query<SearchParams>, QueryRejection>) -> Result<SearchParams, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| error_response(HarfError::InvalidQuery(rejection.body_text())))
}

async fn run_search(state: Arc<AppState>, params: SearchParams) -> Result<Json<SearchResults>, ApiError> {
    // Validate before touching the corpus
    let query = state.search_engine.parse_query(&params).map_err(error_response)?;
    let search_engine = state.search_engine.clone();

    tokio::task::spawn_blocking(move || search_engine.search(&query))
        .await
        .map_err(|e| error_response(HarfError::Other(format!("Task join error: {}", e))))?
        .map(Json)
        .map_err(error_response)
}

/// First page: any `exclude_ids` sent by the caller is ignored.
async fn search(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    let mut params = query_params(query)?;
    params.exclude_ids = None;
    run_search(state, params).await
}

async fn more_verses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    run_search(state, query_params(query)?).await
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(health))
        .route("/letters", get(letters))
        .route("/search", get(search))
        .route("/more_verses", get(more_verses));

    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use harf::corpus::{AudioSource, MemoryCorpus, SqliteCorpus, Verse};
    use harf::search::SearchSettings;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_verses() -> Vec<Verse> {
        [
            (6224, 112, 3, "لَمْ يَلِدْ وَلَمْ يُولَدْ"),
            (6225, 112, 4, "وَلَمْ يَكُن لَّهُۥ كُفُوًا أَحَدٌۢ"),
            (6232, 114, 2, "مَلِكِ ٱلنَّاسِ"),
            (6234, 114, 4, "مِن شَرِّ ٱلْوَسْوَاسِ ٱلْخَنَّاسِ"),
            (6236, 114, 6, "مِنَ ٱلْجِنَّةِ وَٱلنَّاسِ"),
        ]
        .into_iter()
        .map(|(id, surah, verse_number, text)| Verse {
            id,
            surah,
            verse_number,
            text: text.to_string(),
            audio_url: format!("https://audio.example/{}.mp3", id),
        })
        .collect()
    }

    fn test_app() -> Router {
        let state = AppState::from_store(Arc::new(MemoryCorpus::new(test_verses())), SearchSettings::default(), 64);
        build_router(Arc::new(state))
    }

    /// Percent-encode a query value (Arabic letters are multi-byte UTF-8).
    fn encode(value: &str) -> String {
        value.bytes().map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        }).collect()
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn ids(body: &serde_json::Value) -> Vec<u64> {
        body["verses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_letters() {
        let (status, body) = get_json(test_app(), "/letters").await;
        assert_eq!(status, StatusCode::OK);
        let letters = body["letters"].as_array().unwrap();
        assert_eq!(letters.len(), 28);
        assert_eq!(letters[0], "ا");
        assert_eq!(letters[27], "ي");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(test_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["corpus_verses"], 5);
        assert_eq!(body["selection"], "78-114");
        assert_eq!(body["max_limit"], 100);
    }

    #[tokio::test]
    async fn test_search_then_more() {
        let app = test_app();
        let uri = format!("/search?letter={}&position=first&limit=2", encode("م"));
        let (status, body) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![6232, 6234]);
        assert_eq!(body["exhausted"], false);
        assert_eq!(body["verses"][0]["surah"], 114);
        assert_eq!(body["verses"][0]["verse_number"], 2);
        assert_eq!(body["verses"][0]["audio_url"], "https://audio.example/6232.mp3");

        let uri = format!(
            "/more_verses?letter={}&position=first&limit=2&exclude_ids={}",
            encode("م"),
            encode("6232,6234")
        );
        let (status, body) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![6236]);
        assert_eq!(body["exhausted"], true);

        let uri = format!(
            "/api/more_verses?letter={}&position=first&exclude_ids={}",
            encode("م"),
            encode("6232,6234,6236")
        );
        let (status, body) = get_json(app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(ids(&body).is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_exclusions() {
        let uri = format!("/search?letter={}&position=last&exclude_ids=6224", encode("م"));
        let (status, body) = get_json(test_app(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![6224, 6225]);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let cases = [
            "/search?position=first".to_string(),
            format!("/search?letter={}&position=start", encode("م")),
            format!("/search?letter={}", encode("م")),
            "/search?letter=x&position=first".to_string(),
            format!("/search?letter={}&position=first&limit=0", encode("م")),
            format!("/more_verses?letter={}&position=first&exclude_ids=1,two", encode("م")),
            format!("/search?letter={}&letter={}&position=first", encode("م"), encode("ن")),
            format!("/more_verses?letter={}&position=first&position=last", encode("م")),
        ];
        for uri in cases {
            let (status, body) = get_json(test_app(), &uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].as_str().unwrap().starts_with("Invalid query"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_missing_database_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("corpus.db");
        SqliteCorpus::import(&db_path, &test_verses()).unwrap();
        let store = SqliteCorpus::open(db_path.clone(), AudioSource::default()).unwrap();
        let app = build_router(Arc::new(AppState::from_store(Arc::new(store), SearchSettings::default(), 64)));
        std::fs::remove_file(&db_path).unwrap();

        let uri = format!("/search?letter={}&position=first", encode("م"));
        let (status, body) = get_json(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().starts_with("Corpus not ready"));
        assert!(body.get("verses").is_none());

        let (status, _) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
