use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::entities::trial::{self, DEFAULT_MONTHS_BACK, ResultSet};
use crate::server::AppState;
use crate::utils::serde::StringOrVec;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchTrialsRequest {
    #[serde(default)]
    pub query_terms: StringOrVec,
    #[serde(default = "default_months_back")]
    pub months_back: i64,
}

fn default_months_back() -> i64 {
    DEFAULT_MONTHS_BACK
}

/// Liveness probe with a server-side timestamp.
pub(crate) async fn api_status() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "message": "API is running!",
        "timestamp": timestamp,
    }))
}

pub(crate) async fn search_trials(
    State(state): State<AppState>,
    Json(req): Json<SearchTrialsRequest>,
) -> Result<Json<ResultSet>, (StatusCode, Json<Value>)> {
    let terms = trial::normalize_terms(req.query_terms.into_vec());
    if terms.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No query terms provided"})),
        ));
    }

    debug!(terms = ?terms, months_back = req.months_back, "Trial search request");
    let results = trial::search_many(&state.client, &state.search, &terms, req.months_back).await;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::Router;
    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use time::Duration;
    use tower::util::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::entities::trial::TrialSearchConfig;
    use crate::server::{AppState, ServerConfig, router};
    use crate::sources::ctgov::CtGovClient;
    use crate::utils::date::{format_iso, today_utc};

    fn test_router(registry_uri: String) -> Router {
        let state = AppState {
            client: CtGovClient::new_for_test(registry_uri).unwrap(),
            search: TrialSearchConfig::default(),
        };
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: PathBuf::from("static-dir-not-present"),
        };
        router(state, &config)
    }

    fn days_ago(days: i64) -> String {
        format_iso(today_utc() - Duration::days(days))
    }

    fn study_json(nct_id: &str, last_update: &str) -> serde_json::Value {
        json!({
            "protocolSection": {
                "identificationModule": {
                    "nctId": nct_id,
                    "briefTitle": format!("Study {nct_id}")
                },
                "statusModule": {
                    "lastUpdatePostDateStruct": {"date": last_update}
                }
            }
        })
    }

    async fn post_search(app: Router, payload: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/search_trials")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn api_status_reports_running() {
        let app = test_router("http://127.0.0.1".into());

        let response = app
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["message"], "API is running!");
        assert!(value["timestamp"].as_str().is_some_and(|v| !v.is_empty()));
    }

    #[tokio::test]
    async fn missing_terms_get_a_400() {
        let app = test_router("http://127.0.0.1".into());

        let (status, value) = post_search(app.clone(), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "No query terms provided");

        let (status, _) = post_search(app.clone(), json!({"query_terms": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_search(app, json!({"query_terms": " , "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn comma_separated_string_fans_out_to_terms() {
        let server = MockServer::start().await;
        for term in ["alpha", "beta"] {
            Mock::given(method("GET"))
                .and(path("/studies"))
                .and(query_param("query.cond", term))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "studies": [study_json("NCT0000001", &days_ago(5))]
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let app = test_router(server.uri());
        let (status, value) = post_search(app, json!({"query_terms": "alpha, beta"})).await;

        assert_eq!(status, StatusCode::OK);
        assert!(value.get("alpha").is_some());
        assert!(value.get("beta").is_some());
    }

    #[tokio::test]
    async fn response_rows_use_display_labels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study_json("NCT0000001", &days_ago(5))]
            })))
            .mount(&server)
            .await;

        let app = test_router(server.uri());
        let (status, value) = post_search(app, json!({"query_terms": ["lupus"]})).await;

        assert_eq!(status, StatusCode::OK);
        let row = &value["lupus"][0];
        assert_eq!(row["NCT ID"], "NCT0000001");
        assert_eq!(row["Title"], "Study NCT0000001");
        assert_eq!(row["Conditions"], "No conditions listed");
    }

    #[tokio::test]
    async fn months_back_widens_the_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "studies": [study_json("NCT0000001", &days_ago(400))]
            })))
            .mount(&server)
            .await;

        let app = test_router(server.uri());

        let (status, value) = post_search(app.clone(), json!({"query_terms": "lupus"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["lupus"].as_array().map(Vec::len), Some(0));

        let (status, value) =
            post_search(app, json!({"query_terms": "lupus", "months_back": 24})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["lupus"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn unclaimed_paths_fall_through_to_static_404() {
        let app = test_router("http://127.0.0.1".into());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/definitely-not-a-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
