use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use multidash_core::{DataSourceAdapter, DataSourceError};
use multidash_sources::{
    DataSourceFactory, FactorySettings, InfluxDbAdapter, RestAdapter, SqlDialect, SqlProxyAdapter,
};
use multidash_types::{
    DataSource, DataSourceConfig, HttpMethod, InfluxDbSourceConfig, RestSourceConfig,
    SqlSourceConfig, Transformer,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn factory(base: &str) -> DataSourceFactory {
    DataSourceFactory::new(FactorySettings {
        backend_url: base.to_string(),
        http_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

async fn kpi(Query(params): Query<HashMap<String, String>>, headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "value": 42,
        "period": params.get("period"),
        "tenant": headers.get("x-tenant").and_then(|v| v.to_str().ok()),
    }))
}

#[tokio::test]
async fn rest_resolves_relative_url_with_params_and_headers() {
    let base = serve(Router::new().route("/api/kpi", get(kpi))).await;

    let mut config = RestSourceConfig::new("/api/kpi");
    config.params = Some(BTreeMap::from([("period".into(), "7d".into())]));
    config.headers = Some(BTreeMap::from([("x-tenant".into(), "acme".into())]));

    let adapter = factory(&base)
        .create_adapter(&DataSource::new(DataSourceConfig::Rest(config)))
        .unwrap();
    let data = adapter.fetch().await.unwrap();
    assert_eq!(data, json!({"value": 42, "period": "7d", "tenant": "acme"}));
}

#[tokio::test]
async fn rest_applies_transform() {
    let base = serve(Router::new().route("/api/kpi", get(kpi))).await;

    let double = Transformer::new(|d| Ok(json!(d["value"].as_i64().unwrap_or(0) * 2)));
    let source = DataSource::new(DataSourceConfig::Rest(RestSourceConfig::new("/api/kpi")))
        .with_transformer(double);
    let adapter = factory(&base).create_adapter(&source).unwrap();
    assert_eq!(adapter.fetch().await.unwrap(), json!(84));
}

#[tokio::test]
async fn rest_non_success_status() {
    let base = serve(Router::new()).await;
    let adapter = factory(&base)
        .create_adapter(&DataSource::new(DataSourceConfig::Rest(RestSourceConfig::new(
            "/missing",
        ))))
        .unwrap();

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err.message(), "HTTP 404: Not Found");
    assert_eq!(err.code(), "FETCH_ERROR");
}

#[tokio::test]
async fn rest_posts_json_body() {
    let base = serve(Router::new().route(
        "/api/echo",
        post(|Json(body): Json<Value>| async move { Json(json!({"echo": body})) }),
    ))
    .await;

    let mut config = RestSourceConfig::new("/api/echo");
    config.method = Some(HttpMethod::Post);
    config.body = Some(json!({"region": "eu"}));

    let adapter = factory(&base)
        .create_adapter(&DataSource::new(DataSourceConfig::Rest(config)))
        .unwrap();
    assert_eq!(adapter.fetch().await.unwrap(), json!({"echo": {"region": "eu"}}));
}

#[tokio::test]
async fn rest_cancel_aborts_request() {
    let base = serve(Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"late": true}))
        }),
    ))
    .await;

    let adapter = Arc::new(
        RestAdapter::new(RestSourceConfig::new("/slow"), None, Client::new(), &base).unwrap(),
    );
    let running = adapter.clone();
    let handle = tokio::spawn(async move { running.fetch().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    adapter.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("cancelled fetch should finish promptly")
        .unwrap();
    assert_eq!(result.unwrap_err(), DataSourceError::Cancelled);
}

#[tokio::test]
async fn rest_cancel_reaches_overlapping_fetch() {
    use axum::extract::State;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // First request answers quickly, later ones hang
    let calls = Arc::new(AtomicUsize::new(0));
    let base = serve(
        Router::new()
            .route(
                "/mixed",
                get(|State(calls): State<Arc<AtomicUsize>>| async move {
                    let delay = if calls.fetch_add(1, Ordering::SeqCst) == 0 { 50 } else { 5_000 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Json(json!({"delay": delay}))
                }),
            )
            .with_state(calls),
    )
    .await;

    let adapter = Arc::new(
        RestAdapter::new(RestSourceConfig::new("/mixed"), None, Client::new(), &base).unwrap(),
    );
    let quick = tokio::spawn({
        let adapter = adapter.clone();
        async move { adapter.fetch().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let slow = tokio::spawn({
        let adapter = adapter.clone();
        async move { adapter.fetch().await }
    });

    assert_eq!(quick.await.unwrap().unwrap(), json!({"delay": 50}));
    assert_eq!(adapter.in_flight(), 1);

    adapter.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), slow)
        .await
        .expect("overlapping fetch should still be cancellable")
        .unwrap();
    assert_eq!(result.unwrap_err(), DataSourceError::Cancelled);
    assert_eq!(adapter.in_flight(), 0);
}

#[tokio::test]
async fn graphql_errors_become_fetch_errors() {
    let base = serve(Router::new().route(
        "/graphql",
        post(|Json(body): Json<Value>| async move {
            let query = body["query"].as_str().unwrap_or_default();
            if query.contains("broken") {
                Json(json!({"data": null, "errors": [{"message": "Cannot query field"}]}))
            } else {
                Json(json!({"data": {"sales": body["variables"]["limit"]}}))
            }
        }),
    ))
    .await;
    let factory = factory(&base);

    let ok = factory
        .create_adapter_from_value(
            &json!({
                "type": "graphql",
                "endpoint": "/graphql",
                "query": "query($limit: Int) { sales(limit: $limit) }",
                "variables": {"limit": 5}
            }),
            None,
        )
        .unwrap();
    assert_eq!(ok.fetch().await.unwrap(), json!({"sales": 5}));

    let broken = factory
        .create_adapter_from_value(
            &json!({"type": "graphql", "endpoint": "/graphql", "query": "{ broken }"}),
            None,
        )
        .unwrap();
    let err = broken.fetch().await.unwrap_err();
    assert_eq!(err.code(), "GRAPHQL_ERROR");
    assert_eq!(err.message(), "Cannot query field");
}

fn sql_config(query: &str) -> SqlSourceConfig {
    SqlSourceConfig {
        host: "db.internal".into(),
        database: "sales".into(),
        username: "reader".into(),
        password: "secret".into(),
        query: query.into(),
        ..Default::default()
    }
}

fn sql_backend() -> Router {
    Router::new()
        .route(
            "/api/datasource/postgresql",
            post(|Json(body): Json<Value>| async move {
                if body["query"] == "SELECT * FROM missing" {
                    return Json(json!({"error": "relation \"missing\" does not exist"}));
                }
                Json(json!({"data": [{"port": body["port"], "ssl": body["ssl"]}]}))
            }),
        )
        .route(
            "/api/datasource/postgresql/test",
            post(|| async { Json(json!({"success": true})) }),
        )
        .route(
            "/api/datasource/postgresql/tables",
            post(|| async { Json(json!({"tables": ["orders", "customers"]})) }),
        )
        .route(
            "/api/datasource/mysql",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Access denied for user 'reader'"})),
                )
                    .into_response()
            }),
        )
}

#[tokio::test]
async fn sql_proxy_success_and_envelopes() {
    let base = serve(sql_backend()).await;

    let pg = SqlProxyAdapter::new(
        SqlDialect::Postgres,
        sql_config("SELECT 1"),
        None,
        Client::new(),
        &base,
    )
    .unwrap();
    assert_eq!(pg.fetch().await.unwrap(), json!([{"port": 5432, "ssl": false}]));
    assert!(pg.test_connection().await);
    assert_eq!(pg.get_tables().await, vec!["orders", "customers"]);

    let missing = SqlProxyAdapter::new(
        SqlDialect::Postgres,
        sql_config("SELECT * FROM missing"),
        None,
        Client::new(),
        &base,
    )
    .unwrap();
    assert_eq!(
        missing.fetch().await.unwrap_err().message(),
        "PostgreSQL Error: relation \"missing\" does not exist"
    );

    let mysql = SqlProxyAdapter::new(
        SqlDialect::Mysql,
        sql_config("SELECT 1"),
        None,
        Client::new(),
        &base,
    )
    .unwrap();
    assert_eq!(
        mysql.fetch().await.unwrap_err().message(),
        "Access denied for user 'reader'"
    );
    // No /test route for MySQL: failure is logged and reported as false
    assert!(!mysql.test_connection().await);
    assert!(mysql.get_tables().await.is_empty());
}

fn influx_backend() -> Router {
    Router::new()
        .route(
            "/api/v2/query",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Token tok");
                if !authorized {
                    return (StatusCode::UNAUTHORIZED, "bad token").into_response();
                }
                assert_eq!(body["type"], "flux");
                assert_eq!(body["org"], "acme");
                let csv = "#datatype,string,long,double\n,result,table,_value\n,_result,0,1.5\n,_result,0,2.5\n";
                ([("content-type", "text/csv; charset=utf-8")], csv).into_response()
            }),
        )
        .route("/health", get(|| async { Json(json!({"status": "pass"})) }))
        .route(
            "/api/v2/buckets",
            get(|| async { Json(json!({"buckets": [{"name": "telemetry"}, {"name": "_monitoring"}]})) }),
        )
}

fn influx_config(base: &str, token: &str) -> InfluxDbSourceConfig {
    InfluxDbSourceConfig {
        url: base.to_string(),
        token: token.to_string(),
        org: "acme".into(),
        bucket: "telemetry".into(),
        query: "from(bucket: \"telemetry\") |> range(start: -1h)".into(),
        refresh_interval: None,
    }
}

#[tokio::test]
async fn influxdb_csv_and_helpers() {
    let base = serve(influx_backend()).await;
    let adapter = InfluxDbAdapter::new(influx_config(&base, "tok"), None, Client::new()).unwrap();

    let rows = adapter.fetch().await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["_value"], "2.5");

    assert!(adapter.test_connection().await);
    assert_eq!(adapter.get_buckets().await, vec!["telemetry", "_monitoring"]);
    assert_eq!(adapter.get_measurements().await, vec!["1.5", "2.5"]);
}

#[tokio::test]
async fn influxdb_error_includes_body() {
    let base = serve(influx_backend()).await;
    let adapter = InfluxDbAdapter::new(influx_config(&base, "wrong"), None, Client::new()).unwrap();

    let err = adapter.fetch().await.unwrap_err();
    assert_eq!(err.message(), "InfluxDB query failed: Unauthorized - bad token");
}
