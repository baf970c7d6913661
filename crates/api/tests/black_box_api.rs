use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use stockrec_api::config::ApiConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = stockrec_api::app::build_app(ApiConfig::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Warehouse with one product (min 30, max 80): 50 on hand before the
/// current period, then +20 and -30 inside it.
async fn seed(client: &reqwest::Client, server: &TestServer) -> (String, String) {
    let res = client
        .post(server.url("/warehouses"))
        .json(&json!({ "name": "Main depot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let warehouse: Value = res.json().await.unwrap();
    let warehouse_id = warehouse["id"].as_str().unwrap().to_string();

    let res = client
        .post(server.url(&format!("/warehouses/{warehouse_id}/products")))
        .json(&json!({
            "name": "Rice",
            "sku": "RICE-25",
            "unit": "bag",
            "min_stock": 30,
            "max_stock": 80,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let product: Value = res.json().await.unwrap();
    let product_id = product["product_id"].as_str().unwrap().to_string();

    let movements = format!("/warehouses/{warehouse_id}/products/{product_id}");
    let before_period = Utc::now() - ChronoDuration::days(40);

    let res = client
        .post(server.url(&format!("{movements}/receipts")))
        .json(&json!({ "quantity": 50, "unit_cost": "100", "occurred_at": before_period }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url(&format!("{movements}/receipts")))
        .json(&json!({ "quantity": 20, "unit_cost": "130" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url(&format!("{movements}/issues")))
        .json(&json!({ "quantity": 30 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let position: Value = res.json().await.unwrap();
    assert_eq!(position["on_hand"], 40);

    (warehouse_id, product_id)
}

fn manager(req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.header("x-user-id", Uuid::now_v7().to_string())
        .header("x-user-role", "manager")
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn count_lifecycle_reconciles_and_is_idempotent() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;

    let res = client
        .get(server.url(&format!("/warehouses/{warehouse_id}/inventory?period=month")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let inventory: Value = res.json().await.unwrap();
    let line = &inventory["lines"][0];
    assert_eq!(line["stock_initial"], 50);
    assert_eq!(line["entries"], 20);
    assert_eq!(line["exits"], 30);
    assert_eq!(line["sdu_theoretical"], 40);
    assert_eq!(line["physical_count"], Value::Null);
    assert_eq!(line["status"], "normal");
    assert_eq!(inventory["breakdown"]["normal"], 1);

    let counts = json!({ "counts": [{ "product_id": product_id, "physical_count": 35 }] });
    let submit_url = server.url(&format!("/warehouses/{warehouse_id}/physical-counts"));

    let res = manager(client.post(&submit_url)).json(&counts).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: Value = res.json().await.unwrap();
    assert_eq!(outcome["saved_count"], 1);
    assert_eq!(outcome["adjustments"].as_array().unwrap().len(), 1);
    assert_eq!(outcome["adjustments"][0]["quantity_delta"], -5);

    // Theoretical stock now matches the count: nothing left to adjust.
    let res = manager(client.post(&submit_url)).json(&counts).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: Value = res.json().await.unwrap();
    assert_eq!(outcome["adjustments"].as_array().unwrap().len(), 0);
    assert_eq!(outcome["confirmed"].as_array().unwrap().len(), 1);

    let res = client
        .get(server.url(&format!("/warehouses/{warehouse_id}/inventory")))
        .send()
        .await
        .unwrap();
    let inventory: Value = res.json().await.unwrap();
    assert_eq!(inventory["lines"][0]["sdu_theoretical"], 35);
}

#[tokio::test]
async fn preview_and_variance_report_do_not_write() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;
    let counts = json!({ "counts": [{ "product_id": product_id, "physical_count": 45 }] });

    let res = client
        .post(server.url(&format!("/warehouses/{warehouse_id}/inventory/preview")))
        .json(&counts)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let preview: Value = res.json().await.unwrap();
    assert_eq!(preview["lines"][0]["variance"], 5);
    assert_eq!(preview["summary"]["surplus_items"], 1);

    let res = client
        .post(server.url(&format!("/warehouses/{warehouse_id}/variance-report")))
        .json(&counts)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["lines"].as_array().unwrap().len(), 1);
    assert_eq!(report["lines"][0]["kind"], "surplus");

    let res = client
        .get(server.url(&format!("/warehouses/{warehouse_id}/inventory")))
        .send()
        .await
        .unwrap();
    let inventory: Value = res.json().await.unwrap();
    assert_eq!(inventory["lines"][0]["sdu_theoretical"], 40);
}

#[tokio::test]
async fn submissions_require_an_allowed_caller() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;
    let counts = json!({ "counts": [{ "product_id": product_id, "physical_count": 35 }] });
    let submit_url = server.url(&format!("/warehouses/{warehouse_id}/physical-counts"));

    let res = client.post(&submit_url).json(&counts).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(&submit_url)
        .header("x-user-id", Uuid::now_v7().to_string())
        .header("x-user-role", "clerk")
        .json(&counts)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn invalid_counts_are_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;
    let submit_url = server.url(&format!("/warehouses/{warehouse_id}/physical-counts"));

    let res = manager(client.post(&submit_url))
        .json(&json!({ "counts": [{ "product_id": product_id, "physical_count": -1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_argument");
    assert_eq!(body["product_id"], product_id.as_str());

    let res = manager(client.post(&submit_url))
        .json(&json!({ "counts": [{ "product_id": product_id, "physical_count": 35.5 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = manager(client.post(&submit_url))
        .json(&json!({ "counts": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_warehouse_and_period_are_reported() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url(&format!("/warehouses/{}/inventory", Uuid::now_v7())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let (warehouse_id, _) = seed(&client, &server).await;
    let res = client
        .get(server.url(&format!("/warehouses/{warehouse_id}/inventory?period=year")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn export_is_a_csv_attachment() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;

    let res = client
        .get(server.url(&format!("/warehouses/{warehouse_id}/inventory/export")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/csv"));
    let disposition = res.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));

    let text = res.text().await.unwrap();
    let mut rows = text.lines();
    assert!(rows.next().unwrap().starts_with("product_id,name,sku,unit,stock_initial"));
    let row = rows.next().unwrap();
    assert!(row.starts_with(&format!("{product_id},Rice,RICE-25,bag,50,20,30,40,,")));
    assert!(rows.next().is_none());
}

#[tokio::test]
async fn valuation_reports_cmp_and_purchases() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (warehouse_id, product_id) = seed(&client, &server).await;

    let res = client
        .get(server.url(&format!(
            "/warehouses/{warehouse_id}/products/{product_id}/valuation"
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    // Only the in-period receipt falls after the default `since`.
    assert_eq!(body["purchases"]["receipts"], 1);
    assert_eq!(body["purchases"]["quantity"], 20);
    assert!(body["cmp"].is_string());
}
