use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use salesdesk_api::app::services::AppServices;
use salesdesk_infra::{AppConfig, SalesNotifier};
use salesdesk_sales::{Transaction, TransactionStatus};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppServices::in_memory(&AppConfig::default())).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        let app = salesdesk_api::app::build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.put(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let res = self.get(path).await;
        assert_eq!(res.status(), StatusCode::OK, "GET {path}");
        res.json().await.unwrap()
    }

    /// POST and return the `id` of the created record.
    async fn create(&self, path: &str, body: Value) -> i64 {
        let res = self.post(path, body).await;
        assert_eq!(res.status(), StatusCode::CREATED, "POST {path}");
        let created: Value = res.json().await.unwrap();
        created["id"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl SalesNotifier for RecordingNotifier {
    async fn transaction_created(&self, transaction: &Transaction) {
        self.events
            .lock()
            .unwrap()
            .push(format!("created {}", transaction.doc_num));
    }

    async fn status_changed(&self, transaction: &Transaction, previous: TransactionStatus) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{} -> {}", previous, transaction.status));
    }
}

fn admin_body(email: &str, role: &str, region: &str) -> Value {
    json!({
        "name": "Aina",
        "email": email,
        "phone": "012-3456789",
        "role": role,
        "code": "S01",
        "region": region,
    })
}

fn customer_body(admin_id: i64, email: Option<&str>) -> Value {
    json!({
        "code": "C-100",
        "name": "Ladang Hijau Sdn Bhd",
        "email": email,
        "phone_no": "03-1234567",
        "address": "Lot 5, Kuantan",
        "credit_term": "30 days",
        "credit_limit": "50000",
        "admin_id": admin_id,
    })
}

fn product_body(code: &str, category: &str, uom: &str, stock: &str, price: &str) -> Value {
    json!({
        "code": code,
        "name": format!("{category} fertiliser"),
        "category": category,
        "base_uom": uom,
        "stock": stock,
        "unit_price": price,
    })
}

fn transaction_body(customer_id: i64, admin_id: i64, lines: Value) -> Value {
    json!({
        "doc_num": "INV-0001",
        "transaction_date": "2024-05-02",
        "customer_id": customer_id,
        "admin_id": admin_id,
        "total_price": "43500",
        "ref_doc_no": "PO-77",
        "delivery_date": "2024-05-09",
        "shipping_method": "Lorry",
        "commission": "435",
        "location": "Kuantan",
        "lines": lines,
        "remark": "urgent delivery",
    })
}

fn edit_body(customer_id: i64, admin_id: i64, status: &str) -> Value {
    let mut body = transaction_body(
        customer_id,
        admin_id,
        json!([{ "code": "GLD-1", "quantity": "30", "price": "1450" }]),
    );
    body["status"] = json!(status);
    body["remark"] = json!(format!("moved to {status}"));
    body
}

/// Salesperson in the east coast with one customer and one weight-tracked
/// Gold product (100 MT at 1450).
async fn seed(srv: &TestServer) -> (i64, i64) {
    let admin_id = srv
        .create("/admins", admin_body("aina@example.com", "SALESPERSON", "EAST_COAST"))
        .await;
    let customer_id = srv
        .create("/customers", customer_body(admin_id, Some("buyer@example.com")))
        .await;
    let res = srv
        .post("/products", product_body("GLD-1", "Gold", "MT", "100", "1450"))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    (admin_id, customer_id)
}

fn row<'a>(rows: &'a Value, item_group: &str) -> &'a Value {
    rows.as_array()
        .unwrap()
        .iter()
        .find(|r| r["item_group"] == item_group)
        .unwrap_or_else(|| panic!("no row for {item_group}"))
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    assert_eq!(srv.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn product_catalog_lifecycle() {
    let srv = TestServer::spawn().await;

    let res = srv
        .post("/products", product_body("ORG-9", "Organic", "BAG", "40", "55"))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Duplicate code
    let res = srv
        .post("/products", product_body("ORG-9", "Organic", "BAG", "1", "1"))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Negative stock
    let res = srv
        .post("/products", product_body("ORG-10", "Organic", "BAG", "-1", "1"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let found = srv.get_json("/products/search?q=organic").await;
    assert_eq!(found["items"].as_array().unwrap().len(), 1);

    let res = srv
        .client
        .patch(srv.url("/products/ORG-9"))
        .json(&json!({ "stock": "75" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let product = srv.get_json("/products/ORG-9").await;
    assert_eq!(product["stock"], "75");
    assert_eq!(product["name"], "Organic fertiliser");

    assert_eq!(srv.delete("/products/ORG-9").await.status(), StatusCode::NO_CONTENT);
    assert_eq!(srv.get("/products/ORG-9").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(srv.delete("/products/ORG-9").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_emails_are_unique_and_validated() {
    let srv = TestServer::spawn().await;

    srv.create("/admins", admin_body("boss@example.com", "Master Admin", "CENTRAL"))
        .await;
    let res = srv
        .post("/admins", admin_body("BOSS@example.com", "MANAGER", "NORTH"))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .post("/admins", admin_body("not-an-email", "MANAGER", "NORTH"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post("/admins", admin_body("west@example.com", "MANAGER", "WEST"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(srv.get("/admins/abc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.get("/admins/999").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_a_transaction_withdraws_stock_and_notifies() {
    let notifier = Arc::new(RecordingNotifier::default());
    let services = AppServices::in_memory(&AppConfig::default()).with_notifier(notifier.clone());
    let srv = TestServer::spawn_with(services).await;
    let (admin_id, customer_id) = seed(&srv).await;

    let res = srv
        .post(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([{ "code": "GLD-1", "quantity": "30", "price": "1450" }]),
            ),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["status"], "PENDING");
    let id = created["id"].as_i64().unwrap();

    let product = srv.get_json("/products/GLD-1").await;
    assert_eq!(product["stock"], "70");

    let detail = srv.get_json(&format!("/transactions/{id}")).await;
    assert_eq!(detail["customer"]["name"], "Ladang Hijau Sdn Bhd");
    assert_eq!(detail["lines"][0]["product_name"], "Gold fertiliser");
    assert_eq!(detail["remarks"][0]["message"], "urgent delivery");

    assert_eq!(
        notifier.events.lock().unwrap().clone(),
        vec!["created INV-0001".to_string()]
    );
}

#[tokio::test]
async fn stock_shortfall_rejects_the_whole_transaction() {
    let srv = TestServer::spawn().await;
    let (admin_id, customer_id) = seed(&srv).await;
    let res = srv
        .post("/products", product_body("STR-1", "Straight", "BAG", "500", "20"))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv
        .post(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([
                    { "code": "STR-1", "quantity": "10", "price": "20" },
                    { "code": "GLD-1", "quantity": "150", "price": "1450" },
                    { "code": "NOPE-1", "quantity": "1", "price": "1" },
                ]),
            ),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    let shortfalls = body["shortfalls"].as_array().unwrap();
    assert_eq!(shortfalls.len(), 2);
    assert!(shortfalls
        .iter()
        .any(|s| s["code"] == "GLD-1" && s["requested"] == "150" && s["available"] == "100"));
    assert!(shortfalls
        .iter()
        .any(|s| s["code"] == "NOPE-1" && s["available"] == "0"));

    // Nothing was withdrawn, nothing was stored.
    assert_eq!(srv.get_json("/products/STR-1").await["stock"], "500");
    assert_eq!(srv.get_json("/products/GLD-1").await["stock"], "100");
    let list = srv.get_json("/transactions").await;
    assert!(list["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn status_lifecycle_is_enforced_on_edit() {
    let notifier = Arc::new(RecordingNotifier::default());
    let services = AppServices::in_memory(&AppConfig::default()).with_notifier(notifier.clone());
    let srv = TestServer::spawn_with(services).await;
    let (admin_id, customer_id) = seed(&srv).await;
    let id = srv
        .create(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([{ "code": "GLD-1", "quantity": "30", "price": "1450" }]),
            ),
        )
        .await;
    let path = format!("/transactions/{id}");

    let res = srv.put(&path, edit_body(customer_id, admin_id, "APPROVED")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.put(&path, edit_body(customer_id, admin_id, "DELIVERED")).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.put(&path, edit_body(customer_id, admin_id, "PENDING")).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invariant_violation");

    let res = srv.put(&path, edit_body(customer_id, admin_id, "SHIPPED")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let detail = srv.get_json(&path).await;
    assert_eq!(detail["status"], "DELIVERED");
    assert_eq!(detail["remarks"][0]["message"], "moved to DELIVERED");

    assert_eq!(
        notifier.events.lock().unwrap().clone(),
        vec![
            "created INV-0001".to_string(),
            "PENDING -> APPROVED".to_string(),
            "APPROVED -> DELIVERED".to_string(),
        ]
    );
}

#[tokio::test]
async fn salespeople_only_see_their_own_records() {
    let srv = TestServer::spawn().await;
    let (seller_a, customer_a) = seed(&srv).await;
    let seller_b = srv
        .create("/admins", admin_body("badrul@example.com", "SALESPERSON", "SOUTH"))
        .await;
    let manager = srv
        .create("/admins", admin_body("mgr@example.com", "MANAGER", "CENTRAL"))
        .await;
    let customer_b = srv.create("/customers", customer_body(seller_b, None)).await;

    let line = json!([{ "code": "GLD-1", "quantity": "1", "price": "1450" }]);
    srv.create("/transactions", transaction_body(customer_a, seller_a, line.clone()))
        .await;
    let mut other = transaction_body(customer_b, seller_b, line);
    other["doc_num"] = json!("INV-0002");
    srv.create("/transactions", other).await;

    let mine = srv
        .get_json(&format!("/transactions?viewer_id={seller_b}"))
        .await;
    let items = mine["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["doc_num"], "INV-0002");
    assert_eq!(items[0]["latest_remark"]["message"], "urgent delivery");

    let all = srv.get_json(&format!("/transactions?viewer_id={manager}")).await;
    assert_eq!(all["items"].as_array().unwrap().len(), 2);

    let customers = srv.get_json(&format!("/customers?viewer_id={seller_a}")).await;
    assert_eq!(customers["items"].as_array().unwrap().len(), 1);
    assert_eq!(customers["items"][0]["id"], customer_a);

    let found = srv
        .get_json(&format!("/transactions/search?q=ladang&admin_id={seller_a}"))
        .await;
    assert_eq!(found["items"].as_array().unwrap().len(), 1);
    let found = srv
        .get_json(&format!("/transactions/search?q=INV-0002&admin_id={seller_a}"))
        .await;
    assert!(found["items"].as_array().unwrap().is_empty());

    let parties = srv.get_json("/parties/search?q=badrul").await;
    assert_eq!(parties["admins"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn referenced_parties_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let (admin_id, customer_id) = seed(&srv).await;

    let res = srv.delete(&format!("/admins/{admin_id}")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let id = srv
        .create(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([{ "code": "GLD-1", "quantity": "1", "price": "1450" }]),
            ),
        )
        .await;
    let res = srv.delete(&format!("/customers/{customer_id}")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    assert_eq!(
        srv.delete(&format!("/transactions/{id}")).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        srv.delete(&format!("/customers/{customer_id}")).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        srv.delete(&format!("/admins/{admin_id}")).await.status(),
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn current_sales_counts_approved_transactions_only() {
    let srv = TestServer::spawn().await;
    let (admin_id, customer_id) = seed(&srv).await;

    // Seeded item groups are shown even before any sale.
    let empty = srv.get_json("/dashboard/current-sales").await;
    assert_eq!(empty["mt"].as_array().unwrap().len(), 4);
    assert_eq!(row(&empty["costing"], "GOLD")["e_coast"], "0");

    let line = json!([{ "code": "GLD-1", "quantity": "30", "price": "1450" }]);
    let approved = srv
        .create("/transactions", transaction_body(customer_id, admin_id, line.clone()))
        .await;
    srv.create("/transactions", transaction_body(customer_id, admin_id, line))
        .await;
    let res = srv
        .put(
            &format!("/transactions/{approved}"),
            edit_body(customer_id, admin_id, "APPROVED"),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let sales = srv.get_json("/dashboard/current-sales").await;
    let gold_mt = row(&sales["mt"], "GOLD");
    assert_eq!(gold_mt["e_coast"], "30");
    assert_eq!(gold_mt["central"], "0");
    assert_eq!(row(&sales["costing"], "GOLD")["e_coast"], "43500");
    assert_eq!(row(&sales["costing"], "ORGANIC")["e_coast"], "0");
}

#[tokio::test]
async fn unresolved_product_fails_the_report() {
    let srv = TestServer::spawn().await;
    let (admin_id, customer_id) = seed(&srv).await;
    let id = srv
        .create(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([{ "code": "GLD-1", "quantity": "5", "price": "1450" }]),
            ),
        )
        .await;
    srv.put(
        &format!("/transactions/{id}"),
        edit_body(customer_id, admin_id, "APPROVED"),
    )
    .await;
    assert_eq!(srv.delete("/products/GLD-1").await.status(), StatusCode::NO_CONTENT);

    let res = srv.get("/dashboard/current-sales").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "data_integrity");
    assert_eq!(body["transaction_id"], id);

    let res = srv.get("/dashboard/forecast-vs-actual").await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn forecast_targets_update_and_compare_with_sales() {
    let srv = TestServer::spawn().await;
    let (admin_id, customer_id) = seed(&srv).await;

    let tables = srv.get_json("/dashboard/forecast").await;
    let mt = tables["mt"].as_array().unwrap();
    assert_eq!(mt.len(), 5);
    assert_eq!(mt[4]["item_group"], "Total");
    assert!(mt[4]["id"].is_null());
    let gold_id = row(&tables["mt"], "GOLD")["id"].as_i64().unwrap();

    let res = srv
        .put(
            &format!("/dashboard/forecast/mt/{gold_id}"),
            json!({ "central": "10", "e_coast": "50", "south": "0", "north": "5" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .put(
            &format!("/dashboard/forecast/mt/{gold_id}"),
            json!({ "central": "-1", "e_coast": "0", "south": "0", "north": "0" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .put(
            "/dashboard/forecast/yearly/1",
            json!({ "central": "1", "e_coast": "1", "south": "1", "north": "1" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let tables = srv.get_json("/dashboard/forecast").await;
    let total = row(&tables["mt"], "Total");
    assert_eq!(total["e_coast"], "50");
    assert_eq!(total["north"], "5");

    let id = srv
        .create(
            "/transactions",
            transaction_body(
                customer_id,
                admin_id,
                json!([{ "code": "GLD-1", "quantity": "30", "price": "1450" }]),
            ),
        )
        .await;
    srv.put(
        &format!("/transactions/{id}"),
        edit_body(customer_id, admin_id, "APPROVED"),
    )
    .await;

    let report = srv.get_json("/dashboard/forecast-vs-actual").await;
    let gold = row(&report["mt"], "GOLD");
    assert_eq!(gold["e_coast"]["forecast"], "50");
    assert_eq!(gold["e_coast"]["actual"], "30");
    assert_eq!(gold["e_coast"]["variance"], "-20");
}
