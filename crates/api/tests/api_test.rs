//! End-to-end API tests over the in-memory store and carrier.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use creditship_api::{AppState, create_router};
use creditship_core::access::Role;
use creditship_core::account::Account;
use creditship_core::memory::{MemoryCarrier, MemoryStore};
use creditship_core::store::AccountStore;
use creditship_shared::config::BatchConfig;
use creditship_shared::{JwtConfig, JwtService};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "correct-horse-battery";

struct TestApp {
    router: Router,
    state: AppState<MemoryStore>,
    store: Arc<MemoryStore>,
    carrier: Arc<MemoryCarrier>,
    admin: Account,
    reseller: Account,
    user: Account,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let carrier = Arc::new(MemoryCarrier::new());
        let jwt = JwtService::new(JwtConfig {
            secret: "api-test-secret".to_string(),
            access_token_expires_minutes: 15,
        });
        let state = AppState::new(
            Arc::clone(&store),
            carrier.clone(),
            jwt,
            &BatchConfig {
                workers: 2,
                queue_capacity: 16,
                sweep_interval_ms: 60_000,
            },
        );
        let admin = store.seed_login(Role::Admin, None, "admin@creditship.test", PASSWORD);
        let reseller = store.seed_login(
            Role::Reseller,
            Some(admin.id),
            "reseller@creditship.test",
            PASSWORD,
        );
        let user = store.seed_login(
            Role::User,
            Some(reseller.id),
            "user@creditship.test",
            PASSWORD,
        );
        Self {
            router: create_router(state.clone()),
            state,
            store,
            carrier,
            admin,
            reseller,
            user,
        }
    }

    fn token(&self, account: &Account) -> String {
        self.state
            .jwt_service
            .generate_access_token(account.id.into_inner(), account.role.as_str())
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{uri}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, account: &Account) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&self.token(account)), None)
            .await
    }

    async fn post(&self, uri: &str, account: &Account, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&self.token(account)), Some(body))
            .await
    }
}

fn amount(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn address(name: &str, zip: &str) -> Value {
    json!({
        "name": name,
        "street1": "215 Clayton St",
        "city": "San Francisco",
        "state": "CA",
        "zip": zip,
        "country": "US"
    })
}

fn label_request(rate_ref: &str) -> Value {
    json!({
        "from_address": address("Warehouse", "94117"),
        "to_address": address("Mr Hippo", "94105"),
        "parcel": {
            "length": "10", "width": "8", "height": "4", "distance_unit": "in",
            "weight": "2", "mass_unit": "lb"
        },
        "rate_ref": rate_ref
    })
}

fn csv_row(weight: &str) -> Value {
    json!({
        "from_name": "Warehouse", "from_street1": "215 Clayton St", "from_city": "San Francisco",
        "from_state": "CA", "from_zip": "94117", "from_country": "US",
        "to_name": "Mr Hippo", "to_street1": "965 Mission St", "to_city": "San Francisco",
        "to_state": "CA", "to_zip": "94105", "to_country": "US",
        "length": "10", "width": "8", "height": "4", "distance_unit": "in",
        "weight": weight, "mass_unit": "lb"
    })
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn login_returns_token_for_valid_credentials() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "Reseller@Creditship.test", "password": PASSWORD})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["email"], "reseller@creditship.test");
    assert_eq!(body["account"]["role"], "reseller");
    assert!(body["account"].get("password_hash").is_none());
    assert_eq!(body["expires_in"], 900);

    let token = body["access_token"].as_str().unwrap();
    let (status, me) = app.send(Method::GET, "/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], json!(app.reseller.id));
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "user@creditship.test", "password": "not-the-password"})),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn protected_route_requires_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MISSING_TOKEN");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/me", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[tokio::test]
async fn deactivated_account_token_stops_working() {
    let app = TestApp::new();
    let token = app.token(&app.user);
    app.store
        .set_account_active(app.user.id, false)
        .await
        .unwrap();

    let (status, body) = app.send(Method::GET, "/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn stored_role_wins_over_token_role() {
    let app = TestApp::new();
    let forged = app
        .state
        .jwt_service
        .generate_access_token(app.user.id.into_inner(), "super_admin")
        .unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/accounts",
            Some(&forged),
            Some(json!({
                "email": "new-admin@creditship.test",
                "name": "New Admin",
                "password": PASSWORD,
                "role": "admin"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ROLE_NOT_PERMITTED");
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn reseller_provisions_and_lists_own_users() {
    let app = TestApp::new();

    let (status, created) = app
        .post(
            "/accounts",
            &app.reseller,
            json!({
                "email": "customer@creditship.test",
                "name": "Customer",
                "password": PASSWORD,
                "role": "user"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["creator_id"], json!(app.reseller.id));

    let (status, page) = app.get("/accounts?role=user", &app.reseller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 2);

    let (status, body) = app
        .get(&format!("/accounts/{}", app.admin.id), &app.reseller)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OUT_OF_SCOPE");
}

#[tokio::test]
async fn deactivate_keeps_account_visible() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            &format!("/accounts/{}/deactivate", app.user.id),
            &app.reseller,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (status, body) = app
        .get(&format!("/accounts/{}", app.user.id), &app.admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
}

// ============================================================================
// Credits
// ============================================================================

#[tokio::test]
async fn reseller_cannot_assign_outside_scope() {
    let app = TestApp::new();
    let stranger = app.store.seed_account(Role::User, Some(app.admin.id));
    app.store.grant(app.reseller.id, dec!(100)).unwrap();

    let (status, body) = app
        .post(
            "/credits/assign",
            &app.reseller,
            json!({"target_id": stranger.id, "amount": "10.00"}),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OUT_OF_SCOPE");
    assert_eq!(app.store.account(app.reseller.id).unwrap().balance, dec!(100));
}

#[tokio::test]
async fn reseller_assignment_beyond_own_balance_is_payment_required() {
    let app = TestApp::new();
    app.store.grant(app.reseller.id, dec!(5)).unwrap();

    let (status, body) = app
        .post(
            "/credits/assign",
            &app.reseller,
            json!({"target_id": app.user.id, "amount": "6.00"}),
        )
        .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "INSUFFICIENT_AUTHORIZER_BALANCE");
}

#[tokio::test]
async fn invalid_amount_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/credits/assign",
            &app.admin,
            json!({"target_id": app.user.id, "amount": "1.005"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn assign_and_revoke_show_in_history() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/credits/assign",
            &app.admin,
            json!({"target_id": app.user.id, "amount": "50.00", "description": "Welcome"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["balance_after"]), dec!(50));

    let (status, body) = app
        .post(
            "/credits/revoke",
            &app.admin,
            json!({"target_id": app.user.id, "amount": "20.00"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["amount"]), dec!(-20));
    assert_eq!(amount(&body["balance_after"]), dec!(30));

    let (status, page) = app.get("/transactions", &app.user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 2);
    let sum: Decimal = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tx| amount(&tx["amount"]))
        .sum();
    assert_eq!(sum, dec!(30));
}

#[tokio::test]
async fn user_cannot_read_another_accounts_history() {
    let app = TestApp::new();

    let (status, body) = app
        .get(&format!("/transactions?account_id={}", app.reseller.id), &app.user)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OUT_OF_SCOPE");
}

// ============================================================================
// Labels
// ============================================================================

#[tokio::test]
async fn purchase_then_refund_restores_balance() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(50)).unwrap();
    app.carrier.add_rate("rate_priority", dec!(7.25));

    let (status, bought) = app
        .post("/labels/purchase", &app.user, label_request("rate_priority"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bought["status"], "purchased");
    assert_eq!(amount(&bought["cost"]), dec!(7.25));
    assert_eq!(amount(&bought["balance_after"]), dec!(42.75));
    assert!(bought["tracking_id"].as_str().is_some());

    let shipment_id = bought["shipment_id"].clone();
    let (status, refunded) = app
        .post("/labels/refund", &app.user, json!({"shipment_id": shipment_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&refunded["amount"]), dec!(7.25));
    assert_eq!(amount(&refunded["balance_after"]), dec!(50));

    let (status, body) = app
        .post("/labels/refund", &app.user, json!({"shipment_id": shipment_id}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NOT_REFUNDABLE");
    assert_eq!(app.store.account(app.user.id).unwrap().balance, dec!(50));
}

#[tokio::test]
async fn purchase_without_credits_is_payment_required() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(5)).unwrap();
    app.carrier.add_rate("rate_priority", dec!(7.25));

    let (status, body) = app
        .post("/labels/purchase", &app.user, label_request("rate_priority"))
        .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "INSUFFICIENT_CREDITS");
    assert_eq!(app.carrier.purchase_count(), 0);
}

#[tokio::test]
async fn carrier_outage_is_bad_gateway() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(50)).unwrap();
    app.carrier.add_rate("rate_priority", dec!(7.25));
    app.carrier.fail_purchases(true);

    let (status, body) = app
        .post("/labels/purchase", &app.user, label_request("rate_priority"))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "CARRIER_ERROR");
    assert_eq!(app.store.account(app.user.id).unwrap().balance, dec!(50));

    let (_, page) = app.get("/labels?status=error", &app.user).await;
    assert_eq!(page["meta"]["total"], 1);
}

#[tokio::test]
async fn labels_are_scoped_to_the_owner_chain() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(50)).unwrap();
    app.carrier.add_rate("rate_priority", dec!(7.25));
    let (_, bought) = app
        .post("/labels/purchase", &app.user, label_request("rate_priority"))
        .await;
    let uri = format!("/labels/{}", bought["shipment_id"].as_str().unwrap());
    let outsider = app.store.seed_account(Role::User, Some(app.admin.id));

    assert_eq!(app.get(&uri, &app.reseller).await.0, StatusCode::OK);
    assert_eq!(app.get(&uri, &app.admin).await.0, StatusCode::OK);
    let (status, body) = app.get(&uri, &outsider).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OUT_OF_SCOPE");
}

#[tokio::test]
async fn reconcile_is_admin_only() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(50)).unwrap();
    app.carrier.add_rate("rate_priority", dec!(7.25));
    let (_, bought) = app
        .post("/labels/purchase", &app.user, label_request("rate_priority"))
        .await;
    let uri = format!(
        "/labels/{}/reconcile",
        bought["shipment_id"].as_str().unwrap()
    );

    let (status, body) = app.post(&uri, &app.reseller, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "ROLE_NOT_PERMITTED");

    let (status, body) = app.post(&uri, &app.admin, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "NOT_RECONCILABLE");
}

// ============================================================================
// Batch
// ============================================================================

async fn wait_for_batch(app: &TestApp, uri: &str, owner: &Account) -> Value {
    for _ in 0..500 {
        let (status, job) = app.get(uri, owner).await;
        assert_eq!(status, StatusCode::OK);
        if matches!(job["status"].as_str(), Some("completed" | "failed" | "cancelled")) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {uri} did not finish");
}

#[tokio::test]
async fn batch_upload_is_accepted_and_processed_in_background() {
    let app = TestApp::new();
    app.store.grant(app.user.id, dec!(20)).unwrap();
    app.carrier.set_cheapest_rate(Some(dec!(5)));

    let (status, accepted) = app
        .post(
            "/batch",
            &app.user,
            json!({"filename": "labels.csv", "rows": [csv_row("2"), csv_row("0"), csv_row("3")]}),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(accepted["total_rows"], 3);

    let uri = format!("/batch/{}", accepted["batch_id"].as_str().unwrap());
    let job = wait_for_batch(&app, &uri, &app.user).await;

    assert_eq!(job["status"], "completed");
    assert_eq!(job["processed_rows"], 3);
    assert_eq!(job["successful_rows"], 2);
    assert_eq!(job["failed_rows"], 1);
    assert_eq!(job["error_log"][0]["row"], 2);
    assert_eq!(app.store.account(app.user.id).unwrap().balance, dec!(10));

    let (status, body) = app.get(&uri, &app.store.seed_account(Role::User, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OUT_OF_SCOPE");

    let (status, page) = app.get("/batch", &app.reseller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["total"], 1);
}

#[tokio::test]
async fn batch_with_missing_columns_is_rejected_up_front() {
    let app = TestApp::new();
    let mut row = csv_row("2");
    row.as_object_mut().unwrap().remove("to_zip");

    let (status, body) = app
        .post("/batch", &app.user, json!({"rows": [row]}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_COLUMNS");
    assert_eq!(body["missing_columns"], json!(["to_zip"]));

    let (_, page) = app.get("/batch", &app.user).await;
    assert_eq!(page["meta"]["total"], 0);
}

#[tokio::test]
async fn finished_batch_cannot_be_cancelled() {
    let app = TestApp::new();

    let (status, accepted) = app
        .post("/batch", &app.user, json!({"rows": []}))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let uri = format!("/batch/{}", accepted["batch_id"].as_str().unwrap());
    let job = wait_for_batch(&app, &uri, &app.user).await;
    assert_eq!(job["status"], "completed");

    let (status, body) = app
        .post(&format!("{uri}/cancel"), &app.user, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BATCH_ALREADY_FINISHED");
}
