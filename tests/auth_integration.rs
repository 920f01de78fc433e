use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tabungan::auth::{Argon2Hasher, HashError, HashParams, PasswordHasher};
use tabungan::configuration::JwtSettings;
use tabungan::startup::{run, AppServices};
use tabungan::uploads::UploadStore;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub upload_dir: PathBuf,
}

// Cheap argon2 costs keep debug-mode tests fast; the hash format is unchanged.
fn test_hash_params() -> HashParams {
    HashParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        output_len: 32,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

/// Spawn the app, letting the caller swap collaborators before it starts
fn spawn_app_with(customize: impl FnOnce(&mut AppServices)) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let upload_dir = std::env::temp_dir().join(format!("tabungan-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload directory");

    let mut services = AppServices::in_memory(
        &JwtSettings::new("integration-test-secret-of-decent-length"),
        test_hash_params(),
        UploadStore::new(&upload_dir, 1024 * 1024),
    );
    customize(&mut services);
    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
        upload_dir,
    }
}

fn files_in(directory: &Path) -> usize {
    std::fs::read_dir(directory)
        .expect("Failed to read upload directory")
        .count()
}

/// Hasher that counts every argon2 derivation it performs
struct CountingHasher {
    inner: Argon2Hasher,
    derivations: Arc<AtomicUsize>,
}

impl PasswordHasher for CountingHasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        self.inner.hash(password)
    }

    fn verify(&self, password: &str, encoded_hash: &str) -> Result<bool, HashError> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(password, encoded_hash)
    }
}

fn with_image(form: Form) -> Form {
    form.part(
        "image",
        Part::bytes(b"\x89PNG fake".to_vec())
            .file_name("me.png")
            .mime_str("image/png")
            .unwrap(),
    )
}

fn registration_form(email: &str, password: &str, confirmation: &str) -> Form {
    Form::new()
        .text("name", "Alice")
        .text("email", email.to_string())
        .text("password", password.to_string())
        .text("confirmation_password", confirmation.to_string())
        .text("phone_number", "081234567890")
}

impl TestApp {
    async fn register(&self, form: Form) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/register", &self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/login", &self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register and log in, returning the login `data` object
    async fn login_as(&self, email: &str, password: &str) -> Value {
        let response = self.register(registration_form(email, password, password)).await;
        assert_eq!(201, response.status().as_u16());

        let response = self.login(email, password).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }

    async fn list_savings(&self, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/api/v1/savings", &self.address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn logout(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/logout", &self.address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/v1/auth/refresh", &self.address))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

async fn message_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse response");
    body["message"].as_str().unwrap_or_default().to_string()
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_with_identity() {
    let app = spawn_app();

    let form = registration_form("alice@example.com", "secret1", "secret1").part(
        "image",
        Part::bytes(b"\x89PNG fake".to_vec())
            .file_name("me.png")
            .mime_str("image/png")
            .unwrap(),
    );
    let response = app.register(form).await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["phone_number"], "081234567890");
    assert!(body["data"]["image"].as_str().unwrap().starts_with("/uploads/"));
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let app = spawn_app();

    let first = app.register(registration_form("dup@example.com", "secret1", "secret1")).await;
    assert_eq!(201, first.status().as_u16());

    let second = app.register(registration_form("dup@example.com", "secret1", "secret1")).await;
    assert_eq!(409, second.status().as_u16());
    assert_eq!(message_of(second).await, "email already exists");
}

#[tokio::test]
async fn rejected_registration_leaves_no_image_behind() {
    let app = spawn_app();

    let first = app.register(with_image(registration_form("dup@example.com", "secret1", "secret1"))).await;
    assert_eq!(201, first.status().as_u16());
    assert_eq!(files_in(&app.upload_dir), 1);

    let second = app.register(with_image(registration_form("dup@example.com", "secret1", "secret1"))).await;
    assert_eq!(409, second.status().as_u16());
    assert_eq!(files_in(&app.upload_dir), 1);
}

#[tokio::test]
async fn register_rejects_forms_with_too_many_parts() {
    let app = spawn_app();

    let mut form = registration_form("many@example.com", "secret1", "secret1");
    for i in 0..32 {
        form = form.text(format!("extra_{}", i), "x");
    }
    let response = app.register(form).await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app();
    let test_cases = vec![
        (registration_form("not-an-email", "secret1", "secret1"), "invalid email"),
        (registration_form("b@example.com", "short", "short"), "short password"),
        (registration_form("b@example.com", "secret1", "secret2"), "mismatched confirmation"),
    ];

    for (form, description) in test_cases {
        let response = app.register(form).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request for {}.",
            description
        );
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_issues_pair_and_gate_accepts_only_access_token() {
    let app = spawn_app();

    let data = app.login_as("a@x.com", "secret1").await;
    assert_eq!(data["token_type"], "Bearer");
    assert_eq!(data["expires_in"], 900);
    assert_eq!(data["email"], "a@x.com");
    assert_eq!(data["name"], "Alice");

    let access = data["access_token"].as_str().unwrap();
    let refresh = data["refresh_token"].as_str().unwrap();
    assert_ne!(access, refresh);

    let response = app.list_savings(access).await;
    assert_eq!(200, response.status().as_u16());

    let response = app.list_savings(refresh).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(message_of(response).await, "Unauthorized");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.login_as("a@x.com", "secret1").await;

    let wrong_password = app.login("a@x.com", "wrong-password").await;
    assert_eq!(401, wrong_password.status().as_u16());
    let wrong_password = message_of(wrong_password).await;

    let unknown_email = app.login("nobody@x.com", "secret1").await;
    assert_eq!(401, unknown_email.status().as_u16());
    let unknown_email = message_of(unknown_email).await;

    assert_eq!(wrong_password, "invalid email or password");
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn login_with_unknown_email_still_runs_argon2() {
    let derivations = Arc::new(AtomicUsize::new(0));
    let counter = derivations.clone();
    let app = spawn_app_with(move |services| {
        services.hasher = Arc::new(CountingHasher {
            inner: Argon2Hasher::new(test_hash_params()),
            derivations: counter,
        });
    });

    let response = app.login("nobody@x.com", "secret1").await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(derivations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn login_returns_400_for_malformed_body() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/api/v1/auth/login", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 400);
}

// --- Session Lifecycle Tests ---

#[tokio::test]
async fn logout_revokes_access_and_refresh_tokens() {
    let app = spawn_app();
    let data = app.login_as("a@x.com", "secret1").await;
    let access = data["access_token"].as_str().unwrap();
    let refresh = data["refresh_token"].as_str().unwrap();

    let response = app.logout(access, json!({ "refresh_token": refresh })).await;
    assert_eq!(200, response.status().as_u16());

    let response = app.list_savings(access).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(message_of(response).await, "Token Not Valid");

    let response = app.refresh(refresh).await;
    assert_eq!(401, response.status().as_u16());
    assert_eq!(message_of(response).await, "Token Not Valid");
}

#[tokio::test]
async fn refresh_rotates_tokens() {
    let app = spawn_app();
    let data = app.login_as("a@x.com", "secret1").await;
    let old_refresh = data["refresh_token"].as_str().unwrap();

    let response = app.refresh(old_refresh).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let new_access = body["data"]["access_token"].as_str().unwrap();
    assert_eq!(body["data"]["expires_in"], 900);

    assert_eq!(200, app.list_savings(new_access).await.status().as_u16());
    assert_eq!(401, app.refresh(old_refresh).await.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app();
    let data = app.login_as("a@x.com", "secret1").await;

    let response = app.refresh(data["access_token"].as_str().unwrap()).await;
    assert_eq!(401, response.status().as_u16());
}

// --- Savings Tests ---

fn saving_form(currency_code: &str) -> Form {
    Form::new()
        .text("name", "Holiday fund")
        .text("target_amount", "5000000")
        .text("currency_code", currency_code.to_string())
        .text("filling_plan", "monthly")
        .text("filling_nominal", "250000")
        .part(
            "image",
            Part::bytes(b"fake image bytes".to_vec())
                .file_name("beach.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        )
}

#[tokio::test]
async fn create_and_list_savings() {
    let app = spawn_app();
    let data = app.login_as("a@x.com", "secret1").await;
    let access = data["access_token"].as_str().unwrap();

    let response = app
        .client
        .post(&format!("{}/api/v1/savings", &app.address))
        .bearer_auth(access)
        .multipart(saving_form("idr"))
        .send()
        .await
        .unwrap();
    assert_eq!(201, response.status().as_u16());
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["data"]["currency_code"], "IDR");
    assert_eq!(created["data"]["currency_flag"], "🇮🇩");
    assert_eq!(created["data"]["filling_plan"], "monthly");
    assert_eq!(created["data"]["user"]["email"], "a@x.com");

    let image = created["data"]["image"].as_str().unwrap();
    let served = app.client.get(&format!("{}{}", &app.address, image)).send().await.unwrap();
    assert_eq!(200, served.status().as_u16());
    assert_eq!(served.bytes().await.unwrap().as_ref(), b"fake image bytes");

    let response = app.list_savings(access).await;
    let listed: Value = response.json().await.unwrap();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["uuid"], created["data"]["uuid"]);
}

#[tokio::test]
async fn create_saving_rejects_unknown_currency_and_missing_image() {
    let app = spawn_app();
    let data = app.login_as("a@x.com", "secret1").await;
    let access = data["access_token"].as_str().unwrap();

    let response = app
        .client
        .post(&format!("{}/api/v1/savings", &app.address))
        .bearer_auth(access)
        .multipart(saving_form("XYZ"))
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());

    // The image of the rejected saving is not kept.
    assert_eq!(files_in(&app.upload_dir), 0);

    let without_image = Form::new()
        .text("name", "Holiday fund")
        .text("target_amount", "5000000")
        .text("currency_code", "USD")
        .text("filling_plan", "weekly")
        .text("filling_nominal", "100");
    let response = app
        .client
        .post(&format!("{}/api/v1/savings", &app.address))
        .bearer_auth(access)
        .multipart(without_image)
        .send()
        .await
        .unwrap();
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn savings_require_a_bearer_token() {
    let app = spawn_app();

    let response = app
        .client
        .get(&format!("{}/api/v1/savings", &app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Unauthorized");
    assert_eq!(body["code"], 401);
}
