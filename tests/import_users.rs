#[macro_use]
mod common;

use actix_web::{http::StatusCode, test, web, App, HttpResponse, HttpServer};
use common::*;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Deserialize)]
struct StubQuery {
    results: usize,
}

fn fake_user(i: usize) -> Value {
    json!({
        "gender": "female",
        "name": { "title": "Ms", "first": format!("First{}", i), "last": "Imported" },
        "location": { "city": "Espoo", "country": "Finland" },
        "email": format!("imported{}@example.com", i),
        "login": {
            "uuid": Uuid::new_v4(),
            "username": format!("imported_{}", i),
            "password": format!("pw{}", i),
            "sha256": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        },
        "dob": { "date": "1985-06-07T10:20:30.000Z", "age": 39 }
    })
}

async fn stub_users(query: web::Query<StubQuery>) -> HttpResponse {
    let results: Vec<Value> = (0..query.results).map(fake_user).collect();
    HttpResponse::Ok().json(json!({
        "results": results,
        "info": { "seed": "stub", "results": query.results, "page": 1, "version": "1.4" }
    }))
}

async fn stub_broken() -> HttpResponse {
    HttpResponse::InternalServerError().finish()
}

async fn stub_garbage() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "unexpected": "data" }))
}

/// Starts a throwaway upstream on an ephemeral port and returns its base URL.
fn spawn_upstream() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/api/", web::get().to(stub_users))
            .route("/broken/", web::get().to(stub_broken))
            .route("/garbage/", web::get().to(stub_garbage))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

#[actix_web::test]
async fn admin_imports_users() {
    let upstream = spawn_upstream();
    let repo = seeded_repo().await;
    let state = state_with(repo.clone(), &format!("{}/api/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import?results=3")
        .insert_header(admin_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "success": true, "imported_users": 3 }));
    assert_eq!(repo.count().await, 6);

    // imported accounts are plain users who can log in with their upstream password
    let req = test::TestRequest::post()
        .uri("/token")
        .set_form(&[("username", "imported_1"), ("password", "pw1")])
        .to_request();
    let token: Value = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::get()
        .uri("/me")
        .insert_header((
            "Authorization",
            format!("Bearer {}", token["access_token"].as_str().unwrap()),
        ))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["login"]["role"], "user");
    assert_eq!(me["city"], "Espoo");
    assert_eq!(me["dob"], "1985-06-07");
    assert_eq!(me["name"]["first_name"], "First1");
}

#[actix_web::test]
async fn import_defaults_to_five_users() {
    let upstream = spawn_upstream();
    let repo = seeded_repo().await;
    let state = state_with(repo.clone(), &format!("{}/api/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import")
        .insert_header(admin_header())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["imported_users"], 5);
}

#[actix_web::test]
async fn non_admin_cannot_import() {
    let upstream = spawn_upstream();
    let repo = seeded_repo().await;
    let state = state_with(repo.clone(), &format!("{}/api/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import?results=2")
        .insert_header(alice_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "You do not have permission to import users");
    assert_eq!(repo.count().await, 3);
}

#[actix_web::test]
async fn import_without_token() {
    let state = state_with(seeded_repo().await, "http://127.0.0.1:9/api/");
    let app = init_app!(state);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/import").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn import_rejects_out_of_range_count() {
    let state = state_with(seeded_repo().await, "http://127.0.0.1:9/api/");
    let app = init_app!(state);

    for uri in ["/import?results=0", "/import?results=21", "/import?gender=robot"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(admin_header())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
    }
}

#[actix_web::test]
async fn import_with_unexpected_payload() {
    let upstream = spawn_upstream();
    let repo = seeded_repo().await;
    let state = state_with(repo.clone(), &format!("{}/garbage/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import")
        .insert_header(admin_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Invalid response format from external API");
    assert_eq!(repo.count().await, 3);
}

#[actix_web::test]
async fn import_when_upstream_fails() {
    let upstream = spawn_upstream();
    let state = state_with(seeded_repo().await, &format!("{}/broken/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import")
        .insert_header(admin_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "External API error");
}

#[actix_web::test]
async fn import_when_upstream_unreachable() {
    let state = state_with(seeded_repo().await, "http://127.0.0.1:9/api/");
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/import")
        .insert_header(admin_header())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "External API unavailable");
}

#[actix_web::test]
async fn test_endpoint_passes_upstream_json_through() {
    let upstream = spawn_upstream();
    let state = state_with(MemoryUserRepository::new(), &format!("{}/api/", upstream));
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/test?results=2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["info"]["seed"], "stub");
}

#[actix_web::test]
async fn test_endpoint_validates_count() {
    let state = state_with(MemoryUserRepository::new(), "http://127.0.0.1:9/api/");
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/test?results=50").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
