use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::domain::{EntityId, Vehicle};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;

#[derive(Clone, Default)]
struct ServerState {
    posts: Arc<Mutex<Vec<Vehicle>>>,
    puts: Arc<Mutex<Vec<(i64, Vehicle)>>>,
    deletes: Arc<Mutex<Vec<i64>>>,
}

fn car() -> Vehicle {
    Vehicle {
        id: Some(EntityId(5)),
        name: "Car".to_string(),
        kind: "land".to_string(),
    }
}

async fn handle_get(Path(id): Path<i64>) -> Result<Json<Vehicle>, StatusCode> {
    match id {
        5 => Ok(Json(car())),
        6 => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn handle_post(
    State(state): State<ServerState>,
    Json(vehicle): Json<Vehicle>,
) -> Json<Vehicle> {
    state.posts.lock().await.push(vehicle.clone());
    let mut created = vehicle;
    created.id = Some(EntityId(99));
    Json(created)
}

async fn handle_put(
    Path(id): Path<i64>,
    State(state): State<ServerState>,
    Json(vehicle): Json<Vehicle>,
) -> StatusCode {
    state.puts.lock().await.push((id, vehicle));
    StatusCode::NO_CONTENT
}

async fn handle_delete(Path(id): Path<i64>, State(state): State<ServerState>) -> StatusCode {
    state.deletes.lock().await.push(id);
    StatusCode::NO_CONTENT
}

async fn spawn_crud_server() -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = ServerState::default();
    let app = Router::new()
        .route("/vehicles", post(handle_post))
        .route(
            "/vehicles/:id",
            get(handle_get).put(handle_put).delete(handle_delete),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn fetch_decodes_the_stored_entity() {
    let (url, _state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    let fetched = service.fetch(EntityId(5)).await.expect("fetch");
    assert_eq!(fetched, Some(car()));
}

#[tokio::test]
async fn fetch_maps_not_found_to_none() {
    let (url, _state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    let fetched = service.fetch(EntityId(404)).await.expect("fetch");
    assert_eq!(fetched, None);
}

#[tokio::test]
async fn fetch_surfaces_unexpected_statuses() {
    let (url, _state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    let err = service.fetch(EntityId(6)).await.expect_err("status error");
    assert_eq!(err, ServiceError::Status(500));
}

#[tokio::test]
async fn create_posts_the_body_and_decodes_the_server_copy() {
    let (url, state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    let template = Vehicle {
        id: None,
        name: "Rover".to_string(),
        kind: "space".to_string(),
    };
    let created = service.create(&template).await.expect("create");

    assert_eq!(created.id, Some(EntityId(99)));
    assert_eq!(created.name, "Rover");
    assert_eq!(*state.posts.lock().await, vec![template]);
}

#[tokio::test]
async fn update_puts_to_the_item_url() {
    let (url, state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    service.update(&car()).await.expect("update");
    assert_eq!(*state.puts.lock().await, vec![(5, car())]);
}

#[tokio::test]
async fn update_without_identifier_is_rejected_locally() {
    let (url, state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    let err = service
        .update(&Vehicle::template())
        .await
        .expect_err("missing id");
    assert_eq!(err, ServiceError::MissingId);
    assert!(state.puts.lock().await.is_empty());
}

#[tokio::test]
async fn delete_targets_the_item_url() {
    let (url, state) = spawn_crud_server().await;
    let service = HttpEntityService::<Vehicle>::new(url, "vehicles");

    service.delete(&car()).await.expect("delete");
    assert_eq!(*state.deletes.lock().await, vec![5]);
}

#[tokio::test]
async fn trigger_reset_reaches_every_subscriber() {
    let service = HttpEntityService::<Vehicle>::new("http://127.0.0.1:1", "vehicles");
    let mut first = service.subscribe_reset();
    let mut second = service.subscribe_reset();

    service.trigger_reset();

    first.recv().await.expect("first subscriber");
    second.recv().await.expect("second subscriber");
}
