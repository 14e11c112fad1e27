mod common;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use common::{RecordingPresenter, TTL};
use serde_json::json;
use velocity_core::controller::TaskController;
use velocity_core::notify::NoticeKind;
use velocity_core::service::{HttpTaskService, ServiceError, TaskService};
use velocity_shared::{NewTask, TaskId, TaskPriority};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> HttpTaskService {
    HttpTaskService::new(&server.uri(), Some(Duration::from_secs(5))).expect("service")
}

fn task_json(id: &str, title: &str, priority: &str, completed: bool) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "priority": priority,
        "completed": completed,
        "createdAt": "2026-10-18T09:30:00",
        "updatedAt": "2026-10-18T09:30:00"
    })
}

#[tokio::test]
async fn lists_tasks_newest_first_as_served() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("accept", "application/json"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_json("b", "Write report", "MEDIUM", true),
            task_json("a", "Buy milk", "HIGH", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = service(&server).list().await.expect("list");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, TaskId::from("b"));
    assert!(tasks[0].completed);
    assert_eq!(tasks[1].priority, TaskPriority::High);
}

#[tokio::test]
async fn missing_priority_reads_as_medium() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "a",
            "title": "Legacy row",
            "priority": null,
            "createdAt": "2026-10-18T09:30:00.123Z"
        }])))
        .mount(&server)
        .await;

    let tasks = service(&server).list().await.expect("list");
    assert_eq!(tasks[0].priority, TaskPriority::Medium);
    assert!(!tasks[0].completed);
    assert_eq!(tasks[0].updated_at, None);
}

#[tokio::test]
async fn create_posts_the_new_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "title": "Buy milk",
            "priority": "HIGH",
            "completed": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_json(
            "c1", "Buy milk", "HIGH", false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let draft = NewTask::pending("Buy milk", TaskPriority::High, chrono::Utc::now());
    let created = service(&server).create(&draft).await.expect("create");
    assert_eq!(created.id, TaskId::from("c1"));
    assert_eq!(created.title, "Buy milk");
}

#[tokio::test]
async fn update_and_delete_address_the_task() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/c1"))
        .and(body_partial_json(json!({ "id": "c1", "completed": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(
            "c1", "Buy milk", "HIGH", true,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    let mut task: velocity_shared::Task =
        serde_json::from_value(task_json("c1", "Buy milk", "HIGH", false)).expect("task");
    task.completed = true;

    service.update(&task).await.expect("update");
    service.delete(&task.id).await.expect("delete");
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Task not found",
            "status": 404,
            "timestamp": 1_760_000_000_000_i64
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let service = service(&server);
    assert_eq!(
        service.delete(&TaskId::from("nope")).await,
        Err(ServiceError::not_found())
    );
    assert_eq!(
        service.list().await,
        Err(ServiceError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = service(&server).list().await.expect_err("decode");
    assert!(matches!(err, ServiceError::Decode(_)));
    assert!(!err.is_transport());
}

/// Base URL of a local port with nothing listening on it.
fn closed_port_url() -> String {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr")
    };
    format!("http://{addr}")
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let service =
        HttpTaskService::new(&closed_port_url(), Some(Duration::from_secs(2))).expect("service");
    let err = service.list().await.expect_err("nobody listening");
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}

#[tokio::test]
async fn unreachable_service_is_reported_as_an_error_notice() {
    let service =
        HttpTaskService::new(&closed_port_url(), Some(Duration::from_secs(2))).expect("service");
    let presenter = Arc::new(RecordingPresenter::default());
    let controller = TaskController::new(service, Arc::clone(&presenter), TTL);

    controller.load().await.expect_err("offline");
    assert_eq!(
        presenter.messages(),
        vec![(NoticeKind::Error, "Error loading tasks".to_string())]
    );
}
