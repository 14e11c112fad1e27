use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use reqwest::header::{
  ACCEPT,
  CONTENT_TYPE
};
use reqwest::{
  Client,
  RequestBuilder,
  Url
};
use serde::de::DeserializeOwned;
use tracing::{
  Span,
  debug,
  instrument,
  warn
};
use uuid::Uuid;
use velocity_shared::{
  ErrorBody,
  NewTask,
  Task,
  TaskId
};

use super::{
  ServiceError,
  TaskService
};

const REQUEST_ID_HEADER: &str =
  "x-request-id";
const JSON: &str = "application/json";

/// Talks to the REST task API under
/// `{base}/api/tasks`.
#[derive(Debug, Clone)]
pub struct HttpTaskService {
  client: Client,
  base:   Url
}

impl HttpTaskService {
  pub fn new(
    base_url: &str,
    timeout: Option<Duration>
  ) -> anyhow::Result<Self> {
    let base =
      Url::parse(base_url.trim())
        .with_context(|| {
          format!(
            "invalid task service URL: \
             {base_url}"
          )
        })?;
    if base.cannot_be_a_base() {
      return Err(anyhow!(
        "task service URL cannot carry \
         a path: {base_url}"
      ));
    }

    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder.build().context(
      "failed building HTTP client for \
       task service"
    )?;

    Ok(Self { client, base })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(
    &self,
    id: Option<&TaskId>
  ) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) =
      url.path_segments_mut()
    {
      segments
        .pop_if_empty()
        .extend(["api", "tasks"]);
      if let Some(id) = id {
        segments.push(id.as_str());
      }
    }
    url
  }

  async fn send(
    &self,
    request: RequestBuilder
  ) -> Result<String, ServiceError> {
    let request_id =
      Uuid::new_v4().to_string();
    Span::current().record(
      "request_id",
      request_id.as_str()
    );

    let response = request
      .header(
        REQUEST_ID_HEADER,
        request_id.as_str()
      )
      .header(ACCEPT, JSON)
      .send()
      .await
      .map_err(|error| {
        warn!(
          error = %error,
          "task service request failed"
        );
        ServiceError::Transport(
          error.to_string()
        )
      })?;

    let status = response.status();
    let body =
      response.text().await.map_err(
        |error| {
          warn!(
            status = %status,
            error = %error,
            "failed reading task \
             service response body"
          );
          ServiceError::Transport(
            error.to_string()
          )
        }
      )?;

    if status.is_success() {
      debug!(
        status = %status,
        body_len = body.len(),
        "task service request succeeded"
      );
      return Ok(body);
    }

    let message = serde_json::from_str::<
      ErrorBody
    >(&body)
    .map(|parsed| parsed.error)
    .ok()
    .filter(|message| !message.is_empty())
    .or_else(|| {
      status
        .canonical_reason()
        .map(str::to_string)
    })
    .unwrap_or_else(|| {
      "request failed".to_string()
    });

    warn!(
      status = %status,
      message = %message,
      "task service returned non-success \
       status"
    );
    Err(ServiceError::Status {
      status: status.as_u16(),
      message
    })
  }

  fn json_body<T: serde::Serialize>(
    request: RequestBuilder,
    value: &T
  ) -> Result<RequestBuilder, ServiceError>
  {
    let payload =
      serde_json::to_string(value)
        .map_err(|error| {
          ServiceError::Decode(
            error.to_string()
          )
        })?;
    Ok(
      request
        .header(CONTENT_TYPE, JSON)
        .body(payload)
    )
  }
}

fn decode<T: DeserializeOwned>(
  body: &str
) -> Result<T, ServiceError> {
  serde_json::from_str(body).map_err(
    |error| {
      warn!(
        error = %error,
        "task service body did not \
         decode"
      );
      ServiceError::Decode(
        error.to_string()
      )
    }
  )
}

impl TaskService for HttpTaskService {
  #[instrument(skip(self), fields(request_id = tracing::field::Empty))]
  async fn list(
    &self
  ) -> Result<Vec<Task>, ServiceError> {
    let body = self
      .send(
        self
          .client
          .get(self.endpoint(None))
      )
      .await?;
    let tasks: Vec<Task> = decode(&body)?;
    debug!(
      count = tasks.len(),
      "listed tasks"
    );
    Ok(tasks)
  }

  #[instrument(skip(self, task), fields(request_id = tracing::field::Empty, title_len = task.title.len(), priority = %task.priority))]
  async fn create(
    &self,
    task: &NewTask
  ) -> Result<Task, ServiceError> {
    let request = Self::json_body(
      self
        .client
        .post(self.endpoint(None)),
      task
    )?;
    let body = self.send(request).await?;
    let created: Task = decode(&body)?;
    debug!(id = %created.id, "created task");
    Ok(created)
  }

  #[instrument(skip(self, task), fields(request_id = tracing::field::Empty, id = %task.id, completed = task.completed))]
  async fn update(
    &self,
    task: &Task
  ) -> Result<(), ServiceError> {
    let request = Self::json_body(
      self
        .client
        .put(self.endpoint(Some(&task.id))),
      task
    )?;
    self.send(request).await?;
    Ok(())
  }

  #[instrument(skip(self), fields(request_id = tracing::field::Empty, id = %id))]
  async fn delete(
    &self,
    id: &TaskId
  ) -> Result<(), ServiceError> {
    self
      .send(
        self
          .client
          .delete(self.endpoint(Some(id)))
      )
      .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use velocity_shared::TaskId;

  use super::HttpTaskService;

  #[test]
  fn builds_endpoints_under_api_tasks() {
    let service = HttpTaskService::new(
      "http://localhost:8080",
      None
    )
    .expect("service");
    assert_eq!(
      service.endpoint(None).as_str(),
      "http://localhost:8080/api/tasks"
    );
    assert_eq!(
      service
        .endpoint(Some(&TaskId::from("42")))
        .as_str(),
      "http://localhost:8080/api/tasks/42"
    );
  }

  #[test]
  fn keeps_base_path_and_escapes_ids() {
    let service = HttpTaskService::new(
      "http://example.test/velocity/",
      None
    )
    .expect("service");
    assert_eq!(
      service
        .endpoint(Some(&TaskId::from(
          "a b/c"
        )))
        .as_str(),
      "http://example.test/velocity/api/tasks/a%20b%2Fc"
    );
  }

  #[test]
  fn rejects_unusable_urls() {
    assert!(
      HttpTaskService::new("not a url", None)
        .is_err()
    );
    assert!(
      HttpTaskService::new(
        "mailto:tasks@example.test",
        None
      )
      .is_err()
    );
  }
}
