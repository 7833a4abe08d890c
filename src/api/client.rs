//! HTTP client for the export API

use super::{
    fields_param, sorted_fields_param, ApiError, ApiResult, Estimation, ExportApi, LogRequestInfo,
};
use crate::metrics::record_api_request;
use crate::{DateRange, UserRequest, DATE_FORMAT};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct EvaluationEnvelope {
    log_request_evaluation: Estimation,
}

#[derive(Deserialize)]
struct LogRequestEnvelope {
    log_request: LogRequestInfo,
}

#[derive(Deserialize)]
struct CounterEnvelope {
    counter: CounterInfo,
}

#[derive(Deserialize)]
struct CounterInfo {
    create_time: String,
}

/// Export API client over HTTPS
#[derive(Debug, Clone)]
pub struct LogsApiClient {
    client: Client,
    base_url: String,
}

impl LogsApiClient {
    /// Create a client for the given host (e.g. `https://api-metrika.yandex.ru`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Host this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn counter_url(&self, counter_id: u64, path: &str) -> String {
        format!(
            "{}/management/v1/counter/{}{}",
            self.base_url, counter_id, path
        )
    }

    fn range_params(request: &UserRequest, range: &DateRange, fields: String) -> Vec<(&'static str, String)> {
        vec![
            ("date1", range.start.format(DATE_FORMAT).to_string()),
            ("date2", range.end.format(DATE_FORMAT).to_string()),
            ("source", request.source.as_str().to_string()),
            ("fields", fields),
        ]
    }

    /// Send a request and return the body of a 200 response
    async fn send(&self, endpoint: &'static str, builder: RequestBuilder, token: &str) -> ApiResult<String> {
        let response = builder
            .header("Authorization", format!("OAuth {token}"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        record_api_request(endpoint, status.as_u16());

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        debug!(endpoint, status = status.as_u16(), "{}", body);

        if status.as_u16() != 200 {
            return Err(ApiError::Http {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T>(&self, endpoint: &'static str, builder: RequestBuilder, token: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let body = self.send(endpoint, builder, token).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("{endpoint}: {e}")))
    }
}

#[async_trait]
impl ExportApi for LogsApiClient {
    async fn evaluate(&self, request: &UserRequest, range: &DateRange) -> ApiResult<Estimation> {
        let url = self.counter_url(request.counter_id, "/logrequests/evaluate");
        let params = Self::range_params(request, range, fields_param(&request.fields));
        let envelope: EvaluationEnvelope = self
            .send_json("evaluate", self.client.get(url).query(&params), &request.token)
            .await?;
        Ok(envelope.log_request_evaluation)
    }

    async fn create(&self, request: &UserRequest, range: &DateRange) -> ApiResult<LogRequestInfo> {
        let url = self.counter_url(request.counter_id, "/logrequests");
        let params = Self::range_params(request, range, sorted_fields_param(&request.fields));
        let envelope: LogRequestEnvelope = self
            .send_json("create", self.client.post(url).query(&params), &request.token)
            .await?;
        Ok(envelope.log_request)
    }

    async fn status(&self, request: &UserRequest, request_id: u64) -> ApiResult<LogRequestInfo> {
        let url = self.counter_url(request.counter_id, &format!("/logrequest/{request_id}"));
        let envelope: LogRequestEnvelope = self
            .send_json("status", self.client.get(url), &request.token)
            .await?;
        Ok(envelope.log_request)
    }

    async fn download(&self, request: &UserRequest, request_id: u64, part: u32) -> ApiResult<String> {
        let url = self.counter_url(
            request.counter_id,
            &format!("/logrequest/{request_id}/part/{part}/download"),
        );
        self.send("download", self.client.get(url), &request.token)
            .await
    }

    async fn clean(&self, request: &UserRequest, request_id: u64) -> ApiResult<LogRequestInfo> {
        let url = self.counter_url(request.counter_id, &format!("/logrequest/{request_id}/clean"));
        let envelope: LogRequestEnvelope = self
            .send_json("clean", self.client.post(url), &request.token)
            .await?;
        Ok(envelope.log_request)
    }

    async fn counter_creation_date(&self, token: &str, counter_id: u64) -> ApiResult<NaiveDate> {
        let url = self.counter_url(counter_id, "");
        let envelope: CounterEnvelope = self
            .send_json("counter", self.client.get(url), token)
            .await?;
        parse_creation_date(&envelope.counter.create_time)
    }
}

/// Day part of a `create_time` timestamp such as `2019-04-22T16:10:59+03:00`
fn parse_creation_date(create_time: &str) -> ApiResult<NaiveDate> {
    let day = create_time.get(..10).unwrap_or(create_time);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|e| ApiError::Parse(format!("invalid create_time {create_time:?}: {e}")))
}
