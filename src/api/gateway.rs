use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    api::{
        auth::Auth,
        client::{Backend, extract_message, read_json},
        models::{CollectionQuery, ConsumerPayload, PredictRequest, PredictResponse, RecordPayload},
        session::{Session, TokenRefresher},
    },
    core::{
        filter::{FilterCriteria, evaluate},
        forecast::{Forecaster, Month},
        record::{Consumer, ConsumptionRecord},
    },
    error::{Error, Result},
    prelude::*,
};

/// Authenticated backend resources.
///
/// Each call asks the session for the access token right before sending the request.
pub struct Gateway<R = Auth> {
    backend: Backend,
    session: Session<R>,
}

impl<R: TokenRefresher> Gateway<R> {
    pub const fn new(backend: Backend, session: Session<R>) -> Self {
        Self { backend, session }
    }

    pub const fn session(&self) -> &Session<R> {
        &self.session
    }

    /// List the consumers, narrowed down by substring on the client side as well.
    #[instrument(
        skip_all,
        fields(consumer_id = ?criteria.consumer_id, postcode = ?criteria.postcode),
    )]
    pub async fn list_consumers(&self, criteria: &FilterCriteria) -> Result<Vec<Consumer>> {
        const PATH: &str = "consumers/";

        let request = self.backend.request(Method::GET, PATH).query(&CollectionQuery {
            consumer_id: criteria.consumer_id.as_deref(),
            postcode: criteria.postcode.as_deref(),
            start_date: None,
            end_date: None,
        });
        let consumers: Vec<Consumer> = self
            .send::<Vec<ConsumerPayload>>(PATH, request)
            .await?
            .into_iter()
            .map(Consumer::from)
            .collect();
        let consumers = evaluate(&consumers, criteria);
        info!(n_consumers = consumers.len(), "fetched");
        Ok(consumers)
    }

    /// List the records, dropping whatever the backend returns outside the criteria.
    #[instrument(
        skip_all,
        fields(consumer_id = ?criteria.consumer_id, postcode = ?criteria.postcode),
    )]
    pub async fn list_records(&self, criteria: &FilterCriteria) -> Result<Vec<ConsumptionRecord>> {
        const PATH: &str = "records/";

        let request = self.backend.request(Method::GET, PATH).query(&CollectionQuery {
            consumer_id: criteria.consumer_id.as_deref(),
            postcode: criteria.postcode.as_deref(),
            start_date: criteria.start_date,
            end_date: criteria.end_date,
        });
        let records: Vec<ConsumptionRecord> = self
            .send::<Vec<RecordPayload>>(PATH, request)
            .await?
            .into_iter()
            .map(ConsumptionRecord::from)
            .collect();
        let records = evaluate(&records, criteria);
        info!(n_records = records.len(), "fetched");
        Ok(records)
    }

    #[instrument(skip_all, fields(consumer_id = consumer_id, month = %month))]
    pub async fn forecast(&self, consumer_id: &str, month: Month) -> Result<Vec<f64>> {
        const PATH: &str = "predict/";

        info!("requesting…");
        let request = self
            .backend
            .request(Method::POST, PATH)
            .json(&PredictRequest { consumer_id, month: month.to_string() });
        let values = self
            .send::<PredictResponse>(PATH, request)
            .await?
            .into_values()
            .map_err(|reason| Error::malformed(PATH, reason))?;
        info!(n_values = values.len(), "predicted");
        Ok(values)
    }

    /// Authorize, send, and decode.
    ///
    /// A rejected access token means the session is gone, so it is cleared as well.
    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let access_token = self.session.current_access_token().await?;
        let response = request.bearer_auth(access_token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth_expired(extract_message(StatusCode::UNAUTHORIZED, &body)));
        }
        read_json(path, response).await
    }
}

#[async_trait]
impl<R: TokenRefresher> Forecaster for Gateway<R> {
    async fn forecast(&self, consumer_id: &str, month: Month) -> Result<Vec<f64>> {
        Self::forecast(self, consumer_id, month).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
        time::Duration,
    };

    use chrono::{TimeDelta, Utc};
    use reqwest::Url;
    use serde_json::json;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{body_json, header, method, path, query_param, query_param_is_missing},
    };

    use super::*;
    use crate::{
        api::session::{
            Credential,
            tests::{credential, fake_jwt},
        },
        core::forecast::request_forecast,
    };

    fn gateway(server: &MockServer, credential: Option<Credential>) -> Gateway {
        gateway_at(&format!("{}/api", server.uri()), credential)
    }

    fn gateway_at(base_url: &str, credential: Option<Credential>) -> Gateway {
        let base_url = Url::parse(base_url).unwrap();
        let backend = Backend::new(base_url, Duration::from_secs(5)).unwrap();
        let session = Session::new(Auth::new(backend.clone()), credential, TimeDelta::zero());
        Gateway::new(backend, session)
    }

    fn valid_credential() -> Credential {
        credential(Utc::now() + TimeDelta::minutes(5))
    }

    fn bearer(credential: &Credential) -> String {
        format!("Bearer {}", credential.access_token)
    }

    #[tokio::test]
    async fn test_list_records_ok() -> Result {
        let server = MockServer::start().await;
        let credential = valid_credential();
        Mock::given(method("GET"))
            .and(path("/api/records/"))
            .and(header("authorization", bearer(&credential).as_str()))
            .and(query_param("Customer", "42"))
            .and(query_param("start_date", "2013-01-01"))
            .and(query_param_is_missing("Postcode"))
            .and(query_param_is_missing("end_date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Customer": 42, "Postcode": 2000, "date": "2013-01-01T00:00:00", "consumption": 1.5},
                {"Customer": 42, "Postcode": 2000, "date": "2013-01-02T00:00:00", "consumption": 2.5}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let criteria = FilterCriteria::builder()
            .consumer_id("42")
            .postcode("All")
            .start_date(chrono::NaiveDate::from_ymd_opt(2013, 1, 1).unwrap())
            .build()
            .normalized();
        let records = gateway(&server, Some(credential)).list_records(&criteria).await?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].consumption, Some(2.5));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_records_drops_records_outside_criteria() -> Result {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/records/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Customer": 42, "Postcode": 2000, "date": "2013-01-01T00:00:00", "consumption": 1.0},
                {"Customer": 42, "Postcode": 2000, "date": "2013-12-31T23:30:00", "consumption": 2.0},
                {"Customer": 7, "Postcode": 2000, "date": "2013-02-01T00:00:00", "consumption": 4.0},
                {"Customer": 42, "Postcode": 2000, "date": "2014-05-02T00:00:00", "consumption": 8.0}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let criteria = FilterCriteria::builder()
            .consumer_id("42")
            .end_date(chrono::NaiveDate::from_ymd_opt(2013, 12, 31).unwrap())
            .build();
        let records = gateway(&server, Some(valid_credential())).list_records(&criteria).await?;
        assert_eq!(
            records.iter().map(|record| record.consumption).collect::<Vec<_>>(),
            [Some(1.0), Some(2.0)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_list_consumers_filters_by_substring() -> Result {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consumers/"))
            .and(query_param("Postcode", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Customer": 1, "Postcode": 2000},
                {"Customer": 2, "Postcode": 2010},
                {"Customer": 3, "Postcode": 3000}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let criteria = FilterCriteria::builder().postcode("20").build();
        let consumers =
            gateway(&server, Some(valid_credential())).list_consumers(&criteria).await?;
        assert_eq!(
            consumers.iter().map(|consumer| consumer.consumer_id.as_str()).collect::<Vec<_>>(),
            ["1", "2"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_before_the_call() -> Result {
        let server = MockServer::start().await;
        let fresh = fake_jwt(Utc::now() + TimeDelta::minutes(5));
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .and(body_json(json!({"refresh": "refresh"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": fresh.clone()})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/consumers/"))
            .and(header("authorization", format!("Bearer {fresh}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let stale = credential(Utc::now() - TimeDelta::minutes(5));
        let gateway = gateway(&server, Some(stale));
        assert!(gateway.list_consumers(&FilterCriteria::default()).await?.is_empty());
        assert_eq!(gateway.session().credential().await.unwrap().access_token, fresh);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_refresh_is_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token/refresh/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is blacklisted"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/records/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let stale = credential(Utc::now() - TimeDelta::minutes(5));
        let gateway = gateway(&server, Some(stale));
        let result = gateway.list_records(&FilterCriteria::default()).await;
        assert!(matches!(result, Err(Error::AuthExpired { .. })));
        assert!(gateway.session().credential().await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/consumers/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Token has expired"})),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server, Some(valid_credential()));
        let result = gateway.list_consumers(&FilterCriteria::default()).await;
        assert!(matches!(
            result,
            Err(Error::AuthExpired { reason }) if reason == "Token has expired"
        ));
        assert!(gateway.session().credential().await.is_none());
    }

    #[tokio::test]
    async fn test_truncated_rejection_still_drops_the_session() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0_u8; 4096];
            let _ = stream.read(&mut request).unwrap();
            stream
                .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 100\r\n\r\n{\"detail\"")
                .unwrap();
        });

        let gateway = gateway_at(&format!("http://127.0.0.1:{port}/api"), Some(valid_credential()));
        let result = gateway.list_consumers(&FilterCriteria::default()).await;
        server.join().unwrap();
        assert!(matches!(result, Err(Error::AuthExpired { .. })), "{result:?}");
        assert!(gateway.session().credential().await.is_none());
    }

    #[tokio::test]
    async fn test_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/records/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid date format"})),
            )
            .mount(&server)
            .await;

        let result = gateway(&server, Some(valid_credential()))
            .list_records(&FilterCriteria::default())
            .await;
        assert!(matches!(
            result,
            Err(Error::Validation { status: StatusCode::BAD_REQUEST, message })
                if message == "Invalid date format"
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/records/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = gateway(&server, Some(valid_credential()))
            .list_records(&FilterCriteria::default())
            .await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let gateway = gateway_at(&format!("http://127.0.0.1:{port}/api"), Some(valid_credential()));
        let result = gateway.list_consumers(&FilterCriteria::default()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_not_logged_in() {
        let server = MockServer::start().await;
        let result = gateway(&server, None).list_consumers(&FilterCriteria::default()).await;
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_request_forecast_ok() -> Result {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/predict/"))
            .and(body_json(json!({"consumerId": "042", "month": "2013-06"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"predicted_consumption": [3, 4, 5, 6, 7, 8, 9]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server, Some(valid_credential()));
        let series = request_forecast(&gateway, Some("042"), "2013-06".parse().unwrap()).await?;
        assert_eq!(series.labels, [
            "Day 1", "Day 2", "Day 3", "Day 4", "Day 5", "Day 6", "Day 7"
        ]);
        assert_eq!(series.values, [3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_forecast_without_consumer_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/predict/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = gateway(&server, Some(valid_credential()));
        let result = request_forecast(&gateway, Some("All"), "2013-06".parse().unwrap()).await;
        assert!(matches!(result, Err(Error::NoConsumerSelected)));
    }

    #[tokio::test]
    async fn test_malformed_prediction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/predict/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"predicted_consumption": "n/a"})),
            )
            .mount(&server)
            .await;

        let gateway = gateway(&server, Some(valid_credential()));
        let result = request_forecast(&gateway, Some("042"), "2013-06".parse().unwrap()).await;
        assert!(matches!(
            result,
            Err(Error::MalformedResponse { path, .. }) if path == "predict/"
        ));
    }
}
