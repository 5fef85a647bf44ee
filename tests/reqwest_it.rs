#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
// self
use bearer_relay::{
	auth::CredentialPair,
	config::SessionConfig,
	error::{Error, RefreshError, TransportError},
	http::ApiRequest,
	pipeline::AuthenticatedPipeline,
	store::{CredentialStore, MemoryStore},
	url::Url,
};
use common::RecordingNavigator;

#[derive(Debug, Deserialize)]
struct Schedule {
	id: u64,
	owner: String,
}

fn config(server: &MockServer) -> SessionConfig {
	SessionConfig::builder(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
		.request_timeout(time::Duration::seconds(2))
		.build()
		.expect("Mock configuration should validate.")
}

fn pipeline(
	config: &SessionConfig,
	store: &MemoryStore,
	navigator: &Arc<RecordingNavigator>,
) -> AuthenticatedPipeline {
	AuthenticatedPipeline::from_config(config, Arc::new(store.clone()), navigator.clone())
		.expect("Reqwest pipeline should build.")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expired_calls_refresh_once_over_http() {
	let server = MockServer::start_async().await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/schedules/1").header("authorization", "Bearer a-1");
			then.status(403);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/schedules/1").header("authorization", "Bearer a-2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"owner\":\"ada\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "refreshToken": "r-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"accessToken\":\"a-2\",\"refreshToken\":\"r-2\"}")
				.delay(std::time::Duration::from_millis(150));
		})
		.await;
	let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
	let navigator = Arc::new(RecordingNavigator::default());
	let pipeline = pipeline(&config(&server), &store, &navigator);
	let handles = (0..5)
		.map(|_| {
			let pipeline = pipeline.clone();

			tokio::spawn(async move {
				pipeline.call_json::<Schedule>(&ApiRequest::get("schedules/1")).await
			})
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let schedule = handle
			.await
			.expect("Call task should not panic.")
			.expect("Every call should succeed after the shared refresh.");

		assert_eq!(schedule.id, 1);
		assert_eq!(schedule.owner, "ada");
	}

	refresh.assert_calls_async(1).await;
	fresh.assert_calls_async(5).await;
	assert_eq!(
		store.get().await.expect("Store read should succeed."),
		Some(CredentialPair::new("a-2", "r-2"))
	);
	assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn rejected_refresh_ends_the_session() {
	let server = MockServer::start_async().await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(403);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401).body("refresh token revoked");
		})
		.await;
	let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
	let navigator = Arc::new(RecordingNavigator::default());
	let pipeline = pipeline(&config(&server), &store, &navigator);
	let err = pipeline
		.call(&ApiRequest::get("me"))
		.await
		.expect_err("A rejected refresh must fail the call.");
	let Error::RefreshFailure(RefreshError::Rejected { status, body }) = err else {
		panic!("Expected a rejected refresh, got {err:?}.");
	};

	assert_eq!(status, 401);
	assert_eq!(body.as_deref(), Some("refresh token revoked"));
	refresh.assert_calls_async(1).await;
	assert!(store.get().await.expect("Store read should succeed.").is_none());
	assert_eq!(navigator.routes(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn malformed_refresh_bodies_are_refresh_failures() {
	let server = MockServer::start_async().await;
	let _expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/me");
			then.status(403);
		})
		.await;
	let _refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).body("{\"accessToken\":\"a-2\"}");
		})
		.await;
	let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
	let navigator = Arc::new(RecordingNavigator::default());
	let err = pipeline(&config(&server), &store, &navigator)
		.call(&ApiRequest::get("me"))
		.await
		.expect_err("A half pair cannot rotate the session.");

	assert!(matches!(err, Error::RefreshFailure(RefreshError::MalformedResponse { .. })));
	assert!(store.get().await.expect("Store read should succeed.").is_none());
}

#[tokio::test]
async fn requests_carry_query_headers_and_json_bodies() {
	let server = MockServer::start_async().await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/schedules")
				.query_param("notify", "true")
				.header("authorization", "Bearer a-1")
				.header("x-client", "relay-tests")
				.json_body(serde_json::json!({ "owner": "ada" }));
			then.status(201).body("{\"id\":9,\"owner\":\"ada\"}");
		})
		.await;
	let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
	let navigator = Arc::new(RecordingNavigator::default());
	let request = ApiRequest::post("schedules")
		.query("notify", "true")
		.header("X-Client", "relay-tests")
		.json(&serde_json::json!({ "owner": "ada" }))
		.expect("JSON body should serialize.");
	let schedule: Schedule = pipeline(&config(&server), &store, &navigator)
		.call_json(&request)
		.await
		.expect("Create should succeed.");

	assert_eq!(schedule.id, 9);
	create.assert_calls_async(1).await;
}

#[tokio::test]
async fn slow_servers_surface_as_timeouts_without_touching_credentials() {
	let server = MockServer::start_async().await;
	let _slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(std::time::Duration::from_millis(800));
		})
		.await;
	let config = SessionConfig::builder(
		Url::parse(&server.base_url()).expect("Mock base URL should parse."),
	)
	.request_timeout(time::Duration::milliseconds(100))
	.build()
	.expect("Mock configuration should validate.");
	let store = MemoryStore::with_credentials(CredentialPair::new("a-1", "r-1"));
	let navigator = Arc::new(RecordingNavigator::default());
	let err = pipeline(&config, &store, &navigator)
		.call(&ApiRequest::get("slow"))
		.await
		.expect_err("The request must time out.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout { .. })));
	assert_eq!(
		store.get().await.expect("Store read should succeed."),
		Some(CredentialPair::new("a-1", "r-1"))
	);
	assert!(navigator.routes().is_empty());
}
