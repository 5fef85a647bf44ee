//! Fakes shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
// self
use bearer_relay::{
	auth::{CredentialPair, TokenSecret},
	error::{RefreshError, Result},
	guard::Navigator,
	http::{
		ApiRequest, ApiResponse, DefaultStatusClassifier, ExecuteFuture, RequestExecutor,
		settle_response,
	},
	refresh::{RefreshEndpoint, RefreshFuture},
};

/// Builds an unsigned JWT whose payload carries `claims`.
pub fn jwt(claims: serde_json::Value) -> String {
	let header = URL_SAFE_NO_PAD.encode("{\"alg\":\"none\"}");
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

	format!("{header}.{payload}.sig")
}

/// Executor that answers by access token and records every attempt.
#[derive(Default)]
pub struct ScriptedExecutor {
	statuses: HashMap<String, u16>,
	delays: HashMap<String, Duration>,
	attempts: Mutex<Vec<(String, String)>>,
}
impl ScriptedExecutor {
	/// Answers requests carrying `token` with `status`; unknown tokens get 401.
	pub fn respond(mut self, token: &str, status: u16) -> Self {
		self.statuses.insert(token.into(), status);

		self
	}

	/// Delays every attempt against `target`.
	pub fn delay(mut self, target: &str, delay: Duration) -> Self {
		self.delays.insert(target.into(), delay);

		self
	}

	/// `(target, token)` for every attempt, in order.
	pub fn attempts(&self) -> Vec<(String, String)> {
		self.attempts.lock().clone()
	}

	fn answer(&self, request: &ApiRequest, token: &TokenSecret) -> Result<ApiResponse> {
		let status = self.statuses.get(token.expose()).copied().unwrap_or(401);
		let body = format!("{{\"target\":\"{}\",\"token\":\"{}\"}}", request.target, token.expose());

		settle_response(
			&DefaultStatusClassifier::default(),
			ApiResponse { status, headers: Vec::new(), body: body.into_bytes() },
		)
	}
}
impl RequestExecutor for ScriptedExecutor {
	fn execute<'a>(
		&'a self,
		request: &'a ApiRequest,
		token: &'a TokenSecret,
	) -> ExecuteFuture<'a> {
		Box::pin(async move {
			self.attempts.lock().push((request.target.clone(), token.expose().to_owned()));

			if let Some(delay) = self.delays.get(&request.target) {
				tokio::time::sleep(*delay).await;
			}

			self.answer(request, token)
		})
	}
}

/// Refresh endpoint that returns a fixed outcome after a delay.
pub struct ScriptedEndpoint {
	outcome: std::result::Result<CredentialPair, RefreshError>,
	delay: Duration,
	calls: AtomicUsize,
	seen: Mutex<Vec<String>>,
}
impl ScriptedEndpoint {
	pub fn rotating_to(access: &str, refresh: &str) -> Self {
		Self::with_outcome(Ok(CredentialPair::new(access, refresh)))
	}

	pub fn failing(error: RefreshError) -> Self {
		Self::with_outcome(Err(error))
	}

	fn with_outcome(outcome: std::result::Result<CredentialPair, RefreshError>) -> Self {
		Self {
			outcome,
			delay: Duration::from_millis(30),
			calls: AtomicUsize::new(0),
			seen: Mutex::new(Vec::new()),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	/// Refresh tokens the endpoint received, in order.
	pub fn seen(&self) -> Vec<String> {
		self.seen.lock().clone()
	}
}
impl RefreshEndpoint for ScriptedEndpoint {
	fn exchange<'a>(&'a self, refresh_token: &'a TokenSecret) -> RefreshFuture<'a> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.seen.lock().push(refresh_token.expose().to_owned());
			tokio::time::sleep(self.delay).await;

			self.outcome.clone()
		})
	}
}

/// Navigator that remembers every route it was sent to.
#[derive(Default)]
pub struct RecordingNavigator(Mutex<Vec<String>>);
impl RecordingNavigator {
	pub fn routes(&self) -> Vec<String> {
		self.0.lock().clone()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, route: &str) {
		self.0.lock().push(route.to_owned());
	}
}

/// Resolves a batch of boxed futures concurrently on the current runtime.
pub async fn spawn_all<T>(
	futures: Vec<Pin<Box<dyn Future<Output = T> + Send + 'static>>>,
) -> Vec<T>
where
	T: Send + 'static,
{
	let handles = futures.into_iter().map(tokio::spawn).collect::<Vec<_>>();
	let mut results = Vec::with_capacity(handles.len());

	for handle in handles {
		results.push(handle.await.expect("Spawned call should not panic."));
	}

	results
}
