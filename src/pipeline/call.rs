//! Per-call state machine.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	guard::InvalidationCause,
	http::{ApiRequest, ApiResponse},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pipeline::AuthenticatedPipeline,
};

enum CallState {
	Start,
	Attempt(TokenSecret),
	AwaitRefresh(TokenSecret),
	Unauthenticated { cause: InvalidationCause, error: Error },
	Done(Result<ApiResponse>),
}

/// One logical call. The retry budget lives here, never on the request.
struct Call<'a> {
	pipeline: &'a AuthenticatedPipeline,
	request: &'a ApiRequest,
	already_retried: bool,
}
impl Call<'_> {
	async fn drive(mut self) -> Result<ApiResponse> {
		// Invalidations are scoped to the session this call started in.
		let epoch = self.pipeline.guard.session_epoch().await?;
		let mut state = CallState::Start;

		loop {
			state = match state {
				CallState::Start => self.start().await,
				CallState::Attempt(token) => self.attempt(token).await,
				CallState::AwaitRefresh(stale) => self.await_refresh(&stale).await,
				CallState::Unauthenticated { cause, error } =>
					self.end_session(epoch, cause, error).await,
				CallState::Done(result) => return result,
			};
		}
	}

	async fn start(&self) -> CallState {
		match self.pipeline.store.get().await {
			Ok(Some(pair)) => CallState::Attempt(pair.access_token),
			Ok(None) => CallState::Unauthenticated {
				cause: InvalidationCause::MissingCredential,
				error: Error::Unauthenticated { reason: "No access credential is stored".into() },
			},
			Err(e) => CallState::Done(Err(e.into())),
		}
	}

	async fn attempt(&mut self, token: TokenSecret) -> CallState {
		match self.pipeline.executor.execute(self.request, &token).await {
			Ok(response) => CallState::Done(Ok(response)),
			Err(Error::ExpiredCredential { status }) if self.already_retried => {
				#[cfg(feature = "tracing")]
				tracing::debug!(
					access = %token.fingerprint(),
					status,
					"Replayed call expired again; giving up."
				);

				CallState::Done(Err(Error::ExpiredCredential { status }))
			},
			Err(Error::ExpiredCredential { .. }) => {
				self.already_retried = true;

				CallState::AwaitRefresh(token)
			},
			Err(error @ Error::Unauthenticated { .. }) =>
				CallState::Unauthenticated { cause: InvalidationCause::Unauthenticated, error },
			Err(error) => CallState::Done(Err(error)),
		}
	}

	async fn await_refresh(&self, stale: &TokenSecret) -> CallState {
		match self.pipeline.coordinator.refresh_stale(stale).await {
			Ok(pair) => CallState::Attempt(pair.access_token),
			Err(error) if error.is_terminal_credential_failure() =>
				CallState::Unauthenticated { cause: InvalidationCause::of(&error), error },
			Err(error) => CallState::Done(Err(error)),
		}
	}

	async fn end_session(&self, epoch: u64, cause: InvalidationCause, error: Error) -> CallState {
		let invalidated = self.pipeline.guard.invalidate_epoch(epoch, cause).await;

		#[cfg(feature = "tracing")]
		if let Err(e) = &invalidated {
			tracing::warn!(error = %e, "Session guard failed to clear the store.");
		}
		#[cfg(not(feature = "tracing"))]
		let _ = invalidated;

		CallState::Done(Err(error))
	}
}

/// Runs `request` through the state machine.
pub(super) async fn run(
	pipeline: &AuthenticatedPipeline,
	request: &ApiRequest,
) -> Result<ApiResponse> {
	const KIND: FlowKind = FlowKind::Call;

	let span = FlowSpan::new(KIND, "call");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	let call = Call { pipeline, request, already_retried: false };
	let result = span.instrument(call.drive()).await;

	obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

	result
}
