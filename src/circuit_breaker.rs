use crate::errors::AppError;
use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{CircuitBreaker, Config, StateMachine};
use std::future::Future;
use std::time::Duration;

/// Circuit breaker guarding one external data provider for the length of a run.
pub type ProviderCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for external provider calls so a dead provider
/// stops costing one full timeout per lead row.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast.
/// - **HALF_OPEN**: Testing if service recovered.
pub fn create_provider_circuit_breaker() -> ProviderCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// Runs `request` through `breaker`, recording its outcome.
///
/// A rejected call returns `ExternalApiError` without touching the network,
/// which callers degrade exactly like a failed request.
pub async fn call_guarded<T, F>(
    breaker: &ProviderCircuitBreaker,
    provider: &str,
    request: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    if !breaker.is_call_permitted() {
        tracing::debug!("{} circuit open, skipping request", provider);
        return Err(AppError::ExternalApiError(format!(
            "{} circuit breaker is open",
            provider
        )));
    }

    let outcome = request.await;
    let _ = breaker.call(|| outcome.as_ref().map(|_| ()).map_err(|_| ()));
    outcome
}
