use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards a downstream endpoint. After `failure_threshold` consecutive
// failures the breaker opens and calls fail fast for `open_for`; the next
// call after that is let through as a trial (HalfOpen). `success_threshold`
// trial successes close it again and a trial failure reopens it.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_for: Duration,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit '{0}' is open")]
    Open(String),

    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    trial_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                trial_successes: 0,
                opened_at: None,
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.admit().await {
            return Err(CircuitBreakerError::Open(self.name.clone()));
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    async fn admit(&self) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.state != CircuitState::Open {
            return true;
        }

        let cooled_down = inner
            .opened_at
            .map(|opened| opened.elapsed() >= self.config.open_for)
            .unwrap_or(true);

        if cooled_down {
            tracing::info!(circuit = %self.name, "Circuit half-open, letting a trial call through");
            inner.state = CircuitState::HalfOpen;
            inner.trial_successes = 0;
        }

        cooled_down
    }

    async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.trial_successes += 1;
            if inner.trial_successes >= self.config.success_threshold {
                tracing::info!(circuit = %self.name, "Circuit closed");
                inner.state = CircuitState::Closed;
                inner.trial_successes = 0;
                inner.opened_at = None;
            }
        }
    }

    async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;

        let should_open = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if should_open {
            tracing::warn!(
                circuit = %self.name,
                failures = inner.consecutive_failures,
                "Circuit opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            inner.trial_successes = 0;
        }
    }

    #[cfg(test)]
    async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }
}
