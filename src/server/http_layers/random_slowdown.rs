//! Random slowdown middleware, for trying the kiosk against a sluggish backend.

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

const MEAN_DELAY_MS: f64 = 800.0;
const DELAY_STD_DEV_MS: f64 = 600.0;

/// Delays every request by a normally distributed amount of time, never negative.
pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    tokio::time::sleep(random_delay()).await;
    next.run(request).await
}

fn random_delay() -> Duration {
    match Normal::new(MEAN_DELAY_MS, DELAY_STD_DEV_MS) {
        Ok(normal) => {
            let millis = 0.0f64.max(normal.sample(&mut rand::rng()));
            Duration::from_millis(millis as u64)
        }
        Err(_) => Duration::ZERO,
    }
}
