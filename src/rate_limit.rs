//! Sliding-window and daily request budget enforced before every API call.
//!
//! [`RateLimiter::acquire`] waits while the trailing 60-second window is full and fails fast once
//! the daily quota is spent. Timestamps come from [`tokio::time::Instant`], so paused-clock tests
//! observe the same waits real callers do.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::{self, Instant};
// self
use crate::{
	_prelude::*,
	error::{ApiError, RateLimitScope},
	obs::{self, Outcome, Stage},
};

const WINDOW: StdDuration = StdDuration::from_secs(60);
const DAY: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const DEFAULT_BACKOFF: StdDuration = StdDuration::from_secs(1);

/// Request budget for one client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
	/// Requests admitted within any trailing 60-second window; never below `1`.
	pub requests_per_minute: u32,
	/// Requests admitted per 24-hour period.
	pub daily_limit: u32,
}
impl RateLimitConfig {
	/// Creates a budget, clamping `requests_per_minute` to at least `1`.
	pub const fn new(requests_per_minute: u32, daily_limit: u32) -> Self {
		let requests_per_minute = if requests_per_minute == 0 { 1 } else { requests_per_minute };

		Self { requests_per_minute, daily_limit }
	}
}

/// Point-in-time view of the limiter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSnapshot {
	/// Admissions recorded in the trailing window.
	pub requests_in_window: usize,
	/// Admissions recorded since the last daily reset.
	pub daily_count: u32,
	/// Configured daily quota.
	pub daily_limit: u32,
	/// Configured per-minute budget.
	pub requests_per_minute: u32,
	/// Time left until the daily counter resets.
	pub resets_in: StdDuration,
}

struct RateWindow {
	timestamps: VecDeque<Instant>,
	daily_count: u32,
	daily_reset_at: Instant,
}
impl RateWindow {
	fn new(now: Instant) -> Self {
		Self { timestamps: VecDeque::new(), daily_count: 0, daily_reset_at: now + DAY }
	}

	fn roll_daily(&mut self, now: Instant) {
		if now >= self.daily_reset_at {
			self.daily_count = 0;
			self.daily_reset_at = now + DAY;
		}
	}

	fn prune(&mut self, now: Instant) {
		while self.timestamps.front().is_some_and(|ts| now.saturating_duration_since(*ts) >= WINDOW)
		{
			self.timestamps.pop_front();
		}
	}
}

/// Admission gate shared by every request issued through one executor.
pub struct RateLimiter {
	config: RateLimitConfig,
	window: AsyncMutex<RateWindow>,
}
impl RateLimiter {
	/// Creates a limiter whose daily period starts now.
	pub fn new(config: RateLimitConfig) -> Self {
		Self { config, window: AsyncMutex::new(RateWindow::new(Instant::now())) }
	}

	/// Returns the configured budget.
	pub fn config(&self) -> RateLimitConfig {
		self.config
	}

	/// Admits one request.
	///
	/// Waits (holding the limiter lock) while the per-minute window is full. Fails with
	/// [`ApiError::RateLimited`] scoped to [`RateLimitScope::Daily`] when the daily quota is
	/// exhausted; the failure records nothing and carries the seconds left until the reset.
	pub async fn acquire(&self) -> Result<()> {
		let mut window = self.window.lock().await;
		let now = Instant::now();

		window.roll_daily(now);
		window.prune(now);

		if window.daily_count >= self.config.daily_limit {
			let retry_after = window.daily_reset_at.saturating_duration_since(now).as_secs().max(1);

			obs::record_outcome(Stage::Admission, Outcome::Failure);

			return Err(ApiError::RateLimited {
				message: format!(
					"Daily rate limit of {} requests exceeded. Retry after {retry_after} seconds.",
					self.config.daily_limit
				),
				retry_after,
				scope: RateLimitScope::Daily,
			}
			.into());
		}

		let at_capacity = window.timestamps.len() >= self.config.requests_per_minute as usize;

		if let Some(oldest) = window.timestamps.front().copied().filter(|_| at_capacity) {
			let wait = (oldest + WINDOW).saturating_duration_since(now);

			obs::debug_event(
				Stage::Admission,
				format_args!("Per-minute window full; waiting {}ms.", wait.as_millis()),
			);
			time::sleep(wait).await;
			window.prune(Instant::now());
		}

		window.timestamps.push_back(Instant::now());
		window.daily_count += 1;

		Ok(())
	}

	/// Backs off after the remote service answered 429.
	///
	/// Sleeps for `retry_after_secs` seconds, or one second when the service gave no hint.
	pub async fn handle_rate_limit_error(&self, retry_after_secs: u64) {
		let wait = if retry_after_secs > 0 {
			StdDuration::from_secs(retry_after_secs)
		} else {
			DEFAULT_BACKOFF
		};

		obs::warn_event(
			Stage::Admission,
			format_args!("Remote rate limit hit; backing off for {}s.", wait.as_secs()),
		);
		time::sleep(wait).await;
	}

	/// Reports the current window and daily counters.
	pub async fn snapshot(&self) -> RateLimitSnapshot {
		let mut window = self.window.lock().await;
		let now = Instant::now();

		window.roll_daily(now);
		window.prune(now);

		RateLimitSnapshot {
			requests_in_window: window.timestamps.len(),
			daily_count: window.daily_count,
			daily_limit: self.config.daily_limit,
			requests_per_minute: self.config.requests_per_minute,
			resets_in: window.daily_reset_at.saturating_duration_since(now),
		}
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("config", &self.config).finish()
	}
}
