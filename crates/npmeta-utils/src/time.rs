//! Deadlines and duration parsing.
//!
//! A [`Deadline`] is created once per ingestion and handed to every call that
//! may block (fetch, store read/write, lock wait), so a stalled backend cannot
//! hold a package lock forever.

use std::{
    future::Future,
    time::{Duration, Instant},
};

pub use tokio::time::error::Elapsed;

/// An optional point in time after which blocking work should give up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    pub const fn never() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now. Saturates to [`Deadline::never`] if the
    /// instant would overflow.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Builds a deadline from an optional timeout; `None` never expires.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::never, Self::after)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Time left before expiry, `None` for an unbounded deadline.
    ///
    /// An expired deadline reports `Some(Duration::ZERO)`.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Drives `fut` to completion unless the deadline passes first.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use npmeta_utils::time::Deadline;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let deadline = Deadline::after(Duration::from_secs(5));
    /// let value = deadline.run(async { 42 }).await.unwrap();
    /// assert_eq!(value, 42);
    /// # }
    /// ```
    pub async fn run<F>(self, fut: F) -> Result<F::Output, Elapsed>
    where
        F: Future,
    {
        match self.0 {
            Some(at) => tokio::time::timeout_at(at.into(), fut).await,
            None => Ok(fut.await),
        }
    }
}

/// Parses a compact duration such as `30s`, `5m`, `1h30m` or `2d`.
///
/// Returns `None` on empty input, unknown units, a trailing number without a
/// unit, or overflow.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        if digits.is_empty() {
            return None;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return None,
        };
        total_secs = total_secs.checked_add(value.checked_mul(unit)?)?;
    }

    if !digits.is_empty() {
        return None;
    }

    Some(Duration::from_secs(total_secs))
}
