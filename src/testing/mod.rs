//! Testing utilities for camera-session
//!
//! Provides an in-memory capture backend that records every collaborator call,
//! preview sinks that record what they receive, and synthetic frame data.

pub mod fake_backend;
pub mod synthetic_data;

pub use fake_backend::{Call, FakeBackend, FakeProbe, RecordingSink, ReleaseLog};
pub use synthetic_data::{synthetic_codes, synthetic_face, synthetic_frame};

use crate::events::EventStream;
use futures::StreamExt;
use std::time::Duration;

/// Next value from `stream`, or `None` if nothing arrives within `within`.
pub async fn next_within<T>(stream: &mut EventStream<T>, within: Duration) -> Option<T> {
    tokio::time::timeout(within, stream.next())
        .await
        .ok()
        .flatten()
}
