//! Access token of the agent the current request acts for.
//!
//! Backends that enforce row-level policies forward it instead of the
//! public key. The scope is task-local, so it covers every storage call
//! awaited inside [`act_as`].

use std::future::Future;

tokio::task_local! {
    static ACCESS_TOKEN: String;
}

/// Runs `fut` on behalf of the holder of `access_token`. `None` runs it
/// anonymously.
pub async fn act_as<F: Future>(access_token: Option<String>, fut: F) -> F::Output {
    match access_token {
        Some(token) => ACCESS_TOKEN.scope(token, fut).await,
        None => fut.await,
    }
}

pub fn acting_token() -> Option<String> {
    ACCESS_TOKEN.try_with(|token| token.clone()).ok()
}
