//! Request Gateway: the only component that talks to the nutrition service.
//!
//! Every call is a POST with a JSON body. Calls issued on a [`Channel`]
//! supersede the previous call on that channel: the older one is cancelled
//! and its response, if it still arrives, never reaches the caller. Teardown
//! cancels everything, channel-scoped or not.

mod cancel;
mod transport;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;

pub use cancel::{CancellationToken, Channel, ChannelRegistry, Ticket};
pub use transport::{HttpTransport, Transport};

#[cfg(test)]
pub(crate) use transport::scripted;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Autocomplete,
    Search,
    Suggestions,
    CurrentMeal,
    ScaleFood,
    CommitToMeal,
    RemoveFromMeal,
    SubmitPreference,
    AddCustomFood,
    DailyTotal,
    DailyNutrients,
    MealProgress,
    NextDay,
}

impl Endpoint {
    pub const fn path(self) -> &'static str {
        match self {
            Endpoint::Autocomplete => "/autocomplete_food",
            Endpoint::Search => "/search_food",
            Endpoint::Suggestions => "/get_suggestion",
            Endpoint::CurrentMeal => "/get_meal_items",
            Endpoint::ScaleFood => "/scale_food",
            Endpoint::CommitToMeal => "/add_food_to_meal",
            Endpoint::RemoveFromMeal => "/remove_food_from_meal",
            Endpoint::SubmitPreference => "/feedback",
            Endpoint::AddCustomFood => "/add_custom_food",
            Endpoint::DailyTotal => "/get_daily_total",
            Endpoint::DailyNutrients => "/get_daily_nutrients",
            Endpoint::MealProgress => "/get_meal_progress",
            Endpoint::NextDay => "/next_day",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// `{ "success": bool, "message"?: string }` answer of mutating endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusReply {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusReply {
    pub fn into_result(self) -> Result<(), ClientError> {
        if self.success {
            Ok(())
        } else {
            Err(ClientError::Rejected(
                self.message.unwrap_or_else(|| "no reason given".into()),
            ))
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    channels: ChannelRegistry,
    shutdown: CancellationToken,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            channels: ChannelRegistry::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Issue a request. With `channel` set, any unresolved request on the same
    /// channel is cancelled first.
    pub async fn issue<P, R>(
        &self,
        endpoint: Endpoint,
        payload: &P,
        channel: Option<Channel>,
    ) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let body = serde_json::to_value(payload)?;
        // Dropping the ticket releases the channel, on every exit path.
        let ticket = channel.map(|channel| self.channels.claim(channel));
        debug!(%endpoint, channel = ?channel, "issuing request");

        let outcome = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(ClientError::Cancelled),
            () = superseded(ticket.as_ref()) => Err(ClientError::Cancelled),
            reply = self.transport.post(endpoint.path(), body) => reply,
        };

        // A response that raced its own cancellation is still suppressed.
        let cancelled = self.shutdown.is_cancelled()
            || ticket.as_ref().is_some_and(|t| t.token.is_cancelled());
        if cancelled {
            debug!(%endpoint, "response suppressed, request was cancelled");
            return Err(ClientError::Cancelled);
        }

        drop(ticket);
        let value = outcome?;
        Ok(serde_json::from_value(value)?)
    }

    /// Issue a request whose answer is a [`StatusReply`].
    pub async fn issue_status<P>(&self, endpoint: Endpoint, payload: &P) -> Result<(), ClientError>
    where
        P: Serialize + ?Sized,
    {
        self.issue::<P, StatusReply>(endpoint, payload, None)
            .await?
            .into_result()
    }

    pub async fn cancel(&self, channel: Channel) {
        self.channels.cancel(channel);
    }

    pub async fn in_flight(&self, channel: Channel) -> bool {
        self.channels.in_flight(channel)
    }

    /// Cancel every outstanding request; later requests fail with `Cancelled`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.channels.cancel_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

async fn superseded(ticket: Option<&Ticket>) {
    match ticket {
        Some(ticket) => ticket.token.cancelled().await,
        None => std::future::pending().await,
    }
}
