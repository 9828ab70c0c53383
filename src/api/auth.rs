use crate::config::settings::{Credentials, Settings};
use crate::utils::error::{EpiasError, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Header carrying the ticket on every data request.
pub const TGT_HEADER: &str = "TGT";

#[derive(Debug, Clone)]
struct Ticket {
    value: String,
    refresh_at: Instant,
}

/// Obtains and caches CAS ticket-granting tickets.
///
/// A ticket is reused until `validity - refresh_margin` has elapsed. The
/// mutex is held across the login call so concurrent callers wait for one
/// refresh instead of each logging in.
#[derive(Debug)]
pub struct TgtManager {
    client: Client,
    tickets_url: String,
    credentials: Credentials,
    lifetime: Duration,
    ticket: Mutex<Option<Ticket>>,
}

impl TgtManager {
    pub fn new(
        client: Client,
        auth_url: &str,
        credentials: Credentials,
        validity: Duration,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            client,
            tickets_url: format!("{}/cas/v1/tickets", auth_url.trim_end_matches('/')),
            credentials,
            lifetime: validity.saturating_sub(refresh_margin),
            ticket: Mutex::new(None),
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            client,
            settings.auth_url(),
            settings.credentials()?,
            settings.tgt_validity(),
            settings.tgt_refresh_margin(),
        ))
    }

    /// Current ticket, logging in first when none is cached, it is due for
    /// refresh, or `force_refresh` is set.
    pub async fn current(&self, force_refresh: bool) -> Result<String> {
        let mut slot = self.ticket.lock().await;

        if !force_refresh {
            if let Some(ticket) = slot.as_ref() {
                if Instant::now() < ticket.refresh_at {
                    return Ok(ticket.value.clone());
                }
                tracing::debug!("TGT due for refresh");
            }
        }

        let value = self.request_ticket().await?;
        *slot = Some(Ticket {
            value: value.clone(),
            refresh_at: Instant::now() + self.lifetime,
        });
        Ok(value)
    }

    /// Ticket to retry with after `rejected` was refused by the API.
    ///
    /// Logs in only when the cached ticket is still the rejected one, so
    /// callers queued behind a refresh reuse its result.
    pub async fn current_after_rejection(&self, rejected: &str) -> Result<String> {
        let mut slot = self.ticket.lock().await;

        if let Some(ticket) = slot.as_ref() {
            if ticket.value != rejected && Instant::now() < ticket.refresh_at {
                tracing::debug!("TGT already refreshed by another request");
                return Ok(ticket.value.clone());
            }
        }

        let value = self.request_ticket().await?;
        *slot = Some(Ticket {
            value: value.clone(),
            refresh_at: Instant::now() + self.lifetime,
        });
        Ok(value)
    }

    /// Drop the cached ticket so the next call logs in again.
    pub async fn invalidate(&self) {
        *self.ticket.lock().await = None;
    }

    async fn request_ticket(&self) -> Result<String> {
        tracing::info!("Requesting new TGT from {}", self.tickets_url);

        let form = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose()),
        ];
        let response = self
            .client
            .post(&self.tickets_url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .form(&form)
            .send()
            .await
            .map_err(|e| EpiasError::AuthError {
                message: format!("could not reach CAS service: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(EpiasError::AuthError {
                message: format!("CAS service returned HTTP {}", status.as_u16()),
            });
        }

        let ticket = body.trim();
        if !ticket.starts_with("TGT-") {
            return Err(EpiasError::AuthError {
                message: "CAS response did not contain a TGT".to_string(),
            });
        }

        tracing::debug!("TGT obtained");
        Ok(ticket.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Secret;
    use httpmock::prelude::*;

    fn manager(server: &MockServer, validity: Duration, margin: Duration) -> TgtManager {
        TgtManager::new(
            Client::new(),
            &server.base_url(),
            Credentials {
                username: "analyst@example.com".to_string(),
                password: Secret::new("pw"),
            },
            validity,
            margin,
        )
    }

    #[tokio::test]
    async fn test_ticket_is_cached_until_refresh() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/cas/v1/tickets")
                .header("accept", "text/plain")
                .body_contains("username=analyst%40example.com")
                .body_contains("password=pw");
            then.status(201).body("TGT-1-abc\n");
        });

        let tgt = manager(&server, Duration::from_secs(7200), Duration::from_secs(600));

        assert_eq!(tgt.current(false).await.unwrap(), "TGT-1-abc");
        assert_eq!(tgt.current(false).await.unwrap(), "TGT-1-abc");
        login.assert_hits(1);

        tgt.current(true).await.unwrap();
        login.assert_hits(2);
    }

    #[tokio::test]
    async fn test_concurrent_rejections_share_one_login() {
        let server = MockServer::start();
        let mut first = server.mock(|when, then| {
            when.method(POST).path("/cas/v1/tickets");
            then.status(201).body("TGT-old");
        });

        let tgt = std::sync::Arc::new(manager(
            &server,
            Duration::from_secs(7200),
            Duration::from_secs(600),
        ));
        assert_eq!(tgt.current(false).await.unwrap(), "TGT-old");
        first.delete();

        let second = server.mock(|when, then| {
            when.method(POST).path("/cas/v1/tickets");
            then.status(201).body("TGT-new");
        });

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let tgt = tgt.clone();
            set.spawn(async move { tgt.current_after_rejection("TGT-old").await });
        }
        while let Some(joined) = set.join_next().await {
            assert_eq!(joined.unwrap().unwrap(), "TGT-new");
        }

        second.assert_hits(1);
    }

    #[tokio::test]
    async fn test_zero_lifetime_always_refreshes() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST).path("/cas/v1/tickets");
            then.status(201).body("TGT-2-xyz");
        });

        let tgt = manager(&server, Duration::from_secs(600), Duration::from_secs(600));
        tgt.current(false).await.unwrap();
        tgt.current(false).await.unwrap();
        login.assert_hits(2);
    }

    #[tokio::test]
    async fn test_non_ticket_body_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cas/v1/tickets");
            then.status(200).body("<html>login</html>");
        });

        let tgt = manager(&server, Duration::from_secs(7200), Duration::from_secs(600));
        let err = tgt.current(false).await.unwrap_err();
        assert!(matches!(err, EpiasError::AuthError { .. }));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/cas/v1/tickets");
            then.status(401);
        });

        let tgt = manager(&server, Duration::from_secs(7200), Duration::from_secs(600));
        let err = tgt.current(false).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
