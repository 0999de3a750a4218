//! Event store client.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use url::Url;

use crate::config::Config;
use crate::error::{IngestError, IngestResult};
use crate::logging::{log, obj, v_int, v_str, Domain, Level};
use crate::model::Delivery;

/// Destination for translated deliveries.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, delivery: &Delivery) -> IngestResult<()>;
}

pub struct HttpEventStore {
    client: Client,
    events: Url,
    timeout: Duration,
}

impl HttpEventStore {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_base(cfg.event_store_base()?, cfg.publish_timeout)
    }

    pub fn with_base(base: Url, timeout: Duration) -> Result<Self> {
        let events = base
            .join("event")
            .map_err(|e| anyhow!("cannot build event url from {}: {}", base, e))?;
        Ok(Self {
            client: Client::new(),
            events,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.events
    }
}

#[async_trait]
impl EventSink for HttpEventStore {
    async fn publish(&self, delivery: &Delivery) -> IngestResult<()> {
        let endpoint = format!("POST {}", self.events.path());
        if !delivery.is_publishable() {
            return Err(IngestError::Precondition(format!(
                "refusing to publish {} {}.{} with unresolved entities",
                delivery.event_type, delivery.over, delivery.ball
            )));
        }
        let body = serde_json::to_vec(delivery)?;
        let resp = self
            .client
            .post(self.events.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::transport(&endpoint, e))?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            return Err(IngestError::Status {
                endpoint,
                status: status.as_u16(),
                expected: StatusCode::CREATED.as_u16(),
            });
        }
        log(
            Level::Debug,
            Domain::Publish,
            "published",
            obj(&[
                ("match", v_int(delivery.match_id)),
                ("event_type", v_str(delivery.event_type.as_str())),
                ("innings", json!(delivery.innings)),
                ("over", json!(delivery.over)),
                ("ball", json!(delivery.ball)),
            ]),
        );
        Ok(())
    }
}
