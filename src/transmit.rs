use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::TransmitError;
use crate::payload::TelemetryPayload;

/// Delivers a payload to the remote collector.
///
/// Implementations take ownership of the payload and return a future that
/// owns everything it needs, so it can run detached from the control loop.
pub trait Transmitter: Send + Sync {
    /// Resolves to the collector's HTTP status on success
    fn transmit(&self, payload: TelemetryPayload) -> BoxFuture<'static, Result<u16, TransmitError>>;
}

/// POSTs payloads as JSON to the collector endpoint
pub struct HttpTransmitter {
    client: reqwest::Client,
    url: String,
}

impl HttpTransmitter {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransmitError> {
        let mut builder = reqwest::Client::builder().user_agent("fall_node/0.1.0");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
        })
    }
}

impl Transmitter for HttpTransmitter {
    fn transmit(
        &self,
        payload: TelemetryPayload,
    ) -> BoxFuture<'static, Result<u16, TransmitError>> {
        let client = self.client.clone();
        let url = self.url.clone();

        async move {
            let response = client.post(&url).json(&payload).send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(status.as_u16())
            } else {
                Err(TransmitError::Status(status.as_u16()))
            }
        }
        .boxed()
    }
}

/// Logs the payload instead of sending it. Reports status 0.
#[derive(Debug, Default)]
pub struct DryRunTransmitter;

impl Transmitter for DryRunTransmitter {
    fn transmit(
        &self,
        payload: TelemetryPayload,
    ) -> BoxFuture<'static, Result<u16, TransmitError>> {
        async move {
            let json = payload.to_json()?;
            log::info!("[dry-run] would POST {}", json);
            Ok(0)
        }
        .boxed()
    }
}

/// Hand `payload` to a detached task and return immediately.
///
/// The outcome is only logged. The returned handle may be dropped; the
/// transmission still runs to completion.
pub fn dispatch(
    transmitter: Arc<dyn Transmitter>,
    payload: TelemetryPayload,
) -> JoinHandle<Result<u16, TransmitError>> {
    tokio::spawn(async move {
        let result = transmitter.transmit(payload).await;
        match &result {
            Ok(status) => log::info!("HTTP Response code: {}", status),
            Err(TransmitError::Status(status)) => log::warn!("HTTP Response code: {}", status),
            Err(e) => log::error!("Error on sending POST: {}", e),
        }
        result
    })
}
