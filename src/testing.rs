//! Recording fakes shared by the unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::alert::AlertOutput;
use crate::error::TransmitError;
use crate::payload::TelemetryPayload;
use crate::transmit::Transmitter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    Alert(bool),
    Indicator(bool),
}

/// Records every output change; clones share the log
#[derive(Clone, Debug, Default)]
pub struct RecordingAlert {
    events: Arc<Mutex<Vec<OutputEvent>>>,
}

impl RecordingAlert {
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AlertOutput for RecordingAlert {
    fn set_alert(&mut self, on: bool) {
        self.events.lock().unwrap().push(OutputEvent::Alert(on));
    }

    fn set_indicator(&mut self, on: bool) {
        self.events.lock().unwrap().push(OutputEvent::Indicator(on));
    }
}

/// Accepts every payload with status 200 and keeps a copy
#[derive(Clone, Debug, Default)]
pub struct RecordingTransmitter {
    sent: Arc<Mutex<Vec<TelemetryPayload>>>,
}

impl RecordingTransmitter {
    pub fn sent(&self) -> Vec<TelemetryPayload> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transmitter for RecordingTransmitter {
    fn transmit(
        &self,
        payload: TelemetryPayload,
    ) -> BoxFuture<'static, Result<u16, TransmitError>> {
        let sent = Arc::clone(&self.sent);
        async move {
            sent.lock().unwrap().push(payload);
            Ok(200)
        }
        .boxed()
    }
}
