//! Shared in-process fakes for the collaborator seams.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use parcelwise_common::address::Address;
use parcelwise_common::parcel::Parcel;

use crate::carrier::{CarrierApi, CarrierError, PurchasedLabel};
use crate::notify::{Notification, Notifier, NotifyError};

type ErrorFactory = Box<dyn Fn() -> CarrierError + Send + Sync>;

enum Script {
    Succeed(PurchasedLabel),
    Fail(ErrorFactory),
}

/// Carrier double that records what it was asked to ship.
pub struct ScriptedCarrier {
    script: Script,
    calls: AtomicU32,
    last_request: Mutex<Option<(Address, Address, Parcel)>>,
}

impl ScriptedCarrier {
    pub fn succeeding(label: PurchasedLabel) -> Self {
        Self {
            script: Script::Succeed(label),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing<F>(make_error: F) -> Self
    where
        F: Fn() -> CarrierError + Send + Sync + 'static,
    {
        Self {
            script: Script::Fail(Box::new(make_error)),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(Address, Address, Parcel)> {
        self.last_request.try_lock().ok()?.clone()
    }
}

#[async_trait]
impl CarrierApi for ScriptedCarrier {
    async fn purchase_label(
        &self,
        from: &Address,
        to: &Address,
        parcel: &Parcel,
    ) -> Result<PurchasedLabel, CarrierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some((from.clone(), to.clone(), parcel.clone()));
        match &self.script {
            Script::Succeed(label) => Ok(label.clone()),
            Script::Fail(make_error) => Err(make_error()),
        }
    }
}

/// Notifier double that records sends, optionally failing every one.
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail_with: Option<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(err: NotifyError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(err.0),
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Some(message) = &self.fail_with {
            return Err(NotifyError(message.clone()));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
