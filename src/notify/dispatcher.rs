use log::{ debug, error, warn };
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::telegram::TelegramClient;
use super::Notification;

pub const CHANNEL_CAPACITY: usize = 64;

/// Hands notifications to a background task so request handlers never wait
/// on Telegram.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    pub fn spawn(client: Arc<TelegramClient>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Notification>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let kind = notification.kind();
                match client.send(&notification.render()).await {
                    Ok(true) => debug!("Delivered {} notification", kind),
                    Ok(false) => warn!("Telegram rejected {} notification", kind),
                    Err(e) => error!("Failed to deliver {} notification: {}", kind, e),
                }
            }
            debug!("Notification channel closed, dispatcher exiting");
        });

        Self { tx }
    }

    /// Queues without blocking. Returns false when the notification was
    /// dropped.
    pub fn notify(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(n)) => {
                warn!("Notification queue full, dropping {} notification", n.kind());
                false
            }
            Err(TrySendError::Closed(n)) => {
                error!("Notification dispatcher stopped, dropping {} notification", n.kind());
                false
            }
        }
    }
}
