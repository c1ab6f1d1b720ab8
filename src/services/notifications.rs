// Notification outbox: every email is recorded before it is sent and its outcome
// written back, so failures are visible and can be redelivered on the next start.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::db::PortalStore;
use crate::models::{DeliveryOutcome, Notification, NotificationKind};
use crate::services::email::{
    ApplicationSubmittedNotice, EmailError, EmailService, PaymentConfirmationNotice,
};

/// Rows that failed this many times are left for manual follow-up
pub const MAX_DELIVERY_ATTEMPTS: i32 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct NotificationOutbox {
    store: Arc<dyn PortalStore>,
    email: Arc<EmailService>,
}

impl NotificationOutbox {
    pub fn new(store: Arc<dyn PortalStore>, email: Arc<EmailService>) -> Self {
        Self { store, email }
    }

    /// Record and send the "application received" email. Never fails the caller.
    pub async fn application_submitted(
        &self,
        notice: &ApplicationSubmittedNotice,
    ) -> DeliveryOutcome {
        self.enqueue_and_dispatch(
            NotificationKind::ApplicationSubmitted,
            &notice.applicant_email,
            notice,
        )
        .await
    }

    /// Record and send the payment receipt. Never fails the caller.
    pub async fn payment_confirmation(&self, notice: &PaymentConfirmationNotice) -> DeliveryOutcome {
        self.enqueue_and_dispatch(
            NotificationKind::PaymentConfirmation,
            &notice.applicant_email,
            notice,
        )
        .await
    }

    #[instrument(skip(self, payload), fields(kind = kind.as_str()))]
    async fn enqueue_and_dispatch<T: Serialize>(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: &T,
    ) -> DeliveryOutcome {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to serialize notification payload: {}", e);
                return DeliveryOutcome::Failed(e.to_string());
            },
        };

        let notification = Notification::new(kind, recipient, payload);
        let recorded = match self.store.insert_notification(notification.clone()).await {
            Ok(row) => Some(row),
            Err(e) => {
                // Still worth sending; the row just won't be there for redelivery
                warn!("Failed to record notification in outbox: {}", e);
                None
            },
        };

        let outcome = self.dispatch(&notification).await;

        if let Some(row) = recorded {
            self.record_outcome(&row, &outcome).await;
        }

        outcome
    }

    /// Build and send the email a row describes
    async fn dispatch(&self, notification: &Notification) -> DeliveryOutcome {
        let result = match notification.kind() {
            Some(NotificationKind::ApplicationSubmitted) => {
                match decode::<ApplicationSubmittedNotice>(notification) {
                    Ok(notice) => self.email.send_application_submitted(&notice).await,
                    Err(e) => Err(e),
                }
            },
            Some(NotificationKind::PaymentConfirmation) => {
                match decode::<PaymentConfirmationNotice>(notification) {
                    Ok(notice) => self.email.send_payment_confirmation(&notice).await,
                    Err(e) => Err(e),
                }
            },
            None => Err(EmailError::ConfigError(format!(
                "unknown notification kind: {}",
                notification.kind
            ))),
        };

        match result {
            Ok(()) => DeliveryOutcome::Sent,
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    "Notification delivery failed: {}", e
                );
                DeliveryOutcome::Failed(e.to_string())
            },
        }
    }

    async fn record_outcome(&self, notification: &Notification, outcome: &DeliveryOutcome) {
        if let Err(e) = self.store.record_delivery(notification.id, outcome).await {
            warn!(
                notification_id = %notification.id,
                "Failed to record notification outcome: {}", e
            );
        }
    }

    /// One-shot pass over rows a previous run left `pending` or `failed`
    ///
    /// Rows that used up their attempts are left out of the query, so they never
    /// crowd newer rows out of `limit`.
    #[instrument(skip(self))]
    pub async fn redeliver_pending(&self, limit: i64) -> RedeliveryReport {
        let mut report = RedeliveryReport::default();

        let rows = match self
            .store
            .list_undelivered_notifications(MAX_DELIVERY_ATTEMPTS, limit)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not load undelivered notifications: {}", e);
                return report;
            },
        };

        for row in rows {
            report.attempted += 1;
            let outcome = self.dispatch(&row).await;
            match outcome {
                DeliveryOutcome::Sent => report.sent += 1,
                DeliveryOutcome::Failed(_) => report.failed += 1,
            }
            self.record_outcome(&row, &outcome).await;
        }

        if report.attempted > 0 {
            info!(
                "Outbox redelivery: {} attempted, {} sent, {} failed",
                report.attempted, report.sent, report.failed
            );
        }

        report
    }
}

fn decode<T: DeserializeOwned>(notification: &Notification) -> Result<T, EmailError> {
    serde_json::from_value(notification.payload.clone()).map_err(|e| {
        EmailError::ConfigError(format!("malformed notification payload: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::EmailConfig;
    use crate::db::MemoryStore;
    use crate::models::NotificationStatus;
    use crate::services::email::{EmailMessage, EmailTransport};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct FlakyTransport {
        fail: AtomicBool,
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailTransport for FlakyTransport {
        async fn deliver(&self, message: EmailMessage) -> Result<(), EmailError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmailError::ServiceUnavailable);
            }
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            resend_api_key: "re_test".to_string(),
            resend_api_url: "http://localhost/emails".to_string(),
            from_email: "support@blactechafrica.com".to_string(),
            from_name: "BlacTech Scholarship Portal".to_string(),
            support_email: "support@blactechafrica.com".to_string(),
            portal_url: "http://localhost:5173".to_string(),
            max_retries: 1,
            retry_delay_ms: 1,
            request_timeout_ms: 1_000,
        }
    }

    fn notice() -> ApplicationSubmittedNotice {
        ApplicationSubmittedNotice {
            applicant_name: "Ada Okafor".to_string(),
            applicant_email: "ada@example.com".to_string(),
            program: "Data Science".to_string(),
            application_id: Uuid::new_v4(),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failed_send_is_recorded_then_redelivered() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(FlakyTransport::default());
        transport.fail.store(true, Ordering::SeqCst);

        let email =
            Arc::new(EmailService::with_transport(email_config(), transport.clone()).unwrap());
        let outbox = NotificationOutbox::new(store.clone(), email);

        let outcome = outbox.application_submitted(&notice()).await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));

        let rows = store.notifications().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status(), Some(NotificationStatus::Failed));
        assert_eq!(rows[0].attempts, 1);
        assert!(rows[0].last_error.is_some());

        transport.fail.store(false, Ordering::SeqCst);
        let report = outbox.redeliver_pending(10).await;
        assert_eq!(report.sent, 1);

        let rows = store.notifications().await;
        assert_eq!(rows[0].status(), Some(NotificationStatus::Sent));
        assert_eq!(rows[0].attempts, 2);
        assert!(rows[0].sent_at.is_some());
        assert_eq!(transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_sending() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let transport = Arc::new(FlakyTransport::default());
        let email =
            Arc::new(EmailService::with_transport(email_config(), transport.clone()).unwrap());
        let outbox = NotificationOutbox::new(store.clone(), email);

        let outcome = outbox.application_submitted(&notice()).await;
        assert_eq!(outcome, DeliveryOutcome::Sent);
        assert_eq!(transport.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_rows_do_not_starve_redelivery() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..3 {
            let mut row = Notification::new(
                NotificationKind::ApplicationSubmitted,
                "old@example.com",
                serde_json::to_value(notice()).unwrap(),
            );
            row.status = NotificationStatus::Failed.as_str().to_string();
            row.attempts = MAX_DELIVERY_ATTEMPTS;
            store.insert_notification(row).await.unwrap();
        }

        let transport = Arc::new(FlakyTransport::default());
        transport.fail.store(true, Ordering::SeqCst);
        let email =
            Arc::new(EmailService::with_transport(email_config(), transport.clone()).unwrap());
        let outbox = NotificationOutbox::new(store.clone(), email);
        outbox.application_submitted(&notice()).await;

        transport.fail.store(false, Ordering::SeqCst);
        let report = outbox.redeliver_pending(3).await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(transport.sent.lock().await.len(), 1);
        assert_eq!(transport.sent.lock().await[0].to, vec!["ada@example.com".to_string()]);
    }
}
