// PortalStore over Postgres. The payment summary columns are maintained by the
// `refresh_application_payment_summary` trigger, so nothing here writes them.

use async_trait::async_trait;
use bb8::PooledConnection;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::db::diesel_pool::DieselPool;
use crate::db::store::{CreditOutcome, PaymentTransition, PortalStore, StoreError};
use crate::models::{
    Application, Country, DeliveryOutcome, DraftRecord, NewApplication, NewPayment,
    Notification, NotificationStatus, Payment, PaymentPlan, PaymentStatus, Program, WizardDraft,
};
use crate::schema::{
    application_drafts, applications, countries, notification_outbox, payment_plans, payments,
    programs,
};

diesel::define_sql_function!(fn lower(x: diesel::sql_types::Text) -> diesel::sql_types::Text);

type PooledConn<'a> = PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone)]
pub struct DieselStore {
    pool: DieselPool,
}

impl DieselStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<PooledConn<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl PortalStore for DieselStore {
    async fn insert_application(&self, new: NewApplication) -> Result<Application, StoreError> {
        let mut conn = self.conn().await?;

        let application = diesel::insert_into(applications::table)
            .values(&new)
            .returning(Application::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(application)
    }

    async fn find_application_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Application>, StoreError> {
        let mut conn = self.conn().await?;

        let application = applications::table
            .filter(lower(applications::email).eq(email.trim().to_lowercase()))
            .order(applications::created_at.desc())
            .select(Application::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(application)
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        let mut conn = self.conn().await?;

        let application = applications::table
            .find(id)
            .select(Application::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(application)
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment, StoreError> {
        let mut conn = self.conn().await?;

        let payment = diesel::insert_into(payments::table)
            .values(&new)
            .returning(Payment::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(payment)
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let mut conn = self.conn().await?;

        let payment = payments::table
            .filter(payments::payment_reference.eq(reference))
            .select(Payment::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(payment)
    }

    async fn list_payments_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Payment>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = payments::table
            .filter(payments::application_id.eq(application_id))
            .order(payments::payment_date.desc())
            .select(Payment::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn mark_payment_successful(
        &self,
        reference: &str,
        gateway_reference: &str,
        credit_limit: i32,
    ) -> Result<Option<CreditOutcome>, StoreError> {
        let mut conn = self.conn().await?;
        let reference = reference.to_string();
        let gateway_reference = gateway_reference.to_string();

        conn.transaction::<_, StoreError, _>(|tx| {
            async move {
                let existing = payments::table
                    .filter(payments::payment_reference.eq(&reference))
                    .select(Payment::as_select())
                    .for_update()
                    .first(tx)
                    .await
                    .optional()?;

                let Some(existing) = existing else {
                    return Ok(None);
                };

                if !existing.is_successful() {
                    if let Some(refused) = check_credit_limit(
                        tx,
                        existing.application_id,
                        &existing.payment_reference,
                        existing.months_paid_for,
                        credit_limit,
                    )
                    .await?
                    {
                        return Ok(Some(refused));
                    }
                }

                let payment = diesel::update(payments::table.find(existing.id))
                    .set((
                        payments::payment_status.eq(PaymentStatus::Success.as_str()),
                        payments::paystack_reference.eq(&gateway_reference),
                        payments::updated_at.eq(Utc::now()),
                    ))
                    .returning(Payment::as_returning())
                    .get_result(tx)
                    .await?;

                Ok(Some(CreditOutcome::Credited(PaymentTransition {
                    payment,
                    previous_status: existing.status(),
                })))
            }
            .scope_boxed()
        })
        .await
    }

    async fn upsert_successful_payment(
        &self,
        new: NewPayment,
        credit_limit: i32,
    ) -> Result<CreditOutcome, StoreError> {
        let mut conn = self.conn().await?;

        conn.transaction::<_, StoreError, _>(|tx| {
            async move {
                let previous = payments::table
                    .filter(payments::payment_reference.eq(&new.payment_reference))
                    .select((payments::payment_status, payments::months_paid_for))
                    .for_update()
                    .first::<(String, i32)>(tx)
                    .await
                    .optional()?;

                let previous_status = previous
                    .as_ref()
                    .and_then(|(status, _)| PaymentStatus::from_string(status));
                if previous_status != Some(PaymentStatus::Success) {
                    let months = previous.as_ref().map_or(new.months_paid_for, |(_, m)| *m);
                    if let Some(refused) = check_credit_limit(
                        tx,
                        new.application_id,
                        &new.payment_reference,
                        months,
                        credit_limit,
                    )
                    .await?
                    {
                        return Ok(refused);
                    }
                }

                let payment = diesel::insert_into(payments::table)
                    .values(&new)
                    .on_conflict(payments::payment_reference)
                    .do_update()
                    .set((
                        payments::payment_status.eq(PaymentStatus::Success.as_str()),
                        payments::paystack_reference.eq(excluded(payments::paystack_reference)),
                        payments::updated_at.eq(Utc::now()),
                    ))
                    .returning(Payment::as_returning())
                    .get_result(tx)
                    .await?;

                Ok(CreditOutcome::Credited(PaymentTransition {
                    payment,
                    previous_status,
                }))
            }
            .scope_boxed()
        })
        .await
    }

    async fn fail_pending_payments(&self, application_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let mut conn = self.conn().await?;

        let failed = diesel::update(
            payments::table
                .filter(payments::application_id.eq(application_id))
                .filter(payments::payment_status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            payments::payment_status.eq(PaymentStatus::Failed.as_str()),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(Payment::as_returning())
        .get_results(&mut conn)
        .await?;

        Ok(failed)
    }

    async fn record_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let mut conn = self.conn().await?;

        let payment = diesel::update(
            payments::table.filter(payments::payment_reference.eq(reference)),
        )
        .set((
            payments::paystack_reference.eq(gateway_reference),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(Payment::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?;

        Ok(payment)
    }

    async fn mark_payment_failed_if_pending(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(
            payments::table
                .filter(payments::payment_reference.eq(reference))
                .filter(payments::payment_status.eq(PaymentStatus::Pending.as_str())),
        )
        .set((
            payments::payment_status.eq(PaymentStatus::Failed.as_str()),
            payments::updated_at.eq(Utc::now()),
        ))
        .returning(Payment::as_returning())
        .get_result(&mut conn)
        .await
        .optional()?;

        if updated.is_some() {
            return Ok(updated);
        }

        // Already settled (or unknown): report the row as it stands
        let current = payments::table
            .filter(payments::payment_reference.eq(reference))
            .select(Payment::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(current)
    }

    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let record = draft.to_record()?;

        diesel::insert_into(application_drafts::table)
            .values(&record)
            .on_conflict(application_drafts::id)
            .do_update()
            .set((
                application_drafts::payload.eq(excluded(application_drafts::payload)),
                application_drafts::updated_at.eq(excluded(application_drafts::updated_at)),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn load_draft(&self, id: Uuid) -> Result<Option<WizardDraft>, StoreError> {
        let mut conn = self.conn().await?;

        let record = application_drafts::table
            .find(id)
            .select(DraftRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        match record {
            Some(record) => Ok(Some(WizardDraft::from_record(record)?)),
            None => Ok(None),
        }
    }

    async fn delete_draft(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;

        let deleted = diesel::delete(application_drafts::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError> {
        let mut conn = self.conn().await?;

        let row = diesel::insert_into(notification_outbox::table)
            .values(&notification)
            .returning(Notification::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(row)
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        outcome: &DeliveryOutcome,
    ) -> Result<Option<Notification>, StoreError> {
        let mut conn = self.conn().await?;
        let now = Utc::now();
        let target = notification_outbox::table.find(id);

        let row = match outcome {
            DeliveryOutcome::Sent => diesel::update(target)
                .set((
                    notification_outbox::status.eq(NotificationStatus::Sent.as_str()),
                    notification_outbox::attempts.eq(notification_outbox::attempts + 1),
                    notification_outbox::last_error.eq(None::<String>),
                    notification_outbox::sent_at.eq(Some(now)),
                    notification_outbox::updated_at.eq(now),
                ))
                .returning(Notification::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?,
            DeliveryOutcome::Failed(reason) => diesel::update(target)
                .set((
                    notification_outbox::status.eq(NotificationStatus::Failed.as_str()),
                    notification_outbox::attempts.eq(notification_outbox::attempts + 1),
                    notification_outbox::last_error.eq(Some(reason.as_str())),
                    notification_outbox::updated_at.eq(now),
                ))
                .returning(Notification::as_returning())
                .get_result(&mut conn)
                .await
                .optional()?,
        };

        Ok(row)
    }

    async fn list_undelivered_notifications(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = notification_outbox::table
            .filter(notification_outbox::status.eq_any([
                NotificationStatus::Pending.as_str(),
                NotificationStatus::Failed.as_str(),
            ]))
            .filter(notification_outbox::attempts.lt(max_attempts))
            .order(notification_outbox::created_at.asc())
            .limit(limit)
            .select(Notification::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn list_programs(&self) -> Result<Vec<Program>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = programs::table
            .filter(programs::is_active.eq(true))
            .order(programs::id.asc())
            .select(Program::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = countries::table
            .order(countries::name.asc())
            .select(Country::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn list_payment_plans(&self) -> Result<Vec<PaymentPlan>, StoreError> {
        let mut conn = self.conn().await?;

        let rows = payment_plans::table
            .filter(payment_plans::is_active.eq(true))
            .order(payment_plans::id.asc())
            .select(PaymentPlan::as_select())
            .load(&mut conn)
            .await?;

        Ok(rows)
    }

    async fn find_plan_for_program(
        &self,
        program: &str,
    ) -> Result<Option<PaymentPlan>, StoreError> {
        let mut conn = self.conn().await?;

        let program_plan = payment_plans::table
            .inner_join(programs::table)
            .filter(programs::name.eq(program))
            .filter(payment_plans::is_active.eq(true))
            .order(payment_plans::id.asc())
            .select(PaymentPlan::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        if program_plan.is_some() {
            return Ok(program_plan);
        }

        let global_plan = payment_plans::table
            .filter(payment_plans::program_id.is_null())
            .filter(payment_plans::is_active.eq(true))
            .order(payment_plans::id.asc())
            .select(PaymentPlan::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(global_plan)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }
}

/// Lock the application row, then refuse a credit that would take its successful
/// months past `credit_limit`. Concurrent credits for one application serialize here.
async fn check_credit_limit(
    tx: &mut AsyncPgConnection,
    application_id: Uuid,
    reference: &str,
    months_requested: i32,
    credit_limit: i32,
) -> Result<Option<CreditOutcome>, StoreError> {
    applications::table
        .find(application_id)
        .select(applications::id)
        .for_update()
        .first::<Uuid>(tx)
        .await?;

    let months_paid = payments::table
        .filter(payments::application_id.eq(application_id))
        .filter(payments::payment_status.eq(PaymentStatus::Success.as_str()))
        .filter(payments::payment_reference.ne(reference))
        .select(diesel::dsl::sum(payments::months_paid_for))
        .first::<Option<i64>>(tx)
        .await?
        .unwrap_or(0);
    let months_paid = i32::try_from(months_paid).unwrap_or(i32::MAX);

    if months_paid.saturating_add(months_requested) > credit_limit {
        return Ok(Some(CreditOutcome::ExceedsPlan {
            application_id,
            months_paid,
            months_requested,
        }));
    }
    Ok(None)
}
