// In-memory PortalStore used by tests and `STORE_BACKEND=memory`

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{CreditOutcome, PaymentTransition, PortalStore, StoreError};
use crate::models::reference::{SEED_COUNTRIES, SEED_PROGRAMS};
use crate::models::{
    Application, Country, DeliveryOutcome, NewApplication, NewPayment, Notification,
    NotificationStatus, Payment, PaymentPlan, PaymentStatus, PaymentSummary, Program,
    WizardDraft,
};

const FALLBACK_PLAN_MONTHS: i32 = 4;

#[derive(Default)]
struct State {
    applications: HashMap<Uuid, Application>,
    payments: Vec<Payment>,
    drafts: HashMap<Uuid, WizardDraft>,
    outbox: Vec<Notification>,
    programs: Vec<Program>,
    countries: Vec<Country>,
    plans: Vec<PaymentPlan>,
}

impl State {
    fn plan_for_program(&self, program: &str) -> Option<&PaymentPlan> {
        let program_id = self
            .programs
            .iter()
            .find(|p| p.name == program)
            .map(|p| p.id);

        let program_plan = program_id.and_then(|id| {
            self.plans
                .iter()
                .filter(|plan| plan.is_active && plan.program_id == Some(id))
                .min_by_key(|plan| plan.id)
        });

        program_plan.or_else(|| {
            self.plans
                .iter()
                .filter(|plan| plan.is_active && plan.program_id.is_none())
                .min_by_key(|plan| plan.id)
        })
    }

    /// `Some` when crediting `payment` would push its application past `credit_limit`
    fn exceeds_plan(&self, payment: &Payment, credit_limit: i32) -> Option<CreditOutcome> {
        if payment.is_successful() {
            return None;
        }

        let months_paid: i32 = self
            .payments
            .iter()
            .filter(|p| {
                p.application_id == payment.application_id
                    && p.is_successful()
                    && p.payment_reference != payment.payment_reference
            })
            .map(|p| p.months_paid_for)
            .sum();

        (months_paid + payment.months_paid_for > credit_limit).then(|| CreditOutcome::ExceedsPlan {
            application_id: payment.application_id,
            months_paid,
            months_requested: payment.months_paid_for,
        })
    }

    /// Same rules as the `refresh_application_payment_summary` trigger
    fn refresh_summary(&mut self, application_id: Uuid) {
        let Some(program) = self
            .applications
            .get(&application_id)
            .map(|app| app.program.clone())
        else {
            return;
        };

        let plan_months = self
            .plan_for_program(&program)
            .map(|plan| plan.total_duration_months)
            .unwrap_or(FALLBACK_PLAN_MONTHS);

        let summary = PaymentSummary::from_payments(
            self.payments
                .iter()
                .filter(|p| p.application_id == application_id),
            plan_months,
        );

        if let Some(app) = self.applications.get_mut(&application_id) {
            app.months_paid = summary.months_paid;
            app.total_amount_paid = summary.total_amount_paid;
            app.payment_status = summary.status.as_str().to_string();
            app.updated_at = Utc::now();
        }
    }
}

pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Seeded with the same reference data as the seed migration
    pub fn new() -> Self {
        let now = Utc::now();
        let programs = SEED_PROGRAMS
            .iter()
            .enumerate()
            .map(|(i, name)| Program {
                id: i as i32 + 1,
                name: name.to_string(),
                description: None,
                duration_months: Some(FALLBACK_PLAN_MONTHS),
                is_active: true,
            })
            .collect();

        let countries = SEED_COUNTRIES
            .iter()
            .enumerate()
            .map(|(i, (code, name))| Country {
                id: i as i32 + 1,
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();

        let plans = vec![PaymentPlan {
            id: 1,
            program_id: None,
            monthly_amount: 10_000,
            total_duration_months: FALLBACK_PLAN_MONTHS,
            description: Some("Standard scholarship plan: 4 monthly installments".to_string()),
            is_active: true,
            created_at: now,
        }];

        Self {
            state: Mutex::new(State {
                programs,
                countries,
                plans,
                ..State::default()
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// A store without programs, countries or plans
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(State::default()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with a database error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Add a plan, optionally tied to a program by name. Returns the plan id.
    pub async fn add_payment_plan(
        &self,
        program: Option<&str>,
        monthly_amount: i64,
        total_duration_months: i32,
    ) -> i32 {
        let mut state = self.state.lock().await;
        let program_id = program.and_then(|name| {
            state
                .programs
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.id)
        });
        let id = state.plans.iter().map(|p| p.id).max().unwrap_or(0) + 1;

        state.plans.push(PaymentPlan {
            id,
            program_id,
            monthly_amount,
            total_duration_months,
            description: None,
            is_active: true,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn payment_count(&self) -> usize {
        self.state.lock().await.payments.len()
    }

    pub async fn application_count(&self) -> usize {
        self.state.lock().await.applications.len()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.outbox.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("simulated write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn insert_application(&self, new: NewApplication) -> Result<Application, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        if state.applications.contains_key(&new.id) {
            return Err(StoreError::Conflict(format!("application {}", new.id)));
        }

        let application = new.into_application();
        state
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn find_application_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Application>, StoreError> {
        let email = email.trim().to_lowercase();
        let state = self.state.lock().await;

        Ok(state
            .applications
            .values()
            .filter(|app| app.email.to_lowercase() == email)
            .max_by_key(|app| app.created_at)
            .cloned())
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        if !state.applications.contains_key(&new.application_id) {
            return Err(StoreError::Database(format!(
                "payment references unknown application {}",
                new.application_id
            )));
        }
        if state
            .payments
            .iter()
            .any(|p| p.payment_reference == new.payment_reference)
        {
            return Err(StoreError::Conflict(format!(
                "payment reference {}",
                new.payment_reference
            )));
        }

        let payment = new.into_payment();
        let application_id = payment.application_id;
        state.payments.push(payment.clone());
        state.refresh_summary(application_id);
        Ok(payment)
    }

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .iter()
            .find(|p| p.payment_reference == reference)
            .cloned())
    }

    async fn list_payments_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.application_id == application_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(rows)
    }

    async fn mark_payment_successful(
        &self,
        reference: &str,
        gateway_reference: &str,
        credit_limit: i32,
    ) -> Result<Option<CreditOutcome>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        let Some(index) = state
            .payments
            .iter()
            .position(|p| p.payment_reference == reference)
        else {
            return Ok(None);
        };

        if let Some(refused) = state.exceeds_plan(&state.payments[index], credit_limit) {
            return Ok(Some(refused));
        }

        let payment = &mut state.payments[index];
        let previous_status = payment.status();
        payment.payment_status = PaymentStatus::Success.as_str().to_string();
        payment.paystack_reference = Some(gateway_reference.to_string());
        payment.updated_at = Utc::now();

        let payment = payment.clone();
        state.refresh_summary(payment.application_id);

        Ok(Some(CreditOutcome::Credited(PaymentTransition {
            payment,
            previous_status,
        })))
    }

    async fn upsert_successful_payment(
        &self,
        new: NewPayment,
        credit_limit: i32,
    ) -> Result<CreditOutcome, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        if !state.applications.contains_key(&new.application_id) {
            return Err(StoreError::Database(format!(
                "payment references unknown application {}",
                new.application_id
            )));
        }

        let existing = state
            .payments
            .iter()
            .position(|p| p.payment_reference == new.payment_reference);

        let candidate = match existing {
            Some(index) => state.payments[index].clone(),
            None => new.clone().into_payment(),
        };
        if let Some(refused) = state.exceeds_plan(&candidate, credit_limit) {
            return Ok(refused);
        }

        let transition = match existing {
            Some(index) => {
                let payment = &mut state.payments[index];
                let previous_status = payment.status();
                payment.payment_status = PaymentStatus::Success.as_str().to_string();
                payment.paystack_reference = new.paystack_reference.clone();
                payment.updated_at = Utc::now();
                PaymentTransition {
                    payment: payment.clone(),
                    previous_status,
                }
            },
            None => {
                let mut payment = candidate;
                payment.payment_status = PaymentStatus::Success.as_str().to_string();
                state.payments.push(payment.clone());
                PaymentTransition {
                    payment,
                    previous_status: None,
                }
            },
        };

        state.refresh_summary(transition.payment.application_id);
        Ok(CreditOutcome::Credited(transition))
    }

    async fn fail_pending_payments(&self, application_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let failed: Vec<Payment> = state
            .payments
            .iter_mut()
            .filter(|p| {
                p.application_id == application_id && p.status() == Some(PaymentStatus::Pending)
            })
            .map(|payment| {
                payment.payment_status = PaymentStatus::Failed.as_str().to_string();
                payment.updated_at = now;
                payment.clone()
            })
            .collect();

        state.refresh_summary(application_id);
        Ok(failed)
    }

    async fn record_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        Ok(state
            .payments
            .iter_mut()
            .find(|p| p.payment_reference == reference)
            .map(|payment| {
                payment.paystack_reference = Some(gateway_reference.to_string());
                payment.updated_at = Utc::now();
                payment.clone()
            }))
    }

    async fn mark_payment_failed_if_pending(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;

        let Some(payment) = state
            .payments
            .iter_mut()
            .find(|p| p.payment_reference == reference)
        else {
            return Ok(None);
        };

        if payment.status() == Some(PaymentStatus::Pending) {
            payment.payment_status = PaymentStatus::Failed.as_str().to_string();
            payment.updated_at = Utc::now();
        }

        let payment = payment.clone();
        state.refresh_summary(payment.application_id);
        Ok(Some(payment))
    }

    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), StoreError> {
        self.check_writable()?;
        // Through the same JSON document the database stores
        let stored = WizardDraft::from_record(draft.to_record()?)?;
        self.state.lock().await.drafts.insert(draft.id, stored);
        Ok(())
    }

    async fn load_draft(&self, id: Uuid) -> Result<Option<WizardDraft>, StoreError> {
        Ok(self.state.lock().await.drafts.get(&id).cloned())
    }

    async fn delete_draft(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.state.lock().await.drafts.remove(&id).is_some())
    }

    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError> {
        self.check_writable()?;
        self.state.lock().await.outbox.push(notification.clone());
        Ok(notification)
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        outcome: &DeliveryOutcome,
    ) -> Result<Option<Notification>, StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();

        Ok(state.outbox.iter_mut().find(|n| n.id == id).map(|row| {
            row.attempts += 1;
            row.updated_at = now;
            match outcome {
                DeliveryOutcome::Sent => {
                    row.status = NotificationStatus::Sent.as_str().to_string();
                    row.last_error = None;
                    row.sent_at = Some(now);
                },
                DeliveryOutcome::Failed(reason) => {
                    row.status = NotificationStatus::Failed.as_str().to_string();
                    row.last_error = Some(reason.clone());
                },
            }
            row.clone()
        }))
    }

    async fn list_undelivered_notifications(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.lock().await;
        let mut rows: Vec<Notification> = state
            .outbox
            .iter()
            .filter(|n| n.status() != Some(NotificationStatus::Sent) && n.attempts < max_attempts)
            .cloned()
            .collect();
        rows.sort_by_key(|n| n.created_at);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn list_programs(&self) -> Result<Vec<Program>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .programs
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        let mut rows = self.state.lock().await.countries.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn list_payment_plans(&self) -> Result<Vec<PaymentPlan>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.plans.iter().filter(|p| p.is_active).cloned().collect())
    }

    async fn find_plan_for_program(
        &self,
        program: &str,
    ) -> Result<Option<PaymentPlan>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.plan_for_program(program).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
