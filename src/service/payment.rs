//! Payments towards campaigns.
//!
//! A payment starts `pending` and moves through the charge lifecycle:
//!
//! ```text
//! pending -> charging -> success -> refunding -> refunded
//!               |  ^
//!               v  |
//!     error <-  retry
//! ```
//!
//! `completed` carries the time the payment reached `success`, `error` or `refunded` and is
//! empty in every other status.

use chrono::NaiveDateTime;
use sea_orm::ActiveValue;

use crate::{
    audit::{entity_key, AuditDelta},
    data::{campaign::CampaignRepository, payment::PaymentRepository, Page},
    error::{validation::ValidationError, Error},
    model::{
        context::RequestContext,
        db::PaymentModel,
        id::Id,
        payment::{NewPayment, PaymentFilter, PaymentStatus},
    },
    util::time,
};

pub struct PaymentService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> PaymentService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Records a pending payment by `user_id` towards a campaign.
    ///
    /// # Returns
    /// - `Ok(PaymentModel)` - Created payment
    /// - `Err(Error::ValidationError)` - Amount is negative
    /// - `Err(Error::NotFound)` - Campaign does not exist
    pub async fn create(&self, user_id: Id, new_payment: NewPayment) -> Result<PaymentModel, Error> {
        self.ctx.ensure_writable()?;
        if new_payment.amount < 0 {
            return Err(ValidationError::NegativeAmount(new_payment.amount).into());
        }
        if CampaignRepository::new(self.ctx.db())
            .get(new_payment.campaign)
            .await?
            .is_none()
        {
            return Err(Error::NotFound(format!("Campaign {}", new_payment.campaign)));
        }

        let payment_id = self.ctx.ids().next().await?;
        let payment = PaymentRepository::new(self.ctx.db())
            .create(PaymentModel {
                id: i64::from(payment_id),
                remote_id: None,
                amount: new_payment.amount,
                message: new_payment.message,
                created: time::now(),
                completed: None,
                user_id: i64::from(user_id),
                funding_source_id: new_payment.funding_source_id,
                anonymous: new_payment.anonymous,
                campaign: i64::from(new_payment.campaign),
                status: PaymentStatus::Pending.as_str().to_string(),
                error: None,
            })
            .await?;

        let mut delta = AuditDelta::new(entity_key("payments", payment_id));
        delta
            .created("amount", &payment.amount)
            .created("campaign", &Id::from(payment.campaign))
            .created("user_id", &user_id)
            .created("anonymous", &payment.anonymous)
            .created("status", &payment.status);
        self.ctx.audit().record(delta).await;

        Ok(payment)
    }

    /// Moves a payment to `next`, setting or clearing its completion time.
    ///
    /// # Returns
    /// - `Ok(PaymentModel)` - Updated payment
    /// - `Err(Error::ValidationError(ValidationError::InvalidStatus))` - `next` may not follow
    ///   the current status
    /// - `Err(Error::NotFound)` - Payment does not exist
    ///
    /// The status is written only if it still matches the one read, so of two concurrent
    /// transitions from the same status exactly one succeeds.
    pub async fn transition(
        &self,
        payment_id: Id,
        next: PaymentStatus,
    ) -> Result<PaymentModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(payment_id).await?;
        let status = current.status.parse::<PaymentStatus>()?;

        if !status.can_transition_to(next) {
            return Err(ValidationError::InvalidStatus {
                from: status,
                to: next,
            }
            .into());
        }

        let completed = next.is_completed().then(time::now);
        let payment_repository = PaymentRepository::new(self.ctx.db());
        let updated_rows = payment_repository
            .update_status_if(payment_id, status, next, completed)
            .await?;
        if updated_rows == 0 {
            // Another transition moved the payment after it was read
            let from = self.require(payment_id).await?.status.parse::<PaymentStatus>()?;
            return Err(ValidationError::InvalidStatus { from, to: next }.into());
        }
        let updated = self.require(payment_id).await?;

        let mut delta = AuditDelta::new(entity_key("payments", payment_id));
        delta
            .change("status", &current.status, &updated.status)
            .change("completed", &current.completed, &updated.completed);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    /// Stores the processor's error message and reference for a failed charge.
    pub async fn record_error(
        &self,
        payment_id: Id,
        message: &str,
        remote_id: Option<String>,
    ) -> Result<PaymentModel, Error> {
        self.ctx.ensure_writable()?;
        let current = self.require(payment_id).await?;

        let mut changes = entity::payment::ActiveModel {
            error: ActiveValue::Set(Some(message.to_string())),
            ..Default::default()
        };
        if remote_id.is_some() {
            changes.remote_id = ActiveValue::Set(remote_id);
        }
        let updated = self.apply(payment_id, changes).await?;

        let mut delta = AuditDelta::new(entity_key("payments", payment_id));
        delta
            .change("error", &current.error, &updated.error)
            .change("remote_id", &current.remote_id, &updated.remote_id);
        self.ctx.audit().record(delta).await;

        Ok(updated)
    }

    pub async fn get(&self, payment_id: Id) -> Result<Option<PaymentModel>, Error> {
        Ok(PaymentRepository::new(self.ctx.db()).get(payment_id).await?)
    }

    /// Payments matching `filter`, newest first, paged on the creation time.
    pub async fn list(
        &self,
        filter: &PaymentFilter,
        page: Page<NaiveDateTime>,
    ) -> Result<Vec<PaymentModel>, Error> {
        Ok(PaymentRepository::new(self.ctx.db())
            .list(filter, page)
            .await?)
    }

    /// Sum of all successful payments to `campaign`, in cents.
    pub async fn campaign_total(&self, campaign: Id) -> Result<i64, Error> {
        let amounts = PaymentRepository::new(self.ctx.db())
            .amounts_for_campaign(campaign, PaymentStatus::Success)
            .await?;

        amounts
            .into_iter()
            .try_fold(0i64, |total, amount| total.checked_add(amount))
            .ok_or_else(|| {
                Error::InternalError(format!("Total of campaign {campaign} overflows"))
            })
    }

    async fn require(&self, payment_id: Id) -> Result<PaymentModel, Error> {
        PaymentRepository::new(self.ctx.db())
            .get(payment_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Payment {payment_id}")))
    }

    async fn apply(
        &self,
        payment_id: Id,
        changes: entity::payment::ActiveModel,
    ) -> Result<PaymentModel, Error> {
        PaymentRepository::new(self.ctx.db())
            .partial_update(payment_id, changes)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Payment {payment_id}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tandem_test_utils::prelude::*;

    use super::*;
    use crate::{error::ErrorKind, util::test::state_over};

    async fn setup_campaign(test: &mut TestSetup) -> Result<Id, TestError> {
        let campaign = test.campaign().insert_campaign(None, None).await?;
        Ok(Id::from(campaign.id))
    }

    fn new_payment(campaign: Id, amount: i64) -> NewPayment {
        NewPayment {
            amount,
            campaign,
            ..Default::default()
        }
    }

    mod create {
        use super::*;

        /// Expect a pending payment without completion time
        #[tokio::test]
        async fn creates_pending_payment() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);

            let payment = PaymentService::new(&ctx)
                .create(Id::new(7), new_payment(campaign, 2_500))
                .await
                .unwrap();

            assert_eq!(payment.status, "pending");
            assert_eq!(payment.user_id, 7);
            assert!(payment.completed.is_none());

            Ok(())
        }

        /// Expect InvalidInput for a negative amount and NotFound for an unknown campaign
        #[tokio::test]
        async fn rejects_invalid_payment() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let payments = PaymentService::new(&ctx);

            let negative = payments.create(Id::new(7), new_payment(campaign, -1)).await;
            let unknown = payments.create(Id::new(7), new_payment(Id::new(1), 100)).await;

            assert_eq!(negative.unwrap_err().kind(), ErrorKind::InvalidInput);
            assert!(matches!(unknown, Err(Error::NotFound(_))));

            Ok(())
        }
    }

    mod transition {
        use super::*;

        /// Expect completion to be set exactly at success, error and refunded
        #[tokio::test]
        async fn tracks_completion_through_lifecycle() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let payments = PaymentService::new(&ctx);

            let payment = payments
                .create(Id::new(7), new_payment(campaign, 2_500))
                .await
                .unwrap();
            let payment_id = Id::from(payment.id);

            let steps = [
                (PaymentStatus::Charging, false),
                (PaymentStatus::Retry, false),
                (PaymentStatus::Charging, false),
                (PaymentStatus::Success, true),
                (PaymentStatus::Refunding, false),
                (PaymentStatus::Refunded, true),
            ];
            for (status, completed) in steps {
                let payment = payments.transition(payment_id, status).await.unwrap();
                assert_eq!(payment.status, status.as_str());
                assert_eq!(payment.completed.is_some(), completed, "{status}");
            }

            Ok(())
        }

        /// Expect InvalidStatus for an edge outside the lifecycle
        #[tokio::test]
        async fn rejects_invalid_transition() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let payments = PaymentService::new(&ctx);

            let payment = payments
                .create(Id::new(7), new_payment(campaign, 2_500))
                .await
                .unwrap();

            let result = payments
                .transition(Id::from(payment.id), PaymentStatus::Success)
                .await;

            assert!(matches!(
                result,
                Err(Error::ValidationError(ValidationError::InvalidStatus {
                    from: PaymentStatus::Pending,
                    to: PaymentStatus::Success,
                }))
            ));

            Ok(())
        }
    }

    mod transition_race {
        use super::*;

        /// Expect one of two concurrent outcomes of a charge to win and the other to be rejected
        #[tokio::test]
        async fn settles_charge_once() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let payments = PaymentService::new(&ctx);

            let payment = payments
                .create(Id::new(7), new_payment(campaign, 2_500))
                .await
                .unwrap();
            let payment_id = Id::from(payment.id);
            payments
                .transition(payment_id, PaymentStatus::Charging)
                .await
                .unwrap();

            let (success, error) = tokio::join!(
                payments.transition(payment_id, PaymentStatus::Success),
                payments.transition(payment_id, PaymentStatus::Error),
            );

            let stored = payments.get(payment_id).await.unwrap().unwrap();
            match (success, error) {
                (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => {
                    assert_eq!(won.status, stored.status);
                    assert!(matches!(
                        lost,
                        Error::ValidationError(ValidationError::InvalidStatus {
                            to: PaymentStatus::Success | PaymentStatus::Error,
                            ..
                        })
                    ));
                }
                (success, error) => panic!("expected one winner, got {success:?} and {error:?}"),
            }
            assert!(stored.completed.is_some());

            Ok(())
        }
    }

    mod record_error {
        use super::*;

        #[tokio::test]
        async fn stores_error_message() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let payments = PaymentService::new(&ctx);

            let payment = payments
                .create(Id::new(7), new_payment(campaign, 2_500))
                .await
                .unwrap();
            let updated = payments
                .record_error(Id::from(payment.id), "card declined", Some("ch_1".to_string()))
                .await
                .unwrap();

            assert_eq!(updated.error.as_deref(), Some("card declined"));
            assert_eq!(updated.remote_id.as_deref(), Some("ch_1"));

            Ok(())
        }
    }

    mod campaign_total {
        use super::*;

        /// Expect only successful payments to be summed
        #[tokio::test]
        async fn sums_successful_payments() -> Result<(), TestError> {
            let mut test =
                test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
            let campaign = setup_campaign(&mut test).await?;
            let other = setup_campaign(&mut test).await?;
            let now = time::now();
            for (campaign, amount, status) in [
                (campaign, 1_000, "success"),
                (campaign, 2_500, "success"),
                (campaign, 4_000, "error"),
                (campaign, 8_000, "pending"),
                (other, 16_000, "success"),
            ] {
                test.campaign()
                    .insert_payment(7, i64::from(campaign), amount, status, now - Duration::minutes(1))
                    .await?;
            }

            let state = state_over(&test.db);
            let ctx = state.request(constant::TEST_IP, None);
            let total = PaymentService::new(&ctx)
                .campaign_total(campaign)
                .await
                .unwrap();

            assert_eq!(total, 3_500);

            Ok(())
        }
    }
}
