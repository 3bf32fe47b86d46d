use chrono::NaiveDateTime;
use tandem::{
    data::Page,
    error::{validation::ValidationError, Error},
    model::{
        campaign::NewCampaign,
        id::Id,
        payment::{NewPayment, PaymentFilter, PaymentStatus},
    },
    service::{campaign::CampaignService, payment::PaymentService},
};
use tandem_test_utils::prelude::*;

use crate::support::state;

/// Expect a campaign's total to follow its payments through charge, failure and refund
#[tokio::test]
async fn campaign_total_follows_payment_lifecycle() -> Result<(), TestError> {
    let test = test_setup_with_tables!(entity::prelude::Campaign, entity::prelude::Payment)?;
    let state = state(&test);
    let ctx = state.request(constant::TEST_IP, Some(Id::new(7)));

    let campaign = CampaignService::new(&ctx)
        .create(NewCampaign {
            title: "Server costs".to_string(),
            description: "Keeps the servers running".to_string(),
            goal: 50_000,
            ..Default::default()
        })
        .await
        .unwrap();
    let campaign_id = Id::from(campaign.id);
    let payments = PaymentService::new(&ctx);

    let mut charged = Vec::new();
    for amount in [1_000, 2_000, 4_000] {
        let payment = payments
            .create(
                Id::new(7),
                NewPayment {
                    amount,
                    campaign: campaign_id,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let payment_id = Id::from(payment.id);
        payments
            .transition(payment_id, PaymentStatus::Charging)
            .await
            .unwrap();
        charged.push(payment_id);
    }

    payments.transition(charged[0], PaymentStatus::Success).await.unwrap();
    payments.transition(charged[1], PaymentStatus::Success).await.unwrap();
    payments.record_error(charged[2], "card declined", None).await.unwrap();
    let failed = payments.transition(charged[2], PaymentStatus::Error).await.unwrap();
    assert!(failed.completed.is_some());
    assert_eq!(payments.campaign_total(campaign_id).await.unwrap(), 3_000);

    payments.transition(charged[1], PaymentStatus::Refunding).await.unwrap();
    let refunding = payments.get(charged[1]).await.unwrap().unwrap();
    assert!(refunding.completed.is_none());
    assert_eq!(payments.campaign_total(campaign_id).await.unwrap(), 1_000);

    payments.transition(charged[1], PaymentStatus::Refunded).await.unwrap();

    // Failed charges can't be revived
    let revived = payments.transition(charged[2], PaymentStatus::Charging).await;
    assert!(matches!(
        revived,
        Err(Error::ValidationError(ValidationError::InvalidStatus { .. }))
    ));

    let settled = payments
        .list(
            &PaymentFilter {
                campaign: Some(campaign_id),
                statuses: vec![PaymentStatus::Success, PaymentStatus::Refunded],
                ..Default::default()
            },
            Page::<NaiveDateTime>::first(20),
        )
        .await
        .unwrap();
    let mut settled_ids: Vec<_> = settled.iter().map(|p| Id::from(p.id)).collect();
    settled_ids.sort();
    let mut expected = vec![charged[0], charged[1]];
    expected.sort();
    assert_eq!(settled_ids, expected);

    let entries = ctx
        .audit()
        .list(&format!("payments:{}", charged[1]), 100)
        .await
        .unwrap();
    let statuses: Vec<_> = entries
        .iter()
        .filter(|e| e.field == "status" && !e.from.is_empty())
        .map(|e| e.to.as_str())
        .collect();
    assert_eq!(statuses, vec!["refunded", "refunding", "success", "charging"]);

    Ok(())
}
