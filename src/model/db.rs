//! Database model type aliases.

/// User record, including the secret and email confirmation code.
pub type UserModel = entity::user::Model;

/// Binding from an identity provider's foreign ID to a user.
pub type AccountModel = entity::account::Model;

/// Device owned by a user.
pub type DeviceModel = entity::device::Model;

/// Subscription referenced by exactly one user.
pub type SubscriptionModel = entity::subscription::Model;

/// Paid campaign.
pub type CampaignModel = entity::campaign::Model;

/// Payment made by a user towards a campaign.
pub type PaymentModel = entity::payment::Model;
