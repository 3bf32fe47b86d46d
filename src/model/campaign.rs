use chrono::NaiveDateTime;

use crate::error::validation::ValidationError;

#[derive(Debug, Clone, Default)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    /// Funding goal in cents.
    pub goal: i64,
    pub auxilliary: bool,
    pub starts: Option<NaiveDateTime>,
    pub ends: Option<NaiveDateTime>,
}

impl NewCampaign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.description, self.goal)
    }
}

/// Partial campaign update; `None` leaves the field untouched.
///
/// `starts`/`ends` use a nested option so a bound can be cleared with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct CampaignUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal: Option<i64>,
    pub amount: Option<i64>,
    pub auxilliary: Option<bool>,
    pub starts: Option<Option<NaiveDateTime>>,
    pub ends: Option<Option<NaiveDateTime>>,
}

pub(crate) fn validate_fields(
    title: &str,
    description: &str,
    goal: i64,
) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if goal < 0 {
        return Err(ValidationError::NegativeGoal(goal));
    }
    Ok(())
}

/// Whether a campaign with the given bounds is running at `now`: `starts <= now < ends`,
/// with an absent bound leaving that side open.
pub fn is_current(
    starts: Option<NaiveDateTime>,
    ends: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> bool {
    starts.is_none_or(|starts| starts <= now) && ends.is_none_or(|ends| now < ends)
}
