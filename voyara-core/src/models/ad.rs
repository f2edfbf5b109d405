use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A banner served on a storefront placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub placement: String,
    pub title: String,
    pub image_url: Option<String>,
    pub target_url: String,
    pub is_active: bool,
    pub impressions: i64,
    pub clicks: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdInteraction {
    Impression,
    Click,
}

impl AdInteraction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
        }
    }
}
