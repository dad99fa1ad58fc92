use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

use crate::features::taxonomy::TaxonomyItem;

/// Product status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "product_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Draft,
    PendingApproval,
    Approved,
    Reject,
}

impl ProductStatus {
    /// Whether a caller may move a product from `self` to `to`
    ///
    /// Owners submit and withdraw; admins decide. A rejected product goes back to draft.
    pub fn can_transition(self, to: ProductStatus, is_owner: bool, is_admin: bool) -> bool {
        use ProductStatus::*;
        match (self, to) {
            (Draft, PendingApproval) => is_owner || is_admin,
            (PendingApproval, Draft) => is_owner,
            (PendingApproval, Approved | Reject) => is_admin,
            (Approved, Reject) => is_admin,
            (Reject, Draft) => is_owner,
            _ => false,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Draft => write!(f, "DRAFT"),
            ProductStatus::PendingApproval => write!(f, "PENDING_APPROVAL"),
            ProductStatus::Approved => write!(f, "APPROVED"),
            ProductStatus::Reject => write!(f, "REJECT"),
        }
    }
}

/// Database model for products
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub platform_id: Option<i64>,
    pub render_id: Option<i64>,
    pub user_id: String,
    pub public: bool,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PRODUCT_COLUMNS: &str =
    "id, name, category_id, platform_id, render_id, user_id, public, status, created_at, updated_at";

/// Values for a new `products` row
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category_id: i64,
    pub platform_id: Option<i64>,
    pub render_id: Option<i64>,
    pub user_id: String,
    pub public: bool,
    pub status: ProductStatus,
}

/// A product read back with its association sets
#[derive(Debug, Clone)]
pub struct ProductWithRelations {
    pub product: Product,
    pub colors: Vec<TaxonomyItem>,
    pub materials: Vec<TaxonomyItem>,
    pub tags: Vec<TaxonomyItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProductStatus::*;

    const ALL: [ProductStatus; 4] = [Draft, PendingApproval, Approved, Reject];

    #[test]
    fn test_owner_transitions() {
        assert!(Draft.can_transition(PendingApproval, true, false));
        assert!(PendingApproval.can_transition(Draft, true, false));
        assert!(Reject.can_transition(Draft, true, false));
        assert!(!PendingApproval.can_transition(Approved, true, false));
        assert!(!Approved.can_transition(Draft, true, false));
    }

    #[test]
    fn test_admin_transitions() {
        assert!(Draft.can_transition(PendingApproval, false, true));
        assert!(PendingApproval.can_transition(Approved, false, true));
        assert!(PendingApproval.can_transition(Reject, false, true));
        assert!(Approved.can_transition(Reject, false, true));
        assert!(!Reject.can_transition(Draft, false, true));
    }

    #[test]
    fn test_strangers_cannot_transition() {
        for from in ALL {
            for to in ALL {
                assert!(!from.can_transition(to, false, false));
            }
        }
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in ALL {
            assert!(!status.can_transition(status, true, true));
        }
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(PendingApproval).unwrap(),
            "PENDING_APPROVAL"
        );
        assert_eq!(PendingApproval.to_string(), "PENDING_APPROVAL");
    }
}
