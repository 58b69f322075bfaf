//! Package entity: a purchasable unit of paid content access.

use crate::domain::foundation::{Money, PackageId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};

/// A purchasable content package.
///
/// Packages are the unit of sale: a fixed price buys a fixed number of
/// days of access. Inactive packages stay in the catalog for historical
/// transactions but cannot be purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique identifier for this package.
    pub id: PackageId,

    /// Display name shown at checkout.
    pub name: String,

    /// Longer marketing description.
    pub description: String,

    /// Price in whole rupiah.
    pub price: Money,

    /// Access duration granted on successful payment.
    pub duration_days: u32,

    /// Whether the package can currently be purchased.
    pub is_active: bool,

    /// When the package was created.
    pub created_at: Timestamp,
}

impl Package {
    /// Creates a new active package.
    ///
    /// # Errors
    ///
    /// Returns error if the name is empty or duration is zero.
    pub fn new(
        id: PackageId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
        duration_days: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if duration_days == 0 {
            return Err(ValidationError::invalid_value(
                "duration_days",
                "must be at least one day",
            ));
        }
        Ok(Self {
            id,
            name,
            description: description.into(),
            price,
            duration_days,
            is_active: true,
            created_at: Timestamp::now(),
        })
    }

    /// Returns true if the package can be purchased right now.
    pub fn is_purchasable(&self) -> bool {
        self.is_active
    }

    /// Removes the package from sale without deleting it.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
