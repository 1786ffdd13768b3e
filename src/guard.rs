//! Owner scoping for per-user records.
//!
//! Every category, purchase, budget and dashboard query takes an [`Owner`],
//! and the only way to get one is from a verified [`AuthContext`]. Stores
//! add `user_id = owner` to every statement, so a row owned by someone else
//! reads exactly like a row that does not exist.

use uuid::Uuid;

use crate::auth::extractors::AuthContext;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(Uuid);

impl Owner {
    pub fn id(&self) -> Uuid {
        self.0
    }

    /// Test-only escape hatch for exercising stores without a token.
    #[cfg(test)]
    pub(crate) fn for_tests(id: Uuid) -> Self {
        Owner(id)
    }
}

impl From<&AuthContext> for Owner {
    fn from(ctx: &AuthContext) -> Self {
        Owner(ctx.user_id)
    }
}

/// Turns an owner-scoped lookup miss into `NotFound`.
pub fn found<T>(entity: &'static str, row: Option<T>) -> Result<T, AppError> {
    row.ok_or(AppError::NotFound(entity))
}
