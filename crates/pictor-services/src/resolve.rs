//! Strategy resolution.
//!
//! Precedence: explicit selector, then the tenant's default assignment, then a
//! one-time bootstrap from the global default strategy. A tenant with no
//! usable assignment gets `NO_STORAGE_AVAILABLE`.

use std::sync::Arc;

use pictor_core::{AppError, StorageAssignment, StorageStrategy};
use uuid::Uuid;

use crate::ports::{AssignmentStore, StrategyStore};
use crate::quota::default_quota_for;

/// A strategy plus the assignment that authorizes the tenant to use it.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub strategy: StorageStrategy,
    pub assignment: StorageAssignment,
}

pub struct StrategyResolver {
    strategies: Arc<dyn StrategyStore>,
    assignments: Arc<dyn AssignmentStore>,
}

impl StrategyResolver {
    pub fn new(
        strategies: Arc<dyn StrategyStore>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> Self {
        Self {
            strategies,
            assignments,
        }
    }

    /// Resolve the storage target for a tenant operation.
    pub async fn resolve(
        &self,
        tenant_id: Uuid,
        selector: Option<Uuid>,
    ) -> Result<ResolvedTarget, AppError> {
        match selector {
            Some(strategy_id) => self.resolve_explicit(tenant_id, strategy_id).await,
            None => self.resolve_default(tenant_id).await,
        }
    }

    /// An invalid selector never falls back to another backend: unknown,
    /// inactive, and unassigned strategies all fail the same way.
    async fn resolve_explicit(
        &self,
        tenant_id: Uuid,
        strategy_id: Uuid,
    ) -> Result<ResolvedTarget, AppError> {
        let strategy = self
            .strategies
            .get(strategy_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(AppError::NoStorageAvailable)?;

        let assignment = self
            .assignments
            .find(tenant_id, strategy_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or(AppError::NoStorageAvailable)?;

        Ok(ResolvedTarget {
            strategy,
            assignment,
        })
    }

    async fn resolve_default(&self, tenant_id: Uuid) -> Result<ResolvedTarget, AppError> {
        if let Some(assignment) = self
            .assignments
            .find_default(tenant_id)
            .await?
            .filter(|a| a.is_active)
        {
            let strategy = self
                .strategies
                .get(assignment.strategy_id)
                .await?
                .filter(|s| s.is_active)
                .ok_or(AppError::NoStorageAvailable)?;
            return Ok(ResolvedTarget {
                strategy,
                assignment,
            });
        }

        // First contact: seed the tenant from the global default strategy, but
        // never silently re-default a tenant whose grants were all revoked.
        if self.assignments.list_for_tenant(tenant_id).await?.is_empty() {
            if let Some(strategy) = self.strategies.get_default().await?.filter(|s| s.is_active) {
                let quota = default_quota_for(strategy.kind);
                let assignment = self
                    .assignments
                    .grant(tenant_id, strategy.id, Some(quota), true)
                    .await?;
                tracing::info!(
                    tenant_id = %tenant_id,
                    strategy = %strategy.name,
                    quota_bytes = quota,
                    "Bootstrapped tenant onto default strategy"
                );
                return Ok(ResolvedTarget {
                    strategy,
                    assignment,
                });
            }
        }

        Err(AppError::NoStorageAvailable)
    }
}
