//! Alert Lifecycle Manager
//!
//! Sole writer of alert state. Every mutation is written through the injected
//! store before the in-memory view is updated, so a store failure never
//! leaves the two out of sync.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::logic::recommend::types::Recommendation;
use crate::logic::store::{ObjectStore, StoreError};

use super::types::{Alert, AlertStatus, ManagerAction};

#[derive(Debug)]
pub enum AlertError {
    NotFound(String),
    /// Requested transition would regress or reopen a terminal alert
    InvalidTransition {
        id: String,
        from: AlertStatus,
        to: AlertStatus,
    },
    Store(StoreError),
}

impl std::fmt::Display for AlertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertError::NotFound(id) => write!(f, "alert not found: {}", id),
            AlertError::InvalidTransition { id, from, to } => write!(
                f,
                "invalid transition for alert {}: {} -> {}",
                id,
                from.as_str(),
                to.as_str()
            ),
            AlertError::Store(e) => write!(f, "alert store error: {}", e),
        }
    }
}

impl std::error::Error for AlertError {}

impl From<StoreError> for AlertError {
    fn from(e: StoreError) -> Self {
        AlertError::Store(e)
    }
}

pub struct AlertManager {
    store: Arc<dyn ObjectStore<Alert>>,
    alerts: RwLock<Vec<Alert>>,
}

impl AlertManager {
    /// Build a manager on top of a store, loading whatever the store holds.
    pub fn new(store: Arc<dyn ObjectStore<Alert>>) -> Result<Self, AlertError> {
        let alerts = store.get_all()?;
        Ok(Self {
            store,
            alerts: RwLock::new(alerts),
        })
    }

    /// Alerts sorted newest-first.
    pub fn get_alerts(&self) -> Vec<Alert> {
        let mut alerts = self.alerts.read().clone();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Create alerts for findings not already covered by an existing alert.
    /// Resolved and dismissed alerts still suppress re-creation; a closed
    /// situation is not resurrected by the next analysis run. Returns the
    /// number of alerts created.
    pub fn refresh_from_recommendations(
        &self,
        recommendations: &[Recommendation],
    ) -> Result<usize, AlertError> {
        let mut next = self.alerts.read().clone();
        let mut created = 0;
        for rec in recommendations {
            if next.iter().any(|a| a.covers(rec)) {
                continue;
            }
            next.push(Alert::from_recommendation(rec));
            created += 1;
        }
        if created > 0 {
            self.commit(next)?;
            log::info!("alert refresh created {} new alerts", created);
        }
        Ok(created)
    }

    /// pending -> reviewing. Idempotent when already reviewing.
    pub fn mark_as_reviewing(&self, alert_id: &str) -> Result<Alert, AlertError> {
        self.mutate(alert_id, |alert| {
            match alert.status {
                AlertStatus::Pending => alert.status = AlertStatus::Reviewing,
                AlertStatus::Reviewing => {}
                from => {
                    return Err(AlertError::InvalidTransition {
                        id: alert.id.clone(),
                        from,
                        to: AlertStatus::Reviewing,
                    })
                }
            }
            Ok(())
        })
    }

    /// Take ownership of an open alert. Implies reviewing.
    pub fn assign_to_me(&self, alert_id: &str, manager_id: &str) -> Result<Alert, AlertError> {
        self.mutate(alert_id, |alert| {
            if alert.status.is_terminal() {
                return Err(AlertError::InvalidTransition {
                    id: alert.id.clone(),
                    from: alert.status,
                    to: AlertStatus::Reviewing,
                });
            }
            alert.assigned_to = Some(manager_id.to_string());
            if alert.status == AlertStatus::Pending {
                alert.status = AlertStatus::Reviewing;
            }
            Ok(())
        })
    }

    /// Close out an alert with a disposition. An action of "dismissed" moves
    /// the alert to dismissed, anything else to resolved.
    pub fn submit_manager_action(
        &self,
        alert_id: &str,
        action: &str,
        comments: &str,
        manager_id: &str,
    ) -> Result<Alert, AlertError> {
        let target = if action == "dismissed" {
            AlertStatus::Dismissed
        } else {
            AlertStatus::Resolved
        };
        self.mutate(alert_id, |alert| {
            if alert.status.is_terminal() {
                return Err(AlertError::InvalidTransition {
                    id: alert.id.clone(),
                    from: alert.status,
                    to: target,
                });
            }
            alert.manager_action = Some(ManagerAction {
                action: action.to_string(),
                comments: comments.to_string(),
                timestamp: Utc::now(),
                manager_id: manager_id.to_string(),
            });
            alert.status = target;
            Ok(())
        })
    }

    pub fn clear_all(&self) -> Result<(), AlertError> {
        self.store.clear()?;
        self.alerts.write().clear();
        Ok(())
    }

    fn mutate(
        &self,
        alert_id: &str,
        apply: impl FnOnce(&mut Alert) -> Result<(), AlertError>,
    ) -> Result<Alert, AlertError> {
        let mut next = self.alerts.read().clone();
        let alert = next
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;
        apply(alert)?;
        let updated = alert.clone();
        self.commit(next)?;
        Ok(updated)
    }

    // Store write first; in-memory view only updates on success.
    fn commit(&self, next: Vec<Alert>) -> Result<(), AlertError> {
        self.store.put_all(&next)?;
        *self.alerts.write() = next;
        Ok(())
    }
}
