//! The contract every managed service implements.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ServiceError;

/// A named unit with a start priority and start/stop operations.
///
/// Services are shared as `Arc<dyn Service>` between the orchestrator and
/// everything that looks them up, so `start` and `stop` take `&self`;
/// implementations keep their mutable state behind interior mutability
/// (see [`ServiceState`]).
pub trait Service: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Lower values start first and stop last.
    fn priority(&self) -> i32;

    fn start(&self) -> Result<(), ServiceError>;

    fn stop(&self) -> Result<(), ServiceError>;

    fn is_started(&self) -> bool;

    /// Access to the concrete type, for callers that know what a name holds.
    fn as_any(&self) -> &dyn Any;
}

impl dyn Service {
    pub fn downcast_ref<T: Service + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("started", &self.is_started())
            .finish()
    }
}

/// Compare two shared handles by the address of the value they point to.
pub fn same_instance<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Started flag shared by service implementations.
#[derive(Debug, Default)]
pub struct ServiceState {
    started: AtomicBool,
}

impl ServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call moved the service from stopped to started.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// Returns `true` if this call moved the service from started to stopped.
    pub fn mark_stopped(&self) -> bool {
        self.started.swap(false, Ordering::SeqCst)
    }

    /// Fail with [`ServiceError::NotStarted`] unless the service is running.
    pub fn check(&self, name: &str) -> Result<(), ServiceError> {
        if self.is_started() {
            Ok(())
        } else {
            Err(ServiceError::NotStarted(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sampler {
        state: ServiceState,
    }

    impl Service for Sampler {
        fn name(&self) -> &str {
            "sampler"
        }

        fn priority(&self) -> i32 {
            7
        }

        fn start(&self) -> Result<(), ServiceError> {
            self.state.mark_started();
            Ok(())
        }

        fn stop(&self) -> Result<(), ServiceError> {
            self.state.mark_stopped();
            Ok(())
        }

        fn is_started(&self) -> bool {
            self.state.is_started()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_state_transitions_report_changes() {
        let state = ServiceState::new();
        assert!(!state.is_started());
        assert!(state.mark_started());
        assert!(!state.mark_started());
        assert!(state.is_started());
        assert!(state.mark_stopped());
        assert!(!state.mark_stopped());
    }

    #[test]
    fn test_check_requires_started() {
        let state = ServiceState::new();
        assert_eq!(
            state.check("sampler"),
            Err(ServiceError::NotStarted("sampler".to_string()))
        );
        state.mark_started();
        assert!(state.check("sampler").is_ok());
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let service: Arc<dyn Service> = Arc::new(Sampler {
            state: ServiceState::new(),
        });
        assert!(service.downcast_ref::<Sampler>().is_some());
        assert_eq!(format!("{:?}", service), "Service { name: \"sampler\", priority: 7, started: false }");
    }

    #[test]
    fn test_same_instance() {
        let a: Arc<dyn Service> = Arc::new(Sampler {
            state: ServiceState::new(),
        });
        let b: Arc<dyn Service> = Arc::new(Sampler {
            state: ServiceState::new(),
        });
        assert!(same_instance(&a, &a.clone()));
        assert!(!same_instance(&a, &b));
    }
}
