//! The service lifecycle orchestrator.
//!
//! [`Orchestrator`] owns the phase state machine, the registered providers
//! and expansions, the built services and the per-service init hooks. A start
//! cycle runs Stopped → Registering → Building → Initializing → Running; a
//! stop cycle runs Running → Stopping → Stopped.
//!
//! Builders, hooks, expansions and service start/stop run with no internal
//! lock held, so they may call back into the orchestrator. A failing or
//! panicking builder, hook or service is logged, published on the event bus
//! and skipped; only phase violations and expansion failures are returned.

use chrono::Utc;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

use events::{Event, EventBus, FailureStage};
use servicehost_core::Phase;

use crate::config::HostConfig;
use crate::core_provider::CoreServiceProvider;
use crate::error::{OrchestratorError, Result};
use crate::expansion::{Expansion, ExpansionList};
use crate::hooks::HookRegistry;
use crate::provider::{
    run_lifecycle_hook, BuilderBinding, LifecycleHook, ProviderEntry, ProviderTable,
    ServiceProvider,
};
use crate::registry::ServiceRegistry;
use crate::service::Service;
use crate::state_machine::PhaseStateMachine;

pub struct Orchestrator {
    phase: Mutex<Phase>,
    providers: RwLock<ProviderTable>,
    services: RwLock<ServiceRegistry>,
    hooks: Mutex<HookRegistry>,
    expansions: Mutex<ExpansionList>,
    core_provider: Arc<dyn ServiceProvider>,
    event_bus: EventBus,
    config: HostConfig,
}

impl Orchestrator {
    /// Create a stopped orchestrator with the standard core provider.
    pub fn new(config: HostConfig) -> Self {
        let core_provider: Arc<dyn ServiceProvider> =
            Arc::new(CoreServiceProvider::new(config.settings.clone()));
        Self::with_core_provider(config, core_provider)
    }

    /// Create a stopped orchestrator that installs `core_provider` on every
    /// start instead of the standard one.
    pub fn with_core_provider(config: HostConfig, core_provider: Arc<dyn ServiceProvider>) -> Self {
        Self {
            phase: Mutex::new(Phase::Stopped),
            providers: RwLock::new(ProviderTable::default()),
            services: RwLock::new(ServiceRegistry::new()),
            hooks: Mutex::new(HookRegistry::default()),
            expansions: Mutex::new(ExpansionList::default()),
            core_provider,
            event_bus: EventBus::with_capacity(config.events.capacity),
            config,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.phase)
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Run a full start cycle.
    ///
    /// Fails with `IllegalLifecycleState` unless stopped, and with
    /// `ExpansionFailure` if an expansion fails; in the latter case the
    /// orchestrator is back in `Stopped` when this returns.
    pub fn start(&self) -> Result<()> {
        self.enter(Phase::Registering, "start")?;
        let _guard = UnwindGuard(self);
        info!(
            at = %Utc::now().to_rfc2822(),
            "Starting service host initialization"
        );

        write(&self.services).clear();
        lock(&self.hooks).clear();
        self.register_service_provider(Arc::clone(&self.core_provider));

        if let Err(e) = self.init_expansions() {
            error!(error = %e, "Aborting service host initialization");
            self.abort()?;
            return Err(e);
        }
        self.collect_registrations();

        self.advance()?;
        for entry in self.providers_in_order() {
            self.discover(&entry);
        }
        debug!(
            hooks = lock(&self.hooks).len(),
            pending = read(&self.services).pending().len(),
            "Finished building services"
        );

        self.advance()?;
        self.run_lifecycle_hooks(LifecycleHook::PreInit);
        let started = self.start_services();
        self.run_lifecycle_hooks(LifecycleHook::PostInit);
        self.warn_unbuilt();

        self.advance()?;
        info!(services = started, "Service host initialization complete");
        Ok(())
    }

    /// Run a full stop cycle, stopping services in reverse start order.
    ///
    /// The orchestrator leaves `Running` before the pre-stop hooks run, so
    /// of two racing calls only one runs them.
    pub fn stop(&self) -> Result<()> {
        self.enter(Phase::Stopping, "stop")?;
        let _guard = UnwindGuard(self);
        info!("Starting service host shutdown");
        self.run_lifecycle_hooks(LifecycleHook::PreStop);

        let order = read(&self.services).stop_order();
        for service in order {
            let name = service.name().to_string();
            match isolate(|| service.stop()) {
                Ok(()) => {
                    debug!(service = %name, "Stopped service");
                    self.event_bus.emit(Event::ServiceStopped { name: name.clone() });
                }
                Err(reason) => {
                    self.report_service_failure(&name, FailureStage::Stop, reason);
                }
            }
            write(&self.services).remove_to_pending(&name);
        }
        write(&self.services).clear_services();

        self.advance()?;
        info!("Service host shutdown complete");
        Ok(())
    }

    /// Add a provider. Legal in any phase; returns `false` if this instance
    /// was already registered.
    pub fn register_service_provider(&self, provider: Arc<dyn ServiceProvider>) -> bool {
        let name = provider.name().to_string();
        let category = provider.category();
        let added = write(&self.providers).register(provider);
        if added {
            debug!(provider = %name, category = %category, "Registered service provider");
        }
        added
    }

    pub fn provider_count(&self) -> usize {
        read(&self.providers).len()
    }

    /// Mark `name` as expected so a builder for it may run. Only legal while
    /// registering.
    pub fn register_service(&self, name: &str) -> Result<()> {
        let phase = self.phase();
        if phase != Phase::Registering {
            return Err(OrchestratorError::illegal_state("register a service", phase));
        }
        if write(&self.services).mark_pending(name) {
            debug!(service = %name, "Registered expected service");
        }
        Ok(())
    }

    /// Add an expansion. Legal in any phase; it first runs on the next start.
    pub fn register_expansion(&self, expansion: Arc<dyn Expansion>) -> bool {
        let name = expansion.name().to_string();
        let added = lock(&self.expansions).register(expansion);
        if added {
            debug!(expansion = %name, "Registered expansion");
        }
        added
    }

    /// Whether `name` is built and started.
    pub fn has_service(&self, name: &str) -> bool {
        self.get_service(name).is_some()
    }

    /// The service registered as `name`, if it is built and started.
    pub fn get_service(&self, name: &str) -> Option<Arc<dyn Service>> {
        let service = read(&self.services).get(name).cloned()?;
        service.is_started().then_some(service)
    }

    /// Run `f` against the started service `name` as its concrete type.
    pub fn with_service<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Service + 'static,
    {
        let service = self.get_service(name)?;
        service.downcast_ref::<T>().map(f)
    }

    /// Stop one running service outside a stop cycle.
    ///
    /// The service is removed from the registry and its name marked pending
    /// before `stop` is called; a stop error is still returned afterwards.
    pub fn stop_service(&self, service: &Arc<dyn Service>) -> Result<()> {
        let name = service.name().to_string();
        if !write(&self.services).remove_instance(service) {
            return Err(OrchestratorError::ServiceNotRegistered(name));
        }

        match isolate(|| service.stop()) {
            Ok(()) => {
                info!(service = %name, "Stopped service");
                self.event_bus.emit(Event::ServiceStopped { name });
                Ok(())
            }
            Err(reason) => Err(self.report_service_failure(&name, FailureStage::Stop, reason)),
        }
    }

    /// Expected services that are not built, in the order they became pending.
    pub fn pending_services(&self) -> Vec<String> {
        read(&self.services).pending().to_vec()
    }

    /// Names of started services in start order.
    pub fn service_names(&self) -> Vec<String> {
        let order = read(&self.services).start_order();
        order
            .into_iter()
            .filter(|service| service.is_started())
            .map(|service| service.name().to_string())
            .collect()
    }

    /// Leave the current phase for `to`, failing with `IllegalLifecycleState`
    /// when that edge is not allowed from here.
    fn enter(&self, to: Phase, operation: &'static str) -> Result<()> {
        let phase = lock(&self.phase);
        if !PhaseStateMachine::can_transition(&phase, &to) {
            return Err(OrchestratorError::illegal_state(operation, *phase));
        }
        self.transition(phase, to)
    }

    fn advance(&self) -> Result<()> {
        let phase = lock(&self.phase);
        let to = PhaseStateMachine::next_phase(&phase);
        self.transition(phase, to)
    }

    fn abort(&self) -> Result<()> {
        let phase = lock(&self.phase);
        self.transition(phase, Phase::Stopped)
    }

    fn transition(&self, mut phase: MutexGuard<'_, Phase>, to: Phase) -> Result<()> {
        PhaseStateMachine::validate_transition(&phase, &to)?;
        let from = std::mem::replace(&mut *phase, to);
        drop(phase);

        self.announce_phase(from, to);
        Ok(())
    }

    fn announce_phase(&self, from: Phase, to: Phase) {
        debug!(from = %from, to = %to, "Phase changed");
        self.event_bus.emit(Event::PhaseChanged { from, to });
    }

    /// Put everything back to `Stopped` after a cycle unwound past the
    /// per-callback isolation. Started services are not stopped.
    fn recover_from_unwind(&self) {
        lock(&self.hooks).clear();
        write(&self.services).clear_services();
        let from = std::mem::replace(&mut *lock(&self.phase), Phase::Stopped);
        error!(phase = %from, "Lifecycle cycle panicked, forcing the orchestrator to stopped");
        self.announce_phase(from, Phase::Stopped);
    }

    fn providers_in_order(&self) -> Vec<ProviderEntry> {
        read(&self.providers).in_category_order()
    }

    fn init_expansions(&self) -> Result<()> {
        let expansions = lock(&self.expansions).snapshot();
        for expansion in expansions {
            debug!(expansion = %expansion.name(), "Initializing expansion");
            isolate(|| expansion.init(self)).map_err(|reason| {
                OrchestratorError::ExpansionFailure {
                    expansion: expansion.name().to_string(),
                    reason,
                }
            })?;
        }
        Ok(())
    }

    fn collect_registrations(&self) {
        for entry in self.providers_in_order() {
            if let Err(reason) = isolate(|| entry.provider.register_new_services(self)) {
                self.report_hook_failure(entry.provider.name(), "register_new_services", &reason);
            }
        }
    }

    fn discover(&self, entry: &ProviderEntry) {
        let provider = entry.provider.name();
        let bindings = match catch_panic(|| entry.provider.bindings()) {
            Ok(bindings) => bindings,
            Err(reason) => {
                self.report_hook_failure(provider, "bindings", &reason);
                return;
            }
        };
        let (builders, hooks) = bindings.into_parts();

        let mut built = 0usize;
        for binding in builders {
            let target = binding.target();
            if !read(&self.services).accepts_builder_for(target) {
                warn!(
                    provider = %provider,
                    service = %target,
                    "Ignoring builder for a service that was never registered"
                );
                continue;
            }

            match build_service(provider, &binding) {
                Ok(service) => {
                    let replaced = write(&self.services).insert(target, service);
                    debug!(
                        provider = %provider,
                        service = %target,
                        replaced = replaced.is_some(),
                        "Built service"
                    );
                    self.event_bus.emit(Event::ServiceBuilt {
                        name: target.to_string(),
                        provider: provider.to_string(),
                    });
                    built += 1;
                }
                Err(e) => {
                    error!(error = %e, "Service builder failed");
                    self.event_bus.emit(Event::ServiceFailed {
                        name: target.to_string(),
                        stage: FailureStage::Build,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let hook_count = hooks.len();
        {
            let mut registry = lock(&self.hooks);
            for hook in hooks {
                registry.add(provider, hook);
            }
        }

        debug!(
            provider = %provider,
            category = %entry.category,
            built,
            hooks = hook_count,
            "Discovered provider bindings"
        );
    }

    fn run_lifecycle_hooks(&self, hook: LifecycleHook) {
        for entry in self.providers_in_order() {
            if let Err(reason) = isolate(|| run_lifecycle_hook(entry.provider.as_ref(), hook)) {
                self.report_hook_failure(entry.provider.name(), hook.as_str(), &reason);
            }
        }
    }

    /// Start services in priority order, firing each one's init hooks right
    /// after it starts. Returns the number started.
    fn start_services(&self) -> usize {
        let order = read(&self.services).start_order();
        let mut started = 0;

        for service in order {
            let name = service.name().to_string();
            let priority = service.priority();

            if let Err(reason) = isolate(|| service.start()) {
                write(&self.services).remove_instance(&service);
                self.report_service_failure(&name, FailureStage::Start, reason);
                continue;
            }

            started += 1;
            debug!(service = %name, priority, "Started service");
            self.event_bus.emit(Event::ServiceStarted {
                name: name.clone(),
                priority,
            });

            let hooks = lock(&self.hooks).take(&name);
            for hook in hooks {
                if let Err(reason) = isolate(|| hook.binding.invoke(&service)) {
                    self.report_hook_failure(&hook.provider, &name, &reason);
                }
            }
        }

        started
    }

    fn warn_unbuilt(&self) {
        let pending = self.pending_services();
        if !pending.is_empty() {
            warn!(
                services = %pending.join(" "),
                "Finished initialization with unbuilt services"
            );
            self.event_bus
                .emit(Event::UnbuiltServices { names: pending });
        }
    }

    fn report_hook_failure(&self, provider: &str, target: &str, reason: &str) {
        let err = OrchestratorError::hook_failed(provider, target, reason);
        error!(error = %err, "Hook failed");
        self.event_bus.emit(Event::HookFailed {
            provider: provider.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Log and publish a start or stop failure, returning the error.
    fn report_service_failure(
        &self,
        name: &str,
        stage: FailureStage,
        reason: String,
    ) -> OrchestratorError {
        let err = match stage {
            FailureStage::Start => OrchestratorError::ServiceStartFailure {
                service: name.to_string(),
                reason: reason.clone(),
            },
            _ => OrchestratorError::ServiceStopFailure {
                service: name.to_string(),
                reason: reason.clone(),
            },
        };
        error!(error = %err, stage = %stage, "Service failed");
        self.event_bus.emit(Event::ServiceFailed {
            name: name.to_string(),
            stage,
            reason,
        });
        err
    }
}

/// Resets the orchestrator to `Stopped` if a cycle unwinds.
struct UnwindGuard<'a>(&'a Orchestrator);

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.recover_from_unwind();
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("phase", &self.phase())
            .field("providers", &self.provider_count())
            .field("services", &read(&self.services).len())
            .field("pending", &self.pending_services())
            .finish()
    }
}

fn build_service(provider: &str, binding: &BuilderBinding) -> Result<Arc<dyn Service>> {
    let service = isolate(|| binding.build())
        .map_err(|reason| OrchestratorError::builder_failed(provider, binding.target(), reason))?;

    if service.name() != binding.target() {
        return Err(OrchestratorError::builder_failed(
            provider,
            binding.target(),
            format!("builder returned a service named {}", service.name()),
        ));
    }
    Ok(service)
}

/// Run a provider or service callback, turning a panic into a failure reason.
fn catch_panic<T>(callback: impl FnOnce() -> T) -> std::result::Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(callback))
        .map_err(|payload| format!("panicked: {}", panic_message(&*payload)))
}

fn isolate<T, E: fmt::Display>(
    callback: impl FnOnce() -> std::result::Result<T, E>,
) -> std::result::Result<T, String> {
    catch_panic(callback)?.map_err(|e| e.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
