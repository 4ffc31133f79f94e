//! Shared application state handed to every route handler and background
//! scan loop.

use std::sync::Arc;

use basecamp_budget::BudgetEngine;
use basecamp_config::Config;
use basecamp_events::EventBus;
use basecamp_idle::{FixedActivityProbe, IdleEngine};
use basecamp_identity::ProjectService;
use basecamp_lifecycle::LifecycleEngine;
use basecamp_pricing::PricingEngine;
use basecamp_provider::CloudProvider;
use basecamp_storage::{BudgetPeriod, StateStore};
use basecamp_template::TemplateResolver;
use chrono::{DateTime, Datelike, Timelike, Utc};
use tokio_util::sync::CancellationToken;

/// Everything a route handler or scan loop needs. Cheap to clone: every
/// field is an `Arc` (or, for [`LifecycleEngine`], a struct of `Arc`s), so
/// axum hands a fresh clone to each request without contention.
#[derive(Clone)]
pub struct AppState {
    /// The daemon's resolved configuration.
    pub config: Config,
    /// The persistent state store.
    pub store: Arc<dyn StateStore>,
    /// The cloud provider abstraction.
    pub provider: Arc<dyn CloudProvider>,
    /// The template resolver.
    pub templates: Arc<TemplateResolver>,
    /// The pricing/cost accumulator engine.
    pub pricing: Arc<PricingEngine>,
    /// The in-process event bus.
    pub events: Arc<EventBus>,
    /// The workspace lifecycle engine — the facade every mutating
    /// route dispatches through.
    pub lifecycle: LifecycleEngine,
    /// The idle/hibernation policy engine.
    ///
    /// No cloud provider in this stack reports CPU, network, or
    /// interactive-session activity (see [`basecamp_provider::types::VmDescription`]),
    /// so the daemon wires [`FixedActivityProbe::always_active`] in
    /// production: the idle engine still debounces and resolves policy
    /// correctly, it simply never observes a workspace as idle until a
    /// real telemetry-backed probe replaces this one.
    pub idle: Arc<IdleEngine<FixedActivityProbe>>,
    /// The budget evaluation engine.
    pub budget: Arc<BudgetEngine>,
    /// The project/identity service.
    pub projects: Arc<ProjectService>,
    /// Fires when `/shutdown` is called or a termination signal arrives;
    /// the background scan loops and the axum server both select on this
    /// to shut down gracefully.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire a fresh instance of every component over the given store,
    /// provider, and template resolver.
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn StateStore>,
        provider: Arc<dyn CloudProvider>,
        templates: Arc<TemplateResolver>,
        pricing: Arc<PricingEngine>,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let lifecycle = LifecycleEngine::new(
            Arc::clone(&store),
            Arc::clone(&provider),
            Arc::clone(&templates),
            Arc::clone(&pricing),
            Arc::clone(&events),
        );
        let projects = Arc::new(ProjectService::new(Arc::clone(&store)));

        Self {
            config,
            store,
            provider,
            templates,
            pricing,
            events,
            lifecycle,
            idle: Arc::new(IdleEngine::new(FixedActivityProbe::always_active())),
            budget: Arc::new(BudgetEngine::new()),
            projects,
            shutdown: CancellationToken::new(),
        }
    }
}

/// How far into its current period a budget is, for projecting a monthly
/// burn rate. None of our budget periods carry a start timestamp of
/// their own, so this measures against the nearest natural calendar
/// boundary; a `Project`-scoped budget has no such boundary at all and
/// is treated as a flat 30-day window throughout.
pub(crate) fn days_elapsed_in_period(period: BudgetPeriod, now: DateTime<Utc>) -> f64 {
    match period {
        BudgetPeriod::Daily => f64::from(now.hour()) / 24.0 + f64::from(now.minute()) / 1440.0,
        BudgetPeriod::Weekly => {
            f64::from(now.weekday().num_days_from_monday()) + f64::from(now.hour()) / 24.0
        },
        BudgetPeriod::Monthly => f64::from(now.day() - 1) + f64::from(now.hour()) / 24.0,
        BudgetPeriod::Project => 30.0,
    }
}
