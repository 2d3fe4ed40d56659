//! Fairway platform assembly.
//!
//! Wires the ledger, analytics engines, and tenant governance into one
//! service facade and owns the cross-cutting concerns none of the engines
//! should know about: feature toggles, the metrics cache, collaborator
//! time budgets, audit, and batch scheduling.
//!
//! ```text
//!                      +--------------------+
//!                      |  FairwayPlatform   |
//!                      +--------------------+
//!                        |        |       |
//!            +-----------+        |       +------------+
//!            v                    v                    v
//!     +-------------+    +---------------+    +----------------+
//!     | EventStore  |    |  analytics    |    | TenantRegistry |
//!     | + signals   |    |  engines      |    | + governor     |
//!     +-------------+    | metrics/fcst/ |    | + health       |
//!                        | anomaly/growth|    | + migrations   |
//!                        | /insight      |    +----------------+
//!                        +---------------+
//! ```
//!
//! Every read path flows through the toggle checks here, so a disabled
//! feature short-circuits before any engine runs. Report encoders are the
//! only external collaborators; calls to them are bounded by the configured
//! collaborator timeout and failures come back as upstream errors with the
//! cause preserved.

pub mod audit;
pub mod batch;
pub mod report;

pub use audit::{AuditOutcome, AuditRecord, AuditTrail};
pub use batch::{BatchHandle, BatchJob, BatchOutcome, RunOutcome, TenantRun};
pub use report::{
    EncodeError, EncodedReport, ExportFormat, ReportEncoder, ReportFormat, ReportRequest,
    RevenueReport,
};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fairway_analytics::{
    AnomalyDetector, ForecastEngine, GrowthAnalysis, GrowthAnalyzer, InsightGenerator,
    MetricsAggregator, MetricsCache, RevenueAnomaly, RevenueBreakdown, RevenueForecast,
    RevenueInsight, RevenueMetrics,
};
use fairway_common::{
    DateRange, EventId, PlatformConfig, PlatformError, PlatformResult, RevenuePeriod, TenantId,
};
use fairway_ledger::{EventStore, InMemoryEventStore, LiveRevenue, RevenueEvent, RevenueSignals};
use fairway_tenant::{
    GovernedResource, HealthScorer, InMemoryUsageStore, LimitGovernor, MigrationTracker, Operator,
    OverageReport, ResolvedLimits, SloSample, SuspensionReason, Tenant, TenantHealthScore,
    TenantLimits, TenantMigration, TenantRegistry, TenantTier, TenantUpdate, TenantUsage,
    UsageCounterStore,
};

/// The assembled platform.
///
/// Construction validates the configuration up front; a platform that
/// exists always has coherent policies. All methods take `&self`; shared
/// mutable state lives inside the stores and registries.
pub struct FairwayPlatform {
    config: PlatformConfig,
    store: Arc<dyn EventStore>,
    signals: RevenueSignals,
    aggregator: MetricsAggregator,
    forecaster: ForecastEngine,
    anomaly_detector: AnomalyDetector,
    growth_analyzer: GrowthAnalyzer,
    insight_generator: InsightGenerator,
    cache: MetricsCache,
    registry: Arc<TenantRegistry>,
    usage: Arc<dyn UsageCounterStore>,
    governor: Arc<LimitGovernor>,
    health_scorer: HealthScorer,
    migrations: MigrationTracker,
    audit: AuditTrail,
    encoders: RwLock<HashMap<ReportFormat, Arc<dyn ReportEncoder>>>,
}

impl FairwayPlatform {
    /// Assembles a platform over fresh in-memory stores.
    pub fn new(config: PlatformConfig) -> PlatformResult<Self> {
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new(config.ledger));
        let usage: Arc<dyn UsageCounterStore> = Arc::new(InMemoryUsageStore::new());
        Self::with_stores(config, store, usage)
    }

    /// Assembles a platform over caller-provided stores.
    pub fn with_stores(
        config: PlatformConfig,
        store: Arc<dyn EventStore>,
        usage: Arc<dyn UsageCounterStore>,
    ) -> PlatformResult<Self> {
        config.validate()?;

        let registry = Arc::new(TenantRegistry::new());
        let governor = Arc::new(LimitGovernor::new(
            Arc::clone(&registry),
            Arc::clone(&usage),
            config.hierarchy,
        ));

        let platform = Self {
            signals: RevenueSignals::new(),
            aggregator: MetricsAggregator::new(Arc::clone(&store)),
            forecaster: ForecastEngine::new(Arc::clone(&store), config.forecast),
            anomaly_detector: AnomalyDetector::new(Arc::clone(&store), config.anomaly),
            growth_analyzer: GrowthAnalyzer::new(Arc::clone(&store), config.growth),
            insight_generator: InsightGenerator::new(),
            cache: MetricsCache::default(),
            health_scorer: HealthScorer::new(Arc::clone(&governor), config.health),
            migrations: MigrationTracker::new(),
            audit: AuditTrail::new(config.features.audit_logging),
            encoders: RwLock::new(HashMap::new()),
            registry,
            governor,
            usage,
            store,
            config,
        };
        info!("fairway platform assembled");
        Ok(platform)
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// The audit trail, for inspection and export.
    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    // ---------------------------------------------------------------- ledger

    /// Appends one revenue event to the ledger.
    ///
    /// The live signals only advance after a successful append, so a
    /// rejected event (validation failure, duplicate id) leaves every
    /// derived figure untouched.
    pub async fn record_event(&self, event: RevenueEvent) -> PlatformResult<EventId> {
        let started = Instant::now();
        let event_id = event.id;
        let tenant_id = event.tenant_id;

        let snapshot = self
            .config
            .features
            .realtime_updates
            .then(|| event.clone());
        let result = self.store.append(event).await;
        if result.is_ok() {
            if let Some(applied) = &snapshot {
                self.signals.apply(applied);
            }
        }

        self.audit
            .record("record_event", Some(tenant_id), AuditOutcome::of(&result));
        self.benchmark("record_event", started);
        result.map(|()| event_id)
    }

    /// Events in `range`, ordered by `(occurred_at, id)`.
    ///
    /// The range is checked before the store is touched; a backwards range
    /// never reaches a query.
    pub async fn list_events(
        &self,
        tenant: Option<TenantId>,
        range: &DateRange,
    ) -> PlatformResult<Vec<RevenueEvent>> {
        if !range.is_valid() {
            return Err(PlatformError::InvalidDateRange {
                start: range.start,
                end: range.end,
            });
        }
        self.store.query(tenant, range).await
    }

    /// Point-in-time snapshot of the live revenue signals.
    pub fn live_revenue(&self) -> LiveRevenue {
        self.signals.live()
    }

    /// The signal hub, for `watch` subscriptions.
    pub fn signals(&self) -> &RevenueSignals {
        &self.signals
    }

    // ------------------------------------------------------------- analytics

    /// Metrics for the bucket of `period` containing `as_of`.
    ///
    /// With caching enabled the store generation is read before the
    /// computation; an entry stamped with a stale generation is treated as
    /// a miss, so a concurrent append can waste a cached entry but can
    /// never serve stale figures.
    pub async fn compute_metrics(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueMetrics> {
        let started = Instant::now();
        if !self.config.features.caching {
            let metrics = self.aggregator.compute(period, tenant, as_of).await?;
            self.benchmark("compute_metrics", started);
            return Ok(metrics);
        }

        let bucket = period.bucket_for(as_of);
        let generation = self.store.generation(tenant).await?;
        if let Some(metrics) = self.cache.get(tenant, &bucket, generation) {
            debug!(?tenant, %bucket, "metrics served from cache");
            self.benchmark("compute_metrics", started);
            return Ok(metrics);
        }

        let metrics = self.aggregator.compute(period, tenant, as_of).await?;
        self.cache.insert(tenant, bucket, generation, metrics.clone());
        self.benchmark("compute_metrics", started);
        Ok(metrics)
    }

    /// Revenue sliced by event type and source channel.
    pub async fn compute_breakdown(
        &self,
        period: &RevenuePeriod,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<RevenueBreakdown> {
        self.aggregator.breakdown(period, tenant, as_of).await
    }

    /// Projects monthly net revenue `months_ahead` months forward.
    ///
    /// Returns `Ok(None)` when forecasting is disabled; the caller can
    /// distinguish "switched off" from "failed".
    pub async fn generate_forecast(
        &self,
        tenant: Option<TenantId>,
        months_ahead: u32,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<Option<RevenueForecast>> {
        if !self.config.features.forecasting {
            debug!("forecasting disabled, skipping");
            return Ok(None);
        }
        let started = Instant::now();
        let forecast = self.forecaster.forecast(tenant, months_ahead, as_of).await?;
        self.benchmark("generate_forecast", started);
        Ok(Some(forecast))
    }

    /// Scans the trailing daily window for revenue anomalies.
    ///
    /// Disabled detection yields an empty scan, not an error.
    pub async fn detect_anomalies(
        &self,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<Vec<RevenueAnomaly>> {
        if !self.config.features.anomaly_detection {
            debug!("anomaly detection disabled, skipping");
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let anomalies = self.anomaly_detector.detect(tenant, as_of).await?;
        self.benchmark("detect_anomalies", started);
        Ok(anomalies)
    }

    /// Month-over-month growth picture for the tenant scope.
    pub async fn analyze_growth(
        &self,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<GrowthAnalysis> {
        let started = Instant::now();
        let analysis = self.growth_analyzer.analyze(tenant, as_of).await?;
        self.benchmark("analyze_growth", started);
        Ok(analysis)
    }

    /// Narrative insights derived from current metrics, growth, and
    /// anomalies. Disabled generation yields an empty list.
    pub async fn generate_insights(
        &self,
        tenant: Option<TenantId>,
        as_of: DateTime<Utc>,
    ) -> PlatformResult<Vec<RevenueInsight>> {
        if !self.config.features.insight_generation {
            debug!("insight generation disabled, skipping");
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let metrics = self
            .aggregator
            .compute_or_baseline(&RevenuePeriod::Monthly, tenant, as_of)
            .await?;
        let growth = self.growth_analyzer.analyze(tenant, as_of).await.ok();
        let anomalies = self
            .detect_anomalies(tenant, as_of)
            .await
            .unwrap_or_default();

        let insights = self
            .insight_generator
            .generate(&metrics, growth.as_ref(), &anomalies);
        self.benchmark("generate_insights", started);
        Ok(insights)
    }

    // --------------------------------------------------------------- reports

    /// Assembles a revenue report per the request.
    ///
    /// The metrics foundation must succeed; every other section degrades to
    /// absent when its engine cannot produce it, so a young tenant gets a
    /// thin report rather than an error. Sections whose feature toggle is
    /// off stay absent regardless of the request.
    pub async fn generate_report(&self, request: &ReportRequest) -> PlatformResult<RevenueReport> {
        if request.include_forecast && request.forecast_months == 0 {
            return Err(PlatformError::MalformedRequest(
                "report requested a forecast over zero months".into(),
            ));
        }
        let started = Instant::now();
        let tenant = request.tenant_id;
        let as_of = request.as_of;

        let metrics = self
            .aggregator
            .compute_or_baseline(&request.period, tenant, as_of)
            .await?;

        let breakdown = if request.include_breakdown {
            self.aggregator
                .breakdown(&request.period, tenant, as_of)
                .await
                .ok()
        } else {
            None
        };
        let growth = if request.include_growth {
            self.growth_analyzer.analyze(tenant, as_of).await.ok()
        } else {
            None
        };
        let forecast = if request.include_forecast {
            self.generate_forecast(tenant, request.forecast_months, as_of)
                .await
                .ok()
                .flatten()
        } else {
            None
        };
        let anomalies = if request.include_anomalies {
            self.detect_anomalies(tenant, as_of)
                .await
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        let insights = if request.include_insights && self.config.features.insight_generation {
            self.insight_generator
                .generate(&metrics, growth.as_ref(), &anomalies)
        } else {
            Vec::new()
        };

        self.benchmark("generate_report", started);
        Ok(RevenueReport {
            generated_at: Utc::now(),
            tenant_id: tenant,
            period: Some(request.period),
            metrics: Some(metrics),
            breakdown,
            growth,
            forecast,
            anomalies,
            insights,
            events: None,
        })
    }

    /// Registers an encoder, replacing any previous one for its format.
    pub fn register_encoder(&self, encoder: Arc<dyn ReportEncoder>) {
        let format = encoder.format();
        debug!(%format, "report encoder registered");
        self.encoders.write().insert(format, encoder);
    }

    /// Renders a report through the registered encoder for `format`.
    ///
    /// The encoder runs under the collaborator time budget; an overrun
    /// surfaces as a timeout error naming the budget, and an encoder
    /// failure comes back as an upstream error with the cause attached.
    pub async fn render_report(
        &self,
        report: &RevenueReport,
        format: ReportFormat,
    ) -> PlatformResult<EncodedReport> {
        let encoder = self.encoders.read().get(&format).cloned();
        let Some(encoder) = encoder else {
            return Err(PlatformError::MalformedRequest(format!(
                "no encoder registered for {format}"
            )));
        };

        let operation = format!("encode_{format}");
        let budget = self.config.collaborator_timeout();
        match tokio::time::timeout(budget, encoder.encode(report)).await {
            Ok(Ok(bytes)) => Ok(EncodedReport { format, bytes }),
            Ok(Err(source)) => {
                warn!(%operation, error = %source, "report encoder failed");
                Err(PlatformError::Upstream { operation, source })
            }
            Err(_) => Err(PlatformError::CollaboratorTimeout {
                operation,
                timeout: budget,
            }),
        }
    }

    /// Exports raw ledger events for `range` in the requested format.
    pub async fn export_revenue_data(
        &self,
        tenant: Option<TenantId>,
        range: &DateRange,
        format: ExportFormat,
    ) -> PlatformResult<EncodedReport> {
        let events = self.list_events(tenant, range).await?;
        info!(count = events.len(), ?format, "exporting revenue events");

        let report = RevenueReport {
            generated_at: Utc::now(),
            tenant_id: tenant,
            period: None,
            metrics: None,
            breakdown: None,
            growth: None,
            forecast: None,
            anomalies: Vec::new(),
            insights: Vec::new(),
            events: Some(events),
        };
        self.render_report(&report, ReportFormat::from(format)).await
    }

    // --------------------------------------------------------------- tenants

    pub fn create_tenant(&self, name: &str, tier: TenantTier) -> PlatformResult<Tenant> {
        let result = self.registry.create(name, tier);
        self.audit.record(
            "create_tenant",
            result.as_ref().ok().map(|t| t.id),
            AuditOutcome::of(&result),
        );
        result
    }

    pub fn create_child_tenant(
        &self,
        parent_id: &TenantId,
        name: &str,
        tier: TenantTier,
    ) -> PlatformResult<Tenant> {
        let result = self.registry.create_child(parent_id, name, tier);
        self.audit.record(
            "create_child_tenant",
            result.as_ref().ok().map(|t| t.id),
            AuditOutcome::of(&result),
        );
        result
    }

    pub fn tenant(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        self.registry.get(tenant_id)
    }

    pub fn tenants(&self) -> Vec<Tenant> {
        self.registry.list()
    }

    pub fn tenant_children(&self, parent_id: &TenantId) -> Vec<Tenant> {
        self.registry.children_of(parent_id)
    }

    pub fn update_tenant(
        &self,
        tenant_id: &TenantId,
        update: TenantUpdate,
    ) -> PlatformResult<Tenant> {
        let result = self.registry.update(tenant_id, update);
        self.audit
            .record("update_tenant", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    pub fn activate_tenant(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        let result = self.registry.activate(tenant_id);
        self.audit
            .record("activate_tenant", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    /// Suspends a tenant. A reason is mandatory.
    pub fn suspend_tenant(
        &self,
        tenant_id: &TenantId,
        reason: Option<SuspensionReason>,
    ) -> PlatformResult<Tenant> {
        let result = self.registry.suspend(tenant_id, reason);
        self.audit
            .record("suspend_tenant", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    pub fn resume_tenant(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        let result = self.registry.resume(tenant_id);
        self.audit
            .record("resume_tenant", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    pub fn deactivate_tenant(&self, tenant_id: &TenantId) -> PlatformResult<Tenant> {
        let result = self.registry.deactivate(tenant_id);
        self.audit.record(
            "deactivate_tenant",
            Some(*tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    /// Soft-deletes a tenant. Authorization is checked before existence.
    pub fn delete_tenant(&self, operator: &Operator, tenant_id: &TenantId) -> PlatformResult<()> {
        let result = self.registry.delete(operator, tenant_id);
        self.audit
            .record("delete_tenant", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    // ------------------------------------------------------------ governance

    /// Effective limits under the override / parent-fraction / tier-default
    /// precedence.
    pub fn tenant_limits(&self, tenant_id: &TenantId) -> PlatformResult<ResolvedLimits> {
        self.governor.resolve_limits(tenant_id)
    }

    /// Writes or clears a limits override. Child overrides must fit inside
    /// the parent's remaining allocation.
    pub async fn set_tenant_limits(
        &self,
        tenant_id: &TenantId,
        limits: Option<TenantLimits>,
    ) -> PlatformResult<Tenant> {
        let result = self.governor.set_limits_override(tenant_id, limits).await;
        self.audit.record(
            "set_tenant_limits",
            Some(*tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    /// Adds to a usage counter, returning the new total.
    pub async fn record_usage(
        &self,
        tenant_id: &TenantId,
        resource: GovernedResource,
        amount: u64,
    ) -> PlatformResult<u64> {
        self.registry.get(tenant_id)?;
        let result = self.usage.record(*tenant_id, resource, amount).await;
        self.audit
            .record("record_usage", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    /// Overwrites a usage counter with an externally computed value, e.g.
    /// a storage scan total.
    pub async fn replace_usage(
        &self,
        tenant_id: &TenantId,
        resource: GovernedResource,
        value: u64,
    ) -> PlatformResult<()> {
        self.registry.get(tenant_id)?;
        let result = self.usage.replace(*tenant_id, resource, value).await;
        self.audit
            .record("replace_usage", Some(*tenant_id), AuditOutcome::of(&result));
        result
    }

    pub async fn tenant_usage(&self, tenant_id: &TenantId) -> PlatformResult<TenantUsage> {
        self.registry.get(tenant_id)?;
        Ok(self.usage.usage(*tenant_id).await)
    }

    /// Zeroes every counter at the start of a new billing period.
    pub async fn reset_usage_period(&self, tenant_id: &TenantId) -> PlatformResult<()> {
        self.registry.get(tenant_id)?;
        let result = self.usage.reset_period(*tenant_id).await;
        self.audit.record(
            "reset_usage_period",
            Some(*tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    /// Usage against effective limits across every governed resource.
    pub async fn tenant_overages(&self, tenant_id: &TenantId) -> PlatformResult<OverageReport> {
        self.governor.overage_report(tenant_id).await
    }

    /// Composite health score from the overage picture and an SLO sample.
    pub async fn tenant_health(
        &self,
        tenant_id: &TenantId,
        slo: &SloSample,
    ) -> PlatformResult<TenantHealthScore> {
        let started = Instant::now();
        let score = self.health_scorer.score(tenant_id, slo).await?;
        self.benchmark("tenant_health", started);
        Ok(score)
    }

    // ------------------------------------------------------------ migrations

    /// Registers a pending migration for an existing tenant.
    pub fn begin_migration(
        &self,
        tenant_id: &TenantId,
        description: &str,
        total_items: u64,
    ) -> PlatformResult<TenantMigration> {
        self.registry.get(tenant_id)?;
        let migration = self.migrations.begin(*tenant_id, description, total_items);
        self.audit
            .record("begin_migration", Some(*tenant_id), AuditOutcome::Succeeded);
        Ok(migration)
    }

    pub fn migration(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.migrations.get(id)
    }

    pub fn migrations_for(&self, tenant_id: &TenantId) -> Vec<TenantMigration> {
        self.migrations.for_tenant(tenant_id)
    }

    pub fn start_migration(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        let result = self.migrations.start(id);
        self.audit.record(
            "start_migration",
            result.as_ref().ok().map(|m| m.tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    pub fn record_migration_success(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.migrations.record_success(id)
    }

    pub fn record_migration_failure(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        self.migrations.record_failure(id)
    }

    /// Closes a migration with a status derived from its item tallies.
    pub fn finish_migration(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        let result = self.migrations.finish(id);
        self.audit.record(
            "finish_migration",
            result.as_ref().ok().map(|m| m.tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    pub fn cancel_migration(&self, id: &Uuid) -> PlatformResult<TenantMigration> {
        let result = self.migrations.cancel(id);
        self.audit.record(
            "cancel_migration",
            result.as_ref().ok().map(|m| m.tenant_id),
            AuditOutcome::of(&result),
        );
        result
    }

    // ----------------------------------------------------------------- batch

    /// Runs `job` for each tenant in order, isolating failures.
    ///
    /// One tenant's failure never stops the rest; the cancellation flag is
    /// checked between tenants, and tenants never attempted are counted as
    /// skipped rather than failed.
    pub async fn run_batch(
        &self,
        job: &BatchJob,
        tenants: &[TenantId],
        handle: &BatchHandle,
    ) -> BatchOutcome {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut results = Vec::with_capacity(tenants.len());
        let mut cancelled = false;
        let mut skipped = 0u64;

        for (index, tenant_id) in tenants.iter().enumerate() {
            if handle.is_cancelled() {
                cancelled = true;
                skipped = (tenants.len() - index) as u64;
                break;
            }
            let outcome = match self.run_one(job, *tenant_id).await {
                Ok(()) => RunOutcome::Passed,
                Err(err) => {
                    warn!(
                        tenant_id = %tenant_id,
                        job = job.name(),
                        error = %err,
                        "batch run failed"
                    );
                    RunOutcome::Failed(err.to_string())
                }
            };
            results.push(TenantRun {
                tenant_id: *tenant_id,
                outcome,
            });
        }

        let outcome = BatchOutcome::collect(job, started_at, results, skipped, cancelled);
        info!(
            job = outcome.job,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "batch finished"
        );
        self.benchmark("run_batch", started);
        outcome
    }

    async fn run_one(&self, job: &BatchJob, tenant_id: TenantId) -> PlatformResult<()> {
        match job {
            BatchJob::Forecast {
                months_ahead,
                as_of,
            } => {
                self.generate_forecast(Some(tenant_id), *months_ahead, *as_of)
                    .await?;
            }
            BatchJob::AnomalyScan { as_of } => {
                self.detect_anomalies(Some(tenant_id), *as_of).await?;
            }
            BatchJob::Report { period, as_of } => {
                self.generate_report(&ReportRequest::full(Some(tenant_id), *period, *as_of))
                    .await?;
            }
        }
        Ok(())
    }

    fn benchmark(&self, operation: &'static str, started: Instant) {
        if self.config.features.benchmarking {
            debug!(
                operation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "operation timed"
            );
        }
    }
}
