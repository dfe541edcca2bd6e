//! Runs registered handlers through the lifecycle stages.
//!
//! Stages run in a fixed order (`validate`, then `processChanges`). Within a
//! stage handlers run one at a time in ascending priority, registration
//! order breaking ties. Each handler sees the context as folded from every
//! handler before it; the first error aborts the run.

use crate::context::AssetContext;
use crate::error::{DeployError, DeployResult};
use crate::handler::{ResourceHandler, RunState};
use crate::handlers::default_handlers;
use crate::report::RunSummary;
use crate::validation::check_schema;
use tenantsync_api::Gateway;
use tenantsync_types::{AssetCollections, Policy, Stage};
use tracing::{debug, error, info};

/// Owns the handler table and the run's gateway and policy.
pub struct Orchestrator {
    gateway: Gateway,
    policy: Policy,
    handlers: Vec<Box<dyn ResourceHandler>>,
}

impl Orchestrator {
    /// An orchestrator with no handlers.
    pub fn new(gateway: Gateway, policy: Policy) -> Self {
        Self {
            gateway,
            policy,
            handlers: Vec::new(),
        }
    }

    /// An orchestrator with every built-in handler registered.
    pub fn with_default_handlers(gateway: Gateway, policy: Policy) -> Self {
        Self {
            handlers: default_handlers(),
            ..Self::new(gateway, policy)
        }
    }

    /// Adds a handler. Each resource type may be registered once.
    pub fn register(&mut self, handler: Box<dyn ResourceHandler>) -> DeployResult<()> {
        let resource_type = &handler.descriptor().resource_type;
        if self.handler(resource_type).is_some() {
            return Err(DeployError::Config(format!(
                "a handler for {resource_type} is already registered"
            )));
        }
        self.handlers.push(handler);
        Ok(())
    }

    pub fn handler(&self, resource_type: &str) -> Option<&dyn ResourceHandler> {
        self.handlers
            .iter()
            .find(|h| h.descriptor().resource_type == resource_type)
            .map(Box::as_ref)
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Handlers in the order they run for `stage`.
    pub fn ordered(&self, stage: Stage) -> Vec<&dyn ResourceHandler> {
        let mut ordered: Vec<&dyn ResourceHandler> = self.handlers.iter().map(Box::as_ref).collect();
        ordered.sort_by_key(|h| h.descriptor().priority.for_stage(stage));
        ordered
    }

    /// Checks the desired configuration against every handler's schema.
    pub fn check_schema(&self, assets: &AssetCollections) -> DeployResult<()> {
        check_schema(assets, &self.handlers)
    }

    /// Runs one stage over every handler and returns the folded context.
    pub async fn run_stage(
        &self,
        stage: Stage,
        ctx: AssetContext,
        run: &RunState,
    ) -> DeployResult<AssetContext> {
        let scope = run.scope(&self.gateway, &self.policy);
        info!(%stage, handlers = self.handlers.len(), "Running stage");

        let mut ctx = ctx;
        for handler in self.ordered(stage) {
            let resource_type = handler.descriptor().resource_type.as_str();
            debug!(%stage, resource_type, "Running handler");

            let outcome = match stage {
                Stage::Validate => handler.validate(&scope, &ctx).await,
                Stage::ProcessChanges => handler.process_changes(&scope, &ctx).await,
            };
            let delta = outcome.map_err(|e| {
                error!(%stage, resource_type, error = %e, "Stage aborted");
                attach_stage(stage, resource_type, e)
            })?;
            if !delta.is_empty() {
                debug!(resource_type, keys = ?delta.keys().collect::<Vec<_>>(), "Context updated");
            }
            ctx = ctx.fold(delta);
        }
        Ok(ctx)
    }

    /// Schema check, then every stage in order. Nothing remote is read
    /// before the schema check passes. Each call starts from fresh remote
    /// state, so an orchestrator can deploy repeatedly.
    pub async fn deploy(&self, assets: AssetCollections) -> DeployResult<RunSummary> {
        self.check_schema(&assets)?;

        let run = RunState::new();
        let mut ctx = AssetContext::new(assets);
        for stage in Stage::ALL {
            ctx = self.run_stage(stage, ctx, &run).await?;
        }

        let summary = run.report.summary();
        info!(
            actions = summary.actions.len(),
            warnings = summary.warnings.len(),
            "Deploy finished"
        );
        Ok(summary)
    }
}

/// Names the failing handler's type unless the error already does.
fn attach_stage(stage: Stage, resource_type: &str, error: DeployError) -> DeployError {
    if error.resource_type().is_some() {
        return error;
    }
    DeployError::Stage {
        stage,
        resource_type: resource_type.to_string(),
        source: Box::new(error),
    }
}
