//! Resource plans
//!
//! A [`ResourcePlan`] is a small DAG of [`ResourceSpec`] nodes for one
//! execution context. Edges point from a prerequisite to the node that
//! needs it; [`ResourcePlan::ordered`] walks them into a creation order.
//!
//! [`plan`] builds the graph from [`Facts`]:
//!
//! ```text
//! Topic ──> IamRole ──> RolePolicyAttachment
//!   │          │                 │
//!   │          ▼                 ▼
//!   │       Recorder <───────────┘
//!   │          │
//!   └────> DeliveryChannel ──> RecorderStatus ──> ManagedRule*
//!
//! IamRole ──> Aggregator (organization mode)
//! AggregateAuthorization (no prerequisites)
//! ```

pub mod aggregation;
pub mod iam;
pub mod recording;
pub mod spec;

pub use aggregation::{AggregationNodes, plan_aggregation};
pub use iam::{RoleBinding, plan_iam_role};
pub use recording::{RecordingNodes, plan_notification, plan_recording};
pub use spec::*;

use crate::error::{PlanError, ValidationError};
use crate::facts::{ExecutionContext, Facts};
use crate::label::Naming;
use crate::resource_kind::ResourceKind;
use crate::rollout::RolloutPhase;
use crate::topology::DerivedFacts;
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

/// Resources to create in one execution context, with their dependencies
#[derive(Debug, Clone)]
pub struct ResourcePlan {
    context: ExecutionContext,
    graph: DiGraph<ResourceSpec, ()>,
}

impl ResourcePlan {
    pub fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            graph: DiGraph::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Add a node created after every node in `depends_on`
    pub fn add(&mut self, spec: ResourceSpec, depends_on: &[NodeId]) -> NodeId {
        let idx = self.graph.add_node(spec);
        for dep in depends_on {
            self.graph.add_edge(NodeIndex::new(dep.0), idx, ());
        }
        NodeId(idx.index())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn spec(&self, id: NodeId) -> &ResourceSpec {
        &self.graph[NodeIndex::new(id.0)]
    }

    /// Nodes `id` waits for
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        let mut deps: Vec<NodeId> = self
            .graph
            .neighbors_directed(NodeIndex::new(id.0), Direction::Incoming)
            .map(|n| NodeId(n.index()))
            .collect();
        deps.sort();
        deps
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ResourceSpec)> {
        self.graph
            .node_indices()
            .map(|idx| (NodeId(idx.index()), &self.graph[idx]))
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = (NodeId, &ResourceSpec)> {
        self.iter().filter(move |(_, spec)| spec.kind() == kind)
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Which rollout phase this context belongs to
    pub fn phase(&self) -> RolloutPhase {
        RolloutPhase::of(self)
    }

    /// Creation order: every node after all of its dependencies
    ///
    /// Among ready nodes, lower [`ResourceKind::creation_rank`] goes first,
    /// then insertion order, so the order is stable for a given plan.
    pub fn ordered(&self) -> Result<Vec<NodeId>, ValidationError> {
        if is_cyclic_directed(&self.graph) {
            return Err(ValidationError::DependencyCycle(self.context.to_string()));
        }

        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(u8, usize)>> = self
            .graph
            .node_indices()
            .filter(|idx| pending[idx.index()] == 0)
            .map(|idx| Reverse((self.graph[idx].kind().creation_rank(), idx.index())))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse((_, index))) = ready.pop() {
            order.push(NodeId(index));
            for next in self
                .graph
                .neighbors_directed(NodeIndex::new(index), Direction::Outgoing)
            {
                pending[next.index()] -= 1;
                if pending[next.index()] == 0 {
                    ready.push(Reverse((self.graph[next].kind().creation_rank(), next.index())));
                }
            }
        }

        Ok(order)
    }

    /// Serializable view of the plan in creation order
    pub fn summary(&self) -> Result<PlanSummary, PlanError> {
        let resources = self
            .ordered()?
            .into_iter()
            .map(|id| PlannedResource {
                id,
                kind: self.spec(id).kind(),
                name: self.spec(id).display_name(),
                depends_on: self.dependencies(id),
                spec: self.spec(id).clone(),
            })
            .collect();

        Ok(PlanSummary {
            context: self.context.clone(),
            phase: self.phase(),
            resources,
        })
    }
}

impl AsRef<ResourcePlan> for ResourcePlan {
    fn as_ref(&self) -> &ResourcePlan {
        self
    }
}

/// Plan as printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub context: ExecutionContext,
    pub phase: RolloutPhase,
    pub resources: Vec<PlannedResource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedResource {
    pub id: NodeId,
    pub kind: ResourceKind,
    pub name: String,
    pub depends_on: Vec<NodeId>,
    pub spec: ResourceSpec,
}

/// Build the resource plan for one execution context
///
/// Disabled facts give an empty plan. Any error is returned before a plan
/// exists, so callers never see a partial plan.
pub fn plan(facts: &Facts, naming: &impl Naming) -> Result<ResourcePlan, PlanError> {
    let mut plan = ResourcePlan::new(facts.context.clone());

    if !facts.enabled {
        debug!(context = %facts.context, "Recorder disabled, nothing to plan");
        return Ok(plan);
    }

    let derived = DerivedFacts::classify(facts);
    debug!(context = %facts.context, ?derived, "Classified execution context");

    recording::validate(facts, &derived)?;

    let notification = plan_notification(facts, &derived, naming, &mut plan);
    let role = plan_iam_role(facts, &derived, naming, notification.as_ref(), &mut plan)?;
    plan_recording(facts, &derived, naming, &role, notification, &mut plan);
    plan_aggregation(facts, &derived, naming, &role, &mut plan);

    plan.ordered()?;

    debug!(
        context = %facts.context,
        resources = plan.len(),
        phase = %plan.phase(),
        "Resource plan built"
    );

    Ok(plan)
}
