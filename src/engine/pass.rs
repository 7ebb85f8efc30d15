//! Resolution passes.
//!
//! A pass links the currently unresolved population into groups and commits
//! each group on its own. Group commits are sequential; when configured,
//! linkage for independent blocks runs on a worker pool first.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::engine::runtime::link_blocks;
use crate::error::ResolverResult;
use crate::ir::ResolvePayload;
use crate::resolution::{
    block_specs, build_groups, population_pairs, synthesize, Block, ClaimSet, Group,
    SynthesisOutcome,
};
use crate::restaurant::{Restaurant, RestaurantId};
use crate::storage::RecordStore;

/// Identifier of one pass, used to correlate logs with a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassId(Uuid);

impl PassId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the population was partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PassMode {
    /// One linkage run over every unresolved row.
    Unblocked,
    /// Linkage per name-initial block.
    Blocked {
        /// Block count asked for.
        requested: usize,
        /// Blocks actually built, residual block included.
        block_count: usize,
    },
}

/// Per-block counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub label: String,
    pub rows: usize,
    pub unresolved: usize,
    pub groups: usize,
    pub merged: usize,
    pub singletons: usize,
    pub failed: usize,
}

impl BlockSummary {
    fn new(block: &Block) -> Self {
        Self {
            label: block.label(),
            rows: block.rows().len(),
            unresolved: block.unresolved_count(),
            groups: 0,
            merged: 0,
            singletons: 0,
            failed: 0,
        }
    }
}

/// A group that became a composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    pub composite: RestaurantId,
    pub absorbed: Vec<RestaurantId>,
}

/// A group whose commit was rejected; nothing was written for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    pub members: Vec<RestaurantId>,
    pub error: String,
}

/// A block whose rows could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFailure {
    pub block: String,
    pub error: String,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub id: PassId,
    #[serde(flatten)]
    pub mode: PassMode,
    pub threshold: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<BlockSummary>,
    pub merged: Vec<MergedGroup>,
    pub singletons: Vec<RestaurantId>,
    pub failures: Vec<GroupFailure>,
    pub block_failures: Vec<BlockFailure>,
}

impl PassReport {
    fn start(mode: PassMode, threshold: f64) -> Self {
        let now = Utc::now();
        Self {
            id: PassId::new(),
            mode,
            threshold,
            started_at: now,
            finished_at: now,
            blocks: Vec::new(),
            merged: Vec::new(),
            singletons: Vec::new(),
            failures: Vec::new(),
            block_failures: Vec::new(),
        }
    }

    /// True when every block was read and every group committed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.block_failures.is_empty()
    }

    /// Ids of the composites created by this pass.
    #[must_use]
    pub fn composites(&self) -> Vec<RestaurantId> {
        self.merged.iter().map(|m| m.composite).collect()
    }

    /// Number of raw rows absorbed into composites.
    #[must_use]
    pub fn absorbed_count(&self) -> usize {
        self.merged.iter().map(|m| m.absorbed.len()).sum()
    }

    /// Number of groups formed, committed or not.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.merged.len() + self.singletons.len() + self.failures.len()
    }

    /// Commits one group and records what happened. Returns the outcome kind
    /// for block counters.
    fn commit(&mut self, store: &dyn RecordStore, block: Option<&str>, group: &Group) -> Commit {
        match synthesize(store, group) {
            Ok(SynthesisOutcome::Singleton { id }) => {
                self.singletons.push(id);
                Commit::Singleton
            }
            Ok(SynthesisOutcome::Merged {
                composite,
                absorbed,
            }) => {
                debug!(block, %composite, members = absorbed.len(), "group merged");
                self.merged.push(MergedGroup {
                    block: block.map(str::to_string),
                    composite,
                    absorbed,
                });
                Commit::Merged
            }
            Err(err) => {
                warn!(block, anchor = %group.anchor, error = %err, "group commit failed");
                self.failures.push(GroupFailure {
                    block: block.map(str::to_string),
                    members: group.member_ids(),
                    error: err.to_string(),
                });
                Commit::Failed
            }
        }
    }
}

enum Commit {
    Singleton,
    Merged,
    Failed,
}

/// Runs one pass against `store`.
///
/// Request fields override the configured mode and block count. Per-group
/// and per-block failures are collected in the report; only a failure to read
/// the population of an unblocked pass aborts it.
pub fn run_pass(
    store: &dyn RecordStore,
    config: &ResolverConfig,
    request: ResolvePayload,
) -> ResolverResult<PassReport> {
    request.validate()?;
    let scaled = request.scaled.unwrap_or(config.scaled);
    let requested = request.blocks.unwrap_or(config.block_count);

    let mut report = if scaled {
        let specs = block_specs(requested, config.include_residual_block)?;
        let mode = PassMode::Blocked {
            requested,
            block_count: specs.len(),
        };
        let mut report = PassReport::start(mode, config.threshold);
        let span = info_span!("resolution_pass", pass_id = %report.id, mode = "blocked");
        let _guard = span.enter();

        let mut blocks = Vec::with_capacity(specs.len());
        for spec in specs {
            let label = spec.label();
            match Block::materialize(store, spec) {
                Ok(block) => blocks.push(block),
                Err(err) => {
                    warn!(block = %label, error = %err, "block read failed");
                    report.block_failures.push(BlockFailure {
                        block: label,
                        error: err.to_string(),
                    });
                }
            }
        }
        run_blocked(store, config, blocks, &mut report)?;
        report
    } else {
        let mut report = PassReport::start(PassMode::Unblocked, config.threshold);
        let span = info_span!("resolution_pass", pass_id = %report.id, mode = "unblocked");
        let _guard = span.enter();
        run_unblocked(store, config, &mut report)?;
        report
    };

    report.finished_at = Utc::now();
    info!(
        pass_id = %report.id,
        merged = report.merged.len(),
        absorbed = report.absorbed_count(),
        singletons = report.singletons.len(),
        failures = report.failures.len(),
        block_failures = report.block_failures.len(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "resolution pass finished"
    );
    Ok(report)
}

fn run_unblocked(
    store: &dyn RecordStore,
    config: &ResolverConfig,
    report: &mut PassReport,
) -> ResolverResult<()> {
    let population = store.find_unresolved()?;
    let refs: Vec<&Restaurant> = population.iter().collect();
    let mut claims = ClaimSet::new();
    let groups = build_groups(population_pairs(&refs), config.threshold, &mut claims);
    debug!(rows = population.len(), groups = groups.len(), "population linked");

    for group in &groups {
        report.commit(store, None, group);
    }
    Ok(())
}

fn run_blocked(
    store: &dyn RecordStore,
    config: &ResolverConfig,
    blocks: Vec<Block>,
    report: &mut PassReport,
) -> ResolverResult<()> {
    let linked = link_blocks(
        blocks,
        config.threshold,
        config.linkage_workers,
        config.queue_capacity,
    )?;

    for (block, groups) in linked {
        let mut summary = BlockSummary::new(&block);
        summary.groups = groups.len();
        let label = summary.label.clone();
        for group in &groups {
            match report.commit(store, Some(&label), group) {
                Commit::Singleton => summary.singletons += 1,
                Commit::Merged => summary.merged += 1,
                Commit::Failed => summary.failed += 1,
            }
        }
        debug!(
            block = %summary.label,
            rows = summary.rows,
            groups = summary.groups,
            merged = summary.merged,
            "block resolved"
        );
        report.blocks.push(summary);
    }
    Ok(())
}
