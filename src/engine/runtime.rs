//! Bounded thread pool for block linkage.
//!
//! Blocks are disjoint, so their linkage can be computed independently.
//! Results are reordered by block index before they are handed back, which
//! keeps a parallel pass identical to a single-threaded one. Group commits
//! never run here.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use crate::error::{ExecutionError, ResolverError, ResolverResult};
use crate::resolution::{build_groups, Block, CandidateIndex, ClaimSet, Group};

/// Links one block: candidates by postal prefix, then greedy grouping.
#[must_use]
pub fn link_block(block: &Block, threshold: f64) -> Vec<Group> {
    let index = CandidateIndex::build(block);
    let mut claims = ClaimSet::new();
    build_groups(index.pairs(), threshold, &mut claims)
}

struct Job {
    position: usize,
    block: Block,
}

struct Linked {
    position: usize,
    block: Block,
    groups: Vec<Group>,
}

struct LinkagePool {
    tx: Sender<Job>,
    results: Receiver<Linked>,
    workers: Vec<JoinHandle<()>>,
}

impl LinkagePool {
    fn start(workers: usize, queue_capacity: usize, threshold: f64) -> ResolverResult<Self> {
        let workers = workers.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity.max(1));
        let (result_tx, results) = unbounded::<Linked>();

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let result_tx = result_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("resolver-linkage-{idx}"))
                .spawn(move || {
                    while let Ok(Job { position, block }) = rx.recv() {
                        let groups = link_block(&block, threshold);
                        if result_tx
                            .send(Linked {
                                position,
                                block,
                                groups,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                })
                .map_err(|e| ResolverError::internal(format!("spawn linkage worker: {e}")))?;
            handles.push(handle);
        }

        Ok(Self {
            tx,
            results,
            workers: handles,
        })
    }

    fn submit(&self, job: Job) -> ResolverResult<()> {
        self.tx.send(job).map_err(|_| {
            ExecutionError::Disconnected {
                context: "linkage job queue".to_string(),
            }
            .into()
        })
    }

    /// Closes the queue, joins the workers and returns every result.
    fn finish(self) -> Vec<Linked> {
        // Workers drain queued jobs then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
        self.results.try_iter().collect()
    }
}

/// Links every block, in parallel when `workers > 1`.
///
/// The output preserves the input block order.
pub fn link_blocks(
    blocks: Vec<Block>,
    threshold: f64,
    workers: usize,
    queue_capacity: usize,
) -> ResolverResult<Vec<(Block, Vec<Group>)>> {
    let workers = workers.min(blocks.len());
    if workers <= 1 {
        return Ok(blocks
            .into_iter()
            .map(|block| {
                let groups = link_block(&block, threshold);
                (block, groups)
            })
            .collect());
    }

    let expected = blocks.len();
    debug!(blocks = expected, workers, "linking blocks in parallel");
    let pool = LinkagePool::start(workers, queue_capacity, threshold)?;
    for (position, block) in blocks.into_iter().enumerate() {
        pool.submit(Job { position, block })?;
    }
    let mut linked = pool.finish();
    if linked.len() != expected {
        return Err(ExecutionError::Disconnected {
            context: format!("linkage workers returned {} of {expected} blocks", linked.len()),
        }
        .into());
    }
    linked.sort_by_key(|l| l.position);
    Ok(linked.into_iter().map(|l| (l.block, l.groups)).collect())
}
