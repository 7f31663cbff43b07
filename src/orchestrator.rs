//! The traversal orchestrator: a single-pass multi-visitor tree walk, plus
//! the bounded-parallelism driver that runs per-file analyzers across a
//! worker pool and honours cooperative cancellation.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::node::Node;

/// The tree-visitor capability a per-file analyzer implements: `on_enter`
/// fires before a node's children are visited, `on_exit` after.
///
/// Parameterized by the lifetime of the tree being walked so a visitor can
/// hold borrowed references to nodes it collects (see
/// [`crate::visitor::FunctionCollector`]) without cloning the tree.
pub trait Visitor<'a> {
    /// Called on entry to `node`, before descending into its children.
    fn on_enter(&mut self, node: &'a Node, depth: usize);
    /// Called after all of `node`'s children have been fully visited.
    fn on_exit(&mut self, node: &'a Node, depth: usize);
}

/// Run every visitor over `root` in one pre-order/post-order pass: for each
/// node, `on_enter` fires on every visitor (registration order), then its
/// children are recursed into, then `on_exit` fires on every visitor (same
/// order). A `None` root is a no-op.
pub fn traverse<'a>(root: Option<&'a Node>, visitors: &mut [Box<dyn Visitor<'a> + 'a>]) {
    let Some(root) = root else {
        return;
    };
    traverse_node(root, 0, visitors);
}

fn traverse_node<'a>(node: &'a Node, depth: usize, visitors: &mut [Box<dyn Visitor<'a> + 'a>]) {
    for visitor in visitors.iter_mut() {
        visitor.on_enter(node, depth);
    }
    for child in &node.children {
        traverse_node(child, depth + 1, visitors);
    }
    for visitor in visitors.iter_mut() {
        visitor.on_exit(node, depth);
    }
}

/// A type-gated hook: wraps a closure that only fires on `on_enter` when
/// `node.node_type` matches `target_type`.
pub struct OnEnterOfType<F> {
    target_type: String,
    callback: F,
}

impl<F> OnEnterOfType<F> {
    /// Build a hook that calls `callback(node, depth)` only for nodes whose
    /// type equals `target_type`.
    pub fn new(target_type: impl Into<String>, callback: F) -> Self {
        Self {
            target_type: target_type.into(),
            callback,
        }
    }
}

impl<'a, F: FnMut(&'a Node, usize)> Visitor<'a> for OnEnterOfType<F> {
    fn on_enter(&mut self, node: &'a Node, depth: usize) {
        if node.node_type == self.target_type {
            (self.callback)(node, depth);
        }
    }

    fn on_exit(&mut self, _node: &'a Node, _depth: usize) {}
}

/// Dispatches coarse-grained analyzer jobs (one per analyzer-per-file, or
/// one combined visitor traversal) across a bounded worker pool.
///
/// Cancellation is checked before a job acquires a worker slot; a job
/// already running is not interrupted (`Signature::add` is not
/// interruptible, matching the concurrency model's suspension-point list).
/// Individual job failures are collected rather than aborting siblings; if
/// any occurred, [`Orchestrator::dispatch`] returns a single
/// [`Error::AggregatedAnalyzerError`].
pub struct Orchestrator {
    pool: ThreadPool,
}

impl Orchestrator {
    /// Build an orchestrator with a worker pool sized to `workers`, or the
    /// host's logical CPU count when `None`.
    pub fn new(workers: Option<usize>) -> Result<Self> {
        let workers = workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::AggregatedAnalyzerError(vec![e.to_string()]))?;
        debug!(workers, "built orchestrator worker pool");
        Ok(Self { pool })
    }

    /// Run every job in `jobs`, honouring `token`: a job not yet started
    /// when cancellation fires is skipped entirely (no error recorded for
    /// it), but if cancellation is observed at all, the whole dispatch
    /// still reports `Cancelled` once every already-started job has run to
    /// completion. Per-job errors are accumulated and returned together.
    pub fn dispatch<T, F>(&self, jobs: Vec<F>, token: &CancellationToken) -> Result<Vec<T>>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let results: Vec<Result<T>> = self.pool.install(|| {
            use rayon::prelude::*;
            jobs.into_par_iter()
                .map(|job| {
                    if token.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    job()
                })
                .collect()
        });

        let mut ok = Vec::with_capacity(results.len());
        let mut errors = Vec::new();
        let mut saw_cancellation = false;
        for result in results {
            match result {
                Ok(value) => ok.push(value),
                Err(Error::Cancelled) => saw_cancellation = true,
                Err(err) => errors.push(err.to_string()),
            }
        }

        if !errors.is_empty() {
            warn!(count = errors.len(), "one or more analyzers failed");
            return Err(Error::AggregatedAnalyzerError(errors));
        }
        if saw_cancellation || token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(types: &[&str]) -> Node {
        let mut iter = types.iter().rev();
        let mut node = Node::new((*iter.next().unwrap()).to_string());
        for t in iter {
            node = Node::new((*t).to_string()).with_child(node);
        }
        node
    }

    struct OrderRecorder {
        tag: &'static str,
        log: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl<'a> Visitor<'a> for OrderRecorder {
        fn on_enter(&mut self, node: &'a Node, _depth: usize) {
            self.log
                .borrow_mut()
                .push(format!("{}:enter:{}", self.tag, node.node_type));
        }
        fn on_exit(&mut self, node: &'a Node, _depth: usize) {
            self.log
                .borrow_mut()
                .push(format!("{}:exit:{}", self.tag, node.node_type));
        }
    }

    #[test]
    fn visitors_fire_in_registration_order_pre_and_post() {
        let tree = chain(&["Function", "Block"]);
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        let mut visitors: Vec<Box<dyn Visitor>> = vec![
            Box::new(OrderRecorder { tag: "v1", log: log.clone() }),
            Box::new(OrderRecorder { tag: "v2", log: log.clone() }),
        ];
        traverse(Some(&tree), &mut visitors);

        assert_eq!(
            *log.borrow(),
            vec![
                "v1:enter:Function",
                "v2:enter:Function",
                "v1:enter:Block",
                "v2:enter:Block",
                "v1:exit:Block",
                "v2:exit:Block",
                "v1:exit:Function",
                "v2:exit:Function",
            ]
        );
    }

    #[test]
    fn none_root_is_a_no_op() {
        let mut visitors: Vec<Box<dyn Visitor>> = Vec::new();
        traverse(None, &mut visitors);
    }

    #[test]
    fn type_gated_hook_only_fires_on_matching_type() {
        let tree = chain(&["Function", "Block", "Return"]);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let hook = OnEnterOfType::new("Return", move |node: &Node, _depth| {
            seen_clone.borrow_mut().push(node.node_type.clone());
        });
        let mut visitors: Vec<Box<dyn Visitor>> = vec![Box::new(hook)];
        traverse(Some(&tree), &mut visitors);
        assert_eq!(*seen.borrow(), vec!["Return".to_string()]);
    }

    #[test]
    fn dispatch_collects_results_and_runs_all_jobs() {
        let orchestrator = Orchestrator::new(Some(2)).unwrap();
        let token = CancellationToken::new();
        let jobs: Vec<Box<dyn FnOnce() -> Result<i32> + Send>> =
            (0..5).map(|i| Box::new(move || Ok(i)) as Box<dyn FnOnce() -> Result<i32> + Send>).collect();
        let results = orchestrator.dispatch(jobs, &token).unwrap();
        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn dispatch_aggregates_errors_without_aborting_siblings() {
        let orchestrator = Orchestrator::new(Some(2)).unwrap();
        let token = CancellationToken::new();
        let jobs: Vec<Box<dyn FnOnce() -> Result<i32> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| Err(Error::InvalidData("boom".to_string()))),
            Box::new(|| Ok(3)),
        ];
        let err = orchestrator.dispatch(jobs, &token).unwrap_err();
        assert!(matches!(err, Error::AggregatedAnalyzerError(_)));
    }

    #[test]
    fn dispatch_honours_pre_cancelled_token() {
        let orchestrator = Orchestrator::new(Some(2)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let jobs: Vec<Box<dyn FnOnce() -> Result<i32> + Send>> = vec![Box::new(|| Ok(1))];
        let err = orchestrator.dispatch(jobs, &token).unwrap_err();
        assert_eq!(err, Error::Cancelled);
    }
}
