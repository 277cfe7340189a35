//! Out-of-band work attached to conversion rules.
//!
//! Jobs are produced while the host is read sequentially, then run on their
//! own (possibly on a worker pool). A job never touches the host.

pub mod texture;

use std::path::PathBuf;

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::ShadeportError;
use crate::model::node::NodeRef;

pub use texture::{TextureTranscoder, TranscodeJob};

pub trait AssetJob: Send {
    fn describe(&self) -> String;

    fn run(&self) -> Result<AssetReport, ShadeportError>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetReport {
    /// Files the job wrote (or would have written).
    pub produced: Vec<PathBuf>,
    /// Inputs the external tool failed on, with its complaint.
    pub failed: Vec<(PathBuf, String)>,
}

/// Runs `jobs`, returning one result per job in input order.
pub fn run_jobs(
    jobs: Vec<(NodeRef, Box<dyn AssetJob>)>,
    parallel: bool,
) -> Vec<(NodeRef, Result<AssetReport, ShadeportError>)> {
    let run_one = |(node, job): (NodeRef, Box<dyn AssetJob>)| {
        debug!("assets: running {} for {}", job.describe(), node);
        let result = job.run();
        if let Err(err) = &result {
            warn!("assets: {} for {} failed: {}", job.describe(), node, err);
        }
        (node, result)
    };

    if parallel {
        jobs.into_par_iter().map(run_one).collect()
    } else {
        jobs.into_iter().map(run_one).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        ran: Arc<AtomicUsize>,
        fail: bool,
    }

    impl AssetJob for Counting {
        fn describe(&self) -> String {
            "counting job".to_string()
        }

        fn run(&self) -> Result<AssetReport, ShadeportError> {
            self.ran.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ShadeportError::Conversion("tool crashed".into()))
            } else {
                Ok(AssetReport::default())
            }
        }
    }

    #[test]
    fn test_run_jobs_keeps_order_in_parallel() {
        let ran = Arc::new(AtomicUsize::new(0));
        let nodes: Vec<NodeRef> = (0..8).map(|_| NodeRef::new()).collect();
        let jobs = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let job: Box<dyn AssetJob> = Box::new(Counting {
                    ran: ran.clone(),
                    fail: i == 3,
                });
                (*node, job)
            })
            .collect();

        let results = run_jobs(jobs, true);
        assert_eq!(ran.load(Ordering::SeqCst), 8);
        let order: Vec<NodeRef> = results.iter().map(|(node, _)| *node).collect();
        assert_eq!(order, nodes);
        assert!(results[3].1.is_err());
        assert!(results[4].1.is_ok());
    }
}
