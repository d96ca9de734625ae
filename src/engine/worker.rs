//! The background computation channel used by local-engine move sources.
//!
//! One thread owns the search. Jobs are queued over a channel and every job
//! produces exactly one reply through the callback given to [SearchWorker::spawn].

use std::{
    sync::{
        mpsc::{channel, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
};

use anyhow::Context;

use super::{
    ella::{EllaChess, SearchControl},
    Engine,
};
use crate::{Board, Result, SourceError};

struct SearchJob<T> {
    tag: T,
    fen: String,
}

pub struct SearchWorker<T> {
    jobs: Option<Sender<SearchJob<T>>>,
    control: Arc<SearchControl>,
    search_thread: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> SearchWorker<T> {
    pub fn spawn<F>(depth: u32, on_result: F) -> Result<Self>
    where
        F: Fn(T, std::result::Result<String, SourceError>) + Send + 'static,
    {
        let (jobs, job_queue) = channel::<SearchJob<T>>();
        let control = SearchControl::new();
        let thread_control = control.clone();

        let search_thread = thread::Builder::new()
            .name("local-engine".to_string())
            .spawn(move || {
                for job in job_queue {
                    thread_control.reset();
                    let result = search_fen(&job.fen, depth, thread_control.clone());
                    on_result(job.tag, result);
                }
                log::debug!("search worker shutting down");
            })
            .context("spawn search thread")?;

        Ok(SearchWorker {
            jobs: Some(jobs),
            control,
            search_thread: Some(search_thread),
        })
    }

    pub fn submit(&self, tag: T, fen: String) -> std::result::Result<(), SourceError> {
        let jobs = self.jobs.as_ref().ok_or(SourceError::WorkerGone)?;
        jobs.send(SearchJob { tag, fen })
            .map_err(|_| SourceError::WorkerGone)
    }

    /// Stops the search that is currently running. Queued jobs still run.
    pub fn abort(&self) {
        self.control.abort();
    }
}

impl<T> Drop for SearchWorker<T> {
    fn drop(&mut self) {
        // closing the queue ends the worker loop
        self.jobs.take();
        self.control.abort();
        if let Some(search_thread) = self.search_thread.take() {
            if search_thread.join().is_err() {
                log::error!("search thread panicked");
            }
        }
    }
}

fn search_fen(
    fen: &str,
    depth: u32,
    control: Arc<SearchControl>,
) -> std::result::Result<String, SourceError> {
    let board = Board::from_fen(fen).map_err(|e| SourceError::SearchFailed(e.to_string()))?;
    let mut engine = EllaChess::with_control(board, control);
    match engine.search_to_depth(depth) {
        Ok(Some(mve)) => Ok(mve.to_string()),
        Ok(None) => Err(SourceError::NoMove),
        Err(e) => Err(SourceError::SearchFailed(format!("{e:#}"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::START_BOARD_FEN;
    use std::{sync::mpsc, time::Duration};

    #[test]
    fn every_job_gets_one_reply() {
        let (tx, rx) = mpsc::channel();
        let worker = SearchWorker::spawn(1, move |tag: u32, result| {
            let _ = tx.send((tag, result));
        })
        .unwrap();

        worker.submit(1, START_BOARD_FEN.to_string()).unwrap();
        worker.submit(2, "not a fen".to_string()).unwrap();

        let (tag, result) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(tag, 1);
        let mve = result.unwrap();
        assert!(Board::default()
            .find_move(mve.parse().unwrap())
            .is_ok());

        let (tag, result) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(tag, 2);
        assert!(matches!(result, Err(SourceError::SearchFailed(_))));
    }

    #[test]
    fn mated_position_has_no_move() {
        let (tx, rx) = mpsc::channel();
        let worker = SearchWorker::spawn(2, move |_: (), result| {
            let _ = tx.send(result);
        })
        .unwrap();
        worker
            .submit(
                (),
                "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3".to_string(),
            )
            .unwrap();
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(result, Err(SourceError::NoMove));
    }
}
