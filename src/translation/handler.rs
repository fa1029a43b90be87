/*!
 * Worker pool of a translation job.
 *
 * `concurrency_limit` workers (one per paragraph when the limit is 0) pull
 * paragraphs from a shared queue, translate them and push them to a single
 * processing consumer. Results reach the consumer in completion order.
 */

use futures::future::join_all;
use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::mpsc;

use crate::cache::Paragraph;

use super::core::Translation;

pub struct Handler<'a> {
    translation: &'a Translation,
    queue: Mutex<VecDeque<Paragraph>>,
    // @field: Paragraphs drained from the queue by a cancel
    skipped: Mutex<Vec<Paragraph>>,
    total: usize,
}

impl<'a> Handler<'a> {
    pub fn new(translation: &'a Translation, paragraphs: Vec<Paragraph>) -> Self {
        Self {
            translation,
            total: paragraphs.len(),
            queue: Mutex::new(paragraphs.into_iter().collect()),
            skipped: Mutex::new(Vec::new()),
        }
    }

    fn worker_count(&self) -> usize {
        match self.translation.engine().pacing().concurrency_limit {
            0 => self.total.max(1),
            limit => limit.min(self.total.max(1)),
        }
    }

    fn drain(&self) {
        let mut queue = self.queue.lock();
        self.skipped.lock().extend(queue.drain(..));
    }

    async fn worker(&self, id: usize, sender: mpsc::UnboundedSender<Paragraph>) {
        let interval = self.translation.engine().pacing().request_interval;
        loop {
            if self.translation.is_canceled() {
                self.drain();
                break;
            }
            let Some(mut paragraph) = self.queue.lock().pop_front() else {
                break;
            };
            match self.translation.translate_paragraph(&mut paragraph).await {
                Ok(()) => {}
                Err(e) if e.is_canceled() => {
                    self.skipped.lock().push(paragraph);
                    self.drain();
                    break;
                }
                Err(e) => paragraph.error = Some(e.to_string()),
            }
            let cached = paragraph.is_cache;
            if let Err(mpsc::error::SendError(paragraph)) = sender.send(paragraph) {
                self.skipped.lock().push(paragraph);
                break;
            }
            let pending = !self.queue.lock().is_empty();
            if !cached && pending && !interval.is_zero() && self.translation.sleep(interval).await.is_err() {
                self.drain();
                break;
            }
        }
        debug!("Worker {} finished", id);
    }

    async fn process(&self, mut receiver: mpsc::UnboundedReceiver<Paragraph>) -> Vec<Paragraph> {
        let mut processed = Vec::with_capacity(self.total);
        while let Some(paragraph) = receiver.recv().await {
            let fresh_work = !paragraph.is_cache && paragraph.translation.is_some();
            if self.translation.is_canceled() && !fresh_work {
                self.skipped.lock().push(paragraph);
                continue;
            }
            let count = processed.len() + 1;
            self.translation.process_translation(&paragraph, count, self.total).await;
            processed.push(paragraph);
        }
        processed
    }

    /// Run the job to completion or cancellation
    pub async fn run(self) -> Vec<Paragraph> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let workers: Vec<_> = (0..self.worker_count())
            .map(|id| self.worker(id, sender.clone()))
            .collect();
        drop(sender);

        let (_, mut results) = tokio::join!(join_all(workers), self.process(receiver));
        results.extend(self.skipped.into_inner());
        results
    }
}
