use std::collections::VecDeque;

use log::{info, warn};

use crate::{
    BatchSession, PendingTask, ProcessingState, SessionError,
    gateway::{GatewayError, ProcessRequest, ProcessingGateway},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Processed { index: usize, output_url: String },
    Failed { index: usize, message: String },
    Finished { succeeded: usize, failed: usize },
}

/// Submits entries to the gateway strictly one after another: the next request only starts once
/// the previous one resolved. A failure is recorded on its entry and the run continues.
pub struct BatchRun {
    queue: VecDeque<usize>,
    in_flight: Option<(usize, PendingTask<Result<String, GatewayError>>)>,
    succeeded: usize,
    failed: usize,
}

impl BatchRun {
    /// Every masked entry which was not processed yet.
    pub fn all(session: &BatchSession) -> Result<Self, SessionError> {
        if session.is_processing() {
            return Err(SessionError::AlreadyProcessing);
        }
        Self::with_queue(session.submittable())
    }

    pub fn single(session: &BatchSession, index: usize) -> Result<Self, SessionError> {
        if session.is_processing() {
            return Err(SessionError::AlreadyProcessing);
        }
        let entry = session.entries().get(index).ok_or(SessionError::NoImages)?;
        if entry.mask.is_none() {
            return Err(SessionError::NoMask);
        }
        Self::with_queue(vec![index])
    }

    fn with_queue(queue: Vec<usize>) -> Result<Self, SessionError> {
        if queue.is_empty() {
            return Err(SessionError::NothingToSubmit);
        }
        info!("Submitting {} images", queue.len());
        Ok(Self {
            queue: queue.into(),
            in_flight: None,
            succeeded: 0,
            failed: 0,
        })
    }

    pub fn remaining(&self) -> usize {
        self.queue.len() + self.in_flight.is_some() as usize
    }

    pub fn current(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|(i, _)| *i)
    }

    /// Advances the run as far as possible without blocking. The last event of a run is always
    /// [`BatchEvent::Finished`]; polling afterwards yields nothing.
    pub fn poll(
        &mut self,
        session: &mut BatchSession,
        gateway: &dyn ProcessingGateway,
    ) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        loop {
            if self.in_flight.is_none() {
                let Some(index) = self.queue.pop_front() else {
                    if self.succeeded + self.failed > 0 || !events.is_empty() {
                        events.push(BatchEvent::Finished {
                            succeeded: self.succeeded,
                            failed: self.failed,
                        });
                        self.succeeded = 0;
                        self.failed = 0;
                    }
                    return events;
                };
                let Some(entry) = session.entries().get(index) else {
                    warn!("Entry {index} vanished before it was submitted");
                    continue;
                };
                let request = ProcessRequest::for_entry(entry);
                session.set_state(index, ProcessingState::Processing);
                self.in_flight = Some((index, PendingTask::new(gateway.process(request))));
            }

            let Some((index, task)) = self.in_flight.as_mut() else {
                unreachable!("Started above")
            };
            let index = *index;
            let Some(result) = task.poll_ready() else {
                return events;
            };
            self.in_flight = None;
            match result {
                Ok(output_url) => {
                    self.succeeded += 1;
                    session.set_state(
                        index,
                        ProcessingState::Processed {
                            result: output_url.clone(),
                        },
                    );
                    events.push(BatchEvent::Processed { index, output_url });
                }
                Err(e) => {
                    warn!("Processing entry {index} failed: {e}");
                    self.failed += 1;
                    let message = e.to_string();
                    session.set_state(
                        index,
                        ProcessingState::Failed {
                            message: message.clone(),
                        },
                    );
                    events.push(BatchEvent::Failed { index, message });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::VecDeque,
    };

    use futures::{FutureExt, channel::oneshot};
    use image::{GrayImage, Luma};

    use super::*;
    use crate::{BoxFuture, MaskRef, SourceFile};

    /// Answers requests in order from a script and records what was asked.
    struct Scripted {
        answers: RefCell<VecDeque<Result<String, GatewayError>>>,
        requests: RefCell<Vec<ProcessRequest>>,
    }

    impl Scripted {
        fn new(answers: impl IntoIterator<Item = Result<String, GatewayError>>) -> Self {
            Self {
                answers: RefCell::new(answers.into_iter().collect()),
                requests: RefCell::default(),
            }
        }
    }

    impl ProcessingGateway for Scripted {
        fn process(
            &self,
            request: ProcessRequest,
        ) -> BoxFuture<'static, Result<String, GatewayError>> {
            self.requests.borrow_mut().push(request);
            let answer = self
                .answers
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(GatewayError::Transport("unscripted".into())));
            futures::future::ready(answer).boxed()
        }
    }

    fn session(n: usize, masked: &[usize]) -> BatchSession {
        let mut s = BatchSession::default();
        s.add_images(
            (0..n).map(|i| SourceFile::new(format!("{i}.png"), "image/png", vec![i as u8])),
        );
        let mask = MaskRef::encode(&GrayImage::from_pixel(1, 1, Luma([255]))).unwrap();
        for &i in masked {
            s.set_mask(i, Some(mask.clone()));
        }
        s
    }

    #[test]
    fn failure_does_not_stop_the_run() {
        let mut s = session(2, &[0, 1]);
        let gateway = Scripted::new([
            Err(GatewayError::Transport("connection reset".into())),
            Ok("https://out/1.png".into()),
        ]);
        let mut run = BatchRun::all(&s).unwrap();
        let events = run.poll(&mut s, &gateway);
        assert_eq!(
            events,
            vec![
                BatchEvent::Failed {
                    index: 0,
                    message: "connection reset".into()
                },
                BatchEvent::Processed {
                    index: 1,
                    output_url: "https://out/1.png".into()
                },
                BatchEvent::Finished {
                    succeeded: 1,
                    failed: 1
                },
            ]
        );
        assert_eq!(s.entries()[0].state.error(), Some("connection reset"));
        assert_eq!(s.entries()[1].state.result(), Some("https://out/1.png"));
        assert_eq!(gateway.requests.borrow().len(), 2);
        assert!(run.poll(&mut s, &gateway).is_empty());
    }

    #[test]
    fn only_masked_entries_are_sent_with_their_mask() {
        let mut s = session(3, &[1]);
        let gateway = Scripted::new([Ok("u".into())]);
        let mut run = BatchRun::all(&s).unwrap();
        run.poll(&mut s, &gateway);
        let requests = gateway.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].image_url, s.entries()[1].preview.as_str());
        assert_eq!(
            requests[0].mask_url.as_deref(),
            s.entries()[1].mask.as_ref().map(|m| m.as_str())
        );
    }

    #[test]
    fn second_request_waits_for_the_first() {
        struct Manual(RefCell<Vec<oneshot::Sender<Result<String, GatewayError>>>>);
        impl ProcessingGateway for Manual {
            fn process(
                &self,
                _: ProcessRequest,
            ) -> BoxFuture<'static, Result<String, GatewayError>> {
                let (tx, rx) = oneshot::channel();
                self.0.borrow_mut().push(tx);
                async move { rx.await.map_err(GatewayError::from).and_then(|r| r) }.boxed()
            }
        }

        let mut s = session(2, &[0, 1]);
        let gateway = Manual(RefCell::default());
        let mut run = BatchRun::all(&s).unwrap();
        assert!(run.poll(&mut s, &gateway).is_empty());
        assert_eq!(gateway.0.borrow().len(), 1);
        assert_eq!(run.current(), Some(0));
        assert_eq!(s.entries()[0].state, ProcessingState::Processing);
        assert_eq!(s.entries()[1].state, ProcessingState::Idle);
        assert!(!s.can_submit());

        let first = gateway.0.borrow_mut().remove(0);
        first.send(Ok("a".into())).unwrap();
        let events = run.poll(&mut s, &gateway);
        assert_eq!(
            events,
            vec![BatchEvent::Processed {
                index: 0,
                output_url: "a".into()
            }]
        );
        assert_eq!(run.current(), Some(1));
        assert_eq!(run.remaining(), 1);
    }

    #[test]
    fn nothing_to_submit() {
        let s = session(2, &[]);
        assert!(matches!(BatchRun::all(&s), Err(SessionError::NothingToSubmit)));
        assert!(matches!(BatchRun::single(&s, 0), Err(SessionError::NoMask)));
    }

    #[test]
    fn processed_entries_are_skipped() {
        let mut s = session(2, &[0, 1]);
        s.set_state(0, ProcessingState::Processed { result: "x".into() });
        let run = BatchRun::all(&s).unwrap();
        assert_eq!(run.remaining(), 1);
    }
}
