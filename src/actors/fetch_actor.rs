use crossbeam_channel::Receiver;
use miette::miette;
use tracing::{debug, error};

use super::{Actor, Job};
use crate::handlers::Handlers;

/// Worker executing one inbound message at a time, off the poll loop.
///
/// A failed job is logged and dropped; the worker itself only stops once
/// the job channel closes.
pub struct FetchActor<'a> {
    id: usize,
    handlers: &'a Handlers<'a>,

    receive_channel: Option<Receiver<Job>>,
}

impl<'a> FetchActor<'a> {
    pub fn new(id: usize, handlers: &'a Handlers<'a>) -> Self {
        Self {
            id,
            handlers,
            receive_channel: None,
        }
    }
}

impl Actor<Job> for FetchActor<'_> {
    fn set_receive_channel(&mut self, channel: Receiver<Job>) {
        self.receive_channel = Some(channel);
    }

    fn run(mut self) -> crate::result::Result<()> {
        let receive_channel = self
            .receive_channel
            .take()
            .ok_or_else(|| miette!("Receive channel not set"))?;

        debug!("{}: Actor started, waiting for a message", self.id);

        for job in receive_channel {
            debug!("{}: Message received from chat {}", self.id, job.chat);

            if let Err(err) = self.handlers.handle(&job) {
                error!(
                    "{}: Could not handle message from chat {}: {err}",
                    self.id, job.chat
                );
            }

            debug!("{}: Iteration completed. Waiting for next message", self.id);
        }

        debug!("{}: Channel closed. Stopping the actor.", self.id);
        Ok(())
    }
}
