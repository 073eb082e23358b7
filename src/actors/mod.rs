mod fetch_actor;
mod message;

use crossbeam_channel::Receiver;
pub use fetch_actor::FetchActor;
pub use message::{Job, Task};

use crate::result::Result;

/// A worker driven by a channel of inbound work.
///
/// The worker runs until its channel is closed and drained.
pub trait Actor<In> {
    fn set_receive_channel(&mut self, channel: Receiver<In>);

    fn run(self) -> Result<()>;
}
