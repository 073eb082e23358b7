use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::{
    actors::{Job, Task},
    outside::Telegram,
    result::{bail, Result},
};

/// Long-poll the Bot API and feed every inbound message to the workers.
///
/// Transport hiccups are logged and retried after a short jittered pause,
/// the loop itself only gives up if the worker pool goes away.
pub fn run_dispatch_loop(telegram: &Telegram, jobs: &Sender<Job>) -> Result<()> {
    let mut offset = 0;

    loop {
        let updates = match telegram.next_updates(offset) {
            Ok(updates) => updates,
            Err(err) => {
                warn!("Could not poll for updates: {err}");
                std::thread::sleep(Duration::from_secs(fastrand::u64(2..6)));
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let (Some(peer), Some(text)) = (message.from, message.text) else {
                debug!("Skipping a message without sender or text");
                continue;
            };

            let job = Job {
                chat: message.chat.id,
                user: peer.id,
                task: Task::parse(&text),
            };

            if jobs.send(job).is_err() {
                return bail("Worker pool disconnected");
            }
        }
    }
}
