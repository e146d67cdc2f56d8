//! Typed-lag smoother: paces character-by-character output with a queue-length-
//! dependent delay so bursty upstream text reads as a steady, human-paced typing
//! cadence downstream.

use futures::stream::Stream;
use std::pin::Pin;
use tokio_stream::wrappers::ReceiverStream;

/// Stream of paced output characters.
pub type CharStream = Pin<Box<dyn Stream<Item = char> + Send>>;

/// Paces a block of text into a stream of single characters, sleeping between each
/// one for a delay that shrinks as the pending queue grows.
///
/// `D₀` (`initial_delay_ms`) is the per-character delay when the queue is empty;
/// `Q₀` (`zero_delay_queue`) is the queue length at which the delay saturates to zero.
pub struct TypedLagSmoother {
    initial_delay_ms: u64,
    zero_delay_queue: u64,
}

impl TypedLagSmoother {
    pub fn new(initial_delay_ms: u64, zero_delay_queue: u64) -> Self {
        Self {
            initial_delay_ms,
            zero_delay_queue,
        }
    }

    /// `delay(queue_len) = max(0, D₀ - (D₀ / Q₀) * queue_len)`, in milliseconds.
    fn delay_ms(&self, queue_len: u64) -> u64 {
        if self.zero_delay_queue == 0 {
            return 0;
        }
        let raw = self.initial_delay_ms as i64
            - (self.initial_delay_ms as i64 * queue_len as i64) / self.zero_delay_queue as i64;
        raw.max(0) as u64
    }

    /// Pace `text` into a stream of characters, each yielded after its computed delay.
    ///
    /// Characters are pushed onto an internal queue up front and drained one at a time,
    /// so `queue_len` in the delay formula reflects how many characters are still
    /// waiting behind the one about to be emitted.
    pub fn smooth(&self, text: &str) -> CharStream {
        let chars: Vec<char> = text.chars().collect();
        let initial_delay_ms = self.initial_delay_ms;
        let zero_delay_queue = self.zero_delay_queue;
        let (tx, rx) = tokio::sync::mpsc::channel(chars.len().max(1));

        tokio::spawn(async move {
            let smoother = TypedLagSmoother::new(initial_delay_ms, zero_delay_queue);
            let total = chars.len();
            for (i, ch) in chars.into_iter().enumerate() {
                let queue_len = (total - i - 1) as u64;
                let delay = smoother.delay_ms(queue_len);
                if delay > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
                if tx.send(ch).await.is_err() {
                    break;
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

impl Default for TypedLagSmoother {
    fn default() -> Self {
        Self::new(32, 64)
    }
}
