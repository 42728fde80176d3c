//! StreamingEngine - character-paced reveal of a complete reply
//!
//! The backend answers with one string; the engine appends an empty
//! assistant placeholder and grows it one character at a time so the reply
//! appears to be typed. Timing is driven by `tokio::time`, so tests can run
//! it on a paused clock.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use widget_core::{ConversationStore, Message, MessageDraft, Sequence, StoreError};

/// Timing of a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPacing {
    /// Pause after the placeholder appears, before the first character.
    pub initial_pause: Duration,
    pub char_delay: Duration,
    /// Line breaks linger longer than other characters.
    pub newline_delay: Duration,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            initial_pause: Duration::from_millis(300),
            char_delay: Duration::from_millis(18),
            newline_delay: Duration::from_millis(120),
        }
    }
}

impl RevealPacing {
    pub fn delay_for(&self, ch: char) -> Duration {
        if ch == '\n' {
            self.newline_delay
        } else {
            self.char_delay
        }
    }

    /// Wall time a completed reveal of `text` takes.
    pub fn total_duration(&self, text: &str) -> Duration {
        text.chars()
            .map(|ch| self.delay_for(ch))
            .fold(self.initial_pause, |total, delay| total + delay)
    }
}

/// One scheduled append: wait `delay`, then append `ch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStep {
    pub index: usize,
    pub ch: char,
    pub delay: Duration,
}

/// The ordered append schedule for `text`.
pub fn reveal_steps(text: &str, pacing: RevealPacing) -> impl Iterator<Item = RevealStep> + '_ {
    text.chars().enumerate().map(move |(index, ch)| RevealStep {
        index,
        ch,
        delay: pacing.delay_for(ch),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Every character was appended.
    Completed { sequence: Sequence, revealed: usize },
    /// Stopped early; the placeholder keeps what was revealed so far.
    Cancelled { sequence: Sequence, revealed: usize },
}

impl RevealOutcome {
    pub fn sequence(&self) -> Sequence {
        match self {
            Self::Completed { sequence, .. } | Self::Cancelled { sequence, .. } => *sequence,
        }
    }

    pub fn revealed(&self) -> usize {
        match self {
            Self::Completed { revealed, .. } | Self::Cancelled { revealed, .. } => *revealed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamingEngine {
    pacing: RevealPacing,
}

impl StreamingEngine {
    pub fn new(pacing: RevealPacing) -> Self {
        Self { pacing }
    }

    pub fn pacing(&self) -> &RevealPacing {
        &self.pacing
    }

    /// Reveal `full_text` into a new placeholder at the tail of `store`.
    ///
    /// Only one reveal may run per store. If another writer appends behind
    /// the placeholder the reveal stops with [`StoreError::PredicateFailed`].
    pub async fn reveal(
        &self,
        store: &ConversationStore,
        full_text: &str,
        cancel: &CancellationToken,
    ) -> Result<RevealOutcome, StoreError> {
        let sequence = store.append(MessageDraft::streaming_placeholder());
        let owns_placeholder = move |m: &Message| m.sequence() == sequence && m.is_streaming();

        log::debug!(
            "Revealing {} characters into message {}",
            full_text.chars().count(),
            sequence
        );

        let mut revealed = 0usize;
        if pause(self.pacing.initial_pause, cancel).await {
            for step in reveal_steps(full_text, self.pacing) {
                if !pause(step.delay, cancel).await {
                    break;
                }
                let mut buf = [0u8; 4];
                let chunk: &str = step.ch.encode_utf8(&mut buf);
                store.mutate_last(owns_placeholder, |m| {
                    m.append_text(chunk);
                })?;
                revealed = step.index + 1;
            }
        }

        store.mutate_last(owns_placeholder, Message::finish_streaming)?;

        if cancel.is_cancelled() && revealed < full_text.chars().count() {
            log::debug!(
                "Reveal of message {} cancelled after {} characters",
                sequence,
                revealed
            );
            Ok(RevealOutcome::Cancelled { sequence, revealed })
        } else {
            Ok(RevealOutcome::Completed { sequence, revealed })
        }
    }
}

/// Sleep for `delay`; `false` if cancelled first.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;
    use widget_core::StoreChange;

    use super::*;

    fn within(elapsed: Duration, expected: Duration) -> bool {
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5)
    }

    #[test]
    fn newline_takes_longer_than_other_characters() {
        let pacing = RevealPacing::default();
        assert!(pacing.delay_for('\n') > pacing.delay_for('a'));
        assert_eq!(pacing.delay_for('\n'), Duration::from_millis(120));
        assert_eq!(pacing.delay_for('é'), Duration::from_millis(18));
    }

    #[test]
    fn total_duration_sums_steps() {
        let pacing = RevealPacing::default();
        assert_eq!(pacing.total_duration(""), Duration::from_millis(300));
        assert_eq!(
            pacing.total_duration("ab\nc"),
            Duration::from_millis(300 + 18 + 18 + 120 + 18)
        );
    }

    #[test]
    fn steps_cover_every_character_once() {
        let steps: Vec<RevealStep> = reveal_steps("hé\n!", RevealPacing::default()).collect();
        let chars: String = steps.iter().map(|s| s.ch).collect();
        let indices: Vec<usize> = steps.iter().map(|s| s.index).collect();
        assert_eq!(chars, "hé\n!");
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(steps[2].delay, Duration::from_millis(120));
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_grows_placeholder_one_char_per_step() {
        let store = ConversationStore::with_greeting("hi");
        let mut changes = store.subscribe();
        let engine = StreamingEngine::default();
        let text = "Sure!\nOK";

        let outcome = engine
            .reveal(&store, text, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RevealOutcome::Completed {
                sequence: 1,
                revealed: 8
            }
        );
        assert_eq!(changes.try_recv().unwrap(), StoreChange::Appended { sequence: 1 });

        let mut lengths = Vec::new();
        while let Ok(StoreChange::Updated { text_len, .. }) = changes.try_recv() {
            lengths.push(text_len);
        }
        // one update per character, then the final freeze
        assert_eq!(lengths, vec![1, 2, 3, 4, 5, 6, 7, 8, 8]);

        let last = store.last().unwrap();
        assert_eq!(last.text(), text);
        assert!(!last.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_takes_scheduled_time() {
        let store = ConversationStore::new();
        let engine = StreamingEngine::default();

        let start = Instant::now();
        engine
            .reveal(&store, "abc", &CancellationToken::new())
            .await
            .unwrap();
        let plain = start.elapsed();

        let start = Instant::now();
        engine
            .reveal(&store, "a\nc", &CancellationToken::new())
            .await
            .unwrap();
        let with_newline = start.elapsed();

        assert!(within(plain, engine.pacing().total_duration("abc")));
        assert!(within(with_newline, engine.pacing().total_duration("a\nc")));
        assert!(with_newline > plain);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_reply_leaves_empty_finished_placeholder() {
        let store = ConversationStore::new();
        let outcome = StreamingEngine::default()
            .reveal(&store, "", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.revealed(), 0);
        assert!(matches!(outcome, RevealOutcome::Completed { .. }));
        let last = store.last().unwrap();
        assert_eq!(last.text(), "");
        assert!(!last.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_keeps_empty_placeholder() {
        let store = ConversationStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = StreamingEngine::default()
            .reveal(&store, "never shown", &cancel)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RevealOutcome::Cancelled {
                sequence: 0,
                revealed: 0
            }
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.last().unwrap().text(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_reveal_keeps_partial_text() {
        let store = Arc::new(ConversationStore::new());
        let cancel = CancellationToken::new();

        let task = {
            let store = Arc::clone(&store);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                StreamingEngine::default()
                    .reveal(&store, "Hello world", &cancel)
                    .await
            })
        };

        // 300ms pause plus three characters at 18ms each
        tokio::time::sleep(Duration::from_millis(300 + 3 * 18 + 5)).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            RevealOutcome::Cancelled {
                sequence: 0,
                revealed: 3
            }
        );
        let last = store.last().unwrap();
        assert_eq!(last.text(), "Hel");
        assert!(!last.is_streaming());

        // nothing more is appended afterwards
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.last().unwrap().text(), "Hel");
    }

    #[tokio::test(start_paused = true)]
    async fn interleaved_writer_stops_reveal() {
        let store = Arc::new(ConversationStore::new());

        let task = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                StreamingEngine::default()
                    .reveal(&store, "abc", &CancellationToken::new())
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        store.append(MessageDraft::user("sneaky"));

        let result = task.await.unwrap();
        assert_eq!(result, Err(StoreError::PredicateFailed { sequence: 1 }));
        assert_eq!(store.snapshot()[0].text(), "");
    }
}
