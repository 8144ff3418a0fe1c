//! # Playback Continuation
//!
//! The pure decision of what happens when the current stream plays to its
//! end. Keeping it a function of plain values, with no store access and no
//! IO, makes the whole mode matrix table-testable.

use crate::settings::PlayMode;

/// What the engine should do after a natural end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationAction {
    /// Switch the current collection entry to the part at this index.
    AdvancePart(usize),
    /// Seek to zero and play the current entry again.
    Restart,
    /// Move the cursor to this playlist index and play it.
    Advance(usize),
    /// Wrap from the tail back to index zero and play.
    WrapToStart,
    /// Fetch fresh content from discovery, append and play it.
    FetchFresh,
    /// Do nothing; playback stops.
    Stop,
}

/// Decide the follow-up for a natural end.
///
/// `collection` carries `(active_part_index, part_count)` when the current
/// entry is a multi-part collection with a known active part. Part advance
/// wins over every mode except Single, which replays the current part.
pub fn next_action(
    mode: PlayMode,
    playlist_len: usize,
    cursor: Option<usize>,
    collection: Option<(usize, usize)>,
) -> ContinuationAction {
    let Some(cursor) = cursor else {
        return ContinuationAction::Stop;
    };
    if cursor >= playlist_len {
        return ContinuationAction::Stop;
    }

    if mode != PlayMode::Single {
        if let Some((active, count)) = collection {
            if active + 1 < count {
                return ContinuationAction::AdvancePart(active + 1);
            }
        }
    }

    let has_next = cursor + 1 < playlist_len;
    match mode {
        PlayMode::Single => ContinuationAction::Restart,
        PlayMode::Sequence => {
            if has_next {
                ContinuationAction::Advance(cursor + 1)
            } else {
                ContinuationAction::Stop
            }
        }
        PlayMode::Loop => {
            if has_next {
                ContinuationAction::Advance(cursor + 1)
            } else {
                ContinuationAction::WrapToStart
            }
        }
        PlayMode::Auto => {
            if has_next {
                ContinuationAction::Advance(cursor + 1)
            } else {
                ContinuationAction::FetchFresh
            }
        }
    }
}
