use super::{AppState, MAX_WRITE_ATTEMPTS};
use crate::error::{RoomError, RoomResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Identifies one submission across re-reads of the room
type SubmissionKey = (PlayerId, DateTime<Utc>);

fn key_of(submission: &PhotoSubmission) -> SubmissionKey {
    (submission.player_id.clone(), submission.submitted_at)
}

/// Ranking order: score descending (missing = 0), then earlier submission first
fn ranking_order(a: &PhotoSubmission, b: &PhotoSubmission) -> Ordering {
    b.ranking_score()
        .total_cmp(&a.ranking_score())
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
}

/// Submissions best-first
pub fn rank_submissions(submissions: &[PhotoSubmission]) -> Vec<&PhotoSubmission> {
    let mut ranked: Vec<_> = submissions.iter().collect();
    ranked.sort_by(|a, b| ranking_order(a, b));
    ranked
}

/// Winner of a round, if anyone submitted
pub fn pick_winner(submissions: &[PhotoSubmission]) -> Option<GameWinner> {
    rank_submissions(submissions)
        .first()
        .map(|best| GameWinner {
            player_id: best.player_id.clone(),
            player_name: best.player_name.clone(),
            score: best.ranking_score(),
        })
}

fn ensure_complete(room: &Room) -> RoomResult<()> {
    if room.all_submitted() {
        Ok(())
    } else {
        Err(RoomError::IncompleteSubmissions {
            submitted: room.submissions.len(),
            total: room.players.len(),
        })
    }
}

/// Apply computed scores to still-unscored submissions and freeze the winner.
/// Fails with `Conflict` if a submission appeared that was never scored.
fn finalize_round(room: &mut Room, scores: &HashMap<SubmissionKey, f64>) -> RoomResult<()> {
    ensure_complete(room)?;

    for submission in room.submissions.iter_mut().filter(|s| s.score.is_none()) {
        let score = scores
            .get(&key_of(submission))
            .ok_or_else(|| RoomError::Conflict(room.id.clone()))?;
        submission.score = Some(*score);
    }

    if room.winner.is_none() {
        room.winner = pick_winner(&room.submissions);
    }
    room.game_state = GameState::Results;
    Ok(())
}

impl AppState {
    /// Score the round and freeze the winner once everybody has submitted.
    ///
    /// Idempotent: a room whose winner is already frozen is returned as is.
    /// Judge calls run concurrently and outside the store write, so a slow
    /// judge never holds anything that other requests need.
    pub async fn compute_results(&self, room_id: &str) -> RoomResult<Room> {
        let room_id = normalize_room_id(room_id);
        let mut scores: HashMap<SubmissionKey, f64> = HashMap::new();

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let snapshot = self.get_room(&room_id).await?;
            ensure_complete(&snapshot)?;

            if snapshot.winner.is_some() && snapshot.game_state == GameState::Results {
                return Ok(snapshot);
            }

            self.score_missing(&snapshot, &mut scores).await;

            match self
                .update_room(&room_id, |room| finalize_round(room, &scores))
                .await
            {
                Ok((room, ())) => {
                    if let Some(winner) = &room.winner {
                        tracing::info!(
                            "Results for room {}: {} wins with {}",
                            room.id,
                            winner.player_name,
                            winner.score
                        );
                    }
                    return Ok(room);
                }
                // The round changed under us; score whatever is new and try again
                Err(RoomError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(RoomError::Conflict(room_id))
    }

    /// Ask the judge about every unscored submission we have no score for yet
    async fn score_missing(&self, room: &Room, scores: &mut HashMap<SubmissionKey, f64>) {
        let prompt = room.prompt.as_deref().unwrap_or_default();
        let pending: Vec<&PhotoSubmission> = room
            .submissions
            .iter()
            .filter(|s| s.score.is_none() && !scores.contains_key(&key_of(s)))
            .collect();

        if pending.is_empty() {
            return;
        }
        tracing::info!(
            "Scoring {} submissions in room {} with {}",
            pending.len(),
            room.id,
            self.judge.name()
        );

        let judged = futures::future::join_all(pending.into_iter().map(|s| async move {
            (key_of(s), self.judge.score(prompt, &s.image_data).await)
        }))
        .await;
        scores.extend(judged);
    }
}
