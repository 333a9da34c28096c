use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use tracing::{debug, info, warn};

use quiz_core::model::{
    AnswerOutcome, AnswerRecord, Difficulty, Provenance, Question, RawQuestion, RoundResults,
};
use quiz_core::{CategoryCount, Clock, QuestionCatalog, RawInput, normalize};

use super::plan::{RoundBuilder, RoundPlan};
use super::progress::RoundProgress;
use crate::config::DEFAULT_TIME_LIMIT_SECS;
use crate::error::{GenerationError, SessionError};
use crate::source::validate_request;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    InRound,
    RoundComplete,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoundState::Idle => "idle",
            RoundState::InRound => "in a round",
            RoundState::RoundComplete => "between rounds",
        })
    }
}

//
// ─── GENERATION HANDSHAKE ──────────────────────────────────────────────────────
//

/// Claim on the single generation slot of a session.
///
/// Superseded by starting a round, cancelling, or dropping the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    topic: String,
    count: usize,
}

impl GenerationTicket {
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// What happened to a finished generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationApplied {
    /// The batch passed validation and was added to the catalog.
    Accepted(Vec<Question>),
    /// The session had moved on; the result was dropped untouched.
    Ignored,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single-player quiz state machine.
///
/// Owns a catalog, picks a shuffled subset per round and steps through it.
/// Checking an answer and moving to the next question are separate calls so
/// either auto-advance or manual-advance front ends can sit on top.
///
/// Each question has an answer window (15 s unless configured). An answer
/// submitted after the window closed is logged as a timeout.
pub struct QuizSession {
    catalog: QuestionCatalog,
    clock: Clock,
    time_limit: Option<Duration>,
    rng: StdRng,
    state: RoundState,
    category: String,
    difficulty: Option<Difficulty>,
    active_set: Vec<Question>,
    cursor: usize,
    score: u32,
    answer_log: Vec<AnswerRecord>,
    shown_at: Option<DateTime<Utc>>,
    next_ticket: u64,
    pending: Option<u64>,
}

impl QuizSession {
    #[must_use]
    pub fn new(catalog: QuestionCatalog) -> Self {
        Self {
            catalog,
            clock: Clock::default(),
            time_limit: Some(Duration::seconds(DEFAULT_TIME_LIMIT_SECS)),
            rng: StdRng::from_os_rng(),
            state: RoundState::Idle,
            category: String::new(),
            difficulty: None,
            active_set: Vec::new(),
            cursor: 0,
            score: 0,
            answer_log: Vec::new(),
            shown_at: None,
            next_ticket: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Deterministic shuffling, for tests and replays.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Answer window per question; `None` lets every question wait indefinitely.
    #[must_use]
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit.filter(|l| *l > Duration::zero());
        self
    }

    /// Swap the clock used to time answers.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Time left to answer the current question, clamped at zero.
    ///
    /// `None` without a limit, outside a round, or once the question is answered.
    #[must_use]
    pub fn time_remaining(&self) -> Option<Duration> {
        if self.state != RoundState::InRound || self.answer_log.len() > self.cursor {
            return None;
        }
        let limit = self.time_limit?;
        let elapsed = self.clock.elapsed_since(self.shown_at?);
        Some((limit - elapsed).max(Duration::zero()))
    }

    /// Whether the current question's answer window has closed.
    #[must_use]
    pub fn is_time_up(&self) -> bool {
        self.time_remaining().is_some_and(|left| left <= Duration::zero())
    }

    #[must_use]
    pub fn state(&self) -> RoundState {
        self.state
    }

    #[must_use]
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Replace the whole catalog. The active round, if any, keeps its questions.
    pub fn reload_catalog(&mut self, catalog: QuestionCatalog) {
        self.catalog = catalog;
    }

    #[must_use]
    pub fn categories(&self) -> Vec<CategoryCount> {
        self.catalog.categories()
    }

    #[must_use]
    pub fn active_set(&self) -> &[Question] {
        &self.active_set
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn answer_log(&self) -> &[AnswerRecord] {
        &self.answer_log
    }

    #[must_use]
    pub fn progress(&self) -> RoundProgress {
        RoundProgress {
            total: self.active_set.len(),
            answered: self.answer_log.len(),
            remaining: self.active_set.len().saturating_sub(self.answer_log.len()),
            score: self.score,
            is_complete: self.state == RoundState::RoundComplete,
            time_remaining: self.time_remaining(),
        }
    }

    //
    // ─── ROUND LIFECYCLE ───────────────────────────────────────────────────────
    //

    /// Start a round over the catalog's questions in `category` (and `difficulty`).
    ///
    /// Allowed in any state; an unfinished round is abandoned. Returns the round length.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyCategory` if nothing matches; the session is unchanged.
    pub fn start_round(
        &mut self,
        category: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<usize, SessionError> {
        let plan = RoundBuilder::new(category)
            .with_difficulty(difficulty)
            .build(self.catalog.questions(), &mut self.rng);
        self.enter_round(plan)
    }

    /// Like [`QuizSession::start_round`], but drawing from `pool` instead of the catalog.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyCategory` if nothing in `pool` matches.
    pub fn start_round_with(
        &mut self,
        category: &str,
        difficulty: Option<Difficulty>,
        pool: &[Question],
    ) -> Result<usize, SessionError> {
        let plan = RoundBuilder::new(category)
            .with_difficulty(difficulty)
            .build(pool, &mut self.rng);
        self.enter_round(plan)
    }

    fn enter_round(&mut self, plan: RoundPlan) -> Result<usize, SessionError> {
        if plan.is_empty() {
            return Err(SessionError::EmptyCategory {
                category: plan.category,
                difficulty: plan.difficulty,
            });
        }

        if self.state == RoundState::InRound {
            debug!(
                category = %self.category,
                answered = self.answer_log.len(),
                "abandoning unfinished round"
            );
        }
        if self.pending.take().is_some() {
            debug!("new round supersedes outstanding generation request");
        }

        let total = plan.questions.len();
        self.category = plan.category;
        self.difficulty = plan.difficulty;
        self.active_set = plan.questions;
        self.cursor = 0;
        self.score = 0;
        self.answer_log = Vec::new();
        self.shown_at = Some(self.clock.now());
        self.state = RoundState::InRound;

        info!(
            category = %self.category,
            difficulty = self.difficulty.map_or("any", Difficulty::as_str),
            total,
            "round started"
        );
        Ok(total)
    }

    /// The question at the cursor, or `None` once the round is exhausted.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.active_set.get(self.cursor)
    }

    /// Check `choice` against the current question and log it. Does not advance.
    ///
    /// Any index other than the correct one, including out-of-range ones, counts as wrong.
    /// If the answer window already closed, the choice is discarded and the
    /// question is logged as timed out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside a round, or
    /// `SessionError::AlreadyAnswered` if the current question already has an entry.
    pub fn submit_answer(&mut self, choice: usize) -> Result<AnswerOutcome, SessionError> {
        self.record(Some(choice), "submit_answer")
    }

    /// Move past the answered current question.
    ///
    /// Returns `true` while questions remain; `false` when the round just completed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside a round, or
    /// `SessionError::NotAnswered` if the current question has no log entry yet.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        self.ensure_in_round("advance")?;
        if self.answer_log.len() <= self.cursor {
            return Err(SessionError::NotAnswered {
                question_index: self.cursor,
            });
        }

        self.cursor += 1;
        if self.cursor >= self.active_set.len() {
            self.state = RoundState::RoundComplete;
            self.shown_at = None;
            info!(
                category = %self.category,
                score = self.score,
                total = self.active_set.len(),
                "round complete"
            );
            return Ok(false);
        }

        self.shown_at = Some(self.clock.now());
        Ok(true)
    }

    /// Time ran out: log the current question as unanswered, then advance.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSession::submit_answer`].
    pub fn timeout_current(&mut self) -> Result<bool, SessionError> {
        self.record(None, "timeout_current")?;
        self.advance()
    }

    /// Score report for the current or just-finished round.
    ///
    /// Mid-round this reflects the answers logged so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if no round has been started.
    pub fn results(&self) -> Result<RoundResults, SessionError> {
        if self.state == RoundState::Idle {
            return Err(SessionError::InvalidState {
                operation: "results",
                state: self.state,
            });
        }
        Ok(RoundResults::from_log(
            &self.category,
            self.difficulty,
            &self.active_set,
            &self.answer_log,
        ))
    }

    fn ensure_in_round(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state == RoundState::InRound {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn record(
        &mut self,
        choice: Option<usize>,
        operation: &'static str,
    ) -> Result<AnswerOutcome, SessionError> {
        self.ensure_in_round(operation)?;
        if self.answer_log.len() > self.cursor {
            return Err(SessionError::AlreadyAnswered {
                question_index: self.cursor,
            });
        }
        let Some(question) = self.active_set.get(self.cursor) else {
            return Err(SessionError::InvalidState {
                operation,
                state: self.state,
            });
        };

        let late = choice.is_some() && self.is_time_up();
        if late {
            debug!(question_index = self.cursor, ?choice, "answer arrived after the time limit");
        }
        let choice = choice.filter(|_| !late);

        let correct = choice.is_some_and(|c| question.is_correct(c));
        let outcome = AnswerOutcome {
            correct,
            chosen_index: choice,
            correct_index: question.correct_index(),
            score: self.score + u32::from(correct),
            explanation: question.explanation().map(str::to_owned),
        };

        let elapsed = self.shown_at.map(|at| self.clock.elapsed_since(at));
        self.answer_log.push(AnswerRecord {
            question_index: self.cursor,
            chosen_index: choice,
            correct,
            elapsed,
        });
        self.score = outcome.score;

        debug!(
            question_index = self.cursor,
            ?choice,
            correct,
            score = self.score,
            "answer recorded"
        );
        Ok(outcome)
    }

    //
    // ─── GENERATION ────────────────────────────────────────────────────────────
    //

    /// Reserve the session's generation slot for `count` questions on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::GenerationPending` if a request is already outstanding,
    /// or `SessionError::Generation` for an invalid topic/count.
    pub fn begin_generation(
        &mut self,
        topic: &str,
        count: usize,
    ) -> Result<GenerationTicket, SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::GenerationPending);
        }
        validate_request(topic, count)?;

        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        Ok(GenerationTicket {
            id: self.next_ticket,
            topic: topic.trim().to_owned(),
            count,
        })
    }

    /// Drop the outstanding request, if any. Its result will be ignored.
    pub fn cancel_generation(&mut self) {
        if self.pending.take().is_some() {
            debug!("generation request cancelled");
        }
    }

    #[must_use]
    pub fn generation_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply a finished generation request all-or-nothing.
    ///
    /// Records are tagged with the ticket's topic as category. The batch is
    /// accepted only if every record validates and the count matches the
    /// request; the catalog is then replaced by one extended with the batch.
    ///
    /// # Errors
    ///
    /// Returns the source's `GenerationError`, `CountMismatch`, or `Malformed`;
    /// the catalog is unchanged in every error case.
    pub fn apply_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Vec<RawQuestion>, GenerationError>,
    ) -> Result<GenerationApplied, GenerationError> {
        if self.pending != Some(ticket.id) {
            debug!(topic = %ticket.topic, "ignoring stale generation result");
            return Ok(GenerationApplied::Ignored);
        }
        self.pending = None;

        let records = result?;
        if records.len() != ticket.count {
            warn!(
                topic = %ticket.topic,
                requested = ticket.count,
                returned = records.len(),
                "generated batch has the wrong size"
            );
            return Err(GenerationError::CountMismatch {
                requested: ticket.count,
                returned: records.len(),
            });
        }

        let tagged = records
            .into_iter()
            .map(|r| r.with_category(ticket.topic.clone()))
            .collect();
        let normalized = normalize(&RawInput::Flat(tagged), Provenance::Generated);
        if let Some(rejected) = normalized.rejected.first() {
            warn!(
                topic = %ticket.topic,
                rejected = normalized.rejected.len(),
                reason = %rejected.reason,
                "generated batch failed validation"
            );
            return Err(GenerationError::Malformed(format!(
                "{} of {} records invalid, first: {}",
                normalized.rejected.len(),
                ticket.count,
                rejected.reason
            )));
        }

        let batch = normalized.questions;
        self.catalog = self.catalog.extended(&batch);
        info!(topic = %ticket.topic, added = batch.len(), "generated questions accepted");
        Ok(GenerationApplied::Accepted(batch))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("state", &self.state)
            .field("catalog_len", &self.catalog.len())
            .field("category", &self.category)
            .field("difficulty", &self.difficulty)
            .field("active_len", &self.active_set.len())
            .field("cursor", &self.cursor)
            .field("score", &self.score)
            .field("time_limit", &self.time_limit)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::{fixed_clock, fixed_now};

    fn question(category: &str, difficulty: Difficulty, text: &str, answer: i64) -> Question {
        RawQuestion::new(text, ["a", "b", "c", "d"], answer)
            .with_explanation(format!("because {text}"))
            .validate(Some(category), Some(difficulty), Provenance::Static)
            .unwrap()
    }

    fn session() -> QuizSession {
        let catalog = QuestionCatalog::new(vec![
            question("Math", Difficulty::Easy, "1 + 1", 1),
            question("Math", Difficulty::Hard, "d/dx x^2", 2),
            question("Math", Difficulty::Easy, "2 * 3", 3),
            question("Art", Difficulty::Medium, "Mona Lisa", 0),
        ]);
        QuizSession::new(catalog)
            .with_clock(fixed_clock())
            .with_seed(3)
    }

    #[test]
    fn new_session_is_idle() {
        let s = session();
        assert_eq!(s.state(), RoundState::Idle);
        assert!(s.current_question().is_none());
        assert!(matches!(
            s.results(),
            Err(SessionError::InvalidState {
                operation: "results",
                state: RoundState::Idle
            })
        ));
    }

    #[test]
    fn idle_session_rejects_answers_and_advance() {
        let mut s = session();
        assert!(matches!(
            s.submit_answer(0),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(matches!(s.advance(), Err(SessionError::InvalidState { .. })));
        assert!(matches!(
            s.timeout_current(),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(s.answer_log().is_empty());
    }

    #[test]
    fn start_round_filters_and_resets() {
        let mut s = session();
        assert_eq!(s.start_round("Math", Some(Difficulty::Easy)).unwrap(), 2);
        assert_eq!(s.state(), RoundState::InRound);
        assert_eq!(s.cursor(), 0);
        assert!(
            s.active_set()
                .iter()
                .all(|q| q.category() == "Math" && q.difficulty() == Difficulty::Easy)
        );
    }

    #[test]
    fn empty_category_leaves_prior_round_intact() {
        let mut s = session();
        s.start_round("Math", None).unwrap();
        s.submit_answer(0).unwrap();
        let before = s.active_set().to_vec();

        let err = s.start_round("Math", Some(Difficulty::Expert)).unwrap_err();

        assert_eq!(
            err,
            SessionError::EmptyCategory {
                category: "Math".into(),
                difficulty: Some(Difficulty::Expert),
            }
        );
        assert_eq!(s.state(), RoundState::InRound);
        assert_eq!(s.active_set(), before.as_slice());
        assert_eq!(s.answer_log().len(), 1);
    }

    #[test]
    fn answer_then_advance_walks_the_round() {
        let mut s = session();
        s.start_round("Math", None).unwrap();
        let mut correct = 0;

        for i in 0..3 {
            assert_eq!(s.cursor(), i);
            assert_eq!(s.answer_log().len(), i);
            let q = s.current_question().unwrap().clone();
            let choice = if i == 1 {
                (q.correct_index() + 1) % 4
            } else {
                q.correct_index()
            };
            let outcome = s.submit_answer(choice).unwrap();
            if outcome.correct {
                correct += 1;
            }
            assert_eq!(outcome.correct_index, q.correct_index());
            assert_eq!(outcome.explanation.as_deref(), q.explanation());
            assert_eq!(s.cursor(), i, "submit must not advance");
            assert_eq!(s.advance().unwrap(), i < 2);
        }

        assert_eq!(s.state(), RoundState::RoundComplete);
        assert_eq!(s.score(), correct);
        assert_eq!(s.answer_log().len(), 3);
        assert!(s.current_question().is_none());
    }

    #[test]
    fn double_submit_and_early_advance_are_refused() {
        let mut s = session();
        s.start_round("Math", None).unwrap();

        assert_eq!(
            s.advance().unwrap_err(),
            SessionError::NotAnswered { question_index: 0 }
        );
        s.submit_answer(0).unwrap();
        let score = s.score();
        assert_eq!(
            s.submit_answer(1).unwrap_err(),
            SessionError::AlreadyAnswered { question_index: 0 }
        );
        assert_eq!(s.score(), score);
        assert_eq!(s.answer_log().len(), 1);
    }

    #[test]
    fn out_of_range_choice_is_logged_as_wrong() {
        let mut s = session();
        s.start_round("Art", None).unwrap();

        let outcome = s.submit_answer(99).unwrap();

        assert!(!outcome.correct);
        assert_eq!(s.score(), 0);
        assert_eq!(s.answer_log()[0].chosen_index, Some(99));
        assert!(!s.answer_log()[0].correct);
    }

    #[test]
    fn timeout_logs_no_choice_and_advances() {
        let mut s = session();
        s.start_round("Math", Some(Difficulty::Easy)).unwrap();

        assert!(s.timeout_current().unwrap());

        assert_eq!(s.cursor(), 1);
        let entry = &s.answer_log()[0];
        assert_eq!(entry.chosen_index, None);
        assert!(!entry.correct);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn elapsed_is_measured_from_when_question_was_shown() {
        let mut s = session();
        s.start_round("Art", None).unwrap();
        s.set_clock(Clock::fixed(fixed_now() + Duration::seconds(9)));

        s.submit_answer(0).unwrap();

        assert_eq!(s.answer_log()[0].elapsed, Some(Duration::seconds(9)));
    }

    #[test]
    fn answer_after_the_limit_counts_as_timeout() {
        let mut s = session();
        s.start_round("Art", None).unwrap();
        assert_eq!(s.time_remaining(), Some(Duration::seconds(15)));

        s.set_clock(Clock::fixed(fixed_now() + Duration::seconds(16)));
        assert!(s.is_time_up());
        assert_eq!(s.progress().time_remaining, Some(Duration::zero()));

        let correct = s.current_question().unwrap().correct_index();
        let outcome = s.submit_answer(correct).unwrap();

        assert!(!outcome.correct);
        assert!(outcome.timed_out());
        assert_eq!(s.score(), 0);
        let entry = &s.answer_log()[0];
        assert_eq!(entry.chosen_index, None);
        assert!(!entry.correct);
        assert_eq!(entry.elapsed, Some(Duration::seconds(16)));
    }

    #[test]
    fn answer_just_inside_the_limit_is_scored() {
        let mut s = session();
        s.start_round("Art", None).unwrap();
        s.set_clock(Clock::fixed(fixed_now() + Duration::seconds(14)));

        let correct = s.current_question().unwrap().correct_index();
        let outcome = s.submit_answer(correct).unwrap();

        assert!(outcome.correct);
        assert_eq!(s.score(), 1);
        assert_eq!(s.time_remaining(), None);
    }

    #[test]
    fn limit_restarts_for_each_question() {
        let mut s = session().with_time_limit(Some(Duration::seconds(5)));
        s.start_round("Math", None).unwrap();
        s.set_clock(Clock::fixed(fixed_now() + Duration::seconds(4)));
        s.submit_answer(0).unwrap();
        s.advance().unwrap();

        s.set_clock(Clock::fixed(fixed_now() + Duration::seconds(8)));
        assert_eq!(s.time_remaining(), Some(Duration::seconds(1)));
        assert!(!s.is_time_up());
    }

    #[test]
    fn without_a_limit_late_answers_still_count() {
        let mut s = session().with_time_limit(None);
        s.start_round("Art", None).unwrap();
        s.set_clock(Clock::fixed(fixed_now() + Duration::hours(1)));

        assert_eq!(s.time_remaining(), None);
        let correct = s.current_question().unwrap().correct_index();
        assert!(s.submit_answer(correct).unwrap().correct);
    }

    #[test]
    fn completed_round_refuses_further_answers() {
        let mut s = session();
        s.start_round("Art", None).unwrap();
        s.submit_answer(0).unwrap();
        assert!(!s.advance().unwrap());

        assert!(matches!(
            s.submit_answer(0),
            Err(SessionError::InvalidState {
                state: RoundState::RoundComplete,
                ..
            })
        ));
        assert!(matches!(s.advance(), Err(SessionError::InvalidState { .. })));
    }

    #[test]
    fn restart_mid_round_discards_previous_log() {
        let mut s = session();
        s.start_round("Math", None).unwrap();
        s.submit_answer(0).unwrap();
        s.advance().unwrap();

        s.start_round("Math", None).unwrap();

        assert_eq!(s.cursor(), 0);
        assert_eq!(s.score(), 0);
        assert!(s.answer_log().is_empty());
        assert_eq!(s.progress().remaining, 3);
    }

    #[test]
    fn progress_tracks_position() {
        let mut s = session();
        s.start_round("Math", None).unwrap();
        s.submit_answer(s.current_question().unwrap().correct_index()).unwrap();

        assert_eq!(
            s.progress(),
            RoundProgress {
                total: 3,
                answered: 1,
                remaining: 2,
                score: 1,
                is_complete: false,
                time_remaining: None,
            }
        );
    }

    #[test]
    fn categories_reflect_catalog() {
        let s = session();
        let names: Vec<_> = s
            .categories()
            .into_iter()
            .map(|c| (c.category, c.count))
            .collect();
        assert_eq!(names, vec![("Math".to_string(), 3), ("Art".to_string(), 1)]);
    }

    fn generated(n: usize) -> Vec<RawQuestion> {
        (0..n)
            .map(|i| {
                RawQuestion::new(format!("Volcano {i}"), ["a", "b", "c", "d"], 1)
                    .with_difficulty("Hard")
            })
            .collect()
    }

    #[test]
    fn accepted_batch_extends_catalog_under_topic() {
        let mut s = session();
        let ticket = s.begin_generation("Volcanoes", 2).unwrap();

        let applied = s.apply_generation(ticket, Ok(generated(2))).unwrap();

        let GenerationApplied::Accepted(batch) = applied else {
            panic!("expected accepted batch");
        };
        assert_eq!(batch.len(), 2);
        for q in &batch {
            assert_eq!(q.category(), "Volcanoes");
            assert_eq!(q.source(), Provenance::Generated);
            assert_eq!(q.difficulty(), Difficulty::Hard);
        }
        assert_eq!(s.catalog().len(), 6);
        assert!(!s.generation_pending());
        assert_eq!(s.start_round_with("Volcanoes", None, &batch).unwrap(), 2);
    }

    #[test]
    fn malformed_batch_is_rejected_whole() {
        let mut s = session();
        let mut records = generated(3);
        records[1].options = Some(vec!["only one".into()]);
        let ticket = s.begin_generation("Volcanoes", 3).unwrap();

        let err = s.apply_generation(ticket, Ok(records)).unwrap_err();

        assert!(matches!(err, GenerationError::Malformed(_)));
        assert_eq!(s.catalog().len(), 4);
    }

    #[test]
    fn only_one_generation_in_flight() {
        let mut s = session();
        let _ticket = s.begin_generation("Volcanoes", 2).unwrap();
        assert_eq!(
            s.begin_generation("Oceans", 2).unwrap_err(),
            SessionError::GenerationPending
        );
    }

    #[test]
    fn invalid_requests_do_not_take_the_slot() {
        let mut s = session();
        assert!(matches!(
            s.begin_generation("Volcanoes", 21),
            Err(SessionError::Generation(GenerationError::InvalidRequest(_)))
        ));
        assert!(!s.generation_pending());
    }

    #[test]
    fn starting_a_round_supersedes_pending_generation() {
        let mut s = session();
        let ticket = s.begin_generation("Volcanoes", 2).unwrap();
        s.start_round("Art", None).unwrap();

        let applied = s.apply_generation(ticket, Ok(generated(2))).unwrap();

        assert_eq!(applied, GenerationApplied::Ignored);
        assert_eq!(s.catalog().len(), 4);
    }

    #[test]
    fn cancelled_ticket_is_ignored_even_after_new_request() {
        let mut s = session();
        let old = s.begin_generation("Volcanoes", 2).unwrap();
        s.cancel_generation();
        let fresh = s.begin_generation("Volcanoes", 2).unwrap();

        assert_eq!(
            s.apply_generation(old, Ok(generated(2))).unwrap(),
            GenerationApplied::Ignored
        );
        assert!(s.generation_pending());
        assert!(matches!(
            s.apply_generation(fresh, Ok(generated(2))).unwrap(),
            GenerationApplied::Accepted(_)
        ));
    }
}
