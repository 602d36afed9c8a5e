use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;

use super::api::{TriviaApi, TriviaError};
use super::normalize::{normalize, Trivia};
use super::{Answer, Category, Difficulty, Progress, QuestionType, Question, QuizParameters};

/// What became of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Refused by the progress guard; nothing was sent.
    Suppressed,
    /// The store was reset or re-dispatched while the request was in flight; the response was dropped.
    Stale,
    Finished(Progress),
}

/// Source of wall-clock timestamps in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    pub progress: Progress,
    pub parameters: QuizParameters,
    pub questions: Vec<Question>,
    /// Epoch millis of the last successful fetch, 0 when unset.
    pub start: i64,
    /// Epoch millis of the last submission, 0 when unset.
    pub end: i64,
}

impl QuizState {
    pub fn is_submitted(&self) -> bool {
        self.end > self.start && self.start > 0
    }
}

#[derive(Default)]
struct Inner {
    state: QuizState,
    generation: u64,
}

/// One quiz session: parameters, fetched questions, answers and timestamps.
///
/// All mutation goes through the methods below; each one holds the lock for its whole
/// update so readers never observe a partial transition.
pub struct QuizStore {
    api: Arc<dyn TriviaApi>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    inner: Mutex<Inner>,
}

impl QuizStore {
    pub fn new(api: Arc<dyn TriviaApi>) -> Self {
        Self::with_parts(api, Arc::new(SystemClock), StdRng::from_entropy())
    }

    pub fn with_parts(api: Arc<dyn TriviaApi>, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            api,
            clock,
            rng: Mutex::new(rng),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn snapshot(&self) -> QuizState {
        self.inner.lock().await.state.clone()
    }

    pub async fn progress(&self) -> Progress {
        self.inner.lock().await.state.progress
    }

    pub async fn parameters(&self) -> QuizParameters {
        self.inner.lock().await.state.parameters.clone()
    }

    pub async fn questions(&self) -> Vec<Question> {
        self.inner.lock().await.state.questions.clone()
    }

    pub async fn question(&self, index: usize) -> Option<Question> {
        self.inner.lock().await.state.questions.get(index).cloned()
    }

    pub async fn set_category(&self, category: Category) {
        self.inner.lock().await.state.parameters.category = category;
    }

    pub async fn set_difficulty(&self, difficulty: Difficulty) {
        self.inner.lock().await.state.parameters.difficulty = difficulty;
    }

    pub async fn set_type(&self, question_type: QuestionType) {
        self.inner.lock().await.state.parameters.question_type = question_type;
    }

    /// Out-of-range counts are ignored. Returns whether the value was stored.
    pub async fn set_count(&self, count: u32) -> bool {
        let accepted = self.inner.lock().await.state.parameters.set_count(count);
        if !accepted {
            debug!("Rejected question count {}", count);
        }
        accepted
    }

    /// Records a given answer. Indices past the end of the question set are ignored.
    pub async fn answer_question(&self, answer: Answer) {
        let mut inner = self.inner.lock().await;
        match inner.state.questions.get_mut(answer.index) {
            Some(question) => question.given_answer = answer.answer,
            None => debug!("Ignoring answer for missing question {}", answer.index),
        }
    }

    /// Stamps the submission time. Calling it again moves the stamp forward.
    pub async fn submit_quiz(&self) {
        let now = self.clock.now_millis();
        self.inner.lock().await.state.end = now;
    }

    pub async fn reset_quiz(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = QuizState::default();
        inner.generation += 1;
    }

    /// Requests a new question set built from the current parameters.
    ///
    /// Suppressed while another request is pending. The parameters are captured at dispatch,
    /// so later changes only affect the next fetch.
    pub async fn fetch_quiz(&self) -> FetchOutcome {
        let (parameters, generation) = {
            let mut inner = self.inner.lock().await;
            if !inner.state.progress.allows_quiz_fetch() {
                debug!("Quiz fetch suppressed, a request is already in flight");
                return FetchOutcome::Suppressed;
            }
            inner.state.progress = Progress::Pending;
            inner.state.start = 0;
            inner.state.end = 0;
            inner.generation += 1;
            (inner.state.parameters.clone(), inner.generation)
        };

        let query = parameters.to_query();
        info!("Fetching quiz: {}", query);
        let result = self.load(&query).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            info!("Discarding stale quiz response for {}", query);
            return FetchOutcome::Stale;
        }

        match result {
            Ok(questions) => {
                info!("Quiz ready with {} questions", questions.len());
                inner.state.questions = questions;
                inner.state.progress = Progress::Success;
                inner.state.start = self.clock.now_millis();
                inner.state.end = 0;
            }
            Err(err) => {
                warn!("Failed to fetch quiz: {}", err);
                inner.state.progress = Progress::Error;
                inner.state.start = 0;
                inner.state.end = 0;
            }
        }

        FetchOutcome::Finished(inner.state.progress)
    }

    async fn load(&self, query: &str) -> Result<Vec<Question>, TriviaError> {
        let body = self.api.get(query).await?;
        let entries = serde_json::from_value::<Trivia>(body)?.into_entries()?;

        let mut rng = self.rng.lock().await;
        Ok(normalize(entries, &mut *rng))
    }
}

/// Lazily created quiz sessions, one per chat.
pub struct QuizSessions {
    api: Arc<dyn TriviaApi>,
    sessions: Mutex<HashMap<i64, Arc<QuizStore>>>,
}

impl QuizSessions {
    pub fn new(api: Arc<dyn TriviaApi>) -> Self {
        Self {
            api,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, chat_id: i64) -> Arc<QuizStore> {
        self.sessions
            .lock()
            .await
            .entry(chat_id)
            .or_insert_with(|| {
                debug!("Creating quiz session for chat {}", chat_id);
                Arc::new(QuizStore::new(self.api.clone()))
            })
            .clone()
    }

    /// Drops the chat's session; the next `get` starts from a fresh store.
    pub async fn remove(&self, chat_id: i64) {
        let removed = self.sessions.lock().await.remove(&chat_id);
        if let Some(store) = removed {
            debug!("Dropping quiz session for chat {}", chat_id);
            store.reset_quiz().await;
        }
    }
}
