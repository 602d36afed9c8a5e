use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

use super::api::{ResponseCode, TriviaError};
use super::{entities, Question};

/// Body of a quiz request.
#[derive(Debug, Clone, Deserialize)]
pub struct Trivia {
    pub response_code: i64,
    #[serde(default)]
    pub results: Vec<TriviaEntry>,
}

impl Trivia {
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.response_code)
    }

    /// Entries of an accepted response; a non-zero `response_code` is an error.
    pub fn into_entries(self) -> Result<Vec<TriviaEntry>, TriviaError> {
        match self.response_code() {
            ResponseCode::Success => Ok(self.results),
            code => Err(TriviaError::ResponseCode(code)),
        }
    }
}

/// One raw question as delivered by the API, still HTML-escaped.
#[derive(Debug, Clone, Deserialize)]
pub struct TriviaEntry {
    #[serde(default)]
    pub category: String,
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

pub fn normalize<R: Rng + ?Sized>(entries: Vec<TriviaEntry>, rng: &mut R) -> Vec<Question> {
    entries
        .into_iter()
        .map(|entry| normalize_entry(entry, &mut *rng))
        .collect()
}

fn normalize_entry<R: Rng + ?Sized>(entry: TriviaEntry, rng: &mut R) -> Question {
    let TriviaEntry {
        category,
        question,
        correct_answer,
        mut incorrect_answers,
    } = entry;
    log::trace!("[{}] {}", category, question);

    // We shuffle the answers so the correct one isn't always the last one
    incorrect_answers.push(correct_answer.clone());
    incorrect_answers.shuffle(rng);

    let all_answers = incorrect_answers
        .iter()
        .map(|answer| entities::decode(answer))
        .collect();

    Question::new(
        entities::decode(&question),
        all_answers,
        entities::decode(&correct_answer),
    )
}
