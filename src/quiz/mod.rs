pub mod api;
pub mod category;
pub mod entities;
pub mod normalize;
pub mod query;
pub mod stats;
pub mod store;

use std::ops::RangeInclusive;

/// A trivia category as served by the API.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

impl Category {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The "no filter" entry. Always present in a loaded directory and always first.
    pub fn any() -> Self {
        Self::new(0, "Any Category")
    }

    /// Ids start at 1 upstream, so only the sentinel is not sent as a filter.
    pub fn is_any(&self) -> bool {
        self.id == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    pub text: String,
    pub all_answers: Vec<String>,
    pub correct_answer: String,
    /// Empty until the user picks something.
    pub given_answer: String,
}

impl Question {
    pub fn new(text: String, all_answers: Vec<String>, correct_answer: String) -> Self {
        Self {
            text,
            all_answers,
            correct_answer,
            given_answer: String::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.given_answer.is_empty()
    }

    pub fn outcome(&self) -> Outcome {
        if !self.is_answered() {
            Outcome::Unanswered
        } else if self.given_answer == self.correct_answer {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    }
}

/// A single user interaction: pick `answer` for the question at `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub index: usize,
    pub answer: String,
}

impl Answer {
    pub fn new(index: usize, answer: impl Into<String>) -> Self {
        Self {
            index,
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unanswered,
    Correct,
    Incorrect,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Unanswered => "Unanswered",
            Outcome::Correct => "Right",
            Outcome::Incorrect => "Wrong",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Outcome::Unanswered => "gold",
            Outcome::Correct => "green",
            Outcome::Incorrect => "crimson",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    #[default]
    Any,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Any,
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
    ];

    /// Value used in the `difficulty=` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Any => "any",
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Any => "Any Difficulty",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuestionType {
    #[default]
    Any,
    Multiple,
    Boolean,
}

impl QuestionType {
    pub const ALL: [QuestionType; 3] = [
        QuestionType::Any,
        QuestionType::Multiple,
        QuestionType::Boolean,
    ];

    /// Value used in the `type=` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Any => "any",
            QuestionType::Multiple => "multiple",
            QuestionType::Boolean => "boolean",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::Any => "Any Type",
            QuestionType::Multiple => "Multiple Choice",
            QuestionType::Boolean => "True / False",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

/// Lifecycle of one remotely fetched resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Progress {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl Progress {
    /// A quiz may be (re)fetched from any state except while a request is in flight.
    pub fn allows_quiz_fetch(&self) -> bool {
        *self != Progress::Pending
    }

    /// Categories are fetched once; only a never-attempted or failed load is retried.
    pub fn allows_category_fetch(&self) -> bool {
        matches!(self, Progress::Idle | Progress::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizParameters {
    pub category: Category,
    pub count: u32,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
}

impl QuizParameters {
    pub const COUNT_RANGE: RangeInclusive<u32> = 10..=50;
    pub const COUNT_STEP: usize = 5;

    /// Stores `count` only when it lies inside [`Self::COUNT_RANGE`]. Returns whether it was accepted.
    pub fn set_count(&mut self, count: u32) -> bool {
        if Self::COUNT_RANGE.contains(&count) {
            self.count = count;
            true
        } else {
            false
        }
    }

    pub fn count_options() -> Vec<u32> {
        Self::COUNT_RANGE.step_by(Self::COUNT_STEP).collect()
    }
}

impl Default for QuizParameters {
    fn default() -> Self {
        Self {
            category: Category::any(),
            count: *Self::COUNT_RANGE.start(),
            difficulty: Difficulty::Any,
            question_type: QuestionType::Any,
        }
    }
}
