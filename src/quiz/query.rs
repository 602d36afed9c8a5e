use super::{Category, Difficulty, QuestionType, QuizParameters};

pub const QUIZ_ENDPOINT: &str = "api.php";
pub const CATEGORY_ENDPOINT: &str = "api_category.php";

/// Builds the quiz request path. Filters left at "any" are omitted; parameter order is fixed.
pub fn build_query(
    count: u32,
    category: &Category,
    difficulty: Difficulty,
    question_type: QuestionType,
) -> String {
    let mut query = format!("{}?amount={}", QUIZ_ENDPOINT, count);

    if !category.is_any() {
        query.push_str(&format!("&category={}", category.id));
    }

    if difficulty != Difficulty::Any {
        query.push_str(&format!("&difficulty={}", difficulty.as_str()));
    }

    if question_type != QuestionType::Any {
        query.push_str(&format!("&type={}", question_type.as_str()));
    }

    query
}

impl QuizParameters {
    pub fn to_query(&self) -> String {
        build_query(
            self.count,
            &self.category,
            self.difficulty,
            self.question_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movies() -> Category {
        Category::new(1, "Movies")
    }

    #[test]
    fn defaults_only_carry_amount() {
        assert_eq!(
            build_query(10, &Category::any(), Difficulty::Any, QuestionType::Any),
            "api.php?amount=10"
        );
    }

    #[test]
    fn category_filter() {
        assert_eq!(
            build_query(10, &movies(), Difficulty::Any, QuestionType::Any),
            "api.php?amount=10&category=1"
        );
    }

    #[test]
    fn difficulty_filter() {
        assert_eq!(
            build_query(10, &Category::any(), Difficulty::Medium, QuestionType::Any),
            "api.php?amount=10&difficulty=medium"
        );
    }

    #[test]
    fn type_filter() {
        assert_eq!(
            build_query(10, &Category::any(), Difficulty::Any, QuestionType::Multiple),
            "api.php?amount=10&type=multiple"
        );
    }

    #[test]
    fn all_filters_in_fixed_order() {
        assert_eq!(
            build_query(10, &movies(), Difficulty::Medium, QuestionType::Multiple),
            "api.php?amount=10&category=1&difficulty=medium&type=multiple"
        );
        assert_eq!(
            build_query(35, &Category::new(23, "History"), Difficulty::Hard, QuestionType::Boolean),
            "api.php?amount=35&category=23&difficulty=hard&type=boolean"
        );
    }

    #[test]
    fn pairs_without_the_middle_filter() {
        assert_eq!(
            build_query(15, &movies(), Difficulty::Any, QuestionType::Boolean),
            "api.php?amount=15&category=1&type=boolean"
        );
        assert_eq!(
            build_query(20, &Category::any(), Difficulty::Easy, QuestionType::Boolean),
            "api.php?amount=20&difficulty=easy&type=boolean"
        );
        assert_eq!(
            build_query(20, &movies(), Difficulty::Easy, QuestionType::Any),
            "api.php?amount=20&category=1&difficulty=easy"
        );
    }

    #[test]
    fn parameters_build_their_own_query() {
        let mut params = QuizParameters::default();
        assert_eq!(params.to_query(), "api.php?amount=10");

        params.category = movies();
        params.set_count(25);
        params.difficulty = Difficulty::Hard;
        assert_eq!(
            params.to_query(),
            "api.php?amount=25&category=1&difficulty=hard"
        );
    }
}
