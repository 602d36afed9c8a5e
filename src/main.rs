mod config;
mod quiz;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use log::{debug, info};
use quiz::{
    api::{HttpTriviaApi, TriviaApi},
    category::CategoryStore,
    stats::{ChartSlice, QuizReport},
    store::{FetchOutcome, QuizSessions, QuizStore},
    Answer, Difficulty, Progress, Question, QuestionType, QuizParameters,
};
use teloxide::{
    dispatching::dialogue::{ErasedStorage, InMemStorage, Storage},
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type DialogueStorage = Arc<ErasedStorage<State>>;

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    ReceiveCategory,
    ReceiveDifficulty,
    ReceiveType,
    ReceiveCount,
    QuizFailed,
    Answering {
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    pretty_env_logger::init();
    info!("Starting trivia bot...");

    let config = Config::from_env()?;
    let api: Arc<dyn TriviaApi> = Arc::new(HttpTriviaApi::new(
        config.trivia_base_url.clone(),
        config.request_timeout,
    )?);
    info!("Using trivia API at {}", config.trivia_base_url);

    let categories = Arc::new(CategoryStore::new(api.clone()));
    let sessions = Arc::new(QuizSessions::new(api));

    // Warm the directory up; a failure here is retried on the first /start.
    categories.fetch().await;

    let storage: DialogueStorage = InMemStorage::<State>::new().erase();
    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::filter(|msg: Message| msg.text() == Some(QUIT)).endpoint(quit))
            .branch(
                dptree::filter(|msg: Message| msg.text() == Some(REFRESH))
                    .endpoint(refresh_categories),
            )
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveCategory].endpoint(receive_category))
            .branch(dptree::case![State::ReceiveDifficulty].endpoint(receive_difficulty))
            .branch(dptree::case![State::ReceiveType].endpoint(receive_type))
            .branch(dptree::case![State::ReceiveCount].endpoint(receive_count))
            .branch(dptree::case![State::QuizFailed].endpoint(quiz_failed))
            .branch(dptree::case![State::Answering { index }].endpoint(answering)),
    )
    .dependencies(dptree::deps![storage, categories, sessions])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const GREETING_TEXT: &str =
    "Hi! I'm a trivia bot. Pick a category, difficulty, question type and count, and I'll quiz you.";
const QUIT: &str = "/quit";
const REFRESH: &str = "/categories";
const SUBMIT: &str = "Submit answers";
const RETRY: &str = "Retry";

async fn start(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    categories: Arc<CategoryStore>,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    sessions.get(msg.chat.id.0).await.reset_quiz().await;
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;

    ask_category(&bot, &dialogue, msg.chat.id, &categories).await
}

async fn ask_category(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    categories: &CategoryStore,
) -> HandlerResult {
    categories.fetch().await;

    match categories.progress().await {
        Progress::Success => {
            let keyboard = KeyboardMarkup::new(
                categories
                    .categories()
                    .await
                    .into_iter()
                    .map(|category| vec![KeyboardButton::new(category.name)]),
            );
            bot.send_message(chat_id, "Choose a category")
                .reply_markup(keyboard)
                .await?;
            dialogue.update(State::ReceiveCategory).await?;
        }
        Progress::Pending => {
            bot.send_message(chat_id, "Categories are still loading, send any message in a moment")
                .await?;
            dialogue.update(State::Start).await?;
        }
        Progress::Idle | Progress::Error => {
            bot.send_message(chat_id, "Couldn't load the categories. Send any message to try again")
                .reply_markup(KeyboardRemove::new())
                .await?;
            dialogue.update(State::Start).await?;
        }
    }
    Ok(())
}

async fn receive_category(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    categories: Arc<CategoryStore>,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    let category = match msg.text() {
        Some(name) => categories.find_by_name(name).await,
        None => None,
    };
    let Some(category) = category else {
        bot.send_message(msg.chat.id, "Please choose one of the categories")
            .await?;
        return Ok(());
    };

    debug!("Chat {} picked category {}", msg.chat.id, category.id);
    sessions.get(msg.chat.id.0).await.set_category(category).await;

    let keyboard = KeyboardMarkup::new(
        Difficulty::ALL
            .iter()
            .map(|difficulty| vec![KeyboardButton::new(difficulty.label())]),
    );
    bot.send_message(msg.chat.id, "Choose a difficulty")
        .reply_markup(keyboard)
        .await?;

    dialogue.update(State::ReceiveDifficulty).await?;
    Ok(())
}

async fn receive_difficulty(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    let Some(difficulty) = msg.text().and_then(Difficulty::from_label) else {
        bot.send_message(msg.chat.id, "Please choose one of the difficulties")
            .await?;
        return Ok(());
    };

    sessions.get(msg.chat.id.0).await.set_difficulty(difficulty).await;

    let keyboard = KeyboardMarkup::new(
        QuestionType::ALL
            .iter()
            .map(|question_type| vec![KeyboardButton::new(question_type.label())]),
    );
    bot.send_message(msg.chat.id, "Choose a question type")
        .reply_markup(keyboard)
        .await?;

    dialogue.update(State::ReceiveType).await?;
    Ok(())
}

async fn receive_type(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    let Some(question_type) = msg.text().and_then(QuestionType::from_label) else {
        bot.send_message(msg.chat.id, "Please choose one of the question types")
            .await?;
        return Ok(());
    };

    sessions.get(msg.chat.id.0).await.set_type(question_type).await;

    let keyboard = KeyboardMarkup::new(QuizParameters::count_options().chunks(3).map(|row| {
        row.iter()
            .map(|count| KeyboardButton::new(count.to_string()))
            .collect::<Vec<_>>()
    }));
    bot.send_message(msg.chat.id, "How many questions?")
        .reply_markup(keyboard)
        .await?;

    dialogue.update(State::ReceiveCount).await?;
    Ok(())
}

async fn receive_count(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    let store = sessions.get(msg.chat.id.0).await;

    let accepted = match msg.text().map(|text| text.trim().parse::<u32>()) {
        Some(Ok(count)) => store.set_count(count).await,
        _ => false,
    };
    if !accepted {
        let range = QuizParameters::COUNT_RANGE;
        bot.send_message(
            msg.chat.id,
            format!(
                "Please enter a number between {} and {}",
                range.start(),
                range.end()
            ),
        )
        .await?;
        return Ok(());
    }

    start_quiz(&bot, &dialogue, msg.chat.id, &store).await
}

async fn quiz_failed(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    if msg.text() != Some(RETRY) {
        bot.send_message(msg.chat.id, "Press Retry to fetch the quiz again, or /quit")
            .await?;
        return Ok(());
    }

    let store = sessions.get(msg.chat.id.0).await;
    start_quiz(&bot, &dialogue, msg.chat.id, &store).await
}

async fn start_quiz(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    store: &QuizStore,
) -> HandlerResult {
    // Nice to have, the quiz works without it
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    debug!("Chat {} fetching quiz with {:?}", chat_id, store.parameters().await);
    match store.fetch_quiz().await {
        FetchOutcome::Finished(Progress::Success) => {}
        FetchOutcome::Finished(_) => {
            let keyboard = KeyboardMarkup::new(vec![vec![
                KeyboardButton::new(RETRY),
                KeyboardButton::new(QUIT),
            ]]);
            bot.send_message(chat_id, "Couldn't fetch the quiz")
                .reply_markup(keyboard)
                .await?;
            dialogue.update(State::QuizFailed).await?;
            return Ok(());
        }
        FetchOutcome::Suppressed => {
            bot.send_message(chat_id, "Your quiz is still being fetched").await?;
            return Ok(());
        }
        FetchOutcome::Stale => return Ok(()),
    }

    let total = store.questions().await.len();
    if total == 0 {
        store.reset_quiz().await;
        bot.send_message(
            chat_id,
            "No questions came back for these settings. Send any message to start over",
        )
        .reply_markup(KeyboardRemove::new())
        .await?;
        dialogue.update(State::Start).await?;
        return Ok(());
    }

    bot.send_message(chat_id, "Here we go!").await?;
    send_question(bot, chat_id, store, 0).await?;
    dialogue.update(State::Answering { index: 0 }).await?;
    Ok(())
}

async fn send_question(
    bot: &Bot,
    chat_id: ChatId,
    store: &QuizStore,
    index: usize,
) -> HandlerResult {
    let total = store.questions().await.len();
    let Some(question) = store.question(index).await else {
        return Ok(());
    };

    let mut rows: Vec<Vec<KeyboardButton>> = question
        .all_answers
        .iter()
        .map(|answer| vec![KeyboardButton::new(answer.clone())])
        .collect();
    rows.push(vec![KeyboardButton::new(SUBMIT), KeyboardButton::new(QUIT)]);

    bot.send_message(
        chat_id,
        format!("Question {}/{}:\n{}", index + 1, total, question.text),
    )
    .reply_markup(KeyboardMarkup::new(rows))
    .await?;
    Ok(())
}

async fn answering(
    bot: Bot,
    dialogue: QuizDialogue,
    index: usize,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    let store = sessions.get(msg.chat.id.0).await;

    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please pick one of the answers")
            .await?;
        return Ok(());
    };
    if text == SUBMIT {
        return finish_quiz(&bot, &dialogue, msg.chat.id, &store, &sessions).await;
    }

    let Some(question) = store.question(index).await else {
        return finish_quiz(&bot, &dialogue, msg.chat.id, &store, &sessions).await;
    };
    if !question.all_answers.iter().any(|answer| answer == text) {
        bot.send_message(msg.chat.id, "Please pick one of the answers")
            .await?;
        return Ok(());
    }

    store.answer_question(Answer::new(index, text)).await;

    let next = index + 1;
    if store.question(next).await.is_none() {
        return finish_quiz(&bot, &dialogue, msg.chat.id, &store, &sessions).await;
    }

    send_question(&bot, msg.chat.id, &store, next).await?;
    dialogue.update(State::Answering { index: next }).await?;
    Ok(())
}

async fn finish_quiz(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    store: &QuizStore,
    sessions: &QuizSessions,
) -> HandlerResult {
    store.submit_quiz().await;
    let state = store.snapshot().await;
    let report = QuizReport::new(&state);
    info!(
        "Chat {} finished a quiz with {}/{}",
        chat_id, report.correct, report.total
    );

    sessions.remove(chat_id.0).await;
    dialogue.update(State::Start).await?;

    bot.send_message(chat_id, render_report(&report))
        .reply_markup(KeyboardRemove::new())
        .await?;
    for page in render_review(&state.questions) {
        bot.send_message(chat_id, page).await?;
    }
    bot.send_message(chat_id, "Send any message to play again")
        .await?;
    Ok(())
}

async fn quit(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    sessions.remove(msg.chat.id.0).await;
    dialogue.update(State::Start).await?;

    bot.send_message(
        msg.chat.id,
        "The current quiz was discarded. Send any message to start over",
    )
    .reply_markup(KeyboardRemove::new())
    .await?;
    Ok(())
}

/// Drops the cached directory and the current quiz, then asks for a category again.
async fn refresh_categories(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    categories: Arc<CategoryStore>,
    sessions: Arc<QuizSessions>,
) -> HandlerResult {
    categories.reset().await;
    sessions.remove(msg.chat.id.0).await;

    ask_category(&bot, &dialogue, msg.chat.id, &categories).await
}

fn color_marker(slice: &ChartSlice) -> &'static str {
    match slice.color() {
        "gold" => "🟡",
        "green" => "🟢",
        "crimson" => "🔴",
        _ => "⚪",
    }
}

fn render_report(report: &QuizReport) -> String {
    let breakdown = report
        .breakdown
        .iter()
        .map(|slice| format!("{} {}: {}", color_marker(slice), slice.label(), slice.count))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Quiz statistics\n\nStarted on {}\nSubmitted on {}\nTotal duration: {}\n\n{}\n\nYour final score: {}",
        report.started, report.submitted, report.duration, breakdown, report.score
    )
}

// Telegram caps a message at 4096 UTF-16 code units
const MESSAGE_LIMIT: usize = 4096;

fn render_review(questions: &[Question]) -> Vec<String> {
    let entries = questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let given = if question.is_answered() {
                question.given_answer.as_str()
            } else {
                "-"
            };
            format!(
                "{}. {}\nCorrect: {}\nYours: {} ({})",
                i + 1,
                question.text,
                question.correct_answer,
                given,
                question.outcome().label()
            )
        })
        .collect::<Vec<_>>();

    paginate(&entries, MESSAGE_LIMIT)
}

/// Packs entries into as few messages as fit under `limit`, separated by blank lines.
/// An entry too long for a single message is cut into several.
fn paginate(entries: &[String], limit: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = String::new();
    let mut page_len = 0;

    for piece in entries.iter().flat_map(|entry| split_long(entry, limit)) {
        let len = piece.encode_utf16().count();
        if !page.is_empty() && page_len + 2 + len > limit {
            pages.push(std::mem::take(&mut page));
            page_len = 0;
        }
        if !page.is_empty() {
            page.push_str("\n\n");
            page_len += 2;
        }
        page.push_str(&piece);
        page_len += len;
    }

    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

fn split_long(entry: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut len = 0;

    for c in entry.chars() {
        if len + c.len_utf16() > limit {
            pieces.push(std::mem::take(&mut piece));
            len = 0;
        }
        piece.push(c);
        len += c.len_utf16();
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fits(page: &str, limit: usize) -> bool {
        page.encode_utf16().count() <= limit
    }

    #[test]
    fn review_pages_stay_under_the_limit() {
        let questions: Vec<Question> = (0..50)
            .map(|i| {
                Question::new(
                    format!("Question {} {}", i, "é".repeat(300)),
                    vec!["A".to_string(), "B".to_string()],
                    "A".to_string(),
                )
            })
            .collect();

        let pages = render_review(&questions);
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|page| fits(page, MESSAGE_LIMIT)));
        assert!(pages[0].starts_with("1. Question 0"));
        assert!(pages.last().unwrap().contains("50. Question 49"));
    }

    #[test]
    fn short_entries_share_a_page() {
        let entries = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        assert_eq!(paginate(&entries, 100), vec!["one\n\ntwo\n\nthree".to_string()]);
        assert_eq!(
            paginate(&entries, 10),
            vec!["one\n\ntwo".to_string(), "three".to_string()]
        );
        assert!(paginate(&[], 10).is_empty());
    }

    #[test]
    fn oversized_entry_is_split() {
        let entries = vec!["x".repeat(25)];
        let pages = paginate(&entries, 10);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|page| fits(page, 10)));
        assert_eq!(pages.concat(), "x".repeat(25));
    }
}
