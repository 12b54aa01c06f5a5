use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::{FlushPolicy, QuizSettings, SessionMode};
use services::{
    Clock, PresentedQuestion, ProgressOverview, QuizLoopService, QuizSession, SessionError,
    SessionReport,
};
use storage::{FileProgressRepository, load_bank};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidPath { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidPath { flag } => write!(f, "{flag} requires a non-empty path"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn require_path(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<PathBuf, ArgsError> {
    let value = require_value(args, flag)?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidPath { flag });
    }
    Ok(PathBuf::from(value))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  drivequiz [quiz|practice|review|stats] [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  quiz      adaptive quiz over the whole bank (default)");
    eprintln!("  practice  only bookmarked questions");
    eprintln!("  review    only questions last answered wrong");
    eprintln!("  stats     print progress and session history");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bank <csv>          question bank (default questions.csv)");
    eprintln!("  --progress <json>     progress file (default progress.json)");
    eprintln!("  --length <n>          questions per session (default: whole pool)");
    eprintln!("  --seed <n>            seed the question order");
    eprintln!("  --min-weight <f>      selection weight floor, in (0, 1] (default 0.1)");
    eprintln!("  --pass <pct>          pass threshold percentage (default 80)");
    eprintln!("  --no-shuffle          keep options in bank order");
    eprintln!("  --flush-at-end        save progress only when a session completes");
    eprintln!();
    eprintln!("While answering: option number (0-based) or letter, `:b` bookmark, `:q` quit.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK, QUIZ_PROGRESS, QUIZ_SESSION_LENGTH, QUIZ_SEED, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz(SessionMode),
    Stats,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz(SessionMode::Full)),
            "practice" => Some(Self::Quiz(SessionMode::Bookmarked)),
            "review" => Some(Self::Quiz(SessionMode::Missed)),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

struct Args {
    bank: PathBuf,
    progress: PathBuf,
    length: Option<u32>,
    seed: Option<u64>,
    min_weight: f64,
    pass_percentage: u8,
    shuffle: bool,
    flush: FlushPolicy,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let mut parsed = Self {
            bank: env("QUIZ_BANK").map_or_else(|| "questions.csv".into(), PathBuf::from),
            progress: env("QUIZ_PROGRESS").map_or_else(|| "progress.json".into(), PathBuf::from),
            length: env("QUIZ_SESSION_LENGTH")
                .map(|v| parse_number(v, "QUIZ_SESSION_LENGTH"))
                .transpose()?,
            seed: env("QUIZ_SEED")
                .map(|v| parse_number(v, "QUIZ_SEED"))
                .transpose()?,
            min_weight: 0.1,
            pass_percentage: 80,
            shuffle: true,
            flush: FlushPolicy::EveryAnswer,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => parsed.bank = require_path(args, "--bank")?,
                "--progress" => parsed.progress = require_path(args, "--progress")?,
                "--length" => {
                    parsed.length = Some(parse_number(require_value(args, "--length")?, "--length")?);
                }
                "--seed" => {
                    parsed.seed = Some(parse_number(require_value(args, "--seed")?, "--seed")?);
                }
                "--min-weight" => {
                    parsed.min_weight =
                        parse_number(require_value(args, "--min-weight")?, "--min-weight")?;
                }
                "--pass" => {
                    parsed.pass_percentage = parse_number(require_value(args, "--pass")?, "--pass")?;
                }
                "--no-shuffle" => parsed.shuffle = false,
                "--flush-at-end" => parsed.flush = FlushPolicy::SessionEnd,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn settings(&self) -> Result<QuizSettings, quiz_core::model::SettingsError> {
        QuizSettings::new(
            self.length,
            self.min_weight,
            self.seed,
            self.pass_percentage,
            self.shuffle,
            self.flush,
        )
    }
}

/// One line of user input during a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Answer(usize),
    Bookmark,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim().to_ascii_lowercase();
    match line.as_str() {
        ":q" | ":quit" | "quit" => return Some(Input::Quit),
        ":b" | ":bookmark" | "bookmark" => return Some(Input::Bookmark),
        _ => {}
    }
    if let Ok(index) = line.parse::<usize>() {
        return Some(Input::Answer(index));
    }
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='z'), None) => Some(Input::Answer(usize::from(c as u8 - b'a'))),
        _ => None,
    }
}

fn letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or('?', |i| char::from(b'a' + i))
}

fn print_question(out: &mut impl Write, q: &PresentedQuestion) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "[{}/{}] ({}, {}) {}", q.number, q.planned, q.category, q.topic, q.prompt)?;
    for (i, option) in q.options.iter().enumerate() {
        writeln!(out, "  {i}) {}. {option}", letter(i))?;
    }
    write!(out, "> ")?;
    out.flush()
}

fn print_report(out: &mut impl Write, report: &SessionReport, pass_percentage: u8) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}/{} ({:.0}%), {} at {pass_percentage}% in {}m{:02}s",
        report.total_correct,
        report.total_asked,
        report.accuracy * 100.0,
        if report.passed { "PASS" } else { "FAIL" },
        report.duration_secs / 60,
        report.duration_secs % 60,
    )?;
    if !report.missed.is_empty() {
        writeln!(out, "Review:")?;
        for missed in &report.missed {
            writeln!(out, "- {}", missed.prompt)?;
            writeln!(out, "  you answered: {}", missed.selected_option)?;
            writeln!(out, "  correct: {}", missed.correct_option)?;
            writeln!(out, "  {}", missed.explanation)?;
        }
    }
    Ok(())
}

fn print_overview(out: &mut impl Write, overview: &ProgressOverview) -> io::Result<()> {
    writeln!(
        out,
        "Questions: {}  attempted: {}  mastered: {} ({:.0}%)  missed: {}  unseen: {}  bookmarked: {}",
        overview.total_questions,
        overview.attempted,
        overview.mastered,
        overview.mastery() * 100.0,
        overview.missed,
        overview.remaining,
        overview.bookmarked,
    )?;
    if overview.history.is_empty() {
        return writeln!(out, "No completed sessions yet.");
    }
    writeln!(out, "History:")?;
    for item in &overview.history {
        writeln!(
            out,
            "  {}  {:<10} {}/{} ({:.0}%) {}",
            item.completed_at.format("%Y-%m-%d %H:%M"),
            item.mode,
            item.total_correct,
            item.total_asked,
            item.accuracy * 100.0,
            if item.passed { "pass" } else { "fail" },
        )?;
    }
    Ok(())
}

fn run_quiz(
    svc: &mut QuizLoopService,
    mut session: QuizSession,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut line = String::new();
    while let Some(current) = session.current().cloned() {
        print_question(out, &current)?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match parse_input(&line) {
            Some(Input::Quit) => break,
            Some(Input::Bookmark) => match svc.toggle_bookmark(current.id) {
                Ok(on) => {
                    writeln!(out, "{}", if on { "Bookmarked." } else { "Bookmark removed." })?;
                }
                Err(SessionError::Storage(e)) => {
                    writeln!(out, "Bookmark kept for this run only, saving failed: {e}")?;
                }
                Err(e) => return Err(e.into()),
            },
            Some(Input::Answer(index)) => match svc.answer_current(&mut session, index) {
                Ok(result) => {
                    let feedback = &result.feedback;
                    if feedback.was_correct {
                        writeln!(out, "Correct.")?;
                    } else {
                        writeln!(out, "Wrong. Correct answer: {}", feedback.correct_option)?;
                    }
                    writeln!(out, "{}", feedback.explanation)?;
                    if let Some(report) = &result.report {
                        print_report(out, report, svc.settings().pass_percentage())?;
                    }
                }
                Err(SessionError::InvalidInput { options, .. }) => {
                    writeln!(out, "Pick an option between 0 and {}.", options.saturating_sub(1))?;
                }
                Err(e) => return Err(e.into()),
            },
            None => writeln!(out, "Enter an option number or letter, `:b` or `:q`.")?,
        }
    }

    if !session.is_complete() && svc.settings().flush() == FlushPolicy::SessionEnd {
        svc.save()?;
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: an adaptive quiz when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz(SessionMode::Full),
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz(SessionMode::Full),
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = parsed.settings()?;

    let bank = Arc::new(load_bank(&parsed.bank)?);
    let repository = Arc::new(FileProgressRepository::new(&parsed.progress));
    let mut svc = QuizLoopService::open(Clock::System, bank, settings, repository);
    if let Some(warning) = svc.load_warning() {
        eprintln!("warning: {warning}");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Stats => print_overview(&mut out, &svc.overview())?,
        Command::Quiz(mode) => match svc.start_session(mode) {
            Ok(session) => {
                let stdin = io::stdin();
                run_quiz(&mut svc, session, &mut stdin.lock(), &mut out)?;
            }
            Err(SessionError::Empty) => {
                writeln!(out, "No questions to ask in {mode} mode.")?;
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indices_letters_and_commands() {
        assert_eq!(parse_input("2\n"), Some(Input::Answer(2)));
        assert_eq!(parse_input(" C "), Some(Input::Answer(2)));
        assert_eq!(parse_input(":b"), Some(Input::Bookmark));
        assert_eq!(parse_input(":Q"), Some(Input::Quit));
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input("maybe"), None);
        assert_eq!(parse_input(""), None);
    }

    #[test]
    fn every_letter_selects_an_option() {
        assert_eq!(parse_input("b"), Some(Input::Answer(1)));
        assert_eq!(parse_input("q"), Some(Input::Answer(16)));
        assert_eq!(parse_input("B)"), None);
    }

    #[test]
    fn failed_bookmark_save_keeps_the_quiz_running() {
        let bank = storage::parse_bank(
            "question,option 1,option 2,correct\nWhat does a red octagon mean?,Stop,Go,0\n".as_bytes(),
        )
        .unwrap();
        let settings = QuizSettings::default().with_seed(3).with_shuffle_options(false);
        let mut svc = QuizLoopService::open(
            Clock::fixed(quiz_core::time::fixed_now()),
            Arc::new(bank),
            settings,
            Arc::new(storage::InMemoryProgressRepository::failing()),
        );
        let session = svc.start_session(SessionMode::Full).unwrap();

        let mut input = io::Cursor::new(":b\n0\n");
        let mut out = Vec::new();
        run_quiz(&mut svc, session, &mut input, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("saving failed"));
        assert!(printed.contains("Correct."));
        assert_eq!(svc.overview().bookmarked, 1);
    }

    #[test]
    fn letters_cover_first_options() {
        assert_eq!(letter(0), 'a');
        assert_eq!(letter(3), 'd');
        assert_eq!(letter(30), '?');
    }

    #[test]
    fn flags_override_defaults() {
        let mut args = [
            "--length", "10", "--seed", "7", "--pass", "70", "--no-shuffle", "--flush-at-end",
        ]
        .into_iter()
        .map(String::from);
        let parsed = Args::parse(&mut args).unwrap();
        assert_eq!(parsed.length, Some(10));
        assert_eq!(parsed.seed, Some(7));
        assert_eq!(parsed.pass_percentage, 70);
        assert!(!parsed.shuffle);
        assert_eq!(parsed.flush, FlushPolicy::SessionEnd);
        assert!(parsed.settings().is_ok());
    }

    #[test]
    fn rejects_bad_numbers_and_unknown_flags() {
        let mut bad = ["--length", "ten"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut bad),
            Err(ArgsError::InvalidNumber { flag: "--length", .. })
        ));
        let mut unknown = ["--deck"].into_iter().map(String::from);
        assert!(matches!(Args::parse(&mut unknown), Err(ArgsError::UnknownArg(_))));
        let mut missing = ["--bank"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut missing),
            Err(ArgsError::MissingValue { flag: "--bank" })
        ));
    }
}
