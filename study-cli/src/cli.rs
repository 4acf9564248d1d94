//! CLI argument definitions for the study assistant.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use shared::exam::{Difficulty, ExamType};
use shared::{SummaryVariant, UltraKind};

#[derive(Parser)]
#[command(
    name = "study",
    version,
    about = "Turn a PDF into summaries, flashcards, concept maps and exams",
    long_about = "Turn a PDF into study material.\n\n\
                  The API endpoint and credentials come from STUDY_API_BASE_URL and\n\
                  STUDY_AUTH_TOKEN. The active session is kept in a local state file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// File holding the active session between invocations.
    #[arg(long = "state", value_name = "PATH", default_value = ".study-session.json", global = true)]
    pub state: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a PDF and make it the active session.
    Process(ProcessArgs),

    /// Show session, credits and generation status.
    Status,

    /// Print a summary.
    Summary {
        #[arg(long, value_enum, default_value = "breve")]
        variant: VariantArg,
    },

    /// Print the concept map.
    Map {
        /// Show the ultra map.
        #[arg(long)]
        ultra: bool,
    },

    /// Browse flashcards interactively.
    Flashcards {
        /// Browse the ultra deck.
        #[arg(long)]
        ultra: bool,
    },

    /// Take an exam.
    #[command(subcommand)]
    Exam(ExamCommand),

    /// Generate a study plan.
    Plan {
        /// Days until the exam.
        #[arg(long)]
        days: String,
    },

    /// Generate the questions most likely to be asked.
    Questions {
        /// Only print the current price.
        #[arg(long)]
        price: bool,
    },

    /// Read a summary aloud into an MP3 file.
    Tts {
        #[arg(long, value_enum, default_value = "breve")]
        variant: VariantArg,
        #[arg(long, value_name = "FILE", default_value = "summary.mp3")]
        out: PathBuf,
    },

    /// Generate an ultra artifact.
    Ultra {
        #[arg(value_enum)]
        kind: UltraArg,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Browse stored sessions.
    #[command(subcommand)]
    History(HistoryCommand),

    /// Download a summary as a file.
    Download {
        #[arg(long, value_enum, default_value = "esteso")]
        variant: VariantArg,
        #[arg(long, value_name = "FILE", default_value = "summary.pdf")]
        out: PathBuf,
    },

    /// Redeem a magic-link token.
    Claim { token: String },

    /// Manage credits.
    #[command(subcommand)]
    Credits(CreditsCommand),
}

#[derive(Args)]
pub struct ProcessArgs {
    /// PDF to process.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Translate the generated material into this language.
    #[arg(long = "target-language")]
    pub target_language: Option<String>,
}

#[derive(Subcommand)]
pub enum ExamCommand {
    /// Free three-question quiz.
    Base,
    /// Paid exam with custom settings.
    Custom {
        #[arg(long, default_value_t = 10)]
        questions: u32,
        #[arg(long, value_enum, default_value = "medium")]
        difficulty: DifficultyArg,
        #[arg(long = "type", value_enum, default_value = "multiple-choice")]
        exam_type: ExamTypeArg,
    },
    /// Continue the exam in progress.
    Resume,
    /// Take the same exam again from the first question.
    Restart,
    /// Discard the exam and return to configuration.
    Reset,
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    List,
    Load { session_id: String },
}

#[derive(Subcommand)]
pub enum CreditsCommand {
    Add {
        amount: i64,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum VariantArg {
    Breve,
    Esteso,
    Ultra,
}

impl From<VariantArg> for SummaryVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Breve => SummaryVariant::Breve,
            VariantArg::Esteso => SummaryVariant::Esteso,
            VariantArg::Ultra => SummaryVariant::Ultra,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum UltraArg {
    Summary,
    Flashcards,
    Maps,
}

impl From<UltraArg> for UltraKind {
    fn from(arg: UltraArg) -> Self {
        match arg {
            UltraArg::Summary => UltraKind::Summary,
            UltraArg::Flashcards => UltraKind::Flashcards,
            UltraArg::Maps => UltraKind::Maps,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExamTypeArg {
    MultipleChoice,
    Open,
    Mixed,
}

impl From<ExamTypeArg> for ExamType {
    fn from(arg: ExamTypeArg) -> Self {
        match arg {
            ExamTypeArg::MultipleChoice => ExamType::MultipleChoice,
            ExamTypeArg::Open => ExamType::Open,
            ExamTypeArg::Mixed => ExamType::Mixed,
        }
    }
}
