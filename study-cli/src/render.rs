//! Terminal rendering of session artifacts.

use std::io::{self, BufRead, Write};

use shared::exam::Answer;
use shared::models::{ConceptNode, HistoryEntry, QuizQuestion};
use shared::{ExamState, QuestionCost, UltraProgress};

/// Print `label` and read one trimmed line. `None` on end of input.
pub fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{} ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn confirm(label: &str) -> bool {
    matches!(
        prompt(&format!("{} [y/N]", label)).ok().flatten().as_deref(),
        Some("y") | Some("Y") | Some("yes")
    )
}

pub fn print_map(nodes: &[ConceptNode]) {
    if nodes.is_empty() {
        println!("(empty map)");
    }
    for node in nodes {
        print_node(node, 0);
    }
}

fn print_node(node: &ConceptNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.description {
        Some(description) => println!("{}- {}: {}", indent, node.title, description),
        None => println!("{}- {}", indent, node.title),
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

pub fn print_question(exam: &ExamState, question: &QuizQuestion) {
    println!();
    println!(
        "Question {} / {}",
        exam.current_question + 1,
        exam.custom_questions.len()
    );
    println!("{}", question.question);
    for (i, option) in question.options.iter().enumerate() {
        let marker = if exam.selected_option == Some(i) { ">" } else { " " };
        println!("{} {}. {}", marker, i + 1, option);
    }

    if !exam.show_explanation {
        return;
    }
    let answer = exam.user_answers.get(exam.current_question).and_then(Option::as_ref);
    match (answer, question.correct_option_index) {
        (Some(Answer::Choice(chosen)), Some(correct)) if *chosen == correct => println!("Correct!"),
        (Some(Answer::Choice(_)), Some(correct)) => {
            let right = question.options.get(correct).map(String::as_str).unwrap_or("?");
            println!("Wrong. The right answer is {}. {}", correct + 1, right);
        }
        (Some(Answer::Text(text)), _) => println!("Your answer: {}", text),
        _ => {}
    }
    if !question.explanation.is_empty() {
        println!("{}", question.explanation);
    }
}

pub fn print_progress(progress: &UltraProgress) {
    println!(
        "Generating {}: section {} of {}, about {} min left",
        progress.kind.label(),
        progress.current,
        progress.total,
        progress.eta_minutes
    );
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No stored sessions.");
        return;
    }
    for entry in entries {
        let created = entry
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}  {:<16}  {}",
            entry.id,
            created,
            entry.file_name.as_deref().unwrap_or("-")
        );
    }
}

pub fn question_price(cost: QuestionCost) -> String {
    match cost {
        QuestionCost::Unknown => "unknown".to_string(),
        QuestionCost::Pending(0) | QuestionCost::Confirmed(0) => "free".to_string(),
        QuestionCost::Pending(credits) => format!("{} credits (confirming)", credits),
        QuestionCost::Confirmed(credits) => format!("{} credits", credits),
    }
}
