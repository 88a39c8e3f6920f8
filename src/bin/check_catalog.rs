use anyhow::{bail, Result};
use quiz_session::catalog::QuizCatalog;
use quiz_session::models::QuizSummary;
use std::env;

#[derive(Debug, Default)]
struct CheckStats {
    total_quizzes: usize,
    selectable: usize,
    problems: Vec<String>,
}

impl CheckStats {
    fn print_summary(&self) {
        println!("\n=== Catalog Summary ===");
        println!("Total quizzes: {}", self.total_quizzes);
        println!("Selectable quizzes: {}", self.selectable);

        if !self.problems.is_empty() {
            println!("Malformed quizzes: {}", self.problems.len());
            for problem in &self.problems {
                println!("  - {}", problem);
            }
        }
    }
}

fn print_quiz(summary: &QuizSummary) {
    println!(
        "  {} [{}] {} questions, {} ({})",
        summary.id,
        summary.level_label,
        summary.question_count,
        summary.duration_label,
        summary.topic.as_deref().unwrap_or("no topic"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let verbose = args.iter().any(|arg| arg == "--verbose");
    let path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .cloned()
        .or_else(|| env::var("QUIZ_CATALOG_PATH").ok())
        .unwrap_or_else(|| "data/quizzes.json".to_string());

    println!("=== Quiz Catalog Check ===");
    println!("Reading catalog: {}", path);

    let catalog = QuizCatalog::load_from_file(&path).await?;
    let report = catalog.check().await;

    let mut stats = CheckStats {
        total_quizzes: report.len(),
        ..CheckStats::default()
    };

    if verbose {
        println!("\nSelectable quizzes:");
    }
    for (summary, outcome) in &report {
        match outcome {
            Ok(()) => {
                stats.selectable += 1;
                if verbose {
                    print_quiz(summary);
                }
            }
            Err(e) => stats.problems.push(format!("{}: {}", summary.id, e)),
        }
    }

    stats.print_summary();

    if !stats.problems.is_empty() {
        bail!("{} malformed quiz definition(s)", stats.problems.len());
    }

    println!("\n✓ Every quiz can be taken.");
    Ok(())
}
