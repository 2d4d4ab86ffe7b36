use std::env;
use std::fs;
use std::path::Path;

use nextword_core::artifact::ArtifactStore;
use nextword_core::infer::{DEFAULT_PREDICTIONS, predict_next_words};
use nextword_core::matcher::{DEFAULT_MATCH_LIMIT, match_lines};
use nextword_core::trainer::{TrainEvent, Trainer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Usage: nextword-cli <corpus.txt> [partial text...]
    let mut args = env::args().skip(1);
    let corpus_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("Usage: nextword-cli <corpus.txt> [partial text...]");
            std::process::exit(2);
        }
    };
    let query: String = args.collect::<Vec<_>>().join(" ");

    // The dataset key is the corpus file name without extension
    let dataset = Path::new(&corpus_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or("Corpus path has no filename")?;
    let text = fs::read_to_string(&corpus_path)?;

    // Train and persist the artifact under ./models, logging every tenth epoch
    let store = ArtifactStore::new("./models")?;
    let trainer = Trainer::new(store);
    let mut sink = |event: TrainEvent| match event {
        TrainEvent::Started => println!("Training '{dataset}'..."),
        TrainEvent::Epoch { epoch, total, loss } => {
            if epoch % 10 == 0 || epoch == total {
                println!("Epoch {epoch}/{total} - loss: {loss:.4}");
            }
        }
        TrainEvent::Completed { dataset } => println!("Model for '{dataset}' saved."),
        TrainEvent::Failed { reason } => eprintln!("Training failed: {reason}"),
    };
    let artifact = trainer.train(&dataset, &text, &mut sink)?;

    if query.is_empty() {
        return Ok(());
    }

    // Model-based next-word candidates
    println!("\nNext-word candidates for '{query}':");
    for word in predict_next_words(&artifact, &query, DEFAULT_PREDICTIONS) {
        if !word.is_empty() {
            println!("  {word}");
        }
    }

    // Literal typeahead over the raw corpus lines, for comparison
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();
    println!("\nMatching lines:");
    for line in match_lines(&lines, &query, DEFAULT_MATCH_LIMIT) {
        println!("  {line}");
    }

    Ok(())
}
