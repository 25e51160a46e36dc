//! Interactive chat front end.
//!
//! Builds an in-memory index for one uploaded document synchronously, then
//! answers free-text questions one at a time from stdin. Fallback answers
//! are printed inline like any other answer.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;
use docuquery_core::Config;
use docuquery_index::{build_embedder, VectorIndex};
use docuquery_llm::{AnswerSynthesizer, CHAT_TOP_K};
use tracing::info;

pub async fn run_chat(config: &Config, document: &Path) -> anyhow::Result<()> {
    let embedder = build_embedder(config).context("embedding provider required for chat")?;
    let synthesizer = AnswerSynthesizer::from_config(&config.llm, &config.ollama);

    let bytes = std::fs::read(document)
        .with_context(|| format!("failed to read {}", document.display()))?;
    let filename = document
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");

    println!("Processing document…");
    let doc = docuquery_ingest::extract_text(&bytes, filename)?;
    let chunks = docuquery_ingest::extract_chunks(&doc);
    info!(
        "Extracted '{}': {} pages, {} chunks",
        filename,
        doc.pages.len(),
        chunks.len()
    );
    if chunks.is_empty() {
        println!("The document contains no extractable text; answers will be empty.");
    }

    let mut index =
        VectorIndex::new(embedder).with_embed_batch_size(config.embedding.batch_size as usize);
    index.build(chunks).await?;

    println!("Document processed! Ask a question (or 'exit' to quit).");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        let context = match index.search(question, CHAT_TOP_K).await {
            Ok(chunks) => chunks,
            Err(e) => {
                println!("Could not search the index: {e}");
                continue;
            }
        };

        let answer = synthesizer.generate(question, &context).await;
        println!("\n{answer}\n");
        if !context.is_empty() {
            let pages: Vec<usize> = context.iter().map(|c| c.page).collect();
            println!("(sources: pages {pages:?})\n");
        }
    }

    Ok(())
}
