//! `farmctl ask` and the interactive `farmctl chat` loop.
//!
//! Chat commands:
//!
//! | Input | Effect |
//! |-------|--------|
//! | `/history` | Show the last few questions and answers |
//! | `/clear` | Forget the conversation history |
//! | `/quit`, `/exit` | Leave the shell |
//! | anything else | Run the query pipeline |

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::assistant::Pipeline;
use crate::config::Config;
use crate::history::ConversationHistory;
use crate::progress::ProgressMode;

/// Run one query and print the answer to stdout.
pub async fn run_ask(config: &Config, query: &str, progress: ProgressMode) -> Result<()> {
    let mut pipeline = Pipeline::from_config_with_progress(config.clone(), progress.reporter())?;
    let answer = pipeline.ask(query).await;
    println!("{}", answer.response);
    Ok(())
}

/// Interactive question loop on stdin/stdout.
pub async fn run_chat(config: &Config, progress: ProgressMode) -> Result<()> {
    let mut pipeline = Pipeline::from_config_with_progress(config.clone(), progress.reporter())?;
    let mut history = ConversationHistory::new(config.history.max_entries);

    println!("Smart Farm Assistant. Ask about your farm; /history, /clear, /quit.");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    chat_loop(&mut pipeline, &mut history, stdin, &mut stdout).await
}

/// The chat loop over arbitrary input and output, returning at EOF or `/quit`.
pub async fn chat_loop<R, W>(
    pipeline: &mut Pipeline,
    history: &mut ConversationHistory,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let query = line.trim();
        match query {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                history.clear();
                writeln!(out, "History cleared.")?;
            }
            "/history" => print_history(history, out)?,
            _ => {
                writeln!(out, "Processing your query...")?;
                let answer = pipeline.ask(query).await;
                writeln!(out, "\n{}\n", answer.response)?;
                history.push(query, answer.response);
            }
        }
    }
    Ok(())
}

fn print_history<W: Write>(history: &ConversationHistory, out: &mut W) -> Result<()> {
    if history.is_empty() {
        writeln!(out, "No conversation history yet.")?;
        return Ok(());
    }
    for (i, entry) in history.entries().enumerate() {
        writeln!(
            out,
            "[{}] {}  Q: {}",
            i + 1,
            entry.asked_at.format("%H:%M:%S"),
            entry.query
        )?;
        writeln!(out, "    A: {}", entry.response)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::canned_pipeline;
    use tempfile::TempDir;

    async fn run(input: &str, history: &mut ConversationHistory) -> String {
        let tmp = TempDir::new().unwrap();
        let mut pipeline = canned_pipeline(tmp.path(), "Soil is fine.");
        let mut out = Vec::new();
        chat_loop(&mut pipeline, history, input.as_bytes(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn answers_and_records_history() {
        let mut history = ConversationHistory::new(5);
        let out = run("How is the soil?\n/history\n/quit\nignored\n", &mut history).await;
        assert!(out.contains("Soil is fine."));
        assert!(out.contains("Q: How is the soil?"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn clear_forgets_history() {
        let mut history = ConversationHistory::new(5);
        let out = run("first\nsecond\n/clear\n/history\n", &mut history).await;
        assert!(out.contains("History cleared."));
        assert!(out.contains("No conversation history yet."));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let mut history = ConversationHistory::new(2);
        run("a\nb\nc\n", &mut history).await;
        let queries: Vec<String> = history.entries().map(|e| e.query.clone()).collect();
        assert_eq!(queries, vec!["b", "c"]);
    }
}
