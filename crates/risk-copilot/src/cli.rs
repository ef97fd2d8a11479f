use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use risk_copilot_core::{AgentOutput, RiskCopilot};

/// Report text, followed by the reasoning trace when requested.
pub fn format_output(output: &AgentOutput<'_>, show_trace: bool) -> String {
    let mut text = output.report.clone();
    if show_trace {
        text.push_str("\n\nReasoning Trace:");
        for step in &output.reasoning_trace {
            text.push_str("\n  - ");
            text.push_str(step);
        }
    }
    text
}

pub fn run_query(copilot: &RiskCopilot, query: &str, top_k: usize, show_trace: bool) {
    let output = copilot.analyse(query, top_k);
    println!("{}", format_output(&output, show_trace));
}

fn is_exit_command(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Prompt for questions until `exit`, `quit` or end of input.
pub async fn interactive_loop(
    copilot: &RiskCopilot,
    top_k: usize,
    show_trace: bool,
) -> std::io::Result<()> {
    println!("Agentic RAG Risk Copilot (offline)");
    println!("Type 'exit' or 'quit' to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Question> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        let query = line.trim();
        if is_exit_command(query) {
            return Ok(());
        }
        if query.is_empty() {
            continue;
        }
        run_query(copilot, query, top_k, show_trace);
        println!();
    }
}
