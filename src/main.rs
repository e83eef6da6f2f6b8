//! Binary entrypoint that serves the RAG chatbot.

use std::process::ExitCode;

use rag_chatbot::start_rag_chatbot;

/// Start the chatbot server.
fn main() -> ExitCode {
    start_rag_chatbot::run()
}
