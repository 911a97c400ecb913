use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use expensebot_core::config::{AppConfig, LoadOptions};
use expensebot_core::dialogue::{DialogueSession, TurnOutcome};
use expensebot_core::domain::message::Sender;
use expensebot_core::extract::FieldExtractor;
use expensebot_db::{connect_with_settings, migrations, RequestStore, SqlRequestStore};
use expensebot_speech::{AudioSource, HttpTranscriber, TranscriptionProvider};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(chat_loop(&config)) {
        Ok(()) => CommandResult::success("chat", "conversation ended"),
        Err(error) => CommandResult::failure("chat", "chat_session", format!("{error:#}"), 4),
    }
}

async fn chat_loop(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .context("failed to connect to database")?;
    migrations::run_pending(&pool).await.context("failed to apply pending migrations")?;

    let store = SqlRequestStore::new(pool);
    let transcriber =
        HttpTranscriber::from_config(&config.speech).context("failed to build transcriber")?;

    let extractor = FieldExtractor::new();
    let mut session = DialogueSession::new();
    let mut printed = 0usize;
    flush_assistant_messages(&session, &mut printed);

    if transcriber.is_some() {
        println!("(speech input is available: `:audio <path>` transcribes a clip)");
    }
    println!("(type :quit to leave)");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).context("failed to read input")?;
        if read == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == ":quit" || input == ":exit" {
            break;
        }

        let utterance = if let Some(path) = input.strip_prefix(":audio ") {
            match transcribe_clip(transcriber.as_ref(), path.trim()).await {
                Ok(text) => {
                    println!("(transcribed) {text}");
                    text
                }
                Err(detail) => {
                    println!("({detail})");
                    session.transcription_failed();
                    flush_assistant_messages(&session, &mut printed);
                    continue;
                }
            }
        } else {
            input.to_string()
        };

        let outcome = session.handle_utterance(&extractor, &utterance);
        flush_assistant_messages(&session, &mut printed);

        if let TurnOutcome::Submit(draft) = outcome {
            match store.append(&draft).await {
                Ok(request) => {
                    println!("(stored as {})", request.id.0);
                    session.submission_succeeded();
                }
                Err(error) => session.submission_failed(&error.to_string()),
            }
            flush_assistant_messages(&session, &mut printed);
        }
    }

    Ok(())
}

async fn transcribe_clip(
    transcriber: Option<&HttpTranscriber>,
    path: &str,
) -> Result<String, String> {
    let transcriber = transcriber.ok_or_else(|| "speech input is not configured".to_string())?;
    let audio = AudioSource::from_file(Path::new(path)).await.map_err(|err| err.to_string())?;
    transcriber.transcribe(&audio).await.map_err(|err| err.to_string())
}

/// Prints assistant messages appended since the last flush. A successful
/// submission clears the transcript, so the cursor rewinds when it runs past
/// the end.
fn flush_assistant_messages(session: &DialogueSession, printed: &mut usize) {
    let messages = session.messages();
    if *printed > messages.len() {
        *printed = 0;
    }
    for message in &messages[*printed..] {
        if message.sender == Sender::Assistant {
            println!("{}", message.text);
        }
    }
    *printed = messages.len();
}
