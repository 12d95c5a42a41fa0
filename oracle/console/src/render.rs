//! Console rendering
//!
//! Turns [`OracleMessage`]s into terminal lines. The answer area is redrawn
//! in place as letters land; everything else prints on its own line.

use oracle_core::{BoardEvent, OracleMessage, OracleState, ScareKind};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Erase the current line and return to column 0
const CLEAR_LINE: &str = "\r\x1b[2K";

/// What to do with the terminal for one message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    /// Redraw the answer line in place
    Answer(String),
    /// Print a full line
    Print(String),
    /// End the answer line
    Break,
}

/// Terminal output for a message, if it has any
pub fn describe(msg: &OracleMessage) -> Option<Line> {
    let line = match msg {
        OracleMessage::Board(BoardEvent::TextChanged(text)) => Line::Answer(text.clone()),
        OracleMessage::Board(BoardEvent::RunFinished(_)) => Line::Break,
        OracleMessage::Board(_) | OracleMessage::ClearQuestion | OracleMessage::ScareEnded(_) => {
            return None
        }
        OracleMessage::State(OracleState::Thinking) => {
            Line::Print("  ... the planchette trembles ...".to_string())
        }
        OracleMessage::State(_) => return None,
        OracleMessage::PersonaActive(persona) => Line::Print(format!(
            "~ {} is listening. {}",
            persona.name, persona.backstory
        )),
        OracleMessage::Error(Some(error)) => Line::Print(format!("  ! {error}")),
        OracleMessage::Error(None) => return None,
        OracleMessage::Flash(true) => Line::Print("  \u{00b7} 6 7 \u{00b7}".to_string()),
        OracleMessage::Flash(false) => return None,
        OracleMessage::ScareStarted(ScareKind::Random) => Line::Print("  BOO!".to_string()),
        OracleMessage::ScareStarted(ScareKind::Triggered) => {
            Line::Print("  !!! SOMETHING IS BEHIND YOU !!!".to_string())
        }
        OracleMessage::PickerOpened => Line::Print("  The spirits gather...".to_string()),
        OracleMessage::PickerProgress(percent) => Line::Answer(format!("summoning {percent}%")),
        OracleMessage::PickerOptions(options) => {
            let mut text = String::from("\n  Choose a spirit (:pick N, :close):");
            for (i, persona) in options.iter().enumerate() {
                text.push_str(&format!(
                    "\n    {}. {} - {}",
                    i + 1,
                    persona.name,
                    persona.backstory
                ));
            }
            Line::Print(text)
        }
        OracleMessage::PickerClosed => Line::Print("  The circle closes.".to_string()),
        OracleMessage::Muted(true) => Line::Print("  (sound off)".to_string()),
        OracleMessage::Muted(false) => Line::Print("  (sound on)".to_string()),
    };
    Some(line)
}

/// Write every message from `rx` to `out` until the oracle hangs up
pub async fn run<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<OracleMessage>,
    mut out: W,
) -> std::io::Result<()> {
    while let Some(msg) = rx.recv().await {
        let Some(line) = describe(&msg) else {
            continue;
        };
        let text = match line {
            Line::Answer(text) => format!("{CLEAR_LINE}  >> {text}"),
            Line::Print(text) => format!("{CLEAR_LINE}{text}\n"),
            Line::Break => "\n".to_string(),
        };
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::{Persona, RunToken};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_answer_text_redraws_in_place() {
        assert_eq!(
            describe(&OracleMessage::Board(BoardEvent::TextChanged("CA".into()))),
            Some(Line::Answer("CA".into()))
        );
        assert_eq!(
            describe(&OracleMessage::Board(BoardEvent::RunFinished(RunToken::default()))),
            Some(Line::Break)
        );
    }

    #[test]
    fn test_quiet_messages() {
        assert_eq!(describe(&OracleMessage::ClearQuestion), None);
        assert_eq!(describe(&OracleMessage::State(OracleState::Idle)), None);
        assert_eq!(describe(&OracleMessage::Error(None)), None);
    }

    #[test]
    fn test_picker_options_are_numbered_from_one() {
        let Some(Line::Print(text)) =
            describe(&OracleMessage::PickerOptions(vec![Persona::eleanor()]))
        else {
            panic!("expected a printed line");
        };
        assert!(text.contains("1. Eleanor Vance"));
    }

    #[tokio::test]
    async fn test_run_writes_until_channel_closes() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(OracleMessage::Error(Some("cold".into())))
            .await
            .unwrap();
        drop(tx);

        let mut out = Vec::new();
        run(rx, &mut out).await.unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.ends_with("  ! cold\n"));
    }
}
