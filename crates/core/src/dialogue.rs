//! Turn-based dialogue that fills an expense request one field at a time.
//!
//! The session is an owned value: whatever layer manages one conversation's
//! lifetime (a CLI loop, a per-conversation server entry) holds it and feeds
//! it one utterance per turn. The machine never touches storage itself; when
//! the user confirms, it hands the completed draft back as
//! [`TurnOutcome::Submit`] and stays at the confirm stage until the caller
//! reports the store outcome via [`DialogueSession::submission_succeeded`] or
//! [`DialogueSession::submission_failed`].

use serde::{Deserialize, Serialize};

use crate::domain::message::{Message, Transcript};
use crate::domain::request::DraftRequest;
use crate::extract::FieldExtractor;

/// Affirmative tokens intercepted before any stage-specific handling.
const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "sure", "ok", "affirmative", "yep", "yeah", "proceed"];

const UNNAMED_PROJECT: &str = "Unnamed Project";

const MIN_REASON_TOKENS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Project,
    Amount,
    Reason,
    Confirm,
}

impl Stage {
    fn prompt(&self) -> &'static str {
        match self {
            Self::Project => "Please provide the project information (name or number).",
            Self::Amount => "Please specify the amount.",
            Self::Reason => "What is the reason for this expense?",
            Self::Confirm => "Please confirm with 'yes' or 'no'.",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    /// Assistant messages were appended to the transcript; nothing else to do.
    Replied,
    /// Affirmative token outside the confirm stage: the turn is swallowed
    /// with no reply. Matches the original dialogue's documented behavior.
    Absorbed,
    /// The user confirmed. The caller must persist this draft and then report
    /// back; the session stays at the confirm stage meanwhile.
    Submit(DraftRequest),
    /// The user cancelled; stage and draft were reset.
    Cancelled,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueSession {
    stage: Stage,
    draft: DraftRequest,
    transcript: Transcript,
}

impl DialogueSession {
    /// Fresh conversation: project stage, empty draft, welcome prompt.
    pub fn new() -> Self {
        let mut session = Self::default();
        session.say(format!("Welcome! {}", Stage::Project.prompt()));
        session
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn draft(&self) -> &DraftRequest {
        &self.draft
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    /// Processes one user utterance to completion. The utterance lands in the
    /// transcript as a user message before any handling runs.
    pub fn handle_utterance(&mut self, extractor: &FieldExtractor, text: &str) -> TurnOutcome {
        self.transcript.push(Message::user(text));
        let utterance = text.to_lowercase();

        if AFFIRMATIVE_TOKENS.iter().any(|token| utterance.contains(token)) {
            if self.stage == Stage::Confirm {
                return TurnOutcome::Submit(self.draft.clone());
            }
            return TurnOutcome::Absorbed;
        }

        match self.stage {
            Stage::Project => {
                let info = extractor.project_info(&utterance);
                match info.number {
                    Some(number) => {
                        let name = info.name.unwrap_or_else(|| UNNAMED_PROJECT.to_string());
                        self.say(format!("Project info: {name} ({number})"));
                        self.draft.project_name = Some(name);
                        self.draft.project_number = Some(number);
                        self.stage = Stage::Amount;
                        self.say(Stage::Amount.prompt());
                    }
                    None => {
                        self.say("I couldn't detect a project number. Please mention it explicitly.");
                    }
                }
            }
            Stage::Amount => match extractor.amount(&utterance) {
                Some((amount, currency)) => {
                    self.say(format!("Amount received: {amount} {currency}"));
                    self.draft.amount = Some(amount);
                    self.draft.currency = Some(currency);
                    self.stage = Stage::Reason;
                    self.say(Stage::Reason.prompt());
                }
                None => {
                    self.say("I couldn't detect an amount. Please specify it.");
                }
            },
            Stage::Reason => {
                if utterance.split_whitespace().count() >= MIN_REASON_TOKENS {
                    self.draft.reason = Some(utterance);
                    self.stage = Stage::Confirm;
                    self.say(self.summary());
                } else {
                    self.say("Please provide a more detailed reason for the expense.");
                }
            }
            Stage::Confirm => {
                let reply = utterance.trim();
                if reply == "no" || reply == "cancel" {
                    self.stage = Stage::Project;
                    self.draft.clear();
                    self.say("Request cancelled. Let's start over.");
                    return TurnOutcome::Cancelled;
                }
                self.say(Stage::Confirm.prompt());
            }
        }

        TurnOutcome::Replied
    }

    /// The store accepted the submitted draft: reset to a fresh conversation
    /// and announce success. The transcript is cleared before the messages go
    /// out, so the new conversation starts with only them.
    pub fn submission_succeeded(&mut self) {
        self.stage = Stage::Project;
        self.draft.clear();
        self.transcript.clear();
        self.say("Request submitted successfully.");
        self.say("You can start a new request now.");
    }

    /// The store rejected the write. The draft and confirm stage survive so
    /// the user can answer "yes" again to retry, or cancel.
    pub fn submission_failed(&mut self, detail: &str) {
        self.say(format!(
            "Saving your request failed: {detail}. Nothing was lost; answer 'yes' to retry or 'cancel' to discard."
        ));
    }

    /// Transcribed audio produced no usable text. Treated as no input at all:
    /// no user message, no stage or draft mutation, just a re-prompt.
    pub fn transcription_failed(&mut self) {
        self.say(format!("I didn't catch any speech. {}", self.stage.prompt()));
    }

    fn summary(&self) -> String {
        let amount = self
            .draft
            .amount
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "-".to_string());
        let currency = self.draft.currency.map(|currency| currency.to_string()).unwrap_or_default();

        format!(
            "Summary of your request:\n\
             - Project name: {}\n\
             - Project number: {}\n\
             - Amount: {amount} {currency}\n\
             - Reason: {}\n\
             Is this correct? (yes/no)",
            self.draft.project_name.as_deref().unwrap_or("-"),
            self.draft.project_number.as_deref().unwrap_or("-"),
            self.draft.reason.as_deref().unwrap_or("-"),
        )
    }

    fn say(&mut self, text: impl Into<String>) {
        self.transcript.push(Message::assistant(text));
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DialogueSession, Stage, TurnOutcome};
    use crate::domain::message::Sender;
    use crate::domain::request::Currency;
    use crate::extract::FieldExtractor;

    fn drive_to_confirm(session: &mut DialogueSession, extractor: &FieldExtractor) {
        session.handle_utterance(extractor, "project 4021");
        session.handle_utterance(extractor, "300 USD");
        session.handle_utterance(extractor, "client dinner with partners");
        assert_eq!(session.stage(), Stage::Confirm);
    }

    #[test]
    fn new_session_opens_with_a_welcome_prompt() {
        let session = DialogueSession::new();
        assert_eq!(session.stage(), Stage::Project);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].sender, Sender::Assistant);
        assert!(session.messages()[0].text.contains("project information"));
    }

    #[test]
    fn happy_path_advances_one_stage_per_turn() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();

        let outcome = session.handle_utterance(&extractor, "project 4021");
        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(session.stage(), Stage::Amount);
        assert_eq!(session.draft().project_number.as_deref(), Some("4021"));

        let outcome = session.handle_utterance(&extractor, "300 USD");
        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(session.stage(), Stage::Reason);
        assert_eq!(session.draft().amount, Some(Decimal::from(300)));
        assert_eq!(session.draft().currency, Some(Currency::Usd));

        let outcome = session.handle_utterance(&extractor, "client dinner with partners");
        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(session.stage(), Stage::Confirm);

        let summary = &session.messages().last().expect("summary emitted").text;
        assert!(summary.contains("4021"), "summary has project number: {summary}");
        assert!(summary.contains("300"), "summary has amount: {summary}");
        assert!(summary.contains("USD"), "summary has currency: {summary}");
        assert!(summary.contains("client dinner with partners"), "summary has reason: {summary}");

        let outcome = session.handle_utterance(&extractor, "yes");
        let TurnOutcome::Submit(draft) = outcome else {
            panic!("confirmation should yield a submission, got {outcome:?}");
        };
        assert!(draft.is_complete());
        // Still confirm until the caller reports the store outcome.
        assert_eq!(session.stage(), Stage::Confirm);

        session.submission_succeeded();
        assert_eq!(session.stage(), Stage::Project);
        assert_eq!(session.draft(), &Default::default());
        assert_eq!(session.messages().len(), 2);
        assert!(session.messages()[0].text.contains("submitted successfully"));
    }

    #[test]
    fn affirmative_outside_confirm_is_absorbed() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        session.handle_utterance(&extractor, "project 4021");
        let before = session.messages().len();

        let outcome = session.handle_utterance(&extractor, "yes");
        assert_eq!(outcome, TurnOutcome::Absorbed);
        assert_eq!(session.stage(), Stage::Amount, "stage must not move");
        // Only the user's own message lands; no assistant reply.
        assert_eq!(session.messages().len(), before + 1);
        assert_eq!(session.messages().last().expect("user message").sender, Sender::User);
    }

    #[test]
    fn affirmative_interception_matches_substrings() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        drive_to_confirm(&mut session, &extractor);

        let outcome = session.handle_utterance(&extractor, "yeah go ahead");
        assert!(matches!(outcome, TurnOutcome::Submit(_)));
    }

    #[test]
    fn cancellation_resets_without_clearing_transcript() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        drive_to_confirm(&mut session, &extractor);
        let transcript_len = session.messages().len();

        let outcome = session.handle_utterance(&extractor, "cancel");
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(session.stage(), Stage::Project);
        assert_eq!(session.draft(), &Default::default());
        assert!(session.messages().len() > transcript_len, "cancellation message emitted");
    }

    #[test]
    fn short_reason_reprompts_in_place() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        session.handle_utterance(&extractor, "project 4021");
        session.handle_utterance(&extractor, "300 USD");

        session.handle_utterance(&extractor, "fix it");
        assert_eq!(session.stage(), Stage::Reason);
        assert!(session.draft().reason.is_none());
        assert!(session
            .messages()
            .last()
            .expect("re-prompt")
            .text
            .contains("more detailed reason"));
    }

    #[test]
    fn missing_project_number_reprompts_in_place() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();

        session.handle_utterance(&extractor, "the office renovation");
        assert_eq!(session.stage(), Stage::Project);
        assert!(session.draft().project_number.is_none());
        assert!(session.messages().last().expect("re-prompt").text.contains("project number"));
    }

    #[test]
    fn missing_amount_reprompts_in_place() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        session.handle_utterance(&extractor, "project 4021");

        session.handle_utterance(&extractor, "whatever it costs");
        assert_eq!(session.stage(), Stage::Amount);
        assert!(session.draft().amount.is_none());
    }

    #[test]
    fn unrecognized_confirm_reply_reprompts() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        drive_to_confirm(&mut session, &extractor);

        let outcome = session.handle_utterance(&extractor, "hmm maybe");
        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(session.stage(), Stage::Confirm);
        assert!(session.messages().last().expect("re-prompt").text.contains("'yes' or 'no'"));
    }

    #[test]
    fn failed_submission_keeps_draft_for_retry() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        drive_to_confirm(&mut session, &extractor);

        let first = session.handle_utterance(&extractor, "yes");
        assert!(matches!(first, TurnOutcome::Submit(_)));
        session.submission_failed("database is unreachable");

        assert_eq!(session.stage(), Stage::Confirm);
        assert!(session.draft().is_complete(), "draft survives the failed write");
        assert!(session.messages().last().expect("failure message").text.contains("retry"));

        // Retrying yields the same draft again.
        let second = session.handle_utterance(&extractor, "yes");
        let TurnOutcome::Submit(draft) = second else {
            panic!("retry should resubmit");
        };
        assert_eq!(draft.project_number.as_deref(), Some("4021"));
    }

    #[test]
    fn transcription_failure_only_reprompts() {
        let extractor = FieldExtractor::new();
        let mut session = DialogueSession::new();
        session.handle_utterance(&extractor, "project 4021");
        let draft_before = session.draft().clone();
        let len_before = session.messages().len();

        session.transcription_failed();

        assert_eq!(session.stage(), Stage::Amount);
        assert_eq!(session.draft(), &draft_before);
        assert_eq!(session.messages().len(), len_before + 1);
        let reprompt = session.messages().last().expect("re-prompt");
        assert_eq!(reprompt.sender, Sender::Assistant);
        assert!(reprompt.text.contains("specify the amount"));
    }
}
