//! Bot/agent mode controller.
//!
//! Mode only changes in response to an event being handled. The agent
//! inactivity timeout is checked lazily when a lead message arrives; there is
//! no background timer.
//!
//! | Mode  | Event                    | Result                            |
//! |-------|--------------------------|-----------------------------------|
//! | bot   | take control             | agent (`manual-takeover`)         |
//! | bot   | agent message            | agent (`manual-takeover`)         |
//! | agent | take control             | no-op                             |
//! | agent | agent message            | refresh last agent activity       |
//! | agent | lead message, idle > 30m | bot (`timeout`)                   |
//! | agent | release control          | bot (`manual-release`)            |

use chrono::Duration;

use crate::domain::foundation::{OperatorId, StateMachine, Timestamp, ValidationError};

use super::aggregate::Conversation;
use super::mode::{ConversationMode, ModeTransition, TransitionTrigger};

/// Default agent inactivity threshold in minutes.
pub const DEFAULT_AGENT_TIMEOUT_MINUTES: i64 = 30;

/// An event that may affect the conversation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeEvent {
    /// A lead message arrived. The only event that evaluates the timeout.
    LeadMessage { at: Timestamp },
    /// An agent sent a message, optionally flagged as an explicit takeover.
    AgentMessage {
        at: Timestamp,
        operator: Option<OperatorId>,
        takeover: bool,
    },
    /// Explicit "take control" request from an operator.
    TakeControl { at: Timestamp, operator: OperatorId },
    /// Explicit request to hand the conversation back to the bot.
    ReleaseControl { at: Timestamp },
    /// The bot produced a message. Never changes the mode.
    BotMessage { at: Timestamp },
}

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEvaluation {
    pub effective_mode: ConversationMode,
    pub transitioned: bool,
    pub transition: Option<ModeTransition>,
}

impl ModeEvaluation {
    fn unchanged(mode: ConversationMode) -> Self {
        Self {
            effective_mode: mode,
            transitioned: false,
            transition: None,
        }
    }

    fn changed(transition: ModeTransition) -> Self {
        Self {
            effective_mode: transition.current,
            transitioned: true,
            transition: Some(transition),
        }
    }
}

/// Applies mode rules to a conversation.
#[derive(Debug, Clone, Copy)]
pub struct ModeController {
    agent_timeout: Duration,
}

impl ModeController {
    pub fn new(agent_timeout: std::time::Duration) -> Self {
        let agent_timeout = Duration::from_std(agent_timeout)
            .unwrap_or_else(|_| Duration::minutes(DEFAULT_AGENT_TIMEOUT_MINUTES));
        Self { agent_timeout }
    }

    pub fn agent_timeout(&self) -> Duration {
        self.agent_timeout
    }

    /// Returns true when the agent has been idle longer than the threshold at `now`.
    ///
    /// Exactly reaching the threshold does not count as a timeout.
    pub fn agent_timed_out(&self, conversation: &Conversation, now: Timestamp) -> bool {
        let control = conversation.control();
        control.mode == ConversationMode::Agent
            && now.duration_since(&control.agent_inactivity_reference()) > self.agent_timeout
    }

    /// Evaluates an event against the conversation and updates its control state.
    pub fn evaluate(
        &self,
        conversation: &mut Conversation,
        event: &ModeEvent,
    ) -> Result<ModeEvaluation, ValidationError> {
        let mode = conversation.mode();

        let evaluation = match event {
            ModeEvent::LeadMessage { at } => {
                if self.agent_timed_out(conversation, *at) {
                    let transition = switch_mode(
                        conversation,
                        ConversationMode::Bot,
                        TransitionTrigger::Timeout,
                        *at,
                    )?;
                    ModeEvaluation::changed(transition)
                } else {
                    ModeEvaluation::unchanged(mode)
                }
            }

            ModeEvent::AgentMessage { at, operator, takeover } => {
                let evaluation = if mode == ConversationMode::Bot {
                    let transition = switch_mode(
                        conversation,
                        ConversationMode::Agent,
                        TransitionTrigger::ManualTakeover,
                        *at,
                    )?;
                    ModeEvaluation::changed(transition)
                } else {
                    if *takeover {
                        tracing::debug!(
                            lead_id = %conversation.id(),
                            "takeover flag on agent message while already in agent mode"
                        );
                    }
                    ModeEvaluation::unchanged(mode)
                };

                let control = conversation.control_mut();
                control.last_agent_activity = Some(*at);
                if let Some(operator) = operator {
                    if evaluation.transitioned || control.advisor.is_none() {
                        control.advisor = Some(operator.clone());
                    }
                }
                evaluation
            }

            ModeEvent::TakeControl { at, operator } => {
                if mode == ConversationMode::Agent {
                    let control = conversation.control_mut();
                    if control.advisor.is_none() {
                        control.advisor = Some(operator.clone());
                    }
                    ModeEvaluation::unchanged(mode)
                } else {
                    let transition = switch_mode(
                        conversation,
                        ConversationMode::Agent,
                        TransitionTrigger::ManualTakeover,
                        *at,
                    )?;
                    conversation.control_mut().advisor = Some(operator.clone());
                    ModeEvaluation::changed(transition)
                }
            }

            ModeEvent::ReleaseControl { at } => {
                if mode == ConversationMode::Bot {
                    ModeEvaluation::unchanged(mode)
                } else {
                    let transition = switch_mode(
                        conversation,
                        ConversationMode::Bot,
                        TransitionTrigger::ManualRelease,
                        *at,
                    )?;
                    ModeEvaluation::changed(transition)
                }
            }

            ModeEvent::BotMessage { .. } => ModeEvaluation::unchanged(mode),
        };

        if let Some(transition) = evaluation.transition {
            tracing::info!(
                lead_id = %conversation.id(),
                from = %transition.previous,
                to = %transition.current,
                trigger = %transition.trigger,
                "conversation mode changed"
            );
        }

        Ok(evaluation)
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::minutes(DEFAULT_AGENT_TIMEOUT_MINUTES),
        }
    }
}

fn switch_mode(
    conversation: &mut Conversation,
    target: ConversationMode,
    trigger: TransitionTrigger,
    at: Timestamp,
) -> Result<ModeTransition, ValidationError> {
    let control = conversation.control_mut();
    let previous = control.mode;
    control.mode = previous.transition_to(target)?;
    control.mode_since = at;
    control.last_transition = ModeTransition {
        previous,
        current: target,
        trigger,
        at,
    };
    let transition = control.last_transition;
    conversation.touch(at);
    Ok(transition)
}
