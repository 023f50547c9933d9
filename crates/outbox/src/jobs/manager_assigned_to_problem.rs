//! Tell both sides that a manager took the problem.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use chatdesk_core::{DomainError, EventId, ProblemId};
use chatdesk_events::{Event, EventStream};
use chatdesk_producer::{MessageProducer, OutboundMessage};
use chatdesk_store::{MessagesStore, ProblemsStore};

use crate::handler::JobHandler;

pub const NAME: &str = "manager-assigned-to-problem";

pub fn marshal_payload(problem_id: ProblemId) -> Result<String, DomainError> {
    if problem_id.is_nil() {
        return Err(DomainError::invalid_id("problem id is nil"));
    }
    Ok(problem_id.to_string())
}

fn unmarshal_payload(payload: &str) -> Result<ProblemId, DomainError> {
    let id: ProblemId = payload.parse()?;
    if id.is_nil() {
        return Err(DomainError::invalid_id("problem id is nil"));
    }
    Ok(id)
}

/// Creates the "Manager … will answer you" service message, produces it to
/// the broker, and publishes `NewMessage` to the client and `NewChat` to the
/// manager.
pub struct ManagerAssignedToProblemJob {
    problems: Arc<dyn ProblemsStore>,
    messages: Arc<dyn MessagesStore>,
    producer: Arc<dyn MessageProducer>,
    event_stream: Arc<dyn EventStream>,
}

impl ManagerAssignedToProblemJob {
    pub fn new(
        problems: Arc<dyn ProblemsStore>,
        messages: Arc<dyn MessagesStore>,
        producer: Arc<dyn MessageProducer>,
        event_stream: Arc<dyn EventStream>,
    ) -> Self {
        Self {
            problems,
            messages,
            producer,
            event_stream,
        }
    }
}

#[async_trait]
impl JobHandler for ManagerAssignedToProblemJob {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, payload: &str) -> anyhow::Result<()> {
        let problem_id = unmarshal_payload(payload)
            .with_context(|| format!("unmarshal payload in <{NAME}> job"))?;

        let problem = self
            .problems
            .get(problem_id)
            .await
            .with_context(|| format!("get problem in <{NAME}> job"))?;
        let manager_id = problem
            .manager_id
            .ok_or_else(|| anyhow::anyhow!("problem {problem_id} has no manager"))?;

        let client_id = self
            .problems
            .get_client(problem_id)
            .await
            .with_context(|| format!("get client in <{NAME}> job"))?;
        let request_id = self
            .problems
            .get_request_id(problem_id)
            .await
            .with_context(|| format!("get request id in <{NAME}> job"))?;

        let body = format!("Manager {manager_id} will answer you");
        let msg = self
            .messages
            .create_service_message(request_id, problem_id, problem.chat_id, &body)
            .await
            .with_context(|| format!("create service message in <{NAME}> job"))?;

        self.producer
            .produce(OutboundMessage {
                id: msg.id,
                chat_id: msg.chat_id,
                body: msg.body.clone(),
                from_client: false,
            })
            .await
            .with_context(|| format!("produce message in <{NAME}> job"))?;

        self.event_stream
            .publish(
                client_id,
                Event::NewMessage {
                    event_id: EventId::new(),
                    request_id,
                    chat_id: msg.chat_id,
                    message_id: msg.id,
                    author_id: None,
                    created_at: msg.created_at,
                    body: msg.body,
                    is_service: true,
                },
            )
            .await
            .with_context(|| format!("publish client event in <{NAME}> job"))?;

        self.event_stream
            .publish(
                manager_id,
                Event::NewChat {
                    event_id: EventId::new(),
                    chat_id: problem.chat_id,
                    client_id,
                    request_id,
                },
            )
            .await
            .with_context(|| format!("publish manager event in <{NAME}> job"))?;

        debug!(problem_id = %problem_id, manager_id = %manager_id, "assignment announced");
        Ok(())
    }
}
