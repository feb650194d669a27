//! The gRPC stream handler that bridges frames to conversation turns.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};

use ember_conversation::{SessionStore, TurnOrchestrator};

use crate::proto::v1::assistant_service_server::AssistantService;
use crate::proto::v1::{ChatRequest, ChatResponse};

/// Serves `AssistantService::chat`: one spawned task per stream, frames
/// processed strictly in order. A turn failure surfaces as `Status::internal`
/// and ends the stream; the session stays cached and a new stream picks it up
/// where it left off.
pub struct ChatService {
    sessions: Arc<SessionStore>,
    orchestrator: Arc<TurnOrchestrator>,
}

impl ChatService {
    #[must_use]
    pub fn new(sessions: Arc<SessionStore>, orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            sessions,
            orchestrator,
        }
    }

    /// Run one inbound frame to completion and build its response frame.
    pub async fn handle_frame(&self, frame: ChatRequest) -> Result<ChatResponse, Status> {
        if frame.session_id.is_empty() {
            return Err(Status::invalid_argument("session_id is required"));
        }

        let handle = self.sessions.resolve(&frame.session_id).await;
        let mut session = handle.lock().await;

        let text = self
            .orchestrator
            .run_turn(&mut session, &frame.message)
            .await
            .map_err(|e| {
                warn!("Turn failed for session {}: {e}", frame.session_id);
                Status::internal(format!("Failed to process message: {e}"))
            })?;

        Ok(ChatResponse {
            session_id: frame.session_id,
            text_response: text,
            is_final: true,
        })
    }
}

#[tonic::async_trait]
impl AssistantService for ChatService {
    type ChatStream = ReceiverStream<Result<ChatResponse, Status>>;

    async fn chat(
        &self,
        request: Request<Streaming<ChatRequest>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(4);

        let sessions = Arc::clone(&self.sessions);
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            let service = ChatService::new(sessions, orchestrator);
            info!("Chat stream opened");

            loop {
                let frame = match inbound.next().await {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        warn!("Chat stream receive error: {e}");
                        let _ = tx.send(Err(Status::internal("stream receive error"))).await;
                        break;
                    }
                    // Client half-closed; we are done.
                    None => break,
                };

                debug!("Received frame for session: {}", frame.session_id);
                let reply = service.handle_frame(frame).await;
                let failed = reply.is_err();

                if tx.send(reply).await.is_err() {
                    debug!("Chat stream receiver dropped");
                    break;
                }
                if failed {
                    break;
                }
            }

            info!("Chat stream closed");
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
