//! Offline agent that answers from a fixed list of replies.

use async_trait::async_trait;
use mdt_application::{AgentCapability, CapabilityError, InvocationContext};
use mdt_domain::AgentProfile;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cycles through configured replies, one per call.
///
/// Follow-up calls get the next reply like any other call; used for demos
/// and for exercising the engine without a provider.
pub struct ScriptedAgent {
    profile: AgentProfile,
    replies: Vec<String>,
    next: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(profile: AgentProfile, replies: Vec<String>) -> Self {
        Self {
            profile,
            replies,
            next: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentCapability for ScriptedAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn speak(&self, _context: &InvocationContext) -> Result<String, CapabilityError> {
        if self.replies.is_empty() {
            return Err(CapabilityError::EmptyResponse);
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.replies.len();
        Ok(self.replies[index].clone())
    }
}
