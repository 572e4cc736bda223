//! Scripted agent capability shared by the integration tests.

#![allow(dead_code)]

use parley_agent::{AgentCapability, AgentError, Conversation, Fragment, FragmentStream};
use parley_tools::ToolRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub enum Step {
    Emit(Fragment),
    Fail(String),
    /// Never produce another fragment.
    Hang,
}

pub struct ScriptedAgent {
    steps: Vec<Step>,
    /// Fragments handed to the consumer so far.
    pub emitted: Arc<AtomicUsize>,
    /// Notified when the stream is first polled.
    pub started: Arc<Notify>,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            emitted: Arc::new(AtomicUsize::new(0)),
            started: Arc::new(Notify::new()),
        }
    }

    /// Text fragments followed by a hang.
    pub fn hanging(texts: &[&str]) -> Self {
        let mut steps: Vec<Step> = texts.iter().map(|t| Step::Emit(Fragment::text(*t))).collect();
        steps.push(Step::Hang);
        Self::new(steps)
    }

    pub fn emitted(&self) -> usize { self.emitted.load(Ordering::SeqCst) }
}

impl AgentCapability for ScriptedAgent {
    fn name(&self) -> &str { "scripted" }

    fn stream_respond(&self, _conversation: &Conversation, _tools: Arc<ToolRegistry>) -> FragmentStream {
        let steps = self.steps.clone();
        let emitted = self.emitted.clone();
        let started = self.started.clone();
        Box::pin(async_stream::stream! {
            started.notify_one();
            for step in steps {
                match step {
                    Step::Emit(fragment) => {
                        emitted.fetch_add(1, Ordering::SeqCst);
                        yield Ok(fragment);
                    }
                    Step::Fail(message) => {
                        yield Err(AgentError::Stream(message));
                        return;
                    }
                    Step::Hang => futures::future::pending::<()>().await,
                }
            }
        })
    }
}
