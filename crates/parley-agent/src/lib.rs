//! Parley Agent: the interactive session controller
//!
//! Coordinates a streaming agent turn with a key-listener thread, a
//! double-interrupt exit debounce and an activity indicator.

pub mod aggregator;
pub mod cancel;
pub mod capability;
pub mod conversation;
pub mod debounce;
pub mod error;
pub mod indicator;
pub mod interrupt;
pub mod keys;
pub mod llm_agent;
pub mod session;
pub mod terminal;

pub use aggregator::{StreamAccumulator, StreamingAggregator, TurnResult};
pub use cancel::CancellationSignal;
pub use capability::{AgentCapability, Fragment, FragmentKind, FragmentStream};
pub use conversation::Conversation;
pub use debounce::{DebounceState, ExitDebounce, InterruptOutcome};
pub use error::{AgentError, AgentResult};
pub use indicator::{ActivityIndicator, IndicatorState};
pub use interrupt::{forward_interrupts, forward_os_interrupts};
pub use keys::{ChannelKeySource, CrosstermKeySource, KeyListener, KeySource};
pub use llm_agent::{LlmAgent, LlmAgentConfig};
pub use session::{Session, SessionConfig, SessionExit, SessionState};
pub use terminal::{CaptureBuffer, SharedWriter, CANCELLED_MARKER};
