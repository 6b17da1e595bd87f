// Library surface for the typing engine; the terminal harness in main.rs
// only adds rendering on top of it.
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod key_filter;
pub mod layout;
pub mod runtime;
pub mod script;
pub mod session;
pub mod stats;

pub use config::EngineConfig;
pub use engine::{CharStatus, CharacterState, Dispatch, EngineListener, NoopListener, TypingEngine};
pub use key_filter::{KeyAction, RawKeyEvent};
pub use layout::{Finger, KeyboardLayoutMap, LayoutId};
pub use session::{Session, SessionStatus};
pub use stats::{LetterStats, TypingStats};
