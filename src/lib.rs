// Dungeon Oracle — engagement state engine for a chat-driven dungeon master.
//
//   atoms/   pure types, constants, errors and the generation trait
//   engine/  stateful components, the SQLite store and request handling
//
// A transport builds an `EngineState`, normalizes inbound messages into
// `Request`s and shows the returned `Outcome`.

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{Generation, GenerationRequest, Generator, ProviderError};
pub use atoms::types::{Intent, Outcome, Rejection, Request, Response, UserId, Vote};
pub use engine::config::EngineConfig;
pub use engine::state::EngineState;
