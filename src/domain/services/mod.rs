mod chat;
mod event_stream;
mod generation;

pub use chat::*;
pub use event_stream::*;
pub use generation::*;
