mod auth;
mod backend;
mod event;
mod generation;
mod problem;
mod stream_event;
mod transcript;

pub use auth::*;
pub use backend::*;
pub use event::*;
pub use generation::*;
pub use problem::*;
pub use stream_event::*;
pub use transcript::*;
