//! Chat sessions for tradedesk
//!
//! A [`ChatSession`] is the state behind one chat panel. The first turn
//! bootstraps a server-side conversation by shipping the news documents the
//! panel was seeded with; every later turn only references the returned
//! session id. The server owns the history: each reply replaces the local
//! transcript wholesale.
//!
//! Documents usually come from the [`NewsClient`].

pub mod error;
pub mod news;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{ChatError, Result};
pub use news::{NewsClient, NewsSource};
pub use session::{ChatContext, ChatSession, ChatSessionState, SessionMode};
pub use transport::{ChatTransport, HttpChatTransport};
pub use types::{ChatReply, ChatRequest, ChatRole, ChatTurn, NewsDoc, SentimentLabel};
