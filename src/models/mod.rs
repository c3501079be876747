pub mod credential;
pub mod session;
pub mod token;

pub use credential::CredentialRecord;
pub use session::{SessionProfile, SessionRecord, Theme};
pub use token::{Claims, TokenKind, TokenPair};
