pub mod link;
mod session;
mod staging;

pub use link::LinkPhase;
pub use session::PresentationSession;
pub use staging::{ListIdentity, PlaylistStaging, PublishedSnapshot};
