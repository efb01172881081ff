pub mod memory_store;
pub mod pg_store;
pub mod repository;
pub mod store;
pub mod user_repo;

pub use memory_store::MemoryDocumentStore;
pub use pg_store::PgDocumentStore;
pub use repository::{Document, Repository};
pub use store::{Collection, DocumentStore};
pub use user_repo::UserDirectory;

use crate::models::{candidate::Candidate, event::Event, lodge::Lodge, message::Message};

pub type LodgeRepository = Repository<Lodge>;
pub type CandidateRepository = Repository<Candidate>;
pub type EventRepository = Repository<Event>;
pub type MessageRepository = Repository<Message>;
