pub mod answer;
pub mod chain;
pub mod page;
pub mod task;
pub use answer::AnswerValue;
pub use chain::{ChainReport, ChainState, ChainStatus, Credentials, StopReason};
pub use page::{FetchedResource, PageContent};
pub use task::{Task, TaskKind};
