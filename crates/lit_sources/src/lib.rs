pub mod cli;
pub mod router;
pub mod sources;

pub use cli::{handle_command, SourceArgs, SourceCommands};
pub use router::{SearchOutcome, SearchRouter};
pub use sources::{Source, SourceConfig, SourceMetadata};

pub mod prelude {
    pub use super::router::{SearchOutcome, SearchRouter};
    pub use super::sources::{Source, SourceConfig, SourceMetadata};
    pub use lit_core::{Article, Error, Result, YearRange};
}
