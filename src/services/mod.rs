pub mod archive;
pub mod code;
pub mod drop;

pub use archive::ArchiveService;
pub use drop::DropService;
