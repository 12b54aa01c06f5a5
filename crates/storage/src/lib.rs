#![forbid(unsafe_code)]

pub mod bank;
pub mod json;
pub mod repository;

pub use bank::{BankError, FormatErrorKind, load_bank, parse_bank};
pub use json::FileProgressRepository;
pub use repository::{
    InMemoryProgressRepository, LoadedProgress, ProgressRepository, RecoverableWarning,
    StorageError,
};
