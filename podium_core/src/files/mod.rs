pub mod layout;
pub mod listing;
pub mod mime_table;
pub mod models;
pub mod store;
pub mod validation;

pub use layout::{StorageLayout, StorageLocation};
pub use mime_table::mime_for_path;
pub use models::{FileListQuery, FileType, FileUpload, StoredFile};
pub use store::{FileStore, FileWriter, IdGenerator, UuidGenerator};
pub use validation::{FileValidator, ValidationError};
