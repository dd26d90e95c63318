pub mod auth;
pub mod files;
pub mod health;
pub mod notes;

pub use auth::{login_user, register_user};
pub use files::{delete_file, download_file, list_files, upload_file};
pub use health::health_check;
pub use notes::{create_note, delete_note, get_note, list_notes, update_note};
