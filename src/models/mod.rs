pub mod file;
pub mod note;
pub mod user;

pub use file::FileRecord;
pub use note::Note;
pub use user::User;
