pub mod extractor;
pub mod jwt;
pub mod password;
pub mod principal;

pub use principal::{AdminAccess, EntryScope, Principal, ProjectManagerAccess};
