pub mod audit_event;
pub mod entry;
pub mod form;
pub mod project;
pub mod user;

pub use audit_event::AuditEvent;
pub use entry::Entry;
pub use form::Form;
pub use project::{Assignment, Project};
pub use user::{Role, User};
