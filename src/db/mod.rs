pub mod assignments;
pub mod audit;
pub mod entries;
pub mod forms;
pub mod projects;
pub mod users;
