pub mod assignments;
pub mod backup_exchange;
pub mod core;
pub mod courses;
pub mod enrollments;
pub mod materials;
pub mod submissions;
pub mod users;
