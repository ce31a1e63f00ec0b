//! Domain operations over the LMS store.
//!
//! Every operation borrows the store connection it runs against, performs its
//! existence and role checks first, and only then writes. Deletes that touch
//! more than one table run inside a single transaction.

pub mod assignments;
pub mod courses;
pub mod enrollments;
pub mod error;
pub mod materials;
pub mod model;
pub mod submissions;
pub mod users;
pub mod validate;

pub use error::{LmsError, LmsResult};
