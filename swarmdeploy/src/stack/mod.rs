//! Stack lifecycle: deploy, remove, roll back and day-2 changes.

mod data_root;
mod deploy;
mod ops;
mod removal;

pub use data_root::{PreparedDataRoot, prepare_data_root};
pub use deploy::{DeployReport, deploy};
pub use ops::{RollbackReport, rollback, scale, update_image};
pub use removal::{remove_and_wait, wait_until_gone};
