pub mod appointment;
pub mod enums;
pub mod inventory;
pub mod medical_record;
pub mod user;

pub use appointment::*;
pub use enums::*;
pub use inventory::*;
pub use medical_record::*;
pub use user::*;
