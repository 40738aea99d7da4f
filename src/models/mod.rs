pub mod application;
pub mod bank_info;
pub mod document;
pub mod investment;
pub mod investor;
pub mod startup;
pub mod user;

pub use application::*;
pub use bank_info::*;
pub use document::*;
pub use investment::*;
pub use investor::*;
pub use startup::*;
pub use user::*;
