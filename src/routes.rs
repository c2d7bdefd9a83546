mod admin;
mod home;
mod member;

pub use admin::*;
pub use home::*;
pub use member::*;
