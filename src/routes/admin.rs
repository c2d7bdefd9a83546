mod callback;
mod dashboard;
mod guard;
mod login;
mod logout;

pub use callback::*;
pub use dashboard::*;
pub use guard::*;
pub use login::*;
pub use logout::*;
