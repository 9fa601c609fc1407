mod media;
mod post;
mod profile;
mod user;

pub use media::*;
pub use post::*;
pub use profile::*;
pub use user::*;
