pub mod image;
pub mod page;
pub mod request;
pub mod user;

pub use image::*;
pub use page::*;
pub use request::*;
pub use user::*;
