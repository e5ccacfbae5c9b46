//! Generators registered with the process-wide registry at link time.

pub mod invert_image;
pub mod metadata_tester;
pub mod pyramid;
pub mod wrap_user;
pub mod wraptest;

pub use invert_image::InvertImage;
pub use metadata_tester::MetadataTester;
pub use pyramid::Pyramid;
pub use wrap_user::WrapUser;
pub use wraptest::Wraptest;
