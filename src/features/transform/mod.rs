pub mod handler;
pub mod ops;

pub use handler::create_transform_router;
pub use ops::{Fit, FlipMode, Rotation};
