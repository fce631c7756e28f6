pub mod geojson;
pub mod image;

pub use self::image::{load_image, save_image};
