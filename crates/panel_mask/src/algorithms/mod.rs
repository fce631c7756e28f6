pub mod rasterize;
pub mod dilation;
pub mod composite;
pub mod overlay;
pub mod inpaint;

pub use rasterize::*;
pub use dilation::*;
pub use composite::*;
pub use overlay::*;
pub use inpaint::*;
