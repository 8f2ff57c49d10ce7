pub mod layer;
pub mod projection;
pub mod style;
pub mod symbology;

pub use layer::*;
pub use projection::*;
pub use symbology::*;
