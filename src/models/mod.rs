pub mod engagement;
pub mod enums;
pub mod mood;
pub mod patient;
pub mod professional;

pub use engagement::*;
pub use enums::*;
pub use mood::*;
pub use patient::*;
pub use professional::*;
